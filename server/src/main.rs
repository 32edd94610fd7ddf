//! Tollgate server: the attestation-gated OAuth proxy with the security
//! event receiver nested under `/receiver`.

mod config;

use config::ServerConfig;
use miette::{IntoDiagnostic, WrapErr};
use std::sync::Arc;
use tollgate_auth::authorizer::Authorizer;
use tollgate_auth::cache::KeyCache;
use tollgate_auth::secrets::{CachedSecretStore, EnvSecretStore};
use tollgate_proxy::server::ProxyServer;
use tollgate_signals::directory::MemoryUserDirectory;
use tollgate_signals::receiver::SignalsReceiver;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "server=info,tollgate_proxy=info,tollgate_auth=info,tollgate_signals=info,info"
                    .parse()
                    .unwrap()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // One key cache and one secret store behind every component.
    let cache = Arc::new(KeyCache::new());
    let secrets = Arc::new(CachedSecretStore::new(EnvSecretStore::new(
        config::CLIENT_CREDENTIALS_VAR,
    )));

    let proxy = ProxyServer::builder()
        .config(config.proxy.clone())
        .key_cache(cache.clone())
        .secret_store(secrets.clone())
        .build()
        .into_diagnostic()
        .wrap_err("failed to build proxy server")?;

    let authorizer = Arc::new(Authorizer::new(
        config.pool_issuer.clone(),
        secrets,
        cache.clone(),
    ));
    let receiver = SignalsReceiver::builder()
        .config(config.signals.clone())
        .key_cache(cache)
        .directory(Arc::new(MemoryUserDirectory::new()))
        .authorizer(authorizer)
        .enabled(config.signals_enabled)
        .build()
        .into_diagnostic()
        .wrap_err("failed to build signals receiver")?;

    let app = axum::Router::new()
        .nest("/receiver", receiver.router())
        .merge(proxy.router())
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %config.bind_addr, "tollgate listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .into_diagnostic()
        .wrap_err("failed to bind to address")?;
    axum::serve(listener, app)
        .await
        .into_diagnostic()
        .wrap_err("server error")?;

    Ok(())
}
