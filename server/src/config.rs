use miette::{IntoDiagnostic, Result, WrapErr, miette};
use tollgate_auth::attestation::AttestationConfig;
use tollgate_auth::cache::KeySource;
use tollgate_proxy::config::ProxyConfig;
use tollgate_signals::set::SetConfig;
use url::Url;

/// Environment variable holding the client credentials JSON.
pub const CLIENT_CREDENTIALS_VAR: &str = "CLIENT_CREDENTIALS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Everything the server reads from the environment, resolved at startup so
/// a bad deployment fails before the listener binds.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub proxy: ProxyConfig,
    /// Base URL the user-pool issuer lives under; the pool id from the
    /// client credentials completes it.
    pub pool_issuer: Url,
    pub signals_enabled: bool,
    pub signals: SetConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let upstream = required_url("UPSTREAM_URL")?;
        if upstream.scheme() != "https" {
            return Err(miette!("UPSTREAM_URL must use https, got {upstream}"));
        }

        let attestation = AttestationConfig {
            issuer: required_var("ATTESTATION_ISSUER")?,
            audiences: vec![required_var("ATTESTATION_AUDIENCE")?],
            allowed_apps: split_list("ALLOWED_APP_IDS", &required_var("ALLOWED_APP_IDS")?)?,
            key_source: KeySource::new("attestation", required_url("ATTESTATION_JWKS_URI")?),
        };

        let mut proxy = ProxyConfig::new(upstream, attestation);
        if let Ok(token_path) = std::env::var("TOKEN_PATH") {
            proxy = proxy.with_token_path(token_path);
        }

        // The credentials themselves are read per request through the secret
        // store; only their presence is checked here.
        required_var(CLIENT_CREDENTIALS_VAR)?;

        let signals_enabled = match std::env::var("SIGNALS_ENABLED") {
            Ok(value) => parse_flag("SIGNALS_ENABLED", &value)?,
            Err(_) => true,
        };
        let signals = SetConfig {
            issuer: required_var("SIGNALS_ISSUER")?,
            audience: required_var("SIGNALS_AUDIENCE")?,
            key_source: KeySource::new("transmitter", required_url("SIGNALS_JWKS_URI")?),
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            proxy,
            pool_issuer: required_url("POOL_ISSUER")?,
            signals_enabled,
            signals,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| miette!("{name} is not set"))
}

fn required_url(name: &str) -> Result<Url> {
    Url::parse(&required_var(name)?)
        .into_diagnostic()
        .wrap_err_with(|| format!("{name} is not a valid URL"))
}

fn split_list(name: &str, value: &str) -> Result<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    if items.is_empty() {
        return Err(miette!("{name} is empty"));
    }
    Ok(items)
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(miette!("{name} must be true or false, got {other:?}")),
    }
}
