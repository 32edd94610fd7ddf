use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::events::{
    AccountPurgedEvent, ChangeType, CredentialChange, CredentialChangeEvent, CredentialType,
};
use crate::set::{SetConfig, SetVerifier};
use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use std::sync::Arc;
use tollgate_auth::authorizer::Authorizer;
use tollgate_auth::cache::KeyCache;

/// Receives signed security event tokens and applies them to the directory.
#[derive(Clone)]
pub struct SignalsReceiver {
    enabled: bool,
    verifier: Arc<SetVerifier>,
    directory: Arc<dyn UserDirectory>,
    authorizer: Arc<Authorizer>,
}

impl SignalsReceiver {
    /// Create a new receiver builder.
    pub fn builder() -> SignalsReceiverBuilder {
        SignalsReceiverBuilder::default()
    }

    /// Create the axum router: one delivery endpoint behind the bearer
    /// authorizer.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_event))
            .route_layer(middleware::from_fn_with_state(self.clone(), require_bearer))
            .with_state(self.clone())
    }

    async fn apply_credential_change(&self, event: CredentialChangeEvent) -> Result<Response> {
        let change = &event.events.credential_change;
        let user_id = &change.subject.uri;

        let Some(flow) = classify(change) else {
            tracing::error!(
                correlation_id = %event.jti,
                user = %user_id,
                change_type = ?change.change_type,
                credential_type = ?change.credential_type,
                "unsupported credential change"
            );
            return Err(Error::InvalidEvent("unsupported credential change".into()));
        };

        if !self.directory.exists(user_id).await? {
            tracing::warn!(
                correlation_id = %event.jti,
                user = %user_id,
                "credential change for unknown user"
            );
            return Ok(accepted());
        }

        match flow {
            CredentialFlow::PasswordUpdate => {
                self.directory.sign_out(user_id).await?;
                tracing::info!(
                    correlation_id = %event.jti,
                    user = %user_id,
                    "sessions revoked after password update"
                );
            }
            CredentialFlow::EmailUpdate => {
                // The new address stays out of the logs.
                let email = event
                    .events
                    .information
                    .as_ref()
                    .and_then(|info| info.email.as_deref())
                    .ok_or_else(|| {
                        Error::InvalidEvent("email update without an email address".into())
                    })?;
                self.directory.sign_out(user_id).await?;
                self.directory.update_email(user_id, email).await?;
                tracing::info!(
                    correlation_id = %event.jti,
                    user = %user_id,
                    "email address updated"
                );
            }
        }

        Ok(accepted())
    }

    async fn apply_account_purge(&self, event: AccountPurgedEvent) -> Result<Response> {
        let user_id = &event.events.account_purged.subject.uri;

        if !self.directory.exists(user_id).await? {
            tracing::warn!(
                correlation_id = %event.jti,
                user = %user_id,
                "account purge for unknown user"
            );
            return Ok(accepted());
        }

        self.directory.sign_out(user_id).await?;
        self.directory.delete(user_id).await?;
        tracing::info!(correlation_id = %event.jti, user = %user_id, "account purged");
        Ok(accepted())
    }
}

/// Handle a delivered security event: verify the SET, match it against the
/// known schemas, apply the consequence to the directory.
async fn handle_event(State(receiver): State<SignalsReceiver>, body: String) -> Result<Response> {
    tracing::info!("handling security event request");

    if !receiver.enabled {
        return Err(Error::Disabled);
    }

    let token = body.trim();
    if token.is_empty() {
        return Err(Error::InvalidEvent("empty request body".into()));
    }

    let payload = receiver.verifier.verify(token).await?;

    if let Ok(event) = serde_json::from_value::<CredentialChangeEvent>(payload.clone()) {
        return receiver.apply_credential_change(event).await;
    }
    if let Ok(event) = serde_json::from_value::<AccountPurgedEvent>(payload) {
        return receiver.apply_account_purge(event).await;
    }
    Err(Error::InvalidEvent("no matching event schema".into()))
}

/// Reject deliveries without a valid user-pool bearer token before the SET
/// is even read.
async fn require_bearer(
    State(receiver): State<SignalsReceiver>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let method_arn = format!("{} {}", request.method(), request.uri().path());

    match receiver
        .authorizer
        .authorize(authorization.as_deref(), &method_arn)
        .await
    {
        Ok(policy) if policy.is_allow() => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        )
            .into_response(),
    }
}

/// The two credential changes the receiver acts on. Everything else is
/// rejected before the directory is touched.
enum CredentialFlow {
    PasswordUpdate,
    EmailUpdate,
}

fn classify(change: &CredentialChange) -> Option<CredentialFlow> {
    match (change.change_type, change.credential_type) {
        (ChangeType::Update, Some(CredentialType::Password)) => {
            Some(CredentialFlow::PasswordUpdate)
        }
        (ChangeType::Update, Some(CredentialType::Email)) => Some(CredentialFlow::EmailUpdate),
        _ => None,
    }
}

fn accepted() -> Response {
    (StatusCode::ACCEPTED, Json(json!({ "message": "Accepted" }))).into_response()
}

// Builder for SignalsReceiver.
pub struct SignalsReceiverBuilder {
    config: Option<SetConfig>,
    key_cache: Option<Arc<KeyCache>>,
    directory: Option<Arc<dyn UserDirectory>>,
    authorizer: Option<Arc<Authorizer>>,
    enabled: bool,
}

impl Default for SignalsReceiverBuilder {
    fn default() -> Self {
        Self {
            config: None,
            key_cache: None,
            directory: None,
            authorizer: None,
            enabled: true,
        }
    }
}

impl SignalsReceiverBuilder {
    pub fn config(mut self, config: SetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a key cache with other components. A dedicated cache is
    /// created when none is supplied.
    pub fn key_cache(mut self, cache: Arc<KeyCache>) -> Self {
        self.key_cache = Some(cache);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Keep the endpoint registered but refuse every delivery with `503`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn build(self) -> Result<SignalsReceiver> {
        let config = self
            .config
            .ok_or_else(|| Error::Internal("config required".to_string()))?;
        let directory = self
            .directory
            .ok_or_else(|| Error::Internal("directory required".to_string()))?;
        let authorizer = self
            .authorizer
            .ok_or_else(|| Error::Internal("authorizer required".to_string()))?;
        let cache = self.key_cache.unwrap_or_else(|| Arc::new(KeyCache::new()));

        Ok(SignalsReceiver {
            enabled: self.enabled,
            verifier: Arc::new(SetVerifier::new(config, cache)),
            directory,
            authorizer,
        })
    }
}
