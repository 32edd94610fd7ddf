use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use std::borrow::Cow;

/// Fields as they arrive, before any grant-type decision. Unknown form
/// fields are dropped here and never reach the upstream request.
#[derive(Debug, Default, Deserialize)]
struct RawTokenBody {
    grant_type: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    code: Option<String>,
    code_verifier: Option<String>,
    scope: Option<String>,
    refresh_token: Option<String>,
}

/// A validated token request, discriminated by grant type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRequestBody {
    AuthorizationCode(AuthorizationCodeGrant),
    RefreshToken(RefreshTokenGrant),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCodeGrant {
    pub client_id: String,
    pub redirect_uri: String,
    pub code: String,
    pub code_verifier: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenGrant {
    pub client_id: String,
    pub refresh_token: String,
}

impl TokenRequestBody {
    pub fn grant_type(&self) -> &'static str {
        match self {
            TokenRequestBody::AuthorizationCode(_) => "authorization_code",
            TokenRequestBody::RefreshToken(_) => "refresh_token",
        }
    }

    /// Re-encode as a form body with the confidential client secret
    /// appended. Only validated fields are emitted.
    pub fn to_form(&self, client_secret: &str) -> Result<String> {
        let mut pairs: Vec<(&str, &str)> = vec![("grant_type", self.grant_type())];
        match self {
            TokenRequestBody::AuthorizationCode(grant) => {
                pairs.push(("client_id", &grant.client_id));
                pairs.push(("redirect_uri", &grant.redirect_uri));
                pairs.push(("code", &grant.code));
                if let Some(verifier) = &grant.code_verifier {
                    pairs.push(("code_verifier", verifier));
                }
                pairs.push(("scope", &grant.scope));
            }
            TokenRequestBody::RefreshToken(grant) => {
                pairs.push(("client_id", &grant.client_id));
                pairs.push(("refresh_token", &grant.refresh_token));
            }
        }
        pairs.push(("client_secret", client_secret));
        serde_urlencoded::to_string(&pairs).map_err(|e| Error::Internal(e.to_string()))
    }
}

/// Parse and validate a form-encoded token request.
pub fn parse_token_body(raw: &str) -> Result<TokenRequestBody> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidBody("empty body".into()));
    }
    let fields: RawTokenBody = serde_urlencoded::from_str(raw)
        .map_err(|e| Error::InvalidBody(format!("unparseable form body: {e}")))?;

    match fields.grant_type.as_deref() {
        Some("authorization_code") => {
            Ok(TokenRequestBody::AuthorizationCode(AuthorizationCodeGrant {
                client_id: require(fields.client_id, "client_id", 1, 100)?,
                redirect_uri: require(fields.redirect_uri, "redirect_uri", 1, 2000)?,
                code: require(fields.code, "code", 2, 512)?,
                code_verifier: optional(fields.code_verifier, "code_verifier", 1, 128)?,
                scope: require(fields.scope, "scope", 1, 1000)?,
            }))
        }
        Some("refresh_token") => {
            let refresh_token = fields
                .refresh_token
                .filter(|token| !token.is_empty())
                .ok_or_else(|| Error::InvalidBody("refresh_token is required".into()))?;
            Ok(TokenRequestBody::RefreshToken(RefreshTokenGrant {
                client_id: require(fields.client_id, "client_id", 1, 100)?,
                refresh_token,
            }))
        }
        Some(other) => Err(Error::InvalidBody(format!(
            "unsupported grant_type {other:?}"
        ))),
        None => Err(Error::InvalidBody("missing grant_type".into())),
    }
}

/// Some transports deliver the form body base64-encoded. A plain form body
/// always contains `=` or `&`, which are outside the base64 alphabet, so it
/// never decodes by accident; decoded text must still name a grant_type
/// before it replaces the original.
pub fn decode_transport(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    if let Ok(bytes) = BASE64_STANDARD.decode(trimmed) {
        if let Ok(text) = String::from_utf8(bytes) {
            if text.contains("grant_type=") {
                return Cow::Owned(text);
            }
        }
    }
    Cow::Borrowed(raw)
}

// Bounds count characters, not bytes.

fn require(value: Option<String>, name: &str, min: usize, max: usize) -> Result<String> {
    let value = value.ok_or_else(|| Error::InvalidBody(format!("{name} is required")))?;
    bounded(value, name, min, max)
}

fn optional(value: Option<String>, name: &str, min: usize, max: usize) -> Result<Option<String>> {
    value.map(|v| bounded(v, name, min, max)).transpose()
}

fn bounded(value: String, name: &str, min: usize, max: usize) -> Result<String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::InvalidBody(format!(
            "{name} length {len} outside {min}..={max}"
        )));
    }
    Ok(value)
}
