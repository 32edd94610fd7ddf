use crate::error::{Error, Result};
use serde::Deserialize;
use url::Url;

/// A JSON Web Key Set as served by an issuer's JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A single RSA verification key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub e: String,
    pub n: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub nbf: Option<i64>,
}

const REQUIRED_KEY_FIELDS: [&str; 5] = ["kid", "kty", "use", "e", "n"];

impl Jwks {
    /// Validate the raw JSON shape before deserializing.
    ///
    /// A response missing `keys`, carrying a non-array `keys`, or containing
    /// any key object without the required string fields is rejected outright
    /// rather than partially accepted.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let keys = value
            .get("keys")
            .ok_or_else(|| Error::MalformedKeySet("missing keys".into()))?;
        let keys = keys
            .as_array()
            .ok_or_else(|| Error::MalformedKeySet("keys is not an array".into()))?;

        for (index, key) in keys.iter().enumerate() {
            if !key.is_object() {
                return Err(Error::MalformedKeySet(format!(
                    "key {index} is not an object"
                )));
            }
            for field in REQUIRED_KEY_FIELDS {
                if !key.get(field).is_some_and(|v| v.is_string()) {
                    return Err(Error::MalformedKeySet(format!(
                        "key {index} is missing {field}"
                    )));
                }
            }
        }

        serde_json::from_value(value).map_err(|e| Error::MalformedKeySet(e.to_string()))
    }

    /// Look up a key by its `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// Fetch and structurally validate a key set.
pub async fn fetch_jwks(client: &reqwest::Client, uri: &Url) -> Result<Jwks> {
    tracing::debug!(%uri, "fetching key set");

    let response = client
        .get(uri.clone())
        .send()
        .await
        .map_err(|e| Error::KeySetUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::KeySetUnavailable(format!(
            "{uri} returned {}",
            response.status()
        )));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::KeySetUnavailable(e.to_string()))?;

    Jwks::from_value(value)
}
