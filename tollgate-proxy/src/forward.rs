use crate::error::{Error, Result};
use crate::headers::SanitizedHeaders;
use url::Url;

/// Hop metadata the HTTP client recomputes for the upstream request.
const SKIP_REQUEST_HEADERS: &[&str] = &["content-length", "transfer-encoding"];

/// Response from the upstream provider, collected in full and ready to
/// relay. Repeated header names are folded into one comma-joined value.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: http::StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Forwards sanitized requests to the upstream origin.
///
/// Paths are resolved absolute against the origin, so a configured upstream
/// of `https://auth.example.com` receives `/oauth2/token` at the root
/// regardless of any base path on the URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    upstream: Url,
}

impl Forwarder {
    pub fn new(upstream: Url) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(10))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, upstream }
    }

    pub async fn forward(
        &self,
        method: http::Method,
        path_and_query: &str,
        headers: &SanitizedHeaders,
        body: Option<Vec<u8>>,
    ) -> Result<UpstreamResponse> {
        let target = self
            .upstream
            .join(path_and_query)
            .map_err(|e| Error::Internal(format!("bad upstream path {path_and_query:?}: {e}")))?;

        let mut request = self.client.request(method, target.clone());
        for (name, value) in headers {
            if SKIP_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, target = %target, "upstream request failed");
            Error::Upstream(e.to_string())
        })?;

        let status = response.status();
        let headers = fold_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?
            .to_vec();

        tracing::info!(%status, %target, "upstream responded");
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn fold_headers(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), value)
        })
        .collect()
}
