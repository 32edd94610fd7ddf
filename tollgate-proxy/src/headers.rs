use std::collections::BTreeMap;

/// Header map after sanitization: lowercase names, ASCII values, bounded
/// lengths. `BTreeMap` keeps iteration order stable for logs and tests.
pub type SanitizedHeaders = BTreeMap<String, String>;

/// Longest header value forwarded upstream; anything longer is cut.
pub const MAX_VALUE_LEN: usize = 1024;

/// Normalize request headers before anything else looks at them.
///
/// Names are lowercased, `host` is dropped (the HTTP client sets its own for
/// the upstream origin), values containing non-ASCII bytes are dropped, and
/// values longer than [`MAX_VALUE_LEN`] are truncated. When a name repeats,
/// the last value wins.
pub fn sanitize_headers<'a, I>(headers: I) -> SanitizedHeaders
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut sanitized = BTreeMap::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if name == "host" {
            continue;
        }
        if !value.is_ascii() {
            continue;
        }
        // ASCII-only by now, so a byte slice cannot split a character.
        let value = if value.len() > MAX_VALUE_LEN {
            &value[..MAX_VALUE_LEN]
        } else {
            value
        };
        sanitized.insert(name, value.to_string());
    }
    sanitized
}

/// Sanitize an axum/http header map. Values that are not visible ASCII fail
/// `to_str` and are dropped, which matches the ASCII rule above.
pub fn sanitize_header_map(headers: &http::HeaderMap) -> SanitizedHeaders {
    sanitize_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}
