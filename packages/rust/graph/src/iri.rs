//! Relative IRI resolution.

use url::Url;

/// Parse a base IRI. Non-URL bases are ignored.
pub(crate) fn parse_base(base: Option<&str>) -> Option<Url> {
    base.and_then(|b| Url::parse(b).ok())
}

/// Resolve `raw` against `base`. Absolute IRIs are returned verbatim so
/// that the URL normalizer never rewrites what the author published.
pub(crate) fn resolve(base: Option<&Url>, raw: &str) -> String {
    if Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    match base.and_then(|b| b.join(raw).ok()) {
        Some(joined) => joined.to_string(),
        None => raw.to_string(),
    }
}
