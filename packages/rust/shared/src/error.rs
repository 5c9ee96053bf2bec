//! Error types for webcard.
//!
//! Library crates use [`WebcardError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for all webcard operations.
#[derive(Debug, thiserror::Error)]
pub enum WebcardError {
    /// DNS-over-HTTPS query failed or returned a non-zero status.
    #[error("DNS lookup failed: {0}")]
    DnsFailure(String),

    /// The DNS query succeeded but returned no TXT answer.
    #[error("no TXT record found at {name}")]
    RecordMissing { name: String },

    /// The TXT record does not carry an `adp:signer <URI>` marker.
    #[error("could not find a valid adp:signer in the TXT record: {record}")]
    PointerNotFound { record: String },

    /// The signer URI does not contain a recognizable content identifier.
    #[error("could not extract a valid IPFS CID from {uri}")]
    PointerUnrecognized { uri: String },

    /// HTTP fetch failed (network error or non-2xx status).
    #[error("{}", fetch_failure_message(.url, .status, .message))]
    FetchFailure {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The fetched document exceeds the configured size ceiling.
    #[error("{url}: document too large ({size} bytes, max {limit})")]
    DocumentTooLarge { url: String, size: u64, limit: u64 },

    /// Turtle or JSON-LD parsing error.
    #[error("graph parse error: {message}")]
    GraphParse { message: String },

    /// The secondary (WebID) profile could not be resolved. Never terminal.
    #[error("secondary profile error: {0}")]
    Secondary(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad domain, bad field spec, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The inbox notification request failed.
    #[error("notification failed: {0}")]
    Notification(String),
}

fn fetch_failure_message(url: &str, status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("fetch failed for {url} (status: {code}): {message}"),
        None => format!("fetch failed for {url}: {message}"),
    }
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WebcardError>;

/// Stable, serializable classification of a [`WebcardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DnsFailure,
    RecordMissing,
    PointerNotFound,
    PointerUnrecognized,
    FetchFailure,
    DocumentTooLarge,
    GraphParseError,
    SecondaryError,
    Config,
    Io,
    Validation,
    Notification,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DnsFailure => "DnsFailure",
            Self::RecordMissing => "RecordMissing",
            Self::PointerNotFound => "PointerNotFound",
            Self::PointerUnrecognized => "PointerUnrecognized",
            Self::FetchFailure => "FetchFailure",
            Self::DocumentTooLarge => "DocumentTooLarge",
            Self::GraphParseError => "GraphParseError",
            Self::SecondaryError => "SecondaryError",
            Self::Config => "Config",
            Self::Io => "Io",
            Self::Validation => "Validation",
            Self::Notification => "Notification",
        };
        f.write_str(name)
    }
}

impl WebcardError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a graph parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::GraphParse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch failure for a transport-level error (no HTTP status).
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FetchFailure {
            url: url.into(),
            status: None,
            message: msg.into(),
        }
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DnsFailure(_) => ErrorKind::DnsFailure,
            Self::RecordMissing { .. } => ErrorKind::RecordMissing,
            Self::PointerNotFound { .. } => ErrorKind::PointerNotFound,
            Self::PointerUnrecognized { .. } => ErrorKind::PointerUnrecognized,
            Self::FetchFailure { .. } => ErrorKind::FetchFailure,
            Self::DocumentTooLarge { .. } => ErrorKind::DocumentTooLarge,
            Self::GraphParse { .. } => ErrorKind::GraphParseError,
            Self::Secondary(_) => ErrorKind::SecondaryError,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Notification(_) => ErrorKind::Notification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WebcardError::config("duplicate predicate adp:hasGithubAccount");
        assert_eq!(
            err.to_string(),
            "config error: duplicate predicate adp:hasGithubAccount"
        );

        let err = WebcardError::RecordMissing {
            name: "_adp.example.com".into(),
        };
        assert!(err.to_string().contains("_adp.example.com"));
    }

    #[test]
    fn fetch_failure_includes_status() {
        let err = WebcardError::FetchFailure {
            url: "https://ipfs.io/ipfs/Qm".into(),
            status: Some(404),
            message: "HTTP 404 Not Found".into(),
        };
        assert!(err.to_string().contains("status: 404"));

        let err = WebcardError::fetch("https://pod.example/card", "connection refused");
        assert!(!err.to_string().contains("status"));
        assert_eq!(err.kind(), ErrorKind::FetchFailure);
    }

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(WebcardError::parse("x").kind(), ErrorKind::GraphParseError);
        assert_eq!(
            WebcardError::Secondary("x".into()).kind(),
            ErrorKind::SecondaryError
        );
        assert_eq!(ErrorKind::PointerNotFound.to_string(), "PointerNotFound");
    }
}
