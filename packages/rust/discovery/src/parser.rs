//! TXT record parsing.
//!
//! An `_adp.<domain>` TXT record carries the primary document location as
//! `adp:signer <URI>`, where one path segment of the URI is an IPFS CIDv0:
//! - Marker: `adp:signer <https://gateway/ipfs/Qm…#this>`
//! - CID: `Qm` followed by exactly 44 alphanumerics

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use webcard_shared::{Result, WebcardError};

/// Matches `adp:signer <URI>` anywhere in the record.
static SIGNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"adp:signer\s*<([^>]+)>").expect("signer regex")
});

/// Matches a whole path segment holding a CIDv0.
static CID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Qm[A-Za-z0-9]{44}$").expect("cid regex")
});

/// Normalize the `data` field of a DoH TXT answer.
///
/// Resolvers quote each character-string, and long records arrive split as
/// `"part one" "part two"`. Adjacent strings are joined and quotes dropped.
pub(crate) fn normalize_txt(data: &str) -> String {
    data.trim().replace("\" \"", "").replace('"', "")
}

/// Extract the signer URI from a normalized TXT record.
pub(crate) fn signer_uri(record: &str) -> Option<&str> {
    SIGNER_RE
        .captures(record)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Find the CID carried in one path segment of the signer URI.
pub(crate) fn extract_cid(uri: &str) -> Result<String> {
    let unrecognized = || WebcardError::PointerUnrecognized {
        uri: uri.to_string(),
    };

    let parsed = Url::parse(uri).map_err(|_| unrecognized())?;
    let segments = parsed.path_segments().ok_or_else(unrecognized)?;

    segments
        .into_iter()
        .find(|segment| CID_RE.is_match(segment))
        .map(str::to_string)
        .ok_or_else(unrecognized)
}
