//! Core domain types for webcard profile resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, Result, WebcardError};
use crate::vocab;

/// Sentinel used when a primary document carries no `foaf:name`.
pub const NO_NAME_FOUND: &str = "No Name Found";

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// A validated, lowercase hostname. The input of every resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Validate and normalize a hostname.
    pub fn parse(input: &str) -> Result<Self> {
        let host = input.trim().trim_end_matches('.').to_ascii_lowercase();

        if host.is_empty() {
            return Err(WebcardError::validation("domain is empty"));
        }
        if host.len() > 253 {
            return Err(WebcardError::validation(format!(
                "domain '{host}' exceeds 253 characters"
            )));
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Err(WebcardError::validation(format!(
                "domain '{host}' must have at least two labels"
            )));
        }

        for label in &labels {
            let valid = !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(WebcardError::validation(format!(
                    "domain '{host}' has an invalid label '{label}'"
                )));
            }
        }

        Ok(Self(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed DNS name queried for this domain's pointer record.
    pub fn lookup_name(&self) -> String {
        format!("_adp.{}", self.0)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Domain {
    type Err = WebcardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = WebcardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper tagging one pipeline run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pointer & document
// ---------------------------------------------------------------------------

/// The primary document location extracted from a domain's TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPointer {
    /// Content identifier (`Qm` + 44 alphanumerics).
    pub cid: String,
    /// URI exactly as published after `adp:signer`.
    pub signer_uri: String,
    /// Gateway URL the document is fetched from (`<gateway>/ipfs/<cid>`).
    pub resolved_uri: String,
}

/// Declared serialization of a fetched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Turtle,
    JsonLd,
}

impl ContentType {
    /// Classify a `Content-Type` header. Absent or unrecognized means Turtle.
    pub fn from_header(header: Option<&str>) -> Self {
        match header {
            Some(value) if value.to_ascii_lowercase().contains("application/ld+json") => {
                Self::JsonLd
            }
            _ => Self::Turtle,
        }
    }
}

/// Raw text body fetched from a URI. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// URI the body was fetched from (also the base for relative IRIs).
    pub uri: String,
    /// Verbatim body text.
    pub body: String,
    /// Declared serialization.
    pub content_type: ContentType,
    /// SHA-256 hex digest of the body.
    pub content_hash: String,
    /// When the body was fetched.
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Which source a social link was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Primary,
    Secondary,
}

/// A link to an external account or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Display name (service name, or host for generic pages).
    pub service_name: String,
    /// Full target URL.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Compact service predicate, or [`vocab::GENERIC_PAGE`].
    pub predicate: String,
    pub source: SourceTag,
}

impl SocialLink {
    pub fn is_generic_page(&self) -> bool {
        self.predicate == vocab::GENERIC_PAGE
    }
}

/// Attributes extracted from the primary (content-addressed) document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// `foaf:name`, or [`NO_NAME_FOUND`].
    pub name: String,
    /// `foaf:img` reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// `adp:hasEcashAccount` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_address: Option<String>,
    /// `adp:hasWebID` reference. Triggers secondary resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_endpoint: Option<String>,
    /// Service links in table order, then generic pages in document order.
    pub social_links: Vec<SocialLink>,
    /// The document text exactly as fetched.
    pub raw_document: String,
    /// Value of the caller's requested field, when asked for and present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_field: Option<String>,
}

/// Attributes extracted from the secondary (WebID) endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryProfile {
    /// The endpoint URI this profile was fetched from.
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Write endpoint used only by the access-request side-action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox: Option<String>,
    pub social_links: Vec<SocialLink>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// One row of the primary/secondary comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedField {
    pub field_name: String,
    pub primary_value: Option<String>,
    pub secondary_value: Option<String>,
    /// Compact predicate the row is keyed on (e.g. `foaf:name`).
    pub predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub has_conflict: bool,
}

impl MergedField {
    /// Build a row, computing the conflict flag from the two values.
    pub fn new(
        field_name: impl Into<String>,
        predicate: impl Into<String>,
        primary_value: Option<String>,
        secondary_value: Option<String>,
    ) -> Self {
        let has_conflict = values_conflict(primary_value.as_deref(), secondary_value.as_deref());
        Self {
            field_name: field_name.into(),
            primary_value,
            secondary_value,
            predicate: predicate.into(),
            icon: None,
            has_conflict,
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    /// True when at least one side carries a value.
    pub fn is_populated(&self) -> bool {
        self.primary_value.is_some() || self.secondary_value.is_some()
    }
}

/// Conflict iff both values are present and unequal.
pub fn values_conflict(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

/// Ordered result of reconciling a primary and an optional secondary profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedProfile {
    pub fields: Vec<MergedField>,
}

impl MergedProfile {
    pub fn get(&self, field_name: &str) -> Option<&MergedField> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &MergedField> {
        self.fields.iter().filter(|f| f.has_conflict)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub domain: Domain,
    pub pointer: ContentPointer,
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondaryProfile>,
    /// Why the secondary profile is absent, when it was attempted and failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_error: Option<String>,
    pub merged: MergedProfile,
}

/// Externally observable result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionOutcome {
    Loading,
    Found(Box<Resolution>),
    Failed { kind: ErrorKind, message: String },
}

impl ResolutionOutcome {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl From<Result<Resolution>> for ResolutionOutcome {
    fn from(result: Result<Resolution>) -> Self {
        match result {
            Ok(resolution) => Self::Found(Box::new(resolution)),
            Err(e) => Self::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// FieldSpec
// ---------------------------------------------------------------------------

/// A single named property requested by the caller, as `prefix:property`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    pub prefix: String,
    pub property: String,
}

impl FieldSpec {
    /// The expanded predicate IRI, if the prefix is in the field prefix table.
    pub fn predicate_iri(&self) -> Option<String> {
        vocab::field_namespace(&self.prefix).map(|ns| format!("{ns}{}", self.property))
    }
}

impl std::fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.prefix, self.property)
    }
}

impl std::str::FromStr for FieldSpec {
    type Err = WebcardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((prefix, property)) if !prefix.is_empty() && !property.is_empty() => Ok(Self {
                prefix: prefix.to_string(),
                property: property.to_string(),
            }),
            _ => Err(WebcardError::validation(format!(
                "field '{s}' must have the form prefix:property"
            ))),
        }
    }
}
