//! Machine-readable single-value views of a resolved profile.

use serde_json::{Map, Value};

use webcard_shared::{FieldSpec, Profile, WebcardError};

/// Output format for the single-field view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldFormat {
    #[default]
    Json,
    Turtle,
}

impl std::str::FromStr for FieldFormat {
    type Err = WebcardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "turtle" | "ttl" => Ok(Self::Turtle),
            other => Err(WebcardError::validation(format!(
                "unknown output format '{other}' (expected json or turtle)"
            ))),
        }
    }
}

impl std::fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Turtle => "turtle",
        })
    }
}

/// Render the requested field of `profile`.
///
/// JSON: `{"prefix:property": value}` with `null` when absent or empty.
/// Turtle: `<#this> prefix:property "value" .` with an empty literal when absent.
pub fn field_view(field: &FieldSpec, profile: &Profile, format: FieldFormat) -> String {
    let value = profile.requested_field.as_deref();
    match format {
        FieldFormat::Json => {
            let mut map = Map::new();
            map.insert(field.to_string(), optional(value));
            Value::Object(map).to_string()
        }
        FieldFormat::Turtle => format!(
            "<#this> {field} \"{}\" .",
            escape_literal(value.unwrap_or_default())
        ),
    }
}

/// `{"eCashAddress": value}` with `null` when absent.
pub fn ecash_view(profile: &Profile) -> String {
    let mut map = Map::new();
    map.insert(
        "eCashAddress".to_string(),
        optional(profile.payment_address.as_deref()),
    );
    Value::Object(map).to_string()
}

fn optional(value: Option<&str>) -> Value {
    match value {
        Some(v) if !v.is_empty() => Value::String(v.to_string()),
        _ => Value::Null,
    }
}

/// Escape a value for a short double-quoted Turtle literal.
fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
