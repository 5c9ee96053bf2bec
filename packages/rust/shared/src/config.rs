//! Application configuration for webcard.
//!
//! User config lives at `~/.webcard/webcard.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, WebcardError};
use crate::vocab;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "webcard.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".webcard";

// ---------------------------------------------------------------------------
// Config structs (matching webcard.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network endpoints and limits.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Access-request settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Social service table, in display order.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceDescriptor>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            notify: NotifyConfig::default(),
            services: default_services(),
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// DNS-over-HTTPS JSON endpoint.
    #[serde(default = "default_doh_endpoint")]
    pub doh_endpoint: String,

    /// Content-addressed gateway base URL (documents live at `<gateway>/ipfs/<cid>`).
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ceiling on fetched document size, for primary and secondary sources.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            doh_endpoint: default_doh_endpoint(),
            ipfs_gateway: default_ipfs_gateway(),
            timeout_secs: default_timeout_secs(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_doh_endpoint() -> String {
    "https://dns.google/resolve".into()
}
fn default_ipfs_gateway() -> String {
    "https://ipfs.io".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_document_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[notify]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// WebID of the agent asking for access.
    #[serde(default = "default_agent")]
    pub agent: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            agent: default_agent(),
        }
    }
}

fn default_agent() -> String {
    "https://example.com/webcard-user#me".into()
}

/// `[[services]]` entry: maps a profile predicate to a social service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Compact predicate, e.g. `adp:hasGithubAccount`.
    pub predicate: String,
    /// Display name.
    pub name: String,
    /// Prefix joined with the account name to form the profile URL.
    pub url_prefix: String,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ServiceDescriptor {
    /// The full predicate IRI, if the compact form uses a well-known prefix.
    pub fn predicate_iri(&self) -> Option<String> {
        vocab::expand(&self.predicate)
    }
}

fn service(predicate: &str, name: &str, url_prefix: &str, icon: &str) -> ServiceDescriptor {
    ServiceDescriptor {
        predicate: predicate.into(),
        name: name.into(),
        url_prefix: url_prefix.into(),
        icon: Some(icon.into()),
    }
}

fn default_services() -> Vec<ServiceDescriptor> {
    vec![
        service(
            "adp:hasTwitterAccount",
            "Twitter",
            "https://twitter.com/",
            "https://abs.twimg.com/favicons/twitter.2.ico",
        ),
        service(
            "adp:hasLinkedinAccount",
            "LinkedIn",
            "https://www.linkedin.com/in/",
            "https://static.licdn.com/sc/h/akt4ae504epriuy69fpx4cw0a",
        ),
        service(
            "adp:hasGithubAccount",
            "GitHub",
            "https://github.com/",
            "https://github.com/favicon.ico",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Service table (runtime, validated)
// ---------------------------------------------------------------------------

/// Ordered service table with unique predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTable {
    services: Vec<ServiceDescriptor>,
}

impl ServiceTable {
    /// Validate and wrap a list of descriptors, preserving order.
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for svc in &services {
            if svc.predicate.trim().is_empty() || svc.url_prefix.trim().is_empty() {
                return Err(WebcardError::config(format!(
                    "service '{}' needs both a predicate and a url_prefix",
                    svc.name
                )));
            }
            if svc.predicate_iri().is_none() {
                return Err(WebcardError::config(format!(
                    "service '{}' predicate '{}' uses an unknown prefix",
                    svc.name, svc.predicate
                )));
            }
            if !seen.insert(svc.predicate.as_str()) {
                return Err(WebcardError::config(format!(
                    "duplicate service predicate '{}'",
                    svc.predicate
                )));
            }
        }
        Ok(Self { services })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self {
            services: default_services(),
        }
    }
}

impl<'a> IntoIterator for &'a ServiceTable {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

impl AppConfig {
    /// Build the validated service table from `[[services]]`.
    pub fn service_table(&self) -> Result<ServiceTable> {
        ServiceTable::new(self.services.clone())
    }

    /// Check endpoints and the service table.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("resolver.doh_endpoint", &self.resolver.doh_endpoint),
            ("resolver.ipfs_gateway", &self.resolver.ipfs_gateway),
            ("notify.agent", &self.notify.agent),
        ] {
            Url::parse(value).map_err(|e| {
                WebcardError::config(format!("{key} '{value}' is not an absolute URL: {e}"))
            })?;
        }
        if self.resolver.max_document_bytes == 0 {
            return Err(WebcardError::config(
                "resolver.max_document_bytes must be greater than zero",
            ));
        }
        self.service_table().map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.webcard/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WebcardError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.webcard/webcard.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
///
/// Only parses. Call [`AppConfig::validate`] after applying overrides.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WebcardError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WebcardError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WebcardError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WebcardError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WebcardError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("doh_endpoint"));
        assert!(toml_str.contains("adp:hasGithubAccount"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.resolver.timeout_secs, 15);
        assert_eq!(parsed.services.len(), 3);
        assert_eq!(parsed.services[0].name, "Twitter");
        parsed.validate().expect("defaults validate");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").expect("parse");
        assert_eq!(config.resolver.ipfs_gateway, "https://ipfs.io");
        assert_eq!(config.services.len(), 3);
    }

    #[test]
    fn config_with_custom_services() {
        let toml_str = r#"
[resolver]
doh_endpoint = "https://cloudflare-dns.com/dns-query"

[[services]]
predicate = "adp:hasMastodonAccount"
name = "Mastodon"
url_prefix = "https://mastodon.social/@"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.resolver.ipfs_gateway, "https://ipfs.io");
        let table = config.service_table().expect("valid table");
        assert_eq!(table.iter().next().map(|s| s.name.as_str()), Some("Mastodon"));
    }

    #[test]
    fn duplicate_predicates_rejected() {
        let mut services = default_services();
        services.push(services[0].clone());
        let err = ServiceTable::new(services).unwrap_err();
        assert!(err.to_string().contains("duplicate service predicate"));
    }

    #[test]
    fn unknown_prefix_rejected() {
        let services = vec![ServiceDescriptor {
            predicate: "ex:hasThing".into(),
            name: "Thing".into(),
            url_prefix: "https://thing.example/".into(),
            icon: None,
        }];
        assert!(ServiceTable::new(services).is_err());
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let mut config = AppConfig::default();
        config.resolver.doh_endpoint = "dns.google/resolve".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_leaves_validation_to_caller() {
        let dir = std::env::temp_dir().join(format!("webcard-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("webcard.toml");
        std::fs::write(&path, "[resolver]\nmax_document_bytes = 0\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.resolver.max_document_bytes, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_document_bytes"));

        std::fs::write(&path, "[resolver\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
