//! Domain → content pointer resolution over DNS-over-HTTPS.
//!
//! A domain publishes its Agent Discovery Protocol profile by pointing a TXT
//! record at `_adp.<domain>` to an IPFS document:
//! `adp:signer <https://gateway/ipfs/<cid>#this>`. We query a DoH JSON
//! endpoint for that record, pull out the signer URI and its CID, and map the
//! CID onto the configured gateway.

mod parser;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use webcard_shared::{ContentPointer, Domain, ResolverConfig, Result, WebcardError};

/// DNS resource record type for TXT.
const TXT_RECORD_TYPE: u16 = 16;

/// User-Agent string for DoH requests.
const USER_AGENT: &str = concat!("webcard/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// DoH wire format
// ---------------------------------------------------------------------------

/// JSON body returned by DoH resolvers (`application/dns-json`).
#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: i64,
    #[serde(rename = "Answer", default)]
    answer: Option<Vec<DohAnswer>>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

// ---------------------------------------------------------------------------
// PointerResolver
// ---------------------------------------------------------------------------

/// Resolves a [`Domain`] to the [`ContentPointer`] published in its TXT record.
#[derive(Debug, Clone)]
pub struct PointerResolver {
    client: Client,
    doh_endpoint: String,
    gateway: String,
}

impl PointerResolver {
    /// Create a resolver for the configured DoH endpoint and gateway.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebcardError::DnsFailure(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            doh_endpoint: config.doh_endpoint.clone(),
            gateway: config.ipfs_gateway.trim_end_matches('/').to_string(),
        })
    }

    /// Look up `_adp.<domain>` and extract the content pointer.
    ///
    /// No retries: transient DNS errors surface as [`WebcardError::DnsFailure`]
    /// and the caller decides whether to start a fresh run.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn resolve(&self, domain: &Domain) -> Result<ContentPointer> {
        let name = domain.lookup_name();
        let record = self.query_txt(&name).await?;
        debug!(%record, "TXT record received");

        let signer_uri = parser::signer_uri(&record)
            .ok_or_else(|| WebcardError::PointerNotFound {
                record: record.clone(),
            })?
            .to_string();

        let cid = parser::extract_cid(&signer_uri)?;
        let resolved_uri = format!("{}/ipfs/{cid}", self.gateway);

        info!(%cid, %resolved_uri, "content pointer resolved");

        Ok(ContentPointer {
            cid,
            signer_uri,
            resolved_uri,
        })
    }

    /// Query TXT records for `name`, returning the record that carries the
    /// signer marker, or the first TXT record if none does.
    async fn query_txt(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.doh_endpoint)
            .query(&[("name", name), ("type", "TXT")])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| WebcardError::DnsFailure(format!("{name}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebcardError::DnsFailure(format!(
                "{name}: resolver returned HTTP {status}"
            )));
        }

        let body: DohResponse = response
            .json()
            .await
            .map_err(|e| WebcardError::DnsFailure(format!("{name}: malformed DoH response: {e}")))?;

        if body.status != 0 {
            return Err(WebcardError::DnsFailure(format!(
                "{name}: query failed with DNS status {}",
                body.status
            )));
        }

        let records: Vec<String> = body
            .answer
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.record_type == TXT_RECORD_TYPE)
            .map(|a| parser::normalize_txt(&a.data))
            .collect();

        let mut records = records.into_iter();
        let first = records.next().ok_or_else(|| WebcardError::RecordMissing {
            name: name.to_string(),
        })?;

        if parser::signer_uri(&first).is_some() {
            return Ok(first);
        }
        Ok(records
            .find(|r| parser::signer_uri(r).is_some())
            .unwrap_or(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn resolver_for(server: &MockServer) -> PointerResolver {
        let config = ResolverConfig {
            doh_endpoint: format!("{}/resolve", server.uri()),
            ipfs_gateway: "https://gateway.example/".into(),
            ..ResolverConfig::default()
        };
        PointerResolver::new(&config).unwrap()
    }

    async fn mount_doh(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/resolve"))
            .and(query_param("name", "_adp.example.com"))
            .and(query_param("type", "TXT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_valid_record() {
        let server = MockServer::start().await;
        mount_doh(
            &server,
            serde_json::json!({
                "Status": 0,
                "Answer": [{
                    "name": "_adp.example.com.",
                    "type": 16,
                    "TTL": 300,
                    "data": format!("\"adp:signer <https://ipfs.io/ipfs/{CID}#this>\"")
                }]
            }),
        )
        .await;

        let pointer = resolver_for(&server).resolve(&domain()).await.unwrap();
        assert_eq!(pointer.cid, CID);
        assert_eq!(pointer.signer_uri, format!("https://ipfs.io/ipfs/{CID}#this"));
        assert_eq!(
            pointer.resolved_uri,
            format!("https://gateway.example/ipfs/{CID}")
        );
    }

    #[tokio::test]
    async fn test_resolve_skips_unrelated_txt_records() {
        let server = MockServer::start().await;
        mount_doh(
            &server,
            serde_json::json!({
                "Status": 0,
                "Answer": [
                    { "type": 5, "data": "alias.example.com." },
                    { "type": 16, "data": "\"v=spf1 -all\"" },
                    { "type": 16, "data": format!("\"adp:signer <https://gw.example/ipfs/{CID}>\"") }
                ]
            }),
        )
        .await;

        let pointer = resolver_for(&server).resolve(&domain()).await.unwrap();
        assert_eq!(pointer.cid, CID);
    }

    #[tokio::test]
    async fn test_resolve_no_answer_is_record_missing() {
        let server = MockServer::start().await;
        mount_doh(&server, serde_json::json!({ "Status": 0 })).await;

        let err = resolver_for(&server).resolve(&domain()).await.unwrap_err();
        assert!(matches!(err, WebcardError::RecordMissing { ref name } if name == "_adp.example.com"));
    }

    #[tokio::test]
    async fn test_resolve_nxdomain_is_dns_failure() {
        let server = MockServer::start().await;
        mount_doh(&server, serde_json::json!({ "Status": 3 })).await;

        let err = resolver_for(&server).resolve(&domain()).await.unwrap_err();
        assert!(matches!(err, WebcardError::DnsFailure(_)));
    }

    #[tokio::test]
    async fn test_resolve_http_error_is_dns_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = resolver_for(&server).resolve(&domain()).await.unwrap_err();
        assert!(matches!(err, WebcardError::DnsFailure(_)));
    }

    #[tokio::test]
    async fn test_resolve_without_marker_is_pointer_not_found() {
        let server = MockServer::start().await;
        mount_doh(
            &server,
            serde_json::json!({
                "Status": 0,
                "Answer": [{ "type": 16, "data": "\"google-site-verification=abc\"" }]
            }),
        )
        .await;

        let err = resolver_for(&server).resolve(&domain()).await.unwrap_err();
        assert!(matches!(err, WebcardError::PointerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_bad_cid_is_pointer_unrecognized() {
        let server = MockServer::start().await;
        mount_doh(
            &server,
            serde_json::json!({
                "Status": 0,
                "Answer": [{
                    "type": 16,
                    "data": "\"adp:signer <https://gw/ipfs/Qm1111111111111111111111111111111111111111#this>\""
                }]
            }),
        )
        .await;

        let err = resolver_for(&server).resolve(&domain()).await.unwrap_err();
        assert!(matches!(err, WebcardError::PointerUnrecognized { .. }));
    }
}
