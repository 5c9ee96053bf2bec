//! Mock DoH resolver, gateway, and WebID server for pipeline tests.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webcard_shared::{AppConfig, Domain, ResolverConfig};

pub(crate) const CID_A: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
pub(crate) const CID_B: &str = "Qmu8jzPde0IgxLd6GncfBAepfJBd0Kh8oOOL8dKLzdocJ2";

pub(crate) struct Harness {
    pub server: MockServer,
}

impl Harness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            resolver: ResolverConfig {
                doh_endpoint: format!("{}/resolve", self.server.uri()),
                ipfs_gateway: self.server.uri(),
                timeout_secs: 5,
                ..ResolverConfig::default()
            },
            ..AppConfig::default()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    /// Answer `_adp.<domain>` with a signer pointing at `cid`.
    pub async fn txt_record(&self, domain: &str, cid: &str) {
        self.doh_answer(
            domain,
            serde_json::json!({
                "Status": 0,
                "Answer": [{
                    "name": format!("_adp.{domain}."),
                    "type": 16,
                    "TTL": 300,
                    "data": format!("\"adp:signer <https://ipfs.io/ipfs/{cid}#this>\"")
                }]
            }),
        )
        .await;
    }

    /// Answer `_adp.<domain>` with no records.
    pub async fn no_record(&self, domain: &str) {
        self.doh_answer(domain, serde_json::json!({ "Status": 0 }))
            .await;
    }

    async fn doh_answer(&self, domain: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/resolve"))
            .and(query_param("name", format!("_adp.{domain}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` as Turtle at `/ipfs/<cid>`, optionally after a delay.
    pub async fn document(&self, cid: &str, body: &str, delay: Option<Duration>) {
        let mut response = ResponseTemplate::new(200).set_body_raw(body, "text/turtle");
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path(format!("/ipfs/{cid}")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Publish a primary profile for `domain` in one step.
    pub async fn publish(&self, domain: &str, cid: &str, body: &str) {
        self.txt_record(domain, cid).await;
        self.document(cid, body, None).await;
    }

    /// Serve a fixed status at `path`.
    pub async fn status(&self, at: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` as Turtle at `path`.
    pub async fn turtle(&self, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/turtle"))
            .mount(&self.server)
            .await;
    }
}

pub(crate) fn domain(name: &str) -> Domain {
    Domain::parse(name).unwrap()
}

/// Minimal primary document with a name and optional extra predicates.
pub(crate) fn profile_doc(name: &str, extra: &str) -> String {
    format!(
        "@prefix adp: <https://webcivics.github.io/adp/ontdev/adp#> .\n\
         @prefix foaf: <http://xmlns.com/foaf/0.1/> .\n\
         <#this> a adp:Agent ;\n    foaf:name \"{name}\"{extra} .\n"
    )
}
