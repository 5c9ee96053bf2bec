//! WebID (secondary) profile resolution.

use tracing::{info, instrument};

use webcard_fetcher::Fetcher;
use webcard_shared::{Result, SecondaryProfile, ServiceTable, WebcardError};

use crate::extract::extract_secondary;

/// Content negotiation for WebID endpoints.
pub const SECONDARY_ACCEPT: &str = "text/turtle, application/ld+json";

/// Fetch, load, and extract the profile at `endpoint`.
///
/// Any failure comes back as [`WebcardError::Secondary`] carrying the
/// endpoint and the underlying cause.
#[instrument(skip(fetcher, services))]
pub async fn resolve_secondary(
    fetcher: &Fetcher,
    endpoint: &str,
    services: &ServiceTable,
) -> Result<SecondaryProfile> {
    let fetch_and_load = async {
        let doc = fetcher.fetch(endpoint, Some(SECONDARY_ACCEPT)).await?;
        webcard_graph::load_secondary(&doc)
    };

    let graph = fetch_and_load.await.map_err(|e| {
        WebcardError::Secondary(format!("failed to resolve secondary profile {endpoint}: {e}"))
    })?;

    let profile = extract_secondary(&graph, endpoint, services);
    info!(
        name = profile.name.as_deref().unwrap_or("-"),
        links = profile.social_links.len(),
        has_inbox = profile.inbox.is_some(),
        "secondary profile resolved"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcard_shared::{ErrorKind, ResolverConfig};
    use wiremock::matchers::{headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&ResolverConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_turtle_webid() {
        let server = MockServer::start().await;
        let body = std::fs::read_to_string("../../../fixtures/turtle/secondary-profile.ttl")
            .expect("read secondary fixture");
        Mock::given(method("GET"))
            .and(path("/profile/card"))
            .and(headers("Accept", vec!["text/turtle", "application/ld+json"]))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/turtle"))
            .mount(&server)
            .await;

        let endpoint = format!("{}/profile/card#me", server.uri());
        let profile = resolve_secondary(&fetcher(), &endpoint, &ServiceTable::default())
            .await
            .unwrap();
        assert_eq!(profile.endpoint, endpoint);
        assert_eq!(profile.name.as_deref(), Some("Ada King"));
        assert_eq!(
            profile.inbox.as_deref(),
            Some(format!("{}/inbox/", server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_resolves_jsonld_webid() {
        let server = MockServer::start().await;
        let body = std::fs::read_to_string("../../../fixtures/jsonld/secondary-profile.jsonld")
            .expect("read jsonld fixture");
        Mock::given(method("GET"))
            .and(path("/profile/card"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/ld+json"))
            .mount(&server)
            .await;

        let endpoint = format!("{}/profile/card", server.uri());
        let profile = resolve_secondary(&fetcher(), &endpoint, &ServiceTable::default())
            .await
            .unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada King"));
        assert_eq!(profile.email.as_deref(), Some("mailto:ada@example.com"));
        assert_eq!(profile.social_links.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_secondary_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let endpoint = format!("{}/profile/card#me", server.uri());
        let err = resolve_secondary(&fetcher(), &endpoint, &ServiceTable::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecondaryError);
        let message = err.to_string();
        assert!(
            message.contains(&format!("failed to resolve secondary profile {endpoint}")),
            "got: {message}"
        );
        assert!(message.contains("404"), "got: {message}");
    }
}
