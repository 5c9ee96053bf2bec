//! Access request sent to a WebID owner's inbox.

use tracing::{info, instrument};
use url::Url;

use webcard_fetcher::Fetcher;
use webcard_shared::{Resolution, Result, WebcardError};

const TURTLE: &str = "text/turtle";

/// Build the `acl:Authorization` request body asking read access to `webid`
/// on behalf of `agent`. Both must be absolute URLs.
pub fn access_request(agent: &str, webid: &str) -> Result<String> {
    let agent = absolute(agent, "agent")?;
    let webid = absolute(webid, "WebID")?;
    Ok(format!(
        "@prefix acl: <http://www.w3.org/ns/auth/acl#>.\n\
         @prefix foaf: <http://xmlns.com/foaf/0.1/>.\n\
         <#request>\n  \
           a acl:Authorization ;\n  \
           acl:agent <{agent}> ;\n  \
           acl:accessTo <{webid}> ;\n  \
           acl:mode acl:Read .\n"
    ))
}

fn absolute(value: &str, what: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| WebcardError::validation(format!("{what} '{value}' is not an absolute URL: {e}")))?;
    // Nothing that could close the IRI early.
    if url.as_str().contains(['<', '>', '"', ' ']) {
        return Err(WebcardError::validation(format!(
            "{what} '{value}' cannot be written as an IRI"
        )));
    }
    Ok(url)
}

/// POST an access request for the resolved WebID to its inbox.
///
/// Requires a resolved secondary profile that advertises an inbox.
#[instrument(skip_all, fields(domain = %resolution.domain))]
pub async fn send_access_request(
    fetcher: &Fetcher,
    agent: &str,
    resolution: &Resolution,
) -> Result<u16> {
    let secondary = resolution.secondary.as_ref().ok_or_else(|| {
        WebcardError::validation(match &resolution.secondary_error {
            Some(e) => format!("no WebID profile available: {e}"),
            None => format!("{} does not declare a WebID", resolution.domain),
        })
    })?;
    let inbox = secondary.inbox.as_deref().ok_or_else(|| {
        WebcardError::validation(format!(
            "WebID profile {} has no inbox",
            secondary.endpoint
        ))
    })?;
    let inbox_url = absolute(inbox, "inbox")?;

    let body = access_request(agent, &secondary.endpoint)?;
    let status = fetcher
        .post(inbox_url.as_str(), TURTLE, body)
        .await
        .map_err(|e| match e {
            WebcardError::FetchFailure {
                status: Some(code), ..
            } => WebcardError::Notification(format!(
                "failed to send access request (status: {code})"
            )),
            other => WebcardError::Notification(format!(
                "failed to send access request: {other}"
            )),
        })?;

    info!(%inbox, status, "access request sent");
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcard_shared::{
        ContentPointer, ErrorKind, MergedProfile, NO_NAME_FOUND, Profile, ResolverConfig,
        SecondaryProfile,
    };
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENT: &str = "https://example.com/webcard-user#me";

    fn resolution(secondary: Option<SecondaryProfile>) -> Resolution {
        Resolution {
            domain: "ada.example".parse().unwrap(),
            pointer: ContentPointer {
                cid: "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".into(),
                signer_uri: String::new(),
                resolved_uri: String::new(),
            },
            profile: Profile {
                name: NO_NAME_FOUND.into(),
                image: None,
                payment_address: None,
                secondary_endpoint: secondary.as_ref().map(|s| s.endpoint.clone()),
                social_links: vec![],
                raw_document: String::new(),
                requested_field: None,
            },
            secondary,
            secondary_error: None,
            merged: MergedProfile::default(),
        }
    }

    fn secondary(endpoint: &str, inbox: Option<String>) -> SecondaryProfile {
        SecondaryProfile {
            endpoint: endpoint.into(),
            name: None,
            email: None,
            homepage: None,
            inbox,
            social_links: vec![],
        }
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(&ResolverConfig::default()).unwrap()
    }

    #[test]
    fn test_access_request_body() {
        let body = access_request(AGENT, "https://ada.solid.example/profile/card#me").unwrap();
        assert!(body.contains("a acl:Authorization ;"));
        assert!(body.contains("acl:agent <https://example.com/webcard-user#me> ;"));
        assert!(body.contains("acl:accessTo <https://ada.solid.example/profile/card#me> ;"));
        assert!(body.trim_end().ends_with("acl:mode acl:Read ."));

        let graph = webcard_graph::parse_turtle(&body, Some("https://inbox.example/")).unwrap();
        assert_eq!(
            graph.first_reference("http://www.w3.org/ns/auth/acl#accessTo"),
            Some("https://ada.solid.example/profile/card#me")
        );
    }

    #[test]
    fn test_access_request_rejects_relative_iris() {
        let err = access_request(AGENT, "/profile/card#me").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = access_request("me", "https://ada.example/#me").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_posts_to_inbox() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inbox/"))
            .and(header("Content-Type", "text/turtle"))
            .and(body_string_contains("acl:accessTo <https://ada.solid.example/profile/card#me>"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let res = resolution(Some(secondary(
            "https://ada.solid.example/profile/card#me",
            Some(format!("{}/inbox/", server.uri())),
        )));
        let status = send_access_request(&fetcher(), AGENT, &res).await.unwrap();
        assert_eq!(status, 201);
    }

    #[tokio::test]
    async fn test_rejected_request_is_notification_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let res = resolution(Some(secondary(
            "https://ada.solid.example/profile/card#me",
            Some(format!("{}/inbox/", server.uri())),
        )));
        let err = send_access_request(&fetcher(), AGENT, &res).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Notification);
        assert!(err.to_string().contains("status: 403"), "got: {err}");
    }

    #[tokio::test]
    async fn test_missing_inbox_is_validation_error() {
        let res = resolution(Some(secondary("https://ada.solid.example/profile/card#me", None)));
        let err = send_access_request(&fetcher(), AGENT, &res).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("has no inbox"));

        let err = send_access_request(&fetcher(), AGENT, &resolution(None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("does not declare a WebID"));
    }
}
