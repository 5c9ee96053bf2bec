//! Profile extraction from loaded graphs.
//!
//! Two link strategies, one per source shape:
//! - [`links_by_predicate`]: the primary document names each service by a
//!   dedicated predicate whose value is an account handle.
//! - [`links_by_account_url`]: WebID documents list full account URLs under
//!   `foaf:account`, matched against each service's URL prefix.

use url::Url;

use webcard_graph::Graph;
use webcard_shared::vocab::{self, terms};
use webcard_shared::{
    FieldSpec, NO_NAME_FOUND, Profile, SecondaryProfile, ServiceTable, SocialLink, SourceTag,
};

/// Extract the primary profile. Never fails: absent attributes stay absent.
pub fn extract_profile(
    graph: &Graph,
    raw_document: &str,
    services: &ServiceTable,
    requested: Option<&FieldSpec>,
) -> Profile {
    let mut social_links = links_by_predicate(graph, services);
    social_links.extend(generic_pages(graph));

    let requested_field = requested
        .and_then(FieldSpec::predicate_iri)
        .and_then(|predicate| graph.first_value(&predicate).map(str::to_string));

    Profile {
        name: graph
            .first_value(terms::FOAF_NAME)
            .unwrap_or(NO_NAME_FOUND)
            .to_string(),
        image: graph.first_reference(terms::FOAF_IMG).map(str::to_string),
        payment_address: graph
            .first_value(terms::ADP_HAS_ECASH_ACCOUNT)
            .map(str::to_string),
        secondary_endpoint: graph
            .first_reference(terms::ADP_HAS_WEBID)
            .map(str::to_string),
        social_links,
        raw_document: raw_document.to_string(),
        requested_field,
    }
}

/// Extract the secondary profile fetched from `endpoint`.
pub fn extract_secondary(graph: &Graph, endpoint: &str, services: &ServiceTable) -> SecondaryProfile {
    SecondaryProfile {
        endpoint: endpoint.to_string(),
        name: graph.first_value(terms::FOAF_NAME).map(str::to_string),
        email: graph.first_value(terms::VCARD_HAS_EMAIL).map(str::to_string),
        homepage: graph
            .first_reference(terms::FOAF_HOMEPAGE)
            .map(str::to_string),
        inbox: graph.first_reference(terms::LDP_INBOX).map(str::to_string),
        social_links: links_by_account_url(graph, services),
    }
}

/// One link per service whose predicate has a value, in table order.
pub fn links_by_predicate(graph: &Graph, services: &ServiceTable) -> Vec<SocialLink> {
    services
        .iter()
        .filter_map(|service| {
            let predicate = service.predicate_iri()?;
            let handle = graph.first_value(&predicate)?;
            Some(SocialLink {
                service_name: service.name.clone(),
                url: format!("{}{handle}", service.url_prefix),
                icon: service.icon.clone(),
                predicate: service.predicate.clone(),
                source: SourceTag::Primary,
            })
        })
        .collect()
}

/// Service links recovered from `foaf:account` URLs.
///
/// Services are visited in table order, accounts in document order. The
/// handle is the last non-empty path segment of the account URL.
pub fn links_by_account_url(graph: &Graph, services: &ServiceTable) -> Vec<SocialLink> {
    let mut links = Vec::new();
    for service in services {
        for account in graph.references(terms::FOAF_ACCOUNT) {
            if !account.contains(&service.url_prefix) {
                continue;
            }
            let Some(handle) = last_path_segment(account) else {
                continue;
            };
            links.push(SocialLink {
                service_name: service.name.clone(),
                url: format!("{}{handle}", service.url_prefix),
                icon: service.icon.clone(),
                predicate: service.predicate.clone(),
                source: SourceTag::Secondary,
            });
        }
    }
    links
}

/// `foaf:page` references, labelled by host.
fn generic_pages(graph: &Graph) -> impl Iterator<Item = SocialLink> + '_ {
    graph.references(terms::FOAF_PAGE).map(|page| SocialLink {
        service_name: Url::parse(page)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| page.to_string()),
        url: page.to_string(),
        icon: None,
        predicate: vocab::GENERIC_PAGE.to_string(),
        source: SourceTag::Primary,
    })
}

fn last_path_segment(account: &str) -> Option<String> {
    let url = Url::parse(account).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
