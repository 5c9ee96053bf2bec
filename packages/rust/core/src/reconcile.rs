//! Primary/secondary reconciliation.
//!
//! Row order is fixed: Name, one row per configured service, eCash Address,
//! WebID, Email, Homepage. Rows where neither side has a value are dropped.

use webcard_shared::vocab::GENERIC_PAGE;
use webcard_shared::{
    MergedField, MergedProfile, NO_NAME_FOUND, Profile, SecondaryProfile, ServiceTable,
    SocialLink, SourceTag,
};

/// Compare the two profiles field by field. Pure; no I/O.
pub fn reconcile(
    profile: &Profile,
    secondary: Option<&SecondaryProfile>,
    services: &ServiceTable,
) -> MergedProfile {
    let mut fields = Vec::with_capacity(services.len() + 5);

    // The sentinel is display text, not a value to compare.
    let primary_name = (profile.name != NO_NAME_FOUND).then(|| profile.name.clone());
    fields.push(MergedField::new(
        "Name",
        "foaf:name",
        primary_name,
        secondary.and_then(|s| s.name.clone()),
    ));

    for service in services {
        let primary = link_url(&profile.social_links, &service.predicate, SourceTag::Primary);
        let other = secondary
            .and_then(|s| link_url(&s.social_links, &service.predicate, SourceTag::Secondary));
        fields.push(
            MergedField::new(&service.name, &service.predicate, primary, other)
                .with_icon(service.icon.clone()),
        );
    }

    fields.push(MergedField::new(
        "eCash Address",
        "adp:hasEcashAccount",
        profile.payment_address.clone(),
        None,
    ));
    fields.push(MergedField::new(
        "WebID",
        "adp:hasWebID",
        profile.secondary_endpoint.clone(),
        secondary.map(|s| s.endpoint.clone()),
    ));
    fields.push(MergedField::new(
        "Email",
        "vcard:hasEmail",
        None,
        secondary.and_then(|s| s.email.clone()),
    ));
    fields.push(MergedField::new(
        "Homepage",
        "foaf:homepage",
        link_url(&profile.social_links, GENERIC_PAGE, SourceTag::Primary),
        secondary.and_then(|s| s.homepage.clone()),
    ));

    fields.retain(MergedField::is_populated);
    MergedProfile { fields }
}

fn link_url(links: &[SocialLink], predicate: &str, source: SourceTag) -> Option<String> {
    links
        .iter()
        .find(|l| l.predicate == predicate && l.source == source)
        .map(|l| l.url.clone())
}
