//! RDF vocabulary namespaces and the predicates the extractor reads.

/// Friend of a Friend.
pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
/// Agent Discovery Protocol.
pub const ADP: &str = "https://webcivics.github.io/adp/ontdev/adp#";
/// Schema.org.
pub const SCHEMA: &str = "https://schema.org/";
/// vCard.
pub const VCARD: &str = "http://www.w3.org/2006/vcard/ns#";
/// Linked Data Platform.
pub const LDP: &str = "http://www.w3.org/ns/ldp#";
/// RDF core.
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// XML Schema datatypes.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Prefixes a caller may use in a requested field spec (`prefix:property`).
pub const FIELD_PREFIXES: [(&str, &str); 4] =
    [("adp", ADP), ("foaf", FOAF), ("schema", SCHEMA), ("vcard", VCARD)];

/// Prefixes known to structured-data parsing and service predicates.
pub const WELL_KNOWN_PREFIXES: [(&str, &str); 6] = [
    ("adp", ADP),
    ("foaf", FOAF),
    ("schema", SCHEMA),
    ("vcard", VCARD),
    ("ldp", LDP),
    ("rdf", RDF),
];

/// Label used on social links derived from generic `foaf:page` references.
pub const GENERIC_PAGE: &str = "generic-page";

/// Look up a field-spec prefix in the fixed four-entry table.
pub fn field_namespace(prefix: &str) -> Option<&'static str> {
    FIELD_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| *ns)
}

/// Expand a compact IRI (`foaf:name`) or bracketed IRI (`<https://…>`) using
/// the well-known prefix table.
pub fn expand(compact: &str) -> Option<String> {
    if let Some(iri) = compact.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Some(iri.to_string());
    }
    let (prefix, local) = compact.split_once(':')?;
    WELL_KNOWN_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| format!("{ns}{local}"))
}

/// Predicate IRIs used by the profile extractors.
pub mod terms {
    pub const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";
    pub const FOAF_IMG: &str = "http://xmlns.com/foaf/0.1/img";
    pub const FOAF_PAGE: &str = "http://xmlns.com/foaf/0.1/page";
    pub const FOAF_HOMEPAGE: &str = "http://xmlns.com/foaf/0.1/homepage";
    pub const FOAF_ACCOUNT: &str = "http://xmlns.com/foaf/0.1/account";
    pub const ADP_HAS_ECASH_ACCOUNT: &str =
        "https://webcivics.github.io/adp/ontdev/adp#hasEcashAccount";
    pub const ADP_HAS_WEBID: &str = "https://webcivics.github.io/adp/ontdev/adp#hasWebID";
    pub const VCARD_HAS_EMAIL: &str = "http://www.w3.org/2006/vcard/ns#hasEmail";
    pub const LDP_INBOX: &str = "http://www.w3.org/ns/ldp#inbox";
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_prefixes() {
        assert_eq!(
            expand("adp:hasTwitterAccount").as_deref(),
            Some("https://webcivics.github.io/adp/ontdev/adp#hasTwitterAccount")
        );
        assert_eq!(
            expand("<https://example.com/p>").as_deref(),
            Some("https://example.com/p")
        );
        assert_eq!(expand("dcterms:title"), None);
        assert_eq!(expand("no-colon"), None);
    }

    #[test]
    fn field_prefix_table_has_four_entries() {
        assert_eq!(field_namespace("vcard"), Some(VCARD));
        assert_eq!(field_namespace("ldp"), None);
        assert_eq!(terms::FOAF_NAME, format!("{FOAF}name"));
        assert_eq!(terms::LDP_INBOX, format!("{LDP}inbox"));
    }
}
