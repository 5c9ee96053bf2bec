//! JSON-LD reader.
//!
//! Handles the compacted shapes WebID servers emit: a node object, an array
//! of nodes, or an `@graph`, with inline `@context` definitions. Remote
//! contexts are never fetched; the well-known prefixes are predefined so
//! `foaf:name`-style keys work without one.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use webcard_shared::vocab::{self, terms};
use webcard_shared::{Result, WebcardError};

use crate::{Graph, Literal, Term, Triple, iri};

/// Predicates whose plain string values are read as IRIs.
const REFERENCE_PREDICATES: [&str; 6] = [
    terms::FOAF_HOMEPAGE,
    terms::LDP_INBOX,
    terms::FOAF_ACCOUNT,
    terms::FOAF_IMG,
    terms::FOAF_PAGE,
    terms::ADP_HAS_WEBID,
];

pub(crate) fn parse(input: &str, base: Option<&str>) -> Result<Graph> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| WebcardError::parse(format!("JSON-LD parse error: {e}")))?;

    let mut reader = Reader {
        base: iri::parse_base(base),
        blank_labels: HashMap::new(),
        blank_ids: 0,
        graph: Graph::new(),
    };
    reader.top_level(&value, &Context::well_known())?;
    Ok(reader.graph)
}

fn invalid(message: impl AsRef<str>) -> WebcardError {
    WebcardError::parse(format!("JSON-LD parse error: {}", message.as_ref()))
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TermDef {
    iri: String,
    /// `"@type": "@id"`: string values are IRIs.
    reference: bool,
}

#[derive(Debug, Clone, Default)]
struct Context {
    terms: HashMap<String, TermDef>,
    vocab: Option<String>,
}

impl Context {
    fn well_known() -> Self {
        let terms = vocab::WELL_KNOWN_PREFIXES
            .iter()
            .map(|(prefix, ns)| {
                (
                    (*prefix).to_string(),
                    TermDef {
                        iri: (*ns).to_string(),
                        reference: false,
                    },
                )
            })
            .collect();
        Self { terms, vocab: None }
    }

    /// Apply a local `@context` value on top of this one.
    fn extend(&self, local: &Value) -> Result<Self> {
        let mut ctx = self.clone();
        match local {
            Value::Array(items) => {
                for item in items {
                    ctx = ctx.extend(item)?;
                }
            }
            Value::Object(map) => ctx.define(map)?,
            Value::String(url) => debug!(%url, "remote @context not fetched"),
            Value::Null => ctx = Self::well_known(),
            _ => return Err(invalid("@context must be an object, array, or string")),
        }
        Ok(ctx)
    }

    fn define(&mut self, map: &Map<String, Value>) -> Result<()> {
        let mut pending = Vec::new();
        for (key, def) in map {
            if key == "@vocab" {
                self.vocab = def.as_str().map(str::to_string);
                continue;
            }
            if key.starts_with('@') {
                continue;
            }
            match def {
                Value::String(id) => pending.push((key.as_str(), id.as_str(), false)),
                Value::Object(obj) => {
                    let id = obj.get("@id").and_then(Value::as_str).unwrap_or(key.as_str());
                    let reference = obj.get("@type").and_then(Value::as_str) == Some("@id");
                    pending.push((key.as_str(), id, reference));
                }
                Value::Null => {
                    self.terms.remove(key);
                }
                _ => return Err(invalid(format!("invalid definition for term '{key}'"))),
            }
        }

        // Absolute targets first, so compact targets may use prefixes
        // declared in the same context object.
        pending.sort_by_key(|(_, id, _)| !id.contains("://"));
        for (key, id, reference) in pending {
            let iri = self.expand_key(id).unwrap_or_else(|| id.to_string());
            self.terms.insert(key.to_string(), TermDef { iri, reference });
        }
        Ok(())
    }

    /// Expand a property key or `@type` value (vocabulary-relative).
    fn expand_key(&self, key: &str) -> Option<String> {
        if let Some(def) = self.terms.get(key) {
            return Some(def.iri.clone());
        }
        if let Some(expanded) = self.expand_compact(key) {
            return Some(expanded);
        }
        if key.contains(':') {
            return Some(key.to_string());
        }
        self.vocab.as_ref().map(|v| format!("{v}{key}"))
    }

    /// `prefix:local` with a known prefix.
    fn expand_compact(&self, value: &str) -> Option<String> {
        let (prefix, local) = value.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.terms
            .get(prefix)
            .map(|def| format!("{}{local}", def.iri))
    }

    fn is_reference(&self, key: &str, predicate: &str) -> bool {
        self.terms.get(key).is_some_and(|def| def.reference)
            || REFERENCE_PREDICATES.contains(&predicate)
    }
}

/// Array members, `@set` members, or the value itself.
fn members(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) if obj.contains_key("@set") => obj
            .get("@set")
            .map(members)
            .unwrap_or_default(),
        other => vec![other],
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

struct Reader {
    base: Option<Url>,
    blank_labels: HashMap<String, Term>,
    blank_ids: usize,
    graph: Graph,
}

impl Reader {
    fn top_level(&mut self, value: &Value, ctx: &Context) -> Result<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(map) => {
                            self.node(map, ctx)?;
                        }
                        _ => return Err(invalid("top-level array items must be objects")),
                    }
                }
                Ok(())
            }
            Value::Object(map) => self.node(map, ctx).map(|_| ()),
            _ => Err(invalid("expected a JSON object or array")),
        }
    }

    fn fresh_blank(&mut self) -> Term {
        self.blank_ids += 1;
        Term::Blank(format!("b{}", self.blank_ids))
    }

    fn blank_for(&mut self, label: &str) -> Term {
        if let Some(term) = self.blank_labels.get(label) {
            return term.clone();
        }
        let term = self.fresh_blank();
        self.blank_labels.insert(label.to_string(), term.clone());
        term
    }

    /// Expand a document-relative IRI (`@id`, or a reference value).
    fn expand_iri(&mut self, value: &str, ctx: &Context) -> Term {
        if let Some(label) = value.strip_prefix("_:") {
            return self.blank_for(label);
        }
        match ctx.expand_compact(value) {
            Some(expanded) => Term::Iri(expanded),
            None => Term::Iri(iri::resolve(self.base.as_ref(), value)),
        }
    }

    fn node(&mut self, map: &Map<String, Value>, ctx: &Context) -> Result<Term> {
        let ctx = match map.get("@context") {
            Some(local) => ctx.extend(local)?,
            None => ctx.clone(),
        };

        let subject = match map.get("@id") {
            Some(Value::String(id)) => self.expand_iri(id, &ctx),
            Some(_) => return Err(invalid("@id must be a string")),
            None => self.fresh_blank(),
        };

        for (key, value) in map {
            match key.as_str() {
                "@context" | "@id" => {}
                "@type" => {
                    for ty in members(value) {
                        let ty = ty
                            .as_str()
                            .ok_or_else(|| invalid("@type must be a string or array of strings"))?;
                        let class = match ctx.expand_key(ty) {
                            Some(iri) => Term::Iri(iri),
                            None => self.expand_iri(ty, &ctx),
                        };
                        self.graph
                            .insert(Triple::new(subject.clone(), terms::RDF_TYPE, class));
                    }
                }
                "@graph" => {
                    for item in members(value) {
                        match item {
                            Value::Object(inner) => {
                                self.node(inner, &ctx)?;
                            }
                            _ => return Err(invalid("@graph members must be objects")),
                        }
                    }
                }
                k if k.starts_with('@') => {}
                _ => {
                    let Some(predicate) = ctx.expand_key(key) else {
                        debug!(%key, "dropping unmapped property");
                        continue;
                    };
                    let reference = ctx.is_reference(key, &predicate);
                    for item in members(value) {
                        if let Some(object) = self.value(item, &ctx, reference)? {
                            self.graph
                                .insert(Triple::new(subject.clone(), predicate.as_str(), object));
                        }
                    }
                }
            }
        }

        Ok(subject)
    }

    fn value(&mut self, value: &Value, ctx: &Context, reference: bool) -> Result<Option<Term>> {
        let term = match value {
            Value::Null => return Ok(None),
            Value::String(s) if reference => self.expand_iri(s, ctx),
            Value::String(s) => Term::Literal(Literal::simple(s.clone())),
            Value::Bool(b) => Term::Literal(Literal::typed(b.to_string(), terms::XSD_BOOLEAN)),
            Value::Number(n) => Term::Literal(number_literal(n)),
            Value::Array(_) => return Err(invalid("nested arrays are not supported")),
            Value::Object(obj) if obj.contains_key("@value") => {
                return value_object(obj, ctx);
            }
            Value::Object(obj) if obj.contains_key("@list") => {
                let mut items = Vec::new();
                for item in obj.get("@list").map(members).unwrap_or_default() {
                    if let Some(term) = self.value(item, ctx, reference)? {
                        items.push(term);
                    }
                }
                let nodes = items.iter().map(|_| self.fresh_blank()).collect();
                self.graph.insert_collection(nodes, items)
            }
            Value::Object(obj) => self.node(obj, ctx)?,
        };
        Ok(Some(term))
    }
}

fn number_literal(n: &serde_json::Number) -> Literal {
    if n.is_i64() || n.is_u64() {
        Literal::typed(n.to_string(), terms::XSD_INTEGER)
    } else {
        Literal::typed(n.to_string(), terms::XSD_DOUBLE)
    }
}

/// `{"@value": …, "@language"?: …, "@type"?: …}`
fn value_object(obj: &Map<String, Value>, ctx: &Context) -> Result<Option<Term>> {
    let raw = obj.get("@value").unwrap_or(&Value::Null);
    let language = obj.get("@language").and_then(Value::as_str);
    let datatype = obj
        .get("@type")
        .and_then(Value::as_str)
        .map(|dt| ctx.expand_key(dt).unwrap_or_else(|| dt.to_string()));

    let literal = match (raw, language, datatype) {
        (Value::Null, _, _) => return Ok(None),
        (Value::String(s), Some(lang), _) => Literal::lang(s.clone(), lang),
        (Value::String(s), None, Some(dt)) => Literal::typed(s.clone(), dt),
        (Value::String(s), None, None) => Literal::simple(s.clone()),
        (Value::Number(n), _, Some(dt)) => Literal::typed(n.to_string(), dt),
        (Value::Number(n), _, None) => number_literal(n),
        (Value::Bool(b), _, dt) => {
            Literal::typed(b.to_string(), dt.unwrap_or_else(|| terms::XSD_BOOLEAN.to_string()))
        }
        _ => return Err(invalid("@value must be a string, number, or boolean")),
    };
    Ok(Some(Term::Literal(literal)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://ada.solid.example/profile/card";

    fn parse_ok(input: &str) -> Graph {
        match parse(input, Some(BASE)) {
            Ok(graph) => graph,
            Err(e) => panic!("parse failed: {e}"),
        }
    }

    #[test]
    fn test_well_known_prefixes_without_context() {
        let graph = parse_ok(
            r##"{
                "@id": "#me",
                "foaf:name": "Ada",
                "vcard:hasEmail": "mailto:ada@example.com",
                "ldp:inbox": "/inbox/"
            }"##,
        );
        assert_eq!(graph.first_value(terms::FOAF_NAME), Some("Ada"));
        assert_eq!(
            graph.first_value(terms::VCARD_HAS_EMAIL),
            Some("mailto:ada@example.com")
        );
        assert_eq!(
            graph.first_reference(terms::LDP_INBOX),
            Some("https://ada.solid.example/inbox/")
        );
        let subject = &graph.iter().next().unwrap().subject;
        assert_eq!(subject, &Term::iri(format!("{BASE}#me")));
    }

    #[test]
    fn test_context_terms_and_reference_types() {
        let graph = parse_ok(
            r##"{
                "@context": {
                    "ex": "https://ex.example/ns#",
                    "friend": { "@id": "ex:friend", "@type": "@id" },
                    "label": "ex:label",
                    "foaf:homepage": { "@type": "@id" }
                },
                "@id": "#me",
                "friend": "#bob",
                "label": "#not-an-iri",
                "foaf:homepage": "https://ada.example"
            }"##,
        );
        assert_eq!(
            graph.first_reference("https://ex.example/ns#friend"),
            Some("https://ada.solid.example/profile/card#bob")
        );
        assert_eq!(
            graph.objects("https://ex.example/ns#label").next(),
            Some(&Term::Literal(Literal::simple("#not-an-iri")))
        );
        assert_eq!(
            graph.first_reference(terms::FOAF_HOMEPAGE),
            Some("https://ada.example")
        );
    }

    #[test]
    fn test_reference_predicates_without_type_coercion() {
        let graph = parse_ok(
            r#"{
                "@context": { "account": "http://xmlns.com/foaf/0.1/account" },
                "account": ["https://github.com/ada", "https://twitter.com/ada"],
                "foaf:img": "avatar.png"
            }"#,
        );
        let accounts: Vec<_> = graph.references(terms::FOAF_ACCOUNT).collect();
        assert_eq!(accounts, vec!["https://github.com/ada", "https://twitter.com/ada"]);
        assert_eq!(
            graph.first_reference(terms::FOAF_IMG),
            Some("https://ada.solid.example/profile/avatar.png")
        );
    }

    #[test]
    fn test_types_and_vocab() {
        let graph = parse_ok(
            r#"{
                "@context": { "@vocab": "https://schema.org/" },
                "@type": ["Person", "foaf:Agent"],
                "jobTitle": "Analyst"
            }"#,
        );
        let types: Vec<_> = graph.references(terms::RDF_TYPE).collect();
        assert_eq!(types, vec!["https://schema.org/Person", "http://xmlns.com/foaf/0.1/Agent"]);
        assert_eq!(graph.first_value("https://schema.org/jobTitle"), Some("Analyst"));
    }

    #[test]
    fn test_unmapped_keys_are_dropped() {
        let graph = parse_ok(r#"{ "name": "Ada", "foaf:name": "Ada Lovelace" }"#);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.first_value(terms::FOAF_NAME), Some("Ada Lovelace"));
    }

    #[test]
    fn test_value_objects() {
        let graph = parse_ok(
            r#"{
                "@context": { "ex": "https://ex.example/ns#", "xsd": "http://www.w3.org/2001/XMLSchema#" },
                "ex:title": { "@value": "Comtesse", "@language": "fr" },
                "ex:born": { "@value": "1815-12-10", "@type": "xsd:date" },
                "ex:age": 36,
                "ex:ratio": 0.5,
                "ex:alive": false,
                "ex:nothing": { "@value": null }
            }"#,
        );
        let object = |p: &str| graph.objects(&format!("https://ex.example/ns#{p}")).next().cloned();
        assert_eq!(object("title"), Some(Term::Literal(Literal::lang("Comtesse", "fr"))));
        assert_eq!(
            object("born"),
            Some(Term::Literal(Literal::typed(
                "1815-12-10",
                "http://www.w3.org/2001/XMLSchema#date"
            )))
        );
        assert_eq!(object("age"), Some(Term::Literal(Literal::typed("36", terms::XSD_INTEGER))));
        assert_eq!(object("ratio"), Some(Term::Literal(Literal::typed("0.5", terms::XSD_DOUBLE))));
        assert_eq!(
            object("alive"),
            Some(Term::Literal(Literal::typed("false", terms::XSD_BOOLEAN)))
        );
        assert_eq!(object("nothing"), None);
    }

    #[test]
    fn test_nested_nodes_and_blank_labels() {
        let graph = parse_ok(
            r#"{
                "@id": "_:ada",
                "foaf:knows": { "@id": "_:bob", "foaf:name": "Bob" },
                "foaf:account": { "foaf:accountName": "ada" }
            }"#,
        );
        let knows = graph
            .iter()
            .find(|t| t.predicate == "http://xmlns.com/foaf/0.1/knows")
            .unwrap();
        assert!(knows.subject.is_blank());
        let bob_name = graph
            .iter()
            .find(|t| t.predicate == terms::FOAF_NAME)
            .unwrap();
        assert_eq!(knows.object, bob_name.subject);
        assert_eq!(
            graph.first_value("http://xmlns.com/foaf/0.1/accountName"),
            Some("ada")
        );
    }

    #[test]
    fn test_graph_and_top_level_array() {
        let graph = parse_ok(
            r##"{
                "@context": { "name": "http://xmlns.com/foaf/0.1/name" },
                "@graph": [
                    { "@id": "#a", "name": "A" },
                    { "@id": "#b", "name": "B" }
                ]
            }"##,
        );
        let names: Vec<_> = graph.objects(terms::FOAF_NAME).map(Term::value).collect();
        assert_eq!(names, vec!["A", "B"]);

        let graph = parse_ok(r#"[{ "foaf:name": "First" }, { "foaf:name": "Second" }]"#);
        assert_eq!(graph.first_value(terms::FOAF_NAME), Some("First"));
    }

    #[test]
    fn test_list_values() {
        let graph = parse_ok(r#"{ "foaf:nick": { "@list": ["a", "b"] } }"#);
        let firsts: Vec<_> = graph.objects(terms::RDF_FIRST).map(Term::value).collect();
        assert_eq!(firsts, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_documents() {
        let err = parse("{ not json", None).unwrap_err();
        assert!(err.to_string().contains("JSON-LD parse error"), "got: {err}");

        let err = parse("42", None).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object or array"));

        let err = parse(r#"{ "@id": 7 }"#, None).unwrap_err();
        assert!(err.to_string().contains("@id must be a string"));
    }
}
