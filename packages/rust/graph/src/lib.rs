//! In-memory RDF graph and the loaders that fill it.
//!
//! Primary documents are always Turtle. Secondary (WebID) documents are
//! tried as Turtle first and fall back to JSON-LD when the server says so.
//! The graph keeps document order, so "first value of predicate P" is
//! deterministic across runs.

mod iri;
mod jsonld;
mod turtle;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use webcard_shared::vocab::terms;
use webcard_shared::{ContentType, Document, Result, WebcardError};

// ---------------------------------------------------------------------------
// Terms and triples
// ---------------------------------------------------------------------------

/// A literal value with optional datatype IRI or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Literal {
    /// A plain string literal.
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }
}

/// RDF term: subject or object position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Lexical form for literals, IRI text for references, label for blanks.
    pub fn value(&self) -> &str {
        match self {
            Self::Iri(iri) => iri,
            Self::Blank(label) => label,
            Self::Literal(lit) => &lit.value,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(label) => write!(f, "_:{label}"),
            Self::Literal(lit) => {
                write!(f, "{:?}", lit.value)?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free triple store.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple. Returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.seen.contains(&triple) {
            return false;
        }
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    /// Link `items` into an RDF collection over the given list `nodes`
    /// (one per item) and return its head, or `rdf:nil` when empty.
    pub(crate) fn insert_collection(&mut self, nodes: Vec<Term>, items: Vec<Term>) -> Term {
        for (i, item) in items.into_iter().enumerate() {
            let rest = nodes
                .get(i + 1)
                .cloned()
                .unwrap_or_else(|| Term::iri(terms::RDF_NIL));
            self.insert(Triple::new(nodes[i].clone(), terms::RDF_FIRST, item));
            self.insert(Triple::new(nodes[i].clone(), terms::RDF_REST, rest));
        }
        nodes
            .into_iter()
            .next()
            .unwrap_or_else(|| Term::iri(terms::RDF_NIL))
    }

    /// Objects of `predicate` (full IRI), any subject, in document order.
    pub fn objects<'a, 'p>(
        &'a self,
        predicate: &'p str,
    ) -> impl Iterator<Item = &'a Term> + use<'a, 'p> {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// First non-blank object value of `predicate`.
    pub fn first_value(&self, predicate: &str) -> Option<&str> {
        self.objects(predicate)
            .find(|term| !term.is_blank())
            .map(Term::value)
    }

    /// First IRI object of `predicate`.
    pub fn first_reference(&self, predicate: &str) -> Option<&str> {
        self.references(predicate).next()
    }

    /// All IRI objects of `predicate`, in document order.
    pub fn references<'a, 'p>(
        &'a self,
        predicate: &'p str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'p> {
        self.objects(predicate).filter_map(Term::as_iri)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triple> {
        self.triples.iter()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Parse Turtle text with an optional base IRI.
pub fn parse_turtle(input: &str, base: Option<&str>) -> Result<Graph> {
    turtle::parse(input, base)
}

/// Parse JSON-LD text with an optional base IRI.
pub fn parse_jsonld(input: &str, base: Option<&str>) -> Result<Graph> {
    jsonld::parse(input, base)
}

/// Load the primary document. Always Turtle, based at the document URI.
#[instrument(skip_all, fields(uri = %doc.uri))]
pub fn load_primary(doc: &Document) -> Result<Graph> {
    let graph = turtle::parse(&doc.body, Some(&doc.uri))?;
    debug!(triples = graph.len(), "primary graph loaded");
    Ok(graph)
}

/// Load a secondary document: Turtle, then JSON-LD when declared as such.
#[instrument(skip_all, fields(uri = %doc.uri, content_type = ?doc.content_type))]
pub fn load_secondary(doc: &Document) -> Result<Graph> {
    let turtle_err = match turtle::parse(&doc.body, Some(&doc.uri)) {
        Ok(graph) => {
            debug!(triples = graph.len(), "secondary graph loaded as Turtle");
            return Ok(graph);
        }
        Err(e) => e,
    };

    if doc.content_type != ContentType::JsonLd {
        return Err(turtle_err);
    }

    debug!(error = %turtle_err, "Turtle parse failed, trying JSON-LD");
    match jsonld::parse(&doc.body, Some(&doc.uri)) {
        Ok(graph) => {
            debug!(triples = graph.len(), "secondary graph loaded as JSON-LD");
            Ok(graph)
        }
        Err(jsonld_err) => Err(WebcardError::parse(format!(
            "{}; JSON-LD fallback: {}",
            message_of(&turtle_err),
            message_of(&jsonld_err)
        ))),
    }
}

fn message_of(err: &WebcardError) -> String {
    match err {
        WebcardError::GraphParse { message } => message.clone(),
        other => other.to_string(),
    }
}
