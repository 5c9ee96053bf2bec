//! Turtle parser.
//!
//! Recursive descent over a char buffer, building the graph as statements
//! are read. Supported:
//! - `@prefix`/`@base` and SPARQL-style `PREFIX`/`BASE`
//! - IRIs (with `\u`/`\U` escapes, resolved against the base) and prefixed names
//! - `a`, `;` and `,` lists, `#` comments
//! - blank nodes: `_:label`, `[ ... ]`, collections `( ... )`
//! - string literals in all four quote styles, language tags, `^^datatype`
//! - integer, decimal, double and boolean shorthands

use std::collections::HashMap;

use url::Url;

use webcard_shared::vocab::terms;
use webcard_shared::{Result, WebcardError};

use crate::{Graph, Literal, Term, Triple, iri};

/// Characters allowed after `\` in a local name.
const LOCAL_ESCAPES: &str = "_~.-!$&'()*+,;=/?#@%";

/// Deepest allowed nesting of `[ ... ]` and `( ... )`.
const MAX_NESTING: usize = 128;

pub(crate) fn parse(input: &str, base: Option<&str>) -> Result<Graph> {
    let mut parser = Parser::new(input, base);
    match parser.document() {
        Ok(()) => Ok(parser.graph),
        Err(e) => {
            let (line, column) = parser.position(e.pos);
            Err(WebcardError::parse(format!(
                "Turtle parse error at line {line}, column {column}: {}",
                e.message
            )))
        }
    }
}

struct SyntaxError {
    pos: usize,
    message: String,
}

type PResult<T> = std::result::Result<T, SyntaxError>;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    base: Option<Url>,
    prefixes: HashMap<String, String>,
    blank_labels: HashMap<String, Term>,
    blank_ids: usize,
    depth: usize,
    graph: Graph,
}

impl Parser {
    fn new(input: &str, base: Option<&str>) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            base: iri::parse_base(base),
            prefixes: HashMap::new(),
            blank_labels: HashMap::new(),
            blank_ids: 0,
            depth: 0,
            graph: Graph::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// `word` at the cursor, not followed by a name character.
    fn keyword(&self, word: &str, ignore_case: bool) -> bool {
        let len = word.chars().count();
        let matches = word.chars().enumerate().all(|(i, c)| match self.peek_at(i) {
            Some(found) if ignore_case => found.eq_ignore_ascii_case(&c),
            Some(found) => found == c,
            None => false,
        });
        matches && self.peek_at(len).is_none_or(|c| !is_pn_char(c) && c != ':')
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> PResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            pos,
            message: message.into(),
        }
    }

    /// 1-based line and column of a char offset.
    fn position(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for &c in self.chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    fn fresh_blank(&mut self) -> Term {
        self.blank_ids += 1;
        Term::Blank(format!("b{}", self.blank_ids))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn document(&mut self) -> PResult<()> {
        loop {
            self.skip_ws();
            if self.eof() {
                return Ok(());
            }
            self.statement()?;
        }
    }

    fn statement(&mut self) -> PResult<()> {
        if self.keyword("@prefix", false) {
            self.pos += "@prefix".len();
            self.prefix_decl()?;
            self.skip_ws();
            self.expect('.')
        } else if self.keyword("@base", false) {
            self.pos += "@base".len();
            self.base_decl()?;
            self.skip_ws();
            self.expect('.')
        } else if self.keyword("PREFIX", true) {
            self.pos += "PREFIX".len();
            self.prefix_decl()
        } else if self.keyword("BASE", true) {
            self.pos += "BASE".len();
            self.base_decl()
        } else {
            self.triples()?;
            self.skip_ws();
            self.expect('.')
        }
    }

    fn prefix_decl(&mut self) -> PResult<()> {
        self.skip_ws();
        let prefix = self.take_name();
        self.expect(':')?;
        self.skip_ws();
        let namespace = self.iri_ref()?;
        self.prefixes.insert(prefix, namespace);
        Ok(())
    }

    fn base_decl(&mut self) -> PResult<()> {
        self.skip_ws();
        let start = self.pos;
        let base = self.iri_ref()?;
        self.base = Some(
            Url::parse(&base)
                .map_err(|e| self.error_at(start, format!("invalid base IRI <{base}>: {e}")))?,
        );
        Ok(())
    }

    fn triples(&mut self) -> PResult<()> {
        if self.peek() == Some('[') {
            let subject = self.blank_node_property_list()?;
            self.skip_ws();
            if self.peek() != Some('.') {
                self.predicate_object_list(&subject)?;
            }
            return Ok(());
        }
        let subject = self.subject()?;
        self.skip_ws();
        self.predicate_object_list(&subject)
    }

    fn subject(&mut self) -> PResult<Term> {
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri_ref()?)),
            Some('(') => self.collection(),
            Some('_') if self.peek_at(1) == Some(':') => self.blank_label(),
            Some(c) if is_pn_start(c) || c == ':' => Ok(Term::Iri(self.prefixed_name()?)),
            _ => Err(self.error("expected subject")),
        }
    }

    fn predicate_object_list(&mut self, subject: &Term) -> PResult<()> {
        loop {
            self.skip_ws();
            let predicate = self.verb()?;
            self.object_list(subject, &predicate)?;
            self.skip_ws();
            if self.peek() != Some(';') {
                return Ok(());
            }
            while self.peek() == Some(';') {
                self.pos += 1;
                self.skip_ws();
            }
            // A trailing ';' may close the list.
            if matches!(self.peek(), Some('.' | ']') | None) {
                return Ok(());
            }
        }
    }

    fn verb(&mut self) -> PResult<String> {
        if self.keyword("a", false) {
            self.pos += 1;
            return Ok(terms::RDF_TYPE.to_string());
        }
        match self.peek() {
            Some('<') => self.iri_ref(),
            Some(c) if is_pn_start(c) || c == ':' => self.prefixed_name(),
            _ => Err(self.error("expected predicate")),
        }
    }

    fn object_list(&mut self, subject: &Term, predicate: &str) -> PResult<()> {
        loop {
            self.skip_ws();
            let object = self.object()?;
            self.graph
                .insert(Triple::new(subject.clone(), predicate, object));
            self.skip_ws();
            if self.peek() != Some(',') {
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn object(&mut self) -> PResult<Term> {
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri_ref()?)),
            Some('(') => self.collection(),
            Some('[') => self.blank_node_property_list(),
            Some('_') if self.peek_at(1) == Some(':') => self.blank_label(),
            Some('"' | '\'') => self.rdf_literal(),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.numeric_literal(),
            Some(c) if is_pn_start(c) || c == ':' => {
                for word in ["true", "false"] {
                    if self.keyword(word, false) {
                        self.pos += word.len();
                        return Ok(Term::Literal(Literal::typed(word, terms::XSD_BOOLEAN)));
                    }
                }
                Ok(Term::Iri(self.prefixed_name()?))
            }
            _ => Err(self.error("expected object")),
        }
    }

    // -----------------------------------------------------------------------
    // Blank nodes
    // -----------------------------------------------------------------------

    fn blank_label(&mut self) -> PResult<Term> {
        self.pos += 2;
        let start = self.pos;
        let label = self.take_name();
        if label.is_empty() {
            return Err(self.error_at(start, "empty blank node label"));
        }
        if let Some(term) = self.blank_labels.get(&label) {
            return Ok(term.clone());
        }
        let term = self.fresh_blank();
        self.blank_labels.insert(label, term.clone());
        Ok(term)
    }

    fn blank_node_property_list(&mut self) -> PResult<Term> {
        self.nested(|p| {
            p.expect('[')?;
            let node = p.fresh_blank();
            p.skip_ws();
            if p.peek() != Some(']') {
                p.predicate_object_list(&node)?;
                p.skip_ws();
            }
            p.expect(']')?;
            Ok(node)
        })
    }

    fn collection(&mut self) -> PResult<Term> {
        self.nested(|p| {
            let start = p.pos;
            p.expect('(')?;
            let mut items = Vec::new();
            loop {
                p.skip_ws();
                match p.peek() {
                    Some(')') => {
                        p.pos += 1;
                        break;
                    }
                    None => return Err(p.error_at(start, "unterminated collection")),
                    _ => items.push(p.object()?),
                }
            }

            let nodes: Vec<Term> = items.iter().map(|_| p.fresh_blank()).collect();
            Ok(p.graph.insert_collection(nodes, items))
        })
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!(
                "blank nodes and collections nest deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // -----------------------------------------------------------------------
    // IRIs and names
    // -----------------------------------------------------------------------

    fn iri_ref(&mut self) -> PResult<String> {
        let start = self.pos;
        self.expect('<')?;
        let mut raw = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, "unterminated IRI")),
                Some('>') => break,
                Some('\\') => raw.push(self.unicode_escape()?),
                Some(c)
                    if c.is_whitespace()
                        || matches!(c, '<' | '"' | '{' | '}' | '|' | '^' | '`') =>
                {
                    return Err(self.error_at(self.pos - 1, format!("invalid character {c:?} in IRI")));
                }
                Some(c) => raw.push(c),
            }
        }
        Ok(iri::resolve(self.base.as_ref(), &raw))
    }

    fn prefixed_name(&mut self) -> PResult<String> {
        let start = self.pos;
        let prefix = self.take_name();
        if self.peek() != Some(':') {
            return Err(self.error_at(start, format!("unexpected token '{prefix}'")));
        }
        self.pos += 1;
        let local = self.local_name()?;
        let namespace = self
            .prefixes
            .get(&prefix)
            .ok_or_else(|| self.error_at(start, format!("undefined prefix '{prefix}:'")))?;
        Ok(format!("{namespace}{local}"))
    }

    /// Name characters with interior dots. A trailing dot is left unread.
    fn take_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            let continues = is_pn_char(c)
                || (c == '.' && self.peek_at(1).is_some_and(is_pn_char));
            if !continues {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        name
    }

    fn local_name(&mut self) -> PResult<String> {
        let mut local = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    let escaped = self
                        .peek_at(1)
                        .filter(|c| LOCAL_ESCAPES.contains(*c))
                        .ok_or_else(|| self.error("invalid escape in local name"))?;
                    local.push(escaped);
                    self.pos += 2;
                }
                Some('%') => {
                    let hex = [self.peek_at(1), self.peek_at(2)];
                    if !hex.iter().all(|c| c.is_some_and(|c| c.is_ascii_hexdigit())) {
                        return Err(self.error("invalid percent escape in local name"));
                    }
                    local.extend(self.chars[self.pos..self.pos + 3].iter());
                    self.pos += 3;
                }
                Some(c) if is_pn_char(c) || c == ':' => {
                    local.push(c);
                    self.pos += 1;
                }
                Some('.')
                    if self
                        .peek_at(1)
                        .is_some_and(|n| is_pn_char(n) || matches!(n, ':' | '%' | '\\')) =>
                {
                    local.push('.');
                    self.pos += 1;
                }
                _ => return Ok(local),
            }
        }
    }

    fn unicode_escape(&mut self) -> PResult<char> {
        let len = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error_at(self.pos.saturating_sub(1), "expected \\u or \\U escape")),
        };
        let start = self.pos;
        let digits: String = self.chars.iter().skip(start).take(len).collect();
        if digits.chars().count() != len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error_at(start, "invalid unicode escape"));
        }
        self.pos += len;
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error_at(start, format!("invalid code point U+{digits}")))
    }

    // -----------------------------------------------------------------------
    // Literals
    // -----------------------------------------------------------------------

    fn rdf_literal(&mut self) -> PResult<Term> {
        let value = self.string()?;
        match self.peek() {
            Some('@') => {
                self.pos += 1;
                let language = self.lang_tag()?;
                Ok(Term::Literal(Literal::lang(value, language)))
            }
            Some('^') if self.peek_at(1) == Some('^') => {
                self.pos += 2;
                let datatype = match self.peek() {
                    Some('<') => self.iri_ref()?,
                    _ => self.prefixed_name()?,
                };
                Ok(Term::Literal(Literal::typed(value, datatype)))
            }
            _ => Ok(Term::Literal(Literal::simple(value))),
        }
    }

    fn lang_tag(&mut self) -> PResult<String> {
        let start = self.pos;
        let mut tag = String::new();
        while let Some(c) = self.peek() {
            let valid = c.is_ascii_alphabetic()
                || (!tag.is_empty() && (c.is_ascii_digit() || c == '-'));
            if !valid {
                break;
            }
            tag.push(c);
            self.pos += 1;
        }
        if tag.is_empty() || tag.ends_with('-') {
            return Err(self.error_at(start, "invalid language tag"));
        }
        Ok(tag)
    }

    fn string(&mut self) -> PResult<String> {
        let start = self.pos;
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error_at(start, "expected string literal")),
        };
        let long = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if long {
            self.pos += 2;
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some('\\') => value.push(self.string_escape()?),
                Some(c) if c == quote && !long => return Ok(value),
                Some(c) if c == quote => {
                    let closes = self.peek() == Some(quote)
                        && self.peek_at(1) == Some(quote)
                        && self.peek_at(2) != Some(quote);
                    if closes {
                        self.pos += 2;
                        return Ok(value);
                    }
                    value.push(c);
                }
                Some('\n' | '\r') if !long => {
                    return Err(self.error_at(start, "line break in short string literal"));
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn string_escape(&mut self) -> PResult<char> {
        let escaped = match self.peek() {
            Some('u' | 'U') => return self.unicode_escape(),
            Some('t') => '\t',
            Some('b') => '\u{8}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{c}',
            Some(c @ ('"' | '\'' | '\\')) => c,
            _ => return Err(self.error("invalid string escape")),
        };
        self.pos += 1;
        Ok(escaped)
    }

    fn numeric_literal(&mut self) -> PResult<Term> {
        let start = self.pos;
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.pos += 1;
        }

        let integer_digits = self.take_digits(&mut text);
        let mut datatype = terms::XSD_INTEGER;

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            self.take_digits(&mut text);
            datatype = terms::XSD_DECIMAL;
        } else if integer_digits == 0 {
            return Err(self.error_at(start, "expected object"));
        }

        if let Some(e @ ('e' | 'E')) = self.peek() {
            text.push(e);
            self.pos += 1;
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.pos += 1;
            }
            if self.take_digits(&mut text) == 0 {
                return Err(self.error("expected exponent digits"));
            }
            datatype = terms::XSD_DOUBLE;
        }

        Ok(Term::Literal(Literal::typed(text, datatype)))
    }

    fn take_digits(&mut self, into: &mut String) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            into.push(c);
            self.pos += 1;
            count += 1;
        }
        count
    }
}

fn is_pn_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_pn_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '\u{00B7}')
}
