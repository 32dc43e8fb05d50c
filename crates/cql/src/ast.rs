use std::fmt;
use std::str::FromStr;

use crate::{parser, CqlError, TermMatcher, ALL_RECORDS, SERVER_CHOICE};

/// `/name` or `/name<cmp><value>` attached to a relation, boolean or sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub name: String,
    pub comparison: Option<String>,
    pub value: Option<String>,
}

impl Modifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comparison: None,
            value: None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name)?;
        if let (Some(cmp), Some(value)) = (&self.comparison, &self.value) {
            write!(f, "{}{}", cmp, maybe_quote(value))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub base: String,
    pub modifiers: Vec<Modifier>,
}

impl Relation {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            modifiers: Vec::new(),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        self.base.starts_with(['=', '<', '>'])
    }

    /// Relations under which `index rel term` holds exactly when the stored
    /// value equals the term.
    pub fn is_equality(&self) -> bool {
        matches!(
            self.base.to_ascii_lowercase().as_str(),
            "=" | "==" | "exact" | "adj" | "all" | "any"
        )
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for m in &self.modifiers {
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermNode {
    pub index: String,
    pub relation: Relation,
    pub term: String,
}

impl TermNode {
    pub fn new(index: impl Into<String>, relation: &str, term: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            relation: Relation::new(relation),
            term: term.into(),
        }
    }

    /// A bare search term (`cql.serverChoice = term`).
    pub fn bare(term: impl Into<String>) -> Self {
        Self::new(SERVER_CHOICE, "=", term)
    }

    fn is_server_choice(&self) -> bool {
        self.index.eq_ignore_ascii_case(SERVER_CHOICE)
            && self.relation.base == "="
            && self.relation.modifiers.is_empty()
    }
}

impl fmt::Display for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = maybe_quote(&self.term);
        if self.is_server_choice() {
            write!(f, "{}", term)
        } else if self.relation.is_symbolic() && self.relation.modifiers.is_empty() {
            write!(f, "{}{}{}", maybe_quote(&self.index), self.relation, term)
        } else {
            write!(f, "{} {} {}", maybe_quote(&self.index), self.relation, term)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
    Not,
    Prox,
}

impl BooleanOp {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "prox" => Some(Self::Prox),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Prox => "prox",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CqlNode {
    Term(TermNode),
    Boolean {
        op: BooleanOp,
        modifiers: Vec<Modifier>,
        left: Box<CqlNode>,
        right: Box<CqlNode>,
    },
}

impl CqlNode {
    pub fn boolean(op: BooleanOp, left: CqlNode, right: CqlNode) -> Self {
        Self::Boolean {
            op,
            modifiers: Vec::new(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Visit every term in document order.
    pub fn terms(&self) -> Vec<&TermNode> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a TermNode>) {
        match self {
            CqlNode::Term(t) => out.push(t),
            CqlNode::Boolean { left, right, .. } => {
                left.collect_terms(out);
                right.collect_terms(out);
            }
        }
    }
}

impl fmt::Display for CqlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlNode::Term(t) => write!(f, "{}", t),
            CqlNode::Boolean {
                op,
                modifiers,
                left,
                right,
            } => {
                write!(f, "({}) {}", left, op.as_str())?;
                for m in modifiers {
                    write!(f, "{}", m)?;
                }
                write!(f, " ({})", right)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub index: String,
    pub modifiers: Vec<Modifier>,
}

impl SortKey {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            modifiers: Vec::new(),
        }
    }

    /// `/descending`, `/sort.descending` or any `desc*` modifier.
    pub fn is_descending(&self) -> bool {
        self.modifiers.iter().any(|m| {
            let name = m.name.to_ascii_lowercase();
            name.strip_prefix("sort.").unwrap_or(&name).starts_with("desc")
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", maybe_quote(&self.index))?;
        for m in &self.modifiers {
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

/// A parsed query. `root` is `None` once reduction has eliminated every
/// clause, which means "all records".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CqlQuery {
    pub root: Option<CqlNode>,
    pub sort_keys: Vec<SortKey>,
}

impl CqlQuery {
    pub fn parse(input: &str) -> Result<Self, CqlError> {
        parser::parse(input)
    }

    /// The query with every clause related to `assumed` eliminated.
    pub fn reduce(&self, assumed: &TermNode, matcher: TermMatcher) -> CqlQuery {
        CqlQuery {
            root: self
                .root
                .as_ref()
                .and_then(|root| crate::reduce(root, assumed, matcher)),
            sort_keys: self.sort_keys.clone(),
        }
    }

    /// CQL text for the wire, `None` when the query matches everything and
    /// carries no sort.
    pub fn to_cql(&self) -> Option<String> {
        let mut out = match (&self.root, self.sort_keys.is_empty()) {
            (None, true) => return None,
            (None, false) => format!("{}=1", ALL_RECORDS),
            (Some(root), _) => root.to_string(),
        };
        if !self.sort_keys.is_empty() {
            out.push_str(" sortby");
            for key in &self.sort_keys {
                out.push(' ');
                out.push_str(&key.to_string());
            }
        }
        Some(out)
    }
}

impl FromStr for CqlQuery {
    type Err = CqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

const RESERVED_WORDS: [&str; 5] = ["and", "or", "not", "prox", "sortby"];

fn maybe_quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '=' | '<' | '>' | '"' | '/'))
        || RESERVED_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w));
    if needs_quotes {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_serialization() {
        assert_eq!(TermNode::bare("a").to_string(), "a");
        assert_eq!(TermNode::new("topic", "=", "y").to_string(), "topic=y");
        assert_eq!(TermNode::new("title", "adj", "two words").to_string(), "title adj \"two words\"");
        assert_eq!(TermNode::bare("and").to_string(), "\"and\"");
    }

    #[test]
    fn test_sort_key_direction() {
        let mut key = SortKey::new("title");
        assert!(!key.is_descending());

        key.modifiers.push(Modifier::new("sort.descending"));
        assert!(key.is_descending());

        let key = SortKey {
            index: "title".to_string(),
            modifiers: vec![Modifier::new("descending")],
        };
        assert!(key.is_descending());
        assert_eq!(key.to_string(), "title/descending");
    }

    #[test]
    fn test_all_records_stands_in_for_empty_root() {
        let q = CqlQuery {
            root: None,
            sort_keys: vec![SortKey::new("title")],
        };
        assert_eq!(q.to_cql().as_deref(), Some("cql.allRecords=1 sortby title"));

        let q = CqlQuery {
            root: None,
            sort_keys: vec![],
        };
        assert_eq!(q.to_cql(), None);
    }
}
