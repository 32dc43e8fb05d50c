use crate::ast::{BooleanOp, CqlNode, CqlQuery, TermNode};

/// Three-valued truth used when evaluating a query under an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// Decides what a query term says about the assumed term: `True`/`False`
/// when the assumption determines it, `Unknown` when unrelated.
pub type TermMatcher = fn(&TermNode, &TermNode) -> Truth;

/// Same index and an equality relation: the term is decided by comparing
/// values. `<>` inverts. Anything else is unknown.
pub fn fuzzy_equal(node: &TermNode, assumed: &TermNode) -> Truth {
    if !node.index.eq_ignore_ascii_case(&assumed.index) {
        return Truth::Unknown;
    }
    let same_value = node.term == assumed.term;
    if node.relation.is_equality() {
        if same_value {
            Truth::True
        } else {
            Truth::False
        }
    } else if node.relation.base == "<>" {
        if same_value {
            Truth::False
        } else {
            Truth::True
        }
    } else {
        Truth::Unknown
    }
}

/// Every term on the assumed index is related, regardless of value.
pub fn exact_equal(node: &TermNode, assumed: &TermNode) -> Truth {
    if node.index.eq_ignore_ascii_case(&assumed.index) {
        Truth::True
    } else {
        Truth::Unknown
    }
}

pub fn evaluate(node: &CqlNode, assumed: &TermNode, matcher: TermMatcher) -> Truth {
    match node {
        CqlNode::Term(term) => matcher(term, assumed),
        CqlNode::Boolean {
            op, left, right, ..
        } => {
            let l = evaluate(left, assumed, matcher);
            let r = evaluate(right, assumed, matcher);
            match op {
                BooleanOp::And | BooleanOp::Prox => l.and(r),
                BooleanOp::Or => l.or(r),
                BooleanOp::Not => l.and(r.not()),
            }
        }
    }
}

/// `false` only when the query cannot match anything given `assumed`.
/// An empty tree matches everything.
pub fn could_be_true(query: &CqlQuery, assumed: &TermNode, matcher: TermMatcher) -> bool {
    match &query.root {
        Some(root) => evaluate(root, assumed, matcher) != Truth::False,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kleene_tables() {
        use Truth::*;
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn test_fuzzy_equal() {
        let kb = TermNode::new("source", "=", "kb");
        assert_eq!(fuzzy_equal(&TermNode::new("source", "=", "kb"), &kb), Truth::True);
        assert_eq!(fuzzy_equal(&TermNode::new("source", "==", "x"), &kb), Truth::False);
        assert_eq!(fuzzy_equal(&TermNode::new("source", "<>", "x"), &kb), Truth::True);
        assert_eq!(fuzzy_equal(&TermNode::new("source", "<", "x"), &kb), Truth::Unknown);
        assert_eq!(fuzzy_equal(&TermNode::new("title", "=", "kb"), &kb), Truth::Unknown);
    }

    #[test]
    fn test_exact_equal_ignores_value() {
        let kb = TermNode::new("source", "=", "kb");
        assert_eq!(exact_equal(&TermNode::new("source", "=", "other"), &kb), Truth::True);
        assert_eq!(exact_equal(&TermNode::bare("kb"), &kb), Truth::Unknown);
    }

    #[test]
    fn test_not_excludes_assumed_source() {
        let kb = TermNode::new("source", "=", "kb");
        let q = CqlQuery::parse("a not source=kb").unwrap();
        assert!(!could_be_true(&q, &kb, fuzzy_equal));
        let q = CqlQuery::parse("a not source=local").unwrap();
        assert!(could_be_true(&q, &kb, fuzzy_equal));
    }

    #[test]
    fn test_empty_tree_is_satisfiable() {
        let q = CqlQuery {
            root: None,
            sort_keys: vec![],
        };
        assert!(could_be_true(&q, &TermNode::new("source", "=", "kb"), fuzzy_equal));
    }
}
