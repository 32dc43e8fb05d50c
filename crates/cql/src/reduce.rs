use crate::ast::{BooleanOp, CqlNode, TermNode};
use crate::{TermMatcher, Truth, ALL_RECORDS};

/// Remove every term the matcher relates to `assumed`. A boolean node that
/// loses one side collapses to the other; `None` means nothing is left.
///
/// `x not y` with `x` eliminated keeps its negation as
/// `cql.allRecords=1 not y`.
pub fn reduce(node: &CqlNode, assumed: &TermNode, matcher: TermMatcher) -> Option<CqlNode> {
    match node {
        CqlNode::Term(term) => match matcher(term, assumed) {
            Truth::Unknown => Some(node.clone()),
            Truth::True | Truth::False => None,
        },
        CqlNode::Boolean {
            op,
            modifiers,
            left,
            right,
        } => {
            let l = reduce(left, assumed, matcher);
            let r = reduce(right, assumed, matcher);
            match (l, r) {
                (Some(l), Some(r)) => Some(CqlNode::Boolean {
                    op: *op,
                    modifiers: modifiers.clone(),
                    left: Box::new(l),
                    right: Box::new(r),
                }),
                (None, Some(r)) if *op == BooleanOp::Not => Some(CqlNode::Boolean {
                    op: BooleanOp::Not,
                    modifiers: modifiers.clone(),
                    left: Box::new(CqlNode::Term(TermNode::new(ALL_RECORDS, "=", "1"))),
                    right: Box::new(r),
                }),
                (Some(only), None) | (None, Some(only)) => Some(only),
                (None, None) => None,
            }
        }
    }
}

/// Result of partially evaluating a tree under an assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simplified {
    True,
    False,
    Node(CqlNode),
}

/// Substitute the matcher's verdict for every decided term and fold the
/// constants away. Terms the matcher leaves `Unknown` are kept as they are.
pub fn simplify(node: &CqlNode, assumed: &TermNode, matcher: TermMatcher) -> Simplified {
    match node {
        CqlNode::Term(term) => match matcher(term, assumed) {
            Truth::True => Simplified::True,
            Truth::False => Simplified::False,
            Truth::Unknown => Simplified::Node(node.clone()),
        },
        CqlNode::Boolean {
            op,
            modifiers,
            left,
            right,
        } => {
            let l = simplify(left, assumed, matcher);
            let r = simplify(right, assumed, matcher);
            let rebuild = |op: BooleanOp, l: CqlNode, r: CqlNode| {
                Simplified::Node(CqlNode::Boolean {
                    op,
                    modifiers: modifiers.clone(),
                    left: Box::new(l),
                    right: Box::new(r),
                })
            };
            match op {
                BooleanOp::And | BooleanOp::Prox => match (l, r) {
                    (Simplified::False, _) | (_, Simplified::False) => Simplified::False,
                    (Simplified::True, other) | (other, Simplified::True) => other,
                    (Simplified::Node(l), Simplified::Node(r)) => rebuild(*op, l, r),
                },
                BooleanOp::Or => match (l, r) {
                    (Simplified::True, _) | (_, Simplified::True) => Simplified::True,
                    (Simplified::False, other) | (other, Simplified::False) => other,
                    (Simplified::Node(l), Simplified::Node(r)) => rebuild(BooleanOp::Or, l, r),
                },
                BooleanOp::Not => match (l, r) {
                    (Simplified::False, _) | (_, Simplified::True) => Simplified::False,
                    (left, Simplified::False) => left,
                    (Simplified::True, Simplified::Node(r)) => rebuild(
                        BooleanOp::Not,
                        CqlNode::Term(TermNode::new(ALL_RECORDS, "=", "1")),
                        r,
                    ),
                    (Simplified::Node(l), Simplified::Node(r)) => rebuild(BooleanOp::Not, l, r),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{exact_equal, fuzzy_equal, CqlQuery};

    fn reduced(input: &str) -> Option<String> {
        let kb = TermNode::new("source", "=", "kb");
        CqlQuery::parse(input).unwrap().reduce(&kb, exact_equal).to_cql()
    }

    #[test]
    fn test_single_side_collapses() {
        assert_eq!(reduced("source=x and b").as_deref(), Some("b"));
        assert_eq!(reduced("b or source=x").as_deref(), Some("b"));
    }

    #[test]
    fn test_everything_eliminated() {
        assert_eq!(reduced("source=x"), None);
        assert_eq!(reduced("source=x or source=y"), None);
        assert_eq!(
            reduced("source=x sortby title").as_deref(),
            Some("cql.allRecords=1 sortby title")
        );
    }

    #[test]
    fn test_not_keeps_negation() {
        assert_eq!(
            reduced("source=x not b").as_deref(),
            Some("(cql.allRecords=1) not (b)")
        );
        assert_eq!(reduced("b not source=x").as_deref(), Some("b"));
    }

    fn simplified(input: &str) -> Simplified {
        let kb = TermNode::new("source", "=", "kb");
        let root = CqlQuery::parse(input).unwrap().root.unwrap();
        simplify(&root, &kb, fuzzy_equal)
    }

    fn text(s: Simplified) -> String {
        match s {
            Simplified::Node(n) => n.to_string(),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_simplify_keeps_matching_branch() {
        assert_eq!(
            text(simplified("(topic=x and source=kb) or (topic=y and source=local)")),
            "topic=x"
        );
        assert_eq!(text(simplified("topic=y and source=kb")), "topic=y");
    }

    #[test]
    fn test_simplify_constants() {
        assert_eq!(simplified("source=kb or topic=z"), Simplified::True);
        assert_eq!(simplified("source=local and topic=z"), Simplified::False);
        assert_eq!(simplified("topic=z not source=kb"), Simplified::False);
        assert_eq!(text(simplified("topic=z not source=local")), "topic=z");
        assert_eq!(
            text(simplified("source=kb not topic=z")),
            "(cql.allRecords=1) not (topic=z)"
        );
    }

    #[test]
    fn test_simplify_leaves_undecided_source_terms() {
        assert_eq!(text(simplified("source<kb")), "source<kb");
    }
}
