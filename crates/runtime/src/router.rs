//! Per-backend query rewriting.
//!
//! A backend with a source tag only ever holds records from that source, so
//! a query that requires another source is not sent to it at all, and the
//! `source` clauses are stripped from what it does receive.

use mux_common::SourceTagRule;
use mux_cql::{
    could_be_true, exact_equal, fuzzy_equal, reduce, simplify, CqlQuery, Simplified, TermNode,
};
use tracing::debug;

/// Index the tag is matched against in incoming queries.
pub const SOURCE_INDEX: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Send this query text (`None` = no `query` parameter).
    Query(Option<String>),
    /// The query cannot match anything at this backend.
    Excluded,
}

/// Prefix rules mapping a backend id to its source tag. First match wins.
#[derive(Debug, Clone, Default)]
pub struct SourceTagRules {
    rules: Vec<SourceTagRule>,
}

impl SourceTagRules {
    pub fn new(rules: Vec<SourceTagRule>) -> Self {
        Self { rules }
    }

    pub fn tag_for(&self, backend_id: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| backend_id.starts_with(&rule.prefix))
            .map(|rule| rule.tag.clone().unwrap_or_else(|| backend_id.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryRouter {
    tags: SourceTagRules,
}

impl QueryRouter {
    pub fn new(tags: SourceTagRules) -> Self {
        Self { tags }
    }

    pub fn route(&self, backend_id: &str, query: Option<&CqlQuery>) -> Routed {
        let Some(query) = query else {
            return Routed::Query(None);
        };
        let Some(tag) = self.tags.tag_for(backend_id) else {
            return Routed::Query(query.to_cql());
        };

        let assumed = TermNode::new(SOURCE_INDEX, "=", tag);
        if !could_be_true(query, &assumed, fuzzy_equal) {
            debug!(backend = backend_id, "filtering out module");
            return Routed::Excluded;
        }
        debug!(backend = backend_id, "reducing query for module");

        // Fold what the tag decides, then strip any source clause left over.
        let root = match query.root.as_ref().map(|r| simplify(r, &assumed, fuzzy_equal)) {
            None | Some(Simplified::True) => None,
            Some(Simplified::False) => return Routed::Excluded,
            Some(Simplified::Node(node)) => reduce(&node, &assumed, exact_equal),
        };
        let rewritten = CqlQuery {
            root,
            sort_keys: query.sort_keys.clone(),
        };
        Routed::Query(rewritten.to_cql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_common::FederationSettings;

    fn router() -> QueryRouter {
        QueryRouter::new(SourceTagRules::new(FederationSettings::default().source_tags))
    }

    fn route(backend: &str, q: &str) -> Routed {
        router().route(backend, Some(&CqlQuery::parse(q).unwrap()))
    }

    #[test]
    fn test_default_tags() {
        let tags = SourceTagRules::new(FederationSettings::default().source_tags);
        assert_eq!(tags.tag_for("mod-codex-ekb-1.0.0").as_deref(), Some("kb"));
        assert_eq!(tags.tag_for("mod-codex-inventory-1.2").as_deref(), Some("local"));
        assert_eq!(tags.tag_for("mock2").as_deref(), Some("mock2"));
        assert_eq!(tags.tag_for("mod-other"), None);
    }

    #[test]
    fn test_no_query_goes_everywhere() {
        assert_eq!(router().route("mock1", None), Routed::Query(None));
    }

    #[test]
    fn test_untagged_backend_gets_query_unchanged() {
        assert_eq!(
            route("mod-other-1.0", "source=kb and title=x"),
            Routed::Query(Some("(source=kb) and (title=x)".into()))
        );
    }

    #[test]
    fn test_other_source_excluded() {
        assert_eq!(route("mod-codex-inventory-1.0", "source=kb and topic=y"), Routed::Excluded);
    }

    #[test]
    fn test_own_source_reduced() {
        assert_eq!(
            route("mod-codex-ekb-1.0", "topic=y and source=kb"),
            Routed::Query(Some("topic=y".into()))
        );
    }

    #[test]
    fn test_compound_query_split_per_backend() {
        let q = "(topic=x and source=kb) or (topic=y and source=local)";
        assert_eq!(route("mod-codex-ekb-1.0", q), Routed::Query(Some("topic=x".into())));
        assert_eq!(route("mod-codex-inventory-1.0", q), Routed::Query(Some("topic=y".into())));
    }

    #[test]
    fn test_satisfied_source_means_match_all() {
        assert_eq!(route("mod-codex-ekb-1.0", "source=kb or title=x"), Routed::Query(None));
    }

    #[test]
    fn test_undecided_source_clause_is_stripped() {
        assert_eq!(
            route("mod-codex-ekb-1.0", "title=x and source<kb"),
            Routed::Query(Some("title=x".into()))
        );
    }

    #[test]
    fn test_only_source_clause_becomes_match_all() {
        assert_eq!(route("mock1", "source=mock1"), Routed::Query(None));
        assert_eq!(
            route("mock1", "source=mock1 sortby title"),
            Routed::Query(Some("cql.allRecords=1 sortby title".into()))
        );
    }
}
