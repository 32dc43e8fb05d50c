use crate::ast::{BooleanOp, CqlNode, CqlQuery, Modifier, Relation, SortKey, TermNode};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::CqlError;

const RELATION_WORDS: [&str; 6] = ["adj", "all", "any", "within", "encloses", "exact"];

pub(crate) fn parse(input: &str) -> Result<CqlQuery, CqlError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CqlError::EmptyQuery);
    }
    let mut parser = Parser { tokens, pos: 0 };
    parser.prefix_assignments()?;
    let root = parser.scoped_clause()?;
    let sort_keys = parser.sort_spec()?;
    if let Some(tok) = parser.peek() {
        return Err(unexpected(tok, "a boolean operator or end of query"));
    }
    Ok(CqlQuery {
        root: Some(root),
        sort_keys,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn unexpected(tok: &Token, expected: &'static str) -> CqlError {
    CqlError::UnexpectedToken {
        found: tok.describe(),
        position: tok.position,
        expected,
    }
}

fn is_keyword(word: &str, keyword: &str) -> bool {
    word.eq_ignore_ascii_case(keyword)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_any(&mut self, expected: &'static str) -> Result<Token, CqlError> {
        self.advance().ok_or(CqlError::UnexpectedEnd(expected))
    }

    fn peek_boolean(&self) -> Option<BooleanOp> {
        match self.peek_kind(0) {
            Some(TokenKind::Word(w)) => BooleanOp::from_keyword(w),
            _ => None,
        }
    }

    fn at_sortby(&self) -> bool {
        matches!(self.peek_kind(0), Some(TokenKind::Word(w)) if is_keyword(w, "sortby"))
    }

    fn scoped_clause(&mut self) -> Result<CqlNode, CqlError> {
        let mut left = self.search_clause()?;
        while let Some(op) = self.peek_boolean() {
            self.advance();
            let modifiers = self.modifiers()?;
            let right = self.search_clause()?;
            left = CqlNode::Boolean {
                op,
                modifiers,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Skips `>prefix=uri` and `>uri` assignments. Index names are matched
    /// literally, so the assignments carry nothing the router needs.
    fn prefix_assignments(&mut self) -> Result<(), CqlError> {
        while matches!(self.peek_kind(0), Some(TokenKind::Symbol(s)) if s == ">") {
            self.advance();
            self.term_token("a context set prefix or URI")?;
            if matches!(self.peek_kind(0), Some(TokenKind::Symbol(s)) if s == "=") {
                self.advance();
                self.term_token("a context set URI")?;
            }
        }
        Ok(())
    }

    fn search_clause(&mut self) -> Result<CqlNode, CqlError> {
        if matches!(self.peek_kind(0), Some(TokenKind::LParen)) {
            self.advance();
            self.prefix_assignments()?;
            let inner = self.scoped_clause()?;
            let close = self.expect_any("')'")?;
            if close.kind != TokenKind::RParen {
                return Err(unexpected(&close, "')'"));
            }
            return Ok(inner);
        }

        let first = self.term_token("a search term")?;
        if self.relation_follows() {
            let relation = self.relation()?;
            let term = self.term_token("a search term")?;
            return Ok(CqlNode::Term(TermNode {
                index: first,
                relation,
                term,
            }));
        }
        Ok(CqlNode::Term(TermNode::bare(first)))
    }

    fn relation_follows(&self) -> bool {
        match self.peek_kind(0) {
            Some(TokenKind::Symbol(_)) => true,
            Some(TokenKind::Word(w)) => {
                RELATION_WORDS.iter().any(|r| is_keyword(w, r)) && self.peek_kind(1).is_some()
            }
            _ => false,
        }
    }

    fn relation(&mut self) -> Result<Relation, CqlError> {
        let tok = self.expect_any("a relation")?;
        let base = match tok.kind {
            TokenKind::Symbol(s) => s,
            TokenKind::Word(w) => w.to_ascii_lowercase(),
            _ => return Err(unexpected(&tok, "a relation")),
        };
        let modifiers = self.modifiers()?;
        Ok(Relation { base, modifiers })
    }

    /// A term, index or sort key: a plain word that isn't a reserved
    /// keyword, or any quoted string.
    fn term_token(&mut self, expected: &'static str) -> Result<String, CqlError> {
        let tok = self.expect_any(expected)?;
        match tok.kind {
            TokenKind::Quoted(s) => Ok(s),
            TokenKind::Word(ref w)
                if BooleanOp::from_keyword(w).is_none() && !is_keyword(w, "sortby") =>
            {
                Ok(w.clone())
            }
            _ => Err(unexpected(&tok, expected)),
        }
    }

    fn modifiers(&mut self) -> Result<Vec<Modifier>, CqlError> {
        let mut modifiers = Vec::new();
        while matches!(self.peek_kind(0), Some(TokenKind::Slash)) {
            self.advance();
            let name_tok = self.expect_any("a modifier name")?;
            let name = match name_tok.kind {
                TokenKind::Word(w) | TokenKind::Quoted(w) => w,
                _ => return Err(unexpected(&name_tok, "a modifier name")),
            };
            let mut modifier = Modifier::new(name);
            if let Some(TokenKind::Symbol(cmp)) = self.peek_kind(0).cloned() {
                self.advance();
                let value_tok = self.expect_any("a modifier value")?;
                let value = match value_tok.kind {
                    TokenKind::Word(w) | TokenKind::Quoted(w) => w,
                    _ => return Err(unexpected(&value_tok, "a modifier value")),
                };
                modifier.comparison = Some(cmp);
                modifier.value = Some(value);
            }
            modifiers.push(modifier);
        }
        Ok(modifiers)
    }

    fn sort_spec(&mut self) -> Result<Vec<SortKey>, CqlError> {
        if !self.at_sortby() {
            return Ok(Vec::new());
        }
        self.advance();
        let mut keys = Vec::new();
        while let Some(kind) = self.peek_kind(0) {
            if !matches!(kind, TokenKind::Word(_) | TokenKind::Quoted(_)) {
                break;
            }
            let index = self.term_token("a sort index")?;
            let modifiers = self.modifiers()?;
            keys.push(SortKey { index, modifiers });
        }
        if keys.is_empty() {
            return Err(CqlError::MissingSortKey);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_term() {
        let q = parse("a").unwrap();
        assert_eq!(q.root, Some(CqlNode::Term(TermNode::bare("a"))));
        assert!(q.sort_keys.is_empty());
    }

    #[test]
    fn test_booleans_are_left_associative() {
        let q = parse("a and source=x or b").unwrap();
        let expected = CqlNode::boolean(
            BooleanOp::Or,
            CqlNode::boolean(
                BooleanOp::And,
                CqlNode::Term(TermNode::bare("a")),
                CqlNode::Term(TermNode::new("source", "=", "x")),
            ),
            CqlNode::Term(TermNode::bare("b")),
        );
        assert_eq!(q.root, Some(expected));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let q = parse("a AND b SORTBY title").unwrap();
        assert!(matches!(q.root, Some(CqlNode::Boolean { op: BooleanOp::And, .. })));
        assert_eq!(q.sort_keys, vec![SortKey::new("title")]);
    }

    #[test]
    fn test_word_relation_with_modifier() {
        let q = parse("title any/stem \"war peace\"").unwrap();
        match q.root {
            Some(CqlNode::Term(t)) => {
                assert_eq!(t.index, "title");
                assert_eq!(t.relation.base, "any");
                assert_eq!(t.relation.modifiers, vec![Modifier::new("stem")]);
                assert_eq!(t.term, "war peace");
            }
            other => panic!("unexpected root {:?}", other),
        }
    }

    #[test]
    fn test_sort_keys_with_modifiers() {
        let q = parse("a sortby title/sort.descending date").unwrap();
        assert_eq!(q.sort_keys.len(), 2);
        assert!(q.sort_keys[0].is_descending());
        assert!(!q.sort_keys[1].is_descending());
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse("   "), Err(CqlError::EmptyQuery));
        assert_eq!(parse("a sortby"), Err(CqlError::MissingSortKey));
        assert!(matches!(parse("(a and b"), Err(CqlError::UnexpectedEnd(_))));
        assert!(matches!(
            parse("a b"),
            Err(CqlError::UnexpectedToken { position: 2, .. })
        ));
        assert!(matches!(parse("title="), Err(CqlError::UnexpectedEnd(_))));
        assert!(matches!(parse("a and"), Err(CqlError::UnexpectedEnd(_))));
        assert!(matches!(parse(">"), Err(CqlError::UnexpectedEnd(_))));
        assert!(matches!(parse(">dc="), Err(CqlError::UnexpectedEnd(_))));
    }

    #[test]
    fn test_prefix_assignments_are_skipped() {
        let q = parse(">dc = \"xx\" a sortby title").unwrap();
        assert_eq!(q.root, Some(CqlNode::Term(TermNode::bare("a"))));
        assert_eq!(q.sort_keys, vec![SortKey::new("title")]);

        let q = parse(">\"info:srw/cql-context-set/1/dc-v1.1\" title=x").unwrap();
        assert_eq!(q.root, Some(CqlNode::Term(TermNode::new("title", "=", "x"))));

        let q = parse("a and (>dc=xx source=kb)").unwrap();
        let expected = CqlNode::boolean(
            BooleanOp::And,
            CqlNode::Term(TermNode::bare("a")),
            CqlNode::Term(TermNode::new("source", "=", "kb")),
        );
        assert_eq!(q.root, Some(expected));
    }

    #[test]
    fn test_serialization_reparses_to_same_tree() {
        for input in [
            "a",
            "title=\"two words\" and (source=kb or source=local)",
            "title adj x not y sortby date/descending",
            "id<>\"a\\\"b\"",
        ] {
            let q = parse(input).unwrap();
            let text = q.to_cql().unwrap();
            assert_eq!(parse(&text).unwrap(), q, "roundtrip of {}", input);
        }
    }
}
