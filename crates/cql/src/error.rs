use mux_error::{ErrorCode, ErrorContext, MuxError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CqlError {
    #[error("empty query")]
    EmptyQuery,

    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("unexpected '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        position: usize,
        expected: &'static str,
    },

    #[error("unexpected end of query, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("sortby without a sort index")]
    MissingSortKey,
}

impl CqlError {
    pub fn position(&self) -> Option<usize> {
        match self {
            CqlError::UnterminatedString(pos) => Some(*pos),
            CqlError::UnexpectedToken { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Convert into the gateway error, keeping a snippet of the offending text.
    pub fn into_mux_error(self, query: &str) -> MuxError {
        let message = format!(
            "Unsupported Query Format : Search query is in an unsupported format. {}",
            self
        );
        let mut err = MuxError::new(ErrorCode::SyntaxError, message);
        if let Some(position) = self.position() {
            let snippet: String = query.chars().skip(position).take(20).collect();
            err = err.with_context(ErrorContext::Syntax { position, snippet });
        }
        err
    }
}
