//! # Error Contexts
//!
//! Structured metadata attached to errors for logs and API consumers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// A call to one backend (MUX-1002, 1003, 5002)
    Backend {
        backend_id: String,
        url: String,
        status: Option<u16>,
    },

    /// The directory lookup (MUX-1001)
    Directory {
        url: Option<String>,
        status: Option<u16>,
    },

    /// Unsupported sort index (MUX-2002)
    SortField {
        field: String,
        entity: String,
        supported_fields: Vec<String>,
    },

    /// CQL syntax error position (MUX-2001)
    Syntax { position: usize, snippet: String },
}
