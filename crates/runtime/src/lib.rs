//! Federation core of the codex multiplexer.
//!
//! One search request becomes one page fetch per routed backend; the pages
//! are merged into a single globally consistent page.
//!
//! ```text
//!                  ┌────────────────────┐
//!  search ───────▶ │  FederationEngine  │
//!                  └─────────┬──────────┘
//!        directory ─ router ─┼─ comparator
//!                  ┌─────────┴──────────┐
//!                  │ fetch ×N → merge   │ → Page { items, resultInfo }
//!                  └────────────────────┘
//! ```
pub mod comparator;
pub mod diagnostics;
pub mod entity;
pub mod federation;
pub mod lookup;
pub mod merge;
pub mod router;

pub use comparator::EntityComparator;
pub use entity::Entity;
pub use federation::{FederationEngine, FederationEngineOptions, Page};
pub use merge::{merge_pages, RoutedBackend};
pub use router::{QueryRouter, Routed, SourceTagRules};
