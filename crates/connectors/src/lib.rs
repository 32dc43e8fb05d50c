//! Outbound HTTP for the codex multiplexer: the module directory, the
//! per-backend fetch, and normalization of backend collection bodies.
pub mod directory;
pub mod fetch;
pub mod page;

pub use directory::{ProxyDirectory, ServiceDirectory, StaticDirectory};
pub use fetch::{FetchClient, RawResponse};
pub use page::BackendPage;
