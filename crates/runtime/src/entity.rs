//! The record types the gateway federates, and what it needs to know about
//! each: where backends serve them and which fields they can be sorted on.

use mux_common::{Instance, Package};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait Entity: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    /// Singular name used in errors and logs.
    const NAME: &'static str;
    /// Okapi interface implemented by the backends serving this type.
    const INTERFACE: &'static str;
    /// Collection path, also the base of by-id lookups.
    const PATH: &'static str;
    /// Key of the item array in a collection body.
    const COLLECTION_KEY: &'static str;
    const SORT_FIELDS: &'static [&'static str];

    /// Value of a sortable field; `None` when the record lacks it.
    fn sort_value(&self, field: &str) -> Option<&str>;
}

impl Entity for Instance {
    const NAME: &'static str = "instance";
    const INTERFACE: &'static str = "codex";
    const PATH: &'static str = "/codex-instances";
    const COLLECTION_KEY: &'static str = "instances";
    const SORT_FIELDS: &'static [&'static str] = &["title", "date", "id"];

    fn sort_value(&self, field: &str) -> Option<&str> {
        match field {
            "title" => self.title.as_deref(),
            "date" => self.date.as_deref(),
            "id" => self.id.as_deref(),
            _ => None,
        }
    }
}

impl Entity for Package {
    const NAME: &'static str = "package";
    const INTERFACE: &'static str = "codex-packages";
    const PATH: &'static str = "/codex-packages";
    const COLLECTION_KEY: &'static str = "packages";
    const SORT_FIELDS: &'static [&'static str] = &["name"];

    fn sort_value(&self, field: &str) -> Option<&str> {
        match field {
            "name" => self.name.as_deref(),
            _ => None,
        }
    }
}
