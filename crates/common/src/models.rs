use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A codex instance. Only the sortable fields are typed; everything else a
/// backend sends is kept in `extra` and written back unchanged.
///
/// A typed field is filled only from a string. Any other value under that
/// key, `null` included, stays in `extra` so it is echoed as received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Instance {
    pub id: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub extra: Map<String, Value>,
}

/// A codex package (knowledge-base title collection).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Package {
    pub id: Option<String>,
    pub name: Option<String>,
    pub extra: Map<String, Value>,
}

/// A package provider as reported by `/codex-packages-sources`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Source {
    pub id: Option<String>,
    pub name: Option<String>,
    pub extra: Map<String, Value>,
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !fields.get(key).is_some_and(Value::is_string) {
        return None;
    }
    match fields.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

// The typed value wins over a stale copy of the same key in `extra`.
fn put_text(fields: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(text) = value {
        fields.insert(key.to_string(), Value::String(text));
    }
}

impl From<Map<String, Value>> for Instance {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_text(&mut fields, "id"),
            title: take_text(&mut fields, "title"),
            date: take_text(&mut fields, "date"),
            extra: fields,
        }
    }
}

impl From<Instance> for Map<String, Value> {
    fn from(instance: Instance) -> Self {
        let mut fields = instance.extra;
        put_text(&mut fields, "id", instance.id);
        put_text(&mut fields, "title", instance.title);
        put_text(&mut fields, "date", instance.date);
        fields
    }
}

impl From<Map<String, Value>> for Package {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_text(&mut fields, "id"),
            name: take_text(&mut fields, "name"),
            extra: fields,
        }
    }
}

impl From<Package> for Map<String, Value> {
    fn from(package: Package) -> Self {
        let mut fields = package.extra;
        put_text(&mut fields, "id", package.id);
        put_text(&mut fields, "name", package.name);
        fields
    }
}

impl From<Map<String, Value>> for Source {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_text(&mut fields, "id"),
            name: take_text(&mut fields, "name"),
            extra: fields,
        }
    }
}

impl From<Source> for Map<String, Value> {
    fn from(source: Source) -> Self {
        let mut fields = source.extra;
        put_text(&mut fields, "id", source.id);
        put_text(&mut fields, "name", source.name);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceCollection {
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// What one backend was asked and how it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub source: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultInfo {
    pub total_records: u64,
    #[serde(default)]
    pub facets: Vec<Value>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}
