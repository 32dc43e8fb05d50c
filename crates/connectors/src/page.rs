use mux_error::{ErrorCode, ErrorContext, MuxError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::fetch::RawResponse;

/// One backend's answer to a search, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendPage<E> {
    pub status: u16,
    pub items: Vec<E>,
    /// Self-reported total; 0 unless `status == 200`.
    pub total_records: u64,
    /// Raw body, kept only when `status != 200`.
    pub raw_message: Vec<u8>,
    /// The query text actually sent.
    pub query: Option<String>,
}

impl<E: DeserializeOwned> BackendPage<E> {
    /// Items live under `collection_key`. The total is `resultInfo.totalRecords`,
    /// else a top-level `totalRecords`; absent means 0, anything but a
    /// non-negative integer is malformed. A `null` body is an empty page.
    pub fn from_response(
        backend_id: &str,
        resp: RawResponse,
        collection_key: &str,
        query: Option<String>,
    ) -> Result<Self> {
        if !resp.is_ok() {
            return Ok(Self {
                status: resp.status,
                items: Vec::new(),
                total_records: 0,
                raw_message: resp.body,
                query,
            });
        }

        let malformed = |detail: String| {
            MuxError::new(
                ErrorCode::MalformedPayload,
                format!("{} returned an unreadable collection: {}", backend_id, detail),
            )
            .with_context(ErrorContext::Backend {
                backend_id: backend_id.to_string(),
                url: String::new(),
                status: Some(resp.status),
            })
        };

        let body: Value = serde_json::from_slice(&resp.body).map_err(|e| malformed(e.to_string()))?;
        let mut object = match body {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => return Err(malformed(format!("expected an object, got {}", kind(&other)))),
        };

        let total_records = total_records(&object).map_err(malformed)?;

        let items = match object.remove(collection_key) {
            Some(Value::Array(values)) => values
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<E>, _>>()
                .map_err(|e| malformed(e.to_string()))?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(malformed(format!(
                    "'{}' is {}, not an array",
                    collection_key,
                    kind(&other)
                )))
            }
        };

        Ok(Self {
            status: resp.status,
            items,
            total_records,
            raw_message: Vec::new(),
            query,
        })
    }
}

impl<E> BackendPage<E> {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn message_text(&self) -> String {
        String::from_utf8_lossy(&self.raw_message).into_owned()
    }
}

fn total_records(object: &serde_json::Map<String, Value>) -> std::result::Result<u64, String> {
    let present = |v: &&Value| !v.is_null();
    let nested = object
        .get("resultInfo")
        .and_then(|info| info.get("totalRecords"))
        .filter(present);
    match nested.or_else(|| object.get("totalRecords").filter(present)) {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| format!("totalRecords {} is not a non-negative integer", v)),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
