use mux_error::{ErrorCode, ErrorContext, MuxError};
use serde_json::Value;

#[test]
fn test_json_serialization() {
    let error = MuxError::new(ErrorCode::UnsupportedSortField, "unsupported sort index titel")
        .with_context(ErrorContext::SortField {
            field: "titel".to_string(),
            entity: "instance".to_string(),
            supported_fields: vec!["title".to_string(), "date".to_string(), "id".to_string()],
        })
        .with_hint("Did you mean 'title'?");

    let json = error.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "MUX-2002");
    assert_eq!(v["message"], "unsupported sort index titel");
    assert_eq!(v["hint"], "Did you mean 'title'?");
    assert_eq!(v["context"]["type"], "sort_field");
    assert_eq!(v["context"]["field"], "titel");
}

#[test]
fn test_error_code_parsing() {
    let code: ErrorCode = "MUX-1001".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::DirectoryUnavailable);
}

#[test]
fn test_error_roundtrips_through_json() {
    let error = MuxError::directory_unavailable("Get http://okapi/_/proxy returned status 500")
        .with_context(ErrorContext::Directory {
            url: Some("http://okapi/_/proxy".to_string()),
            status: Some(500),
        });

    let de: MuxError = serde_json::from_str(&error.to_json()).expect("valid json");
    assert_eq!(de.code, ErrorCode::DirectoryUnavailable);
    assert_eq!(de.http_status(), 401);
}
