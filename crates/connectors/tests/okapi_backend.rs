use std::time::Duration;

use mux_common::{Instance, RoutingContext};
use mux_connectors::fetch::search_url;
use mux_connectors::{BackendPage, FetchClient, ProxyDirectory, ServiceDirectory};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ctx(server: &MockServer) -> RoutingContext {
    RoutingContext::from_headers([
        ("X-Okapi-Url", server.uri()),
        ("X-Okapi-Tenant", "diku".to_string()),
        ("X-Okapi-Token", "secret".to_string()),
        ("Content-Length", "0".to_string()),
    ])
}

#[tokio::test]
async fn test_discover_then_search_one_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_/proxy/tenants/diku/interfaces/codex"))
        .and(header("x-okapi-token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "mod-codex-mux-2.0" },
            { "id": "mod-codex-inventory-1.1" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/codex-instances"))
        .and(header("x-okapi-module-id", "mod-codex-inventory-1.1"))
        .and(header("x-okapi-tenant", "diku"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "7"))
        .and(query_param("query", "title=\"moby dick\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instances": [
                { "id": "a", "title": "Moby Dick", "identifier": [{ "value": "0-123" }] }
            ],
            "resultInfo": { "totalRecords": 1, "facets": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new(Duration::from_secs(5));
    let ctx = ctx(&server);
    let backends = ProxyDirectory::new(client.clone(), "mod-codex-mux")
        .list_backends("codex", &ctx)
        .await
        .unwrap();
    assert_eq!(backends, vec!["mod-codex-inventory-1.1".to_string()]);

    let query = "title=\"moby dick\"";
    let url = search_url(ctx.okapi_url().unwrap(), "/codex-instances", 7, Some(query)).unwrap();
    let resp = client.fetch(&backends[0], &url, &ctx).await.unwrap();
    let page =
        BackendPage::<Instance>::from_response(&backends[0], resp, "instances", Some(query.into()))
            .unwrap();

    assert!(page.is_ok());
    assert_eq!(page.total_records, 1);
    assert_eq!(page.items[0].extra["identifier"][0]["value"], "0-123");
    assert_eq!(page.query.as_deref(), Some(query));
}
