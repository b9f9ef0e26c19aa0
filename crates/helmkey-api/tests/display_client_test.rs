#![allow(clippy::unwrap_used)]
// Integration tests for `DisplayClient` and `RestClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helmkey_api::{DisplayClient, Error, HttpMethod, RestClient, RestRequest};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DisplayClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/plugins/kip/", server.uri())).unwrap();
    let client = DisplayClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Display list ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_displays_bare_array() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"displayId": "helm", "displayName": "Helm"},
            {"uuid": "nav-1"},
        ])))
        .mount(&server)
        .await;

    let displays = client.list_displays().await.unwrap();
    let ids: Vec<_> = displays.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["helm", "nav-1"]);
    assert_eq!(displays[0].name.as_deref(), Some("Helm"));
}

#[tokio::test]
async fn test_list_displays_enveloped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"displays": [{"id": "a"}, {"id": "b"}]})),
        )
        .mount(&server)
        .await;

    let displays = client.list_displays().await.unwrap();
    assert_eq!(displays.len(), 2);
    assert_eq!(displays[1].id, "b");
}

#[tokio::test]
async fn test_list_displays_unexpected_shape() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nope": true})))
        .mount(&server)
        .await;

    let result = client.list_displays().await;
    assert!(
        matches!(result, Err(Error::UnexpectedShape { .. })),
        "expected UnexpectedShape, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_displays_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
        .mount(&server)
        .await;

    let err = client.list_displays().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}

// ── Dashboards & index ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_dashboards_wrapped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays/helm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dashboards": [{"id": "d0", "name": "Sailing"}, {"id": "d1"}, "d2"]
        })))
        .mount(&server)
        .await;

    let dashboards = client.list_dashboards("helm").await.unwrap();
    let ids: Vec<_> = dashboards.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["d0", "d1", "d2"]);
    assert_eq!(dashboards[0].name.as_deref(), Some("Sailing"));
}

#[tokio::test]
async fn test_screen_index_shapes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays/a/screenIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays/b/screenIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"activeScreen": 1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays/c/screenIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    assert_eq!(client.screen_index("a").await.unwrap(), Some(2));
    assert_eq!(client.screen_index("b").await.unwrap(), Some(1));
    assert_eq!(client.screen_index("c").await.unwrap(), None);
}

#[tokio::test]
async fn test_display_ids_are_percent_encoded() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/plugins/kip/displays/Nav%20Station/screenIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"index": 0})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.screen_index("Nav Station").await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_set_active_screen_posts_change_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/plugins/kip/displays/helm/activeScreen"))
        .and(body_json(json!({"changeId": 3})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_active_screen("helm", 3).await.unwrap();
}

#[tokio::test]
async fn test_set_active_screen_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/plugins/kip/displays/helm/activeScreen"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such display"))
        .mount(&server)
        .await;

    let err = client.set_active_screen("helm", 0).await.unwrap_err();
    assert!(err.is_not_found(), "got: {err:?}");
}

// ── REST actions ────────────────────────────────────────────────────

#[tokio::test]
async fn test_rest_get_with_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lights"))
        .and(query_param("zone", "cockpit"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let rest = RestClient::with_client(reqwest::Client::new());
    let resp = rest
        .send(&RestRequest {
            method: HttpMethod::Get,
            url: Url::parse(&format!("{}/lights", server.uri())).unwrap(),
            query: vec![("zone".into(), "cockpit".into())],
            body: Some(json!({"ignored": true})),
        })
        .await
        .unwrap();

    assert_eq!(resp.status, 204);
    assert!(resp.is_success());
}

#[tokio::test]
async fn test_rest_post_reports_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/autopilot"))
        .and(body_json(json!({"mode": "standby"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let rest = RestClient::with_client(reqwest::Client::new());
    let resp = rest
        .send(&RestRequest {
            method: HttpMethod::Post,
            url: Url::parse(&format!("{}/autopilot", server.uri())).unwrap(),
            query: Vec::new(),
            body: Some(json!({"mode": "standby"})),
        })
        .await
        .unwrap();

    assert_eq!(resp.status, 500);
    assert!(!resp.is_success());
}
