#![allow(clippy::unwrap_used)]
// Integration tests for `RouterClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gatewatch_api::{Error, RouterClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RouterClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = RouterClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Read endpoints ──────────────────────────────────────────────────

#[tokio::test]
async fn active_config_returns_raw_blob() {
    let (server, client) = setup().await;

    let config = json!({
        "interface": { "phy": { "eth0": { "enabled": true } } },
        "routing": { "global": { "default": { "viaIntf": "eth0" } } }
    });

    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&config))
        .mount(&server)
        .await;

    let got = client.active_config().await.unwrap();
    assert_eq!(got, config);
}

#[tokio::test]
async fn interfaces_returns_name_keyed_map() {
    let (server, client) = setup().await;

    let body = json!({
        "eth0": {
            "config": { "meta": { "name": "eth0", "uuid": "u-1", "type": "wan" } },
            "state": { "mac": "20:6d:31:aa:bb:cc", "ip4": "192.168.1.2/24" }
        },
        "br0": {
            "config": { "meta": { "name": "br0", "uuid": "u-2", "type": "lan" } },
            "state": { "ip4": "192.168.218.1/24" }
        }
    });

    Mock::given(method("GET"))
        .and(path("/config/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let map = client.interfaces().await.unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.contains_key("eth0"));
    assert_eq!(map["br0"]["config"]["meta"]["type"], "lan");
}

#[tokio::test]
async fn wan_and_lan_subsets() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/config/wans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "eth0": {} })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/config/lans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "br0": {} })))
        .mount(&server)
        .await;

    assert!(client.wan_interfaces().await.unwrap().contains_key("eth0"));
    assert!(client.lan_interfaces().await.unwrap().contains_key("br0"));
}

// ── Write endpoint ──────────────────────────────────────────────────

#[tokio::test]
async fn set_config_posts_body_and_returns_response() {
    let (server, client) = setup().await;

    let config = json!({ "interface": { "phy": { "eth0": { "enabled": true } } } });

    Mock::given(method("POST"))
        .and(path("/config/set"))
        .and(body_json(&config))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "applied": true })))
        .mount(&server)
        .await;

    let resp = client.set_config(&config).await.unwrap();
    assert_eq!(resp["applied"], true);
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn non_2xx_maps_to_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = client.active_config().await.unwrap_err();
    match err {
        Error::Api { status, ref body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(err.is_transient());
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn non_ascii_error_body_truncates_on_char_boundary() {
    let (server, client) = setup().await;

    // 300 bytes of 3-byte chars: byte 200 is mid-character
    let body = "€".repeat(100);
    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(502).set_body_string(body))
        .mount(&server)
        .await;

    let err = client.active_config().await.unwrap_err();
    match err {
        Error::Api { status, ref body } => {
            assert_eq!(status, 502);
            assert!(body.len() <= 200);
            assert_eq!(body, &"€".repeat(66));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn non_ascii_undecodable_body_truncates_on_char_boundary() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/config/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ü".repeat(150)))
        .mount(&server)
        .await;

    let err = client.interfaces().await.unwrap_err();
    match err {
        Error::Deserialization { ref message, ref body } => {
            assert!(message.contains("body preview"));
            // the full body is kept even though the preview is cut
            assert_eq!(body.chars().count(), 150);
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_maps_to_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/config/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.interfaces().await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { .. }),
        "expected Deserialization error, got: {err:?}"
    );
    assert!(!err.is_transient());
}
