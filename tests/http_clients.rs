//! Outbound HTTP clients against wiremock.
//!
//! | Client            | Method | Path                 |
//! |-------------------|--------|----------------------|
//! | HttpNameService   | GET    | `/search-names`      |
//! | HttpNameService   | GET    | `/get-names`         |
//! | HttpNameService   | POST   | `/set-name`          |
//! | HttpContentStore  | POST   | `/pinning/pinFileToIPFS` |
//! | CoinGeckoOracle   | GET    | `/simple/price`      |

use std::sync::Arc;

use luca3auth::config::{NamesConfig, PriceConfig, StorageConfig};
use luca3auth::names::{HttpNameService, IdentityResolver, NameError, NameService};
use luca3auth::pricing::{CoinGeckoOracle, PriceOracle, RateCache};
use luca3auth::storage::{ContentStore, FilePayload, HttpContentStore, StorageError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names_client(server: &MockServer) -> HttpNameService {
    HttpNameService::new(&NamesConfig {
        base_url: server.uri(),
        api_key: "names-key".to_string(),
        timeout_secs: 5,
        ..NamesConfig::default()
    })
    .unwrap()
}

// ── Name service ─────────────────────────────────────────────────────

#[tokio::test]
async fn search_sends_domain_name_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search-names"))
        .and(query_param("domain", "luca.eth"))
        .and(query_param("name", "alice"))
        .and(header("authorization", "names-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "alice",
                "domain": "luca.eth",
                "address": "0x4242424242424242424242424242424242424242"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = names_client(&server).search("luca.eth", "alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "alice");
    assert_eq!(records[0].domain, "luca.eth");
}

#[tokio::test]
async fn names_for_reads_reverse_bindings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get-names"))
        .and(query_param("address", "0x7B7b7b7B7b7B7b7b7B7b7b7B7B7b7B7b7B7b7B7b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "tp012345",
                "domain": "luca.eth",
                "address": "0x7B7b7b7B7b7B7b7b7B7b7b7B7B7b7B7b7B7b7B7b"
            }
        ])))
        .mount(&server)
        .await;

    let names: Arc<dyn NameService> = Arc::new(names_client(&server));
    let resolver = IdentityResolver::new(names, ".eth", "luca.eth");
    let found = resolver
        .reverse("0x7B7b7b7B7b7B7b7b7B7b7b7B7B7b7B7b7B7b7B7b")
        .await
        .unwrap();
    assert_eq!(found, Some(("tp012345".to_string(), "luca.eth".to_string())));
}

#[tokio::test]
async fn claim_posts_binding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-name"))
        .and(header("authorization", "names-key"))
        .and(body_json(json!({
            "domain": "luca.eth",
            "name": "tp012345",
            "address": "0x7B7b7b7B7b7B7b7b7B7b7b7B7B7b7B7b7B7b7B7b"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    names_client(&server)
        .claim(
            "luca.eth",
            "tp012345",
            "0x7B7b7b7B7b7B7b7b7B7b7b7B7B7b7B7b7B7b7B7b",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn claim_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-name"))
        .respond_with(ResponseTemplate::new(409).set_body_string("name already taken"))
        .mount(&server)
        .await;

    let err = names_client(&server)
        .claim("luca.eth", "alice", "0x4242424242424242424242424242424242424242")
        .await
        .unwrap_err();
    match err {
        NameError::Status { status, body } => {
            assert_eq!(status, 409);
            assert_eq!(body, "name already taken");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn failed_lookup_falls_back_to_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search-names"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let names: Arc<dyn NameService> = Arc::new(names_client(&server));
    let resolver = IdentityResolver::new(names, ".eth", "luca.eth");
    assert_eq!(resolver.resolve_one("bob.luca.eth").await, "bob.luca.eth");
}

// ── Content storage ──────────────────────────────────────────────────

fn store(server: &MockServer) -> HttpContentStore {
    HttpContentStore::new(&StorageConfig {
        upload_url: format!("{}/pinning/pinFileToIPFS", server.uri()),
        api_key: "pin-jwt".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn upload_returns_cid_and_first_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .and(header("authorization", "Bearer pin-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "IpfsHash": "bafybeigdyrzt",
            "PinSize": 4,
            "Timestamp": "2026-10-14T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reference = store(&server)
        .upload(vec![FilePayload::new("me.png", b"\x89PNG".to_vec())])
        .await
        .unwrap();
    assert_eq!(reference.locator(), "bafybeigdyrzt/me.png");
    assert_eq!(reference.uri(), "ipfs://bafybeigdyrzt/me.png");
}

#[tokio::test]
async fn upload_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid JWT"))
        .mount(&server)
        .await;

    let err = store(&server)
        .upload(vec![FilePayload::new("me.png", vec![1])])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Status { status: 401, .. }));
}

#[tokio::test]
async fn upload_without_files_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store(&server).upload(Vec::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::NoFiles));
}

// ── Price oracle ─────────────────────────────────────────────────────

fn oracle(server: &MockServer) -> CoinGeckoOracle {
    CoinGeckoOracle::new(&PriceConfig {
        url: format!("{}/simple/price", server.uri()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn oracle_reads_eth_usd() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum"))
        .and(query_param("vs_currencies", "usd"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ethereum": { "usd": 2431.17 } })),
        )
        .mount(&server)
        .await;

    let rate = oracle(&server).eth_usd().await.unwrap();
    assert!((rate - 2431.17).abs() < f64::EPSILON);
}

#[tokio::test]
async fn rate_cache_serves_last_known_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ethereum": { "usd": 2000.0 } })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let cache = RateCache::new(Arc::new(oracle(&server)));
    let first = cache.current().await.unwrap();
    let second = cache.current().await.unwrap();
    assert_eq!(first.eth_usd, 2000.0);
    assert_eq!(second, first);
}

#[tokio::test]
async fn rate_cache_without_history_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let cache = RateCache::new(Arc::new(oracle(&server)));
    assert!(cache.current().await.is_none());
}
