//! Contract tests for EvmRpcAnchor against a simulated JSON-RPC node.
//!
//! ## Calls Tested
//!
//! | Method | Test |
//! |--------|------|
//! | `eth_sendTransaction` | `anchor_*` |
//! | `eth_accounts` | `anchor_uses_first_node_account_*`, `anchor_without_accounts_*` |

use rcpt_core::ContentDigest;
use rcpt_ledger::{AnchorError, AnchorOutcome, EvmRpcAnchor, LedgerAnchor, LedgerConfig};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
const SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn digest() -> ContentDigest {
    ContentDigest::from_hex("9d1215b4ce08e5b8c77bccd7c2f673af82d153b1eabea22a1e3c524272b78db1")
        .unwrap()
}

fn tx_hash() -> String {
    format!("0x{}", "c0".repeat(32))
}

fn anchor_for(server: &MockServer, from: Option<&str>) -> EvmRpcAnchor {
    let mut cfg = LedgerConfig::new(server.uri().parse().unwrap(), CONTRACT);
    cfg.from_address = from.map(str::to_string);
    cfg.timeout_secs = 5;
    EvmRpcAnchor::new(cfg).unwrap()
}

// ── eth_sendTransaction ──────────────────────────────────────────────

#[tokio::test]
async fn anchor_sends_digest_as_calldata_and_returns_tx_hash() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_sendTransaction",
            "params": [{
                "from": SENDER,
                "to": CONTRACT,
                "data": "0x9d1215b4ce08e5b8c77bccd7c2f673af82d153b1eabea22a1e3c524272b78db1"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": tx_hash()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = anchor_for(&server, Some(SENDER)).anchor(&digest()).await.unwrap();
    assert_eq!(outcome, AnchorOutcome::Anchored { tx_ref: tx_hash() });
}

#[tokio::test]
async fn anchor_uses_first_node_account_when_sender_unset() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"method": "eth_accounts"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": [SENDER, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "method": "eth_sendTransaction",
            "params": [{"from": SENDER}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 2, "result": tx_hash()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = anchor_for(&server, None).anchor(&digest()).await.unwrap();
    assert_eq!(outcome, AnchorOutcome::Anchored { tx_ref: tx_hash() });
}

#[tokio::test]
async fn anchor_without_accounts_is_config_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": []
        })))
        .mount(&server)
        .await;

    let err = anchor_for(&server, None).anchor(&digest()).await.unwrap_err();
    assert!(matches!(err, AnchorError::Config(_)), "got {err:?}");
}

#[tokio::test]
async fn anchor_rpc_error_object_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "insufficient funds for gas"}
        })))
        .mount(&server)
        .await;

    let err = anchor_for(&server, Some(SENDER)).anchor(&digest()).await.unwrap_err();
    match err {
        AnchorError::Rpc { method, code, message } => {
            assert_eq!(method, "eth_sendTransaction");
            assert_eq!(code, -32000);
            assert!(message.contains("insufficient funds"));
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn anchor_http_status_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("node syncing"))
        .mount(&server)
        .await;

    let err = anchor_for(&server, Some(SENDER)).anchor(&digest()).await.unwrap_err();
    assert!(
        matches!(err, AnchorError::Status { status: 503, ref body, .. } if body == "node syncing"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn anchor_rejects_non_hash_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x..."
        })))
        .mount(&server)
        .await;

    let err = anchor_for(&server, Some(SENDER)).anchor(&digest()).await.unwrap_err();
    assert!(matches!(err, AnchorError::InvalidResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn anchor_unreachable_node_is_http_error() {
    let mut cfg = LedgerConfig::new("http://127.0.0.1:1".parse().unwrap(), CONTRACT);
    cfg.from_address = Some(SENDER.to_string());
    cfg.timeout_secs = 1;
    let anchor = EvmRpcAnchor::new(cfg).unwrap();

    let err = anchor.anchor(&digest()).await.unwrap_err();
    assert!(matches!(err, AnchorError::Http { .. }), "got {err:?}");
}

#[tokio::test]
async fn zero_contract_never_calls_node() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = LedgerConfig::new(server.uri().parse().unwrap(), "0x0");
    let anchor = EvmRpcAnchor::new(cfg).unwrap();
    let outcome = anchor.anchor(&digest()).await.unwrap();
    assert!(matches!(outcome, AnchorOutcome::Declined { .. }));
}
