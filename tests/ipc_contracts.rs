use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zeyo_lib::chain::algorand::{AlgorandClient, AlgorandEndpoints};
use zeyo_lib::chain::client::{HttpConfig, RetryConfig};
use zeyo_lib::commands::badge::{list_badges_internal, mint_badge_internal, verify_credential_internal};
use zeyo_lib::commands::db::get_score_history_internal;
use zeyo_lib::commands::intent::query_activity_internal;
use zeyo_lib::commands::reputation::{
    generate_reputation_internal, latest_report_internal, PipelineControl, SharedReputationCache,
};
use zeyo_lib::commands::settings::{load_effective_settings, load_settings_from_disk, save_settings_to_disk};
use zeyo_lib::commands::wallet::{connect_wallet_internal, disconnect_wallet_internal, SharedWallet};
use zeyo_lib::models::intent::{ApiService, Chain, Intent};
use zeyo_lib::models::log_entry::{LogEntry, LogLevel};
use zeyo_lib::models::reputation::{ReputationCache, ScoreTier};
use zeyo_lib::models::wallet::WalletManager;

const ADDR: &str = "7ZUECA7HFLZTXENRV24SHLU4AVPUTMTTDUFUBNBD64C73F3UHRTHAIOF6Q";
const ROUNDS_PER_DAY: u64 = 19_200;

fn stub_response(path: &str) -> (u16, String) {
    let account = format!("/idx/v2/accounts/{ADDR}");
    let governor = format!("/gov/periods/gp-1/governors/{ADDR}/");

    if path == account || path == format!("/algod/v2/accounts/{ADDR}") {
        let body = json!({
            "account": {
                "address": ADDR,
                "amount": 250_000_000u64,
                "assets": (0..10).map(|i| json!({"asset-id": i})).collect::<Vec<_>>(),
                "total-apps-opted-in": 2,
                "reward-base": 0,
                "created-at-round": 1_000
            },
            "current-round": 1_000 + ROUNDS_PER_DAY * 65
        });
        return (200, body.to_string());
    }
    if path.starts_with(&format!("{account}/transactions?after-time=")) && path.ends_with("&limit=1000") {
        let transactions: Vec<_> = (0..12)
            .map(|i| {
                if i % 3 == 0 {
                    json!({"id": format!("T{i}"), "tx-type": "appl", "application-transaction": {"application-id": 9}})
                } else {
                    json!({"id": format!("T{i}"), "tx-type": "pay"})
                }
            })
            .collect();
        return (200, json!({ "transactions": transactions }).to_string());
    }
    if path == "/gov/periods/" {
        return (200, json!({"results": [{"slug": "gp-1"}, {"slug": "gp-2"}]}).to_string());
    }
    if path == governor {
        return (200, json!({"committed-algo": 10_000_000u64}).to_string());
    }
    if path == format!("{governor}activities/") {
        let body = json!({"results": [{"type": "vote"}, {"type": "commit"}, {"type": "voting"}]});
        return (200, body.to_string());
    }
    if path.starts_with("/down") {
        return (500, "{}".to_string());
    }
    (404, "{}".to_string())
}

/// Routes requests by path until the test runtime shuts down.
async fn stub_chain_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 2048];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = stub_response(&path);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

fn client_for(base: &str, governance_path: &str) -> AlgorandClient {
    AlgorandClient::new(
        AlgorandEndpoints {
            algod_url: format!("{base}/algod"),
            indexer_url: format!("{base}/idx"),
            governance_url: format!("{base}{governance_path}"),
            core_api_url: String::new(),
        },
        &HttpConfig {
            request_timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
            retry: RetryConfig {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
        },
    )
    .expect("client")
}

fn empty_cache() -> SharedReputationCache {
    Arc::new(Mutex::new(ReputationCache::default()))
}

#[tokio::test]
async fn reputation_pipeline_scores_persists_and_mints() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = stub_chain_server().await;
    let client = client_for(&base, "/gov");
    let cache = empty_cache();
    let control = PipelineControl::default();
    let mut logs: Vec<LogEntry> = Vec::new();

    let report = generate_reputation_internal(&client, tmp.path(), ADDR, 90, &control, &cache, |entry| {
        logs.push(entry)
    })
    .await
    .expect("pipeline");

    assert!((report.metrics.algo_balance - 250.0).abs() < 1e-9);
    assert_eq!(report.metrics.transaction_count, 12);
    assert_eq!(report.metrics.dapp_interactions, 4);
    assert_eq!(report.metrics.governance_periods, 1);
    assert_eq!(report.metrics.governance_votes, 2);
    assert!((report.metrics.committed_algo - 10.0).abs() < 1e-9);
    assert_eq!(report.metrics.external_claims, 4);
    assert!(report.metrics.staking_participation);

    assert_eq!(report.score.wallet_balance, 8);
    assert_eq!(report.score.staking_governance, 10);
    assert_eq!(report.score.transaction_activity, 8);
    assert_eq!(report.score.dapp_participation, 6);
    assert_eq!(report.score.external_attestations, 8);
    assert_eq!(report.score.total_score, 40);
    assert_eq!(report.tier, ScoreTier::Fair);
    assert!(!control.is_running());

    assert_eq!(logs.first().map(|e| e.level), Some(LogLevel::Info));
    assert_eq!(
        logs.last().map(|e| e.message.as_str()),
        Some("Reputation score: 40/100 (Fair)")
    );
    assert!(logs.iter().all(|e| e.level != LogLevel::Error));

    let cached = latest_report_internal(&cache, Some(ADDR)).expect("cached report");
    assert_eq!(cached.id, report.id);
    assert_eq!(cached.breakdown.categories.len(), 5);

    let history = get_score_history_internal(tmp.path(), Some(ADDR.to_string()), None).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].report_id, report.id);
    assert_eq!(history[0].total_score, 40);

    let badge = mint_badge_internal(tmp.path(), &cache, ADDR, |_| {}).expect("mint");
    assert_eq!(badge.badge_name, "Fair Reputation Badge");
    let verification = verify_credential_internal(tmp.path(), &badge.tx_id).expect("verify");
    assert!(verification.found);
    assert_eq!(verification.badge_name.as_deref(), Some("Fair Reputation Badge"));
    assert_eq!(list_badges_internal(tmp.path(), None).expect("list").len(), 1);
}

#[tokio::test]
async fn governance_outage_degrades_to_zero_participation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = stub_chain_server().await;
    let client = client_for(&base, "/down");

    let report = generate_reputation_internal(&client, tmp.path(), ADDR, 30, &PipelineControl::default(), &empty_cache(), |_| {})
        .await
        .expect("pipeline still completes");

    assert_eq!(report.metrics.governance_periods, 0);
    assert_eq!(report.score.staking_governance, 0);
    assert!(!report.metrics.staking_participation);
    assert_eq!(report.score.total_score, 30);
}

#[tokio::test]
async fn cancellation_stops_pipeline_without_persisting() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = stub_chain_server().await;
    let client = client_for(&base, "/gov");
    let cache = empty_cache();
    let control = PipelineControl::default();
    let mut levels = Vec::new();

    let err = generate_reputation_internal(&client, tmp.path(), ADDR, 90, &control, &cache, |entry| {
        levels.push(entry.level);
        control.cancel();
    })
    .await
    .unwrap_err();

    assert!(err.starts_with("CANCELLED"), "{err}");
    assert_eq!(levels.last(), Some(&LogLevel::Error));
    assert!(!control.is_running());
    assert!(latest_report_internal(&cache, None).unwrap_err().starts_with("NO_REPORT"));
    assert!(get_score_history_internal(tmp.path(), None, None).expect("history").is_empty());
}

#[tokio::test]
async fn invalid_address_is_rejected_before_any_request() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let client = client_for("http://127.0.0.1:9", "/gov");

    let err = generate_reputation_internal(&client, tmp.path(), "not-an-address", 90, &PipelineControl::default(), &empty_cache(), |_| {})
        .await
        .unwrap_err();
    assert!(err.starts_with("INVALID_ADDRESS"), "{err}");
}

#[tokio::test]
async fn activity_query_fetches_resolved_endpoint() {
    let base = stub_chain_server().await;
    let client = client_for(&base, "/gov");

    let result = query_activity_internal(&client, Chain::Algorand, "what is my balance", Some(ADDR))
        .await
        .expect("query");
    assert_eq!(result.parsed.intent, Intent::Balance);
    assert_eq!(result.query.service, ApiService::Algod);
    assert!(result.query.used_fallback_address);
    assert_eq!(result.url, format!("{base}/algod/v2/accounts/{ADDR}"));
    assert_eq!(result.response["account"]["amount"], json!(250_000_000u64));

    let unknown = query_activity_internal(&client, Chain::Algorand, "lorem ipsum", Some(ADDR))
        .await
        .unwrap_err();
    assert!(unknown.starts_with("UNKNOWN_INTENT"));

    let no_address = query_activity_internal(&client, Chain::Algorand, "show my assets", None)
        .await
        .unwrap_err();
    assert!(no_address.starts_with("NO_ADDRESS"));
}

#[tokio::test]
async fn wallet_on_another_chain_is_not_used_as_query_address() {
    // Nothing listens here; a request would surface as CHAIN_ERROR.
    let client = client_for("http://127.0.0.1:9", "/gov");

    let err = query_activity_internal(&client, Chain::Core, "what is my balance", Some(ADDR))
        .await
        .unwrap_err();
    assert!(err.starts_with("NO_ADDRESS"), "{err}");

    let err = query_activity_internal(
        &client,
        Chain::Algorand,
        "what is my balance",
        Some("0x52908400098527886E0F7030069857D2E4169EE7"),
    )
    .await
    .unwrap_err();
    assert!(err.starts_with("NO_ADDRESS"), "{err}");
}

#[tokio::test]
async fn core_queries_need_a_configured_explorer() {
    let client = client_for("http://127.0.0.1:9", "/gov");
    let err = query_activity_internal(
        &client,
        Chain::Core,
        "balance of 0x52908400098527886E0F7030069857D2E4169EE7",
        None,
    )
    .await
    .unwrap_err();
    assert!(err.starts_with("CHAIN_ERROR"), "{err}");
}

#[tokio::test]
async fn settings_round_trip_and_feed_effective_config() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let initial = load_settings_from_disk(tmp.path()).expect("load defaults");
    assert_eq!(initial["network"], json!("testnet"));
    assert_eq!(initial["historyDays"], json!(90));

    let saved = save_settings_to_disk(
        tmp.path(),
        json!({ "historyDays": 1000, "intentChain": "core", "retryMaxAttempts": 5 }),
    )
    .expect("save");
    assert_eq!(saved["historyDays"], json!(365));
    assert_eq!(saved["network"], json!("testnet"));

    let effective = load_effective_settings(tmp.path()).expect("effective");
    assert_eq!(effective.history_days, 365);
    assert_eq!(effective.intent_chain, Chain::Core);
    assert_eq!(effective.http.retry.max_attempts, 5);
    assert_eq!(effective.endpoints.algod_url, "https://testnet-api.algonode.cloud");
}

#[tokio::test]
async fn wallet_session_connects_and_disconnects() {
    let wallet: SharedWallet = Arc::new(Mutex::new(WalletManager::default()));

    let session = connect_wallet_internal(&wallet, "pera", ADDR, "testnet").expect("connect");
    assert_eq!(session.address.as_deref(), Some(ADDR));
    assert!(session.connected_at.is_some());

    let err = connect_wallet_internal(&wallet, "pera", "bogus", "testnet").unwrap_err();
    assert!(err.starts_with("INVALID_ADDRESS"));
    // A failed connect keeps the previous session.
    assert_eq!(wallet.lock().expect("lock").active_address().as_deref(), Some(ADDR));

    let cleared = disconnect_wallet_internal(&wallet).expect("disconnect");
    assert!(!cleared.is_connected());
}
