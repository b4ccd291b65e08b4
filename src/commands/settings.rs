use crate::chain::algorand::AlgorandEndpoints;
use crate::chain::client::{HttpConfig, RetryConfig};
use crate::commands::AppContext;
use crate::models::intent::Chain;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 1;
const NETWORKS: &[&str] = &["testnet", "mainnet", "localnet"];

/// Settings resolved into the typed values the chain clients need.
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub network: String,
    pub endpoints: AlgorandEndpoints,
    pub http: HttpConfig,
    pub intent_chain: Chain,
    pub history_days: u32,
}

#[tauri::command]
pub async fn get_settings(ctx: tauri::State<'_, AppContext>) -> Result<Value, String> {
    load_settings_from_disk(&ctx.data_dir)
}

#[tauri::command]
pub async fn save_settings(ctx: tauri::State<'_, AppContext>, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&ctx.data_dir, settings)
}

pub fn load_effective_settings(data_dir: &Path) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(data_dir)?;
    Ok(effective_from_value(&settings))
}

fn effective_from_value(settings: &Value) -> EffectiveSettings {
    let network = settings
        .get("network")
        .and_then(Value::as_str)
        .unwrap_or("testnet")
        .to_string();
    let preset = network_preset(&network);

    // Blank URLs fall back to the network preset.
    let url = |key: &str| {
        settings
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| preset[key].as_str().unwrap_or_default().to_string())
    };
    let number = |key: &str, default: u64| settings.get(key).and_then(Value::as_u64).unwrap_or(default);

    let retry = RetryConfig {
        max_attempts: number("retryMaxAttempts", 3) as u32,
        base_delay_ms: number("retryBaseDelayMs", 250),
        max_delay_ms: number("retryMaxDelayMs", 2_000),
    };

    EffectiveSettings {
        endpoints: AlgorandEndpoints {
            algod_url: url("algodUrl"),
            indexer_url: url("indexerUrl"),
            governance_url: url("governanceUrl"),
            core_api_url: url("coreApiUrl"),
        },
        http: HttpConfig {
            request_timeout_ms: number("requestTimeoutMs", 10_000),
            connect_timeout_ms: number("connectTimeoutMs", 3_000),
            retry,
        },
        intent_chain: settings
            .get("intentChain")
            .and_then(Value::as_str)
            .and_then(Chain::parse)
            .unwrap_or(Chain::Algorand),
        history_days: number("historyDays", 90).clamp(7, 365) as u32,
        network,
    }
}

/// Public endpoints for each supported network.
pub fn network_preset(network: &str) -> Value {
    match network {
        "mainnet" => json!({
            "algodUrl": "https://mainnet-api.algonode.cloud",
            "indexerUrl": "https://mainnet-idx.algonode.cloud",
            "governanceUrl": "https://governance.algorand.foundation/api",
            "coreApiUrl": "https://openapi.coredao.org"
        }),
        "localnet" => json!({
            "algodUrl": "http://localhost:4001",
            "indexerUrl": "http://localhost:8980",
            "governanceUrl": "https://governance.algorand.foundation/api",
            "coreApiUrl": ""
        }),
        _ => json!({
            "algodUrl": "https://testnet-api.algonode.cloud",
            "indexerUrl": "https://testnet-idx.algonode.cloud",
            "governanceUrl": "https://governance.algorand.foundation/api",
            "coreApiUrl": "https://scan.test2.btcs.network"
        }),
    }
}

pub fn load_settings_from_disk(data_dir: &Path) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON, using defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &Path, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());

    // Switching network without explicit URLs resets them to the new preset.
    let network_changed = settings
        .get("network")
        .is_some_and(|n| Some(n) != merged.get("network"));
    if network_changed {
        if let (Some(obj), Some(network)) = (
            merged.as_object_mut(),
            settings.get("network").and_then(Value::as_str),
        ) {
            if let Some(preset) = network_preset(network).as_object() {
                for (key, value) in preset {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
    }

    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!(
        "Saved settings (network {})",
        migrated["network"].as_str().unwrap_or("testnet")
    );
    Ok(migrated)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

fn ensure_data_dir(data_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create data directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let network = out
        .get("network")
        .and_then(Value::as_str)
        .filter(|n| NETWORKS.contains(n))
        .unwrap_or("testnet")
        .to_string();
    deep_merge_defaults(&mut out, &network_preset(&network));
    deep_merge_defaults(&mut out, &default_settings());

    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    let mut defaults = json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "network": "testnet",
        "intentChain": "algorand",
        "historyDays": 90,
        "requestTimeoutMs": 10000,
        "connectTimeoutMs": 3000,
        "retryMaxAttempts": 3,
        "retryBaseDelayMs": 250,
        "retryMaxDelayMs": 2000
    });
    deep_merge_defaults(&mut defaults, &network_preset("testnet"));
    defaults
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "historyDays", 7, 365, 90);
    clamp_u64(obj, "requestTimeoutMs", 1_000, 120_000, 10_000);
    clamp_u64(obj, "connectTimeoutMs", 500, 60_000, 3_000);
    clamp_u64(obj, "retryMaxAttempts", 1, 10, 3);
    clamp_u64(obj, "retryBaseDelayMs", 0, 10_000, 250);
    clamp_u64(obj, "retryMaxDelayMs", 0, 60_000, 2_000);

    sanitize_enum(obj, "network", NETWORKS, "testnet");
    sanitize_enum(obj, "intentChain", &["algorand", "core"], "algorand");

    for key in ["algodUrl", "indexerUrl", "governanceUrl", "coreApiUrl"] {
        ensure_string(obj, key);
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}

fn ensure_string(map: &mut Map<String, Value>, key: &str) {
    let value = map
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();
    map.insert(key.to_string(), json!(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults_clamps_and_stamps_version() {
        let migrated = migrate_settings(json!({ "historyDays": 3, "requestTimeoutMs": 50 }));
        assert_eq!(migrated["network"], json!("testnet"));
        assert_eq!(migrated["historyDays"], json!(7));
        assert_eq!(migrated["requestTimeoutMs"], json!(1000));
        assert_eq!(migrated["indexerUrl"], json!("https://testnet-idx.algonode.cloud"));
        assert_eq!(
            migrated["schema_version"].as_i64(),
            Some(SETTINGS_SCHEMA_VERSION)
        );
    }

    #[test]
    fn non_object_settings_are_replaced_by_defaults() {
        assert_eq!(migrate_settings(json!([1, 2, 3])), migrate_settings(json!({})));
    }

    #[test]
    fn unknown_enums_fall_back_to_defaults() {
        let migrated = migrate_settings(json!({
            "schema_version": SETTINGS_SCHEMA_VERSION,
            "network": "devnet",
            "intentChain": "solana"
        }));
        assert_eq!(migrated["network"], json!("testnet"));
        assert_eq!(migrated["intentChain"], json!("algorand"));
    }

    #[test]
    fn merges_partial_settings_without_losing_existing_values() {
        let mut existing = default_settings();
        merge_settings(&mut existing, &json!({ "historyDays": 30 }));
        let migrated = migrate_settings(existing);

        assert_eq!(migrated["historyDays"], json!(30));
        assert_eq!(migrated["retryMaxAttempts"], json!(3));
        assert_eq!(migrated["algodUrl"], json!("https://testnet-api.algonode.cloud"));
    }

    #[test]
    fn effective_settings_use_preset_for_blank_urls() {
        let mut settings = migrate_settings(json!({ "network": "mainnet" }));
        settings["indexerUrl"] = json!("");
        settings["intentChain"] = json!("core");

        let effective = effective_from_value(&settings);
        assert_eq!(effective.network, "mainnet");
        assert_eq!(effective.endpoints.indexer_url, "https://mainnet-idx.algonode.cloud");
        assert_eq!(effective.endpoints.algod_url, "https://mainnet-api.algonode.cloud");
        assert_eq!(effective.intent_chain, Chain::Core);
        assert_eq!(effective.history_days, 90);
        assert_eq!(effective.http.retry.max_attempts, 3);
    }

    #[test]
    fn save_switches_presets_with_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let saved = save_settings_to_disk(dir.path(), json!({ "network": "localnet" })).expect("save");
        assert_eq!(saved["algodUrl"], json!("http://localhost:4001"));

        let custom = save_settings_to_disk(
            dir.path(),
            json!({ "network": "mainnet", "algodUrl": "https://my-node.example/" }),
        )
        .expect("save");
        assert_eq!(custom["algodUrl"], json!("https://my-node.example"));
        assert_eq!(custom["indexerUrl"], json!("https://mainnet-idx.algonode.cloud"));

        let reloaded = load_settings_from_disk(dir.path()).expect("load");
        assert_eq!(reloaded, custom);
    }
}
