use crate::analysis::intent_parser::{resolve_query, IntentParser};
use crate::chain::algorand::AlgorandClient;
use crate::commands::settings::load_effective_settings;
use crate::commands::wallet::{active_address, SharedWallet};
use crate::commands::AppContext;
use crate::models::intent::{ActivityQueryResult, Chain, ParsedIntent};
use std::sync::OnceLock;

static ALGORAND_PARSER: OnceLock<IntentParser> = OnceLock::new();
static CORE_PARSER: OnceLock<IntentParser> = OnceLock::new();

#[tauri::command]
pub async fn parse_activity_intent(
    text: String,
    chain: Option<String>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<ParsedIntent, String> {
    let chain = match chain {
        Some(raw) => parse_chain(&raw)?,
        None => load_effective_settings(&ctx.data_dir)?.intent_chain,
    };
    parse_activity_intent_internal(&text, chain)
}

#[tauri::command]
pub async fn query_activity(
    text: String,
    ctx: tauri::State<'_, AppContext>,
    wallet: tauri::State<'_, SharedWallet>,
) -> Result<ActivityQueryResult, String> {
    let settings = load_effective_settings(&ctx.data_dir)?;
    let client = AlgorandClient::new(settings.endpoints, &settings.http)
        .map_err(|e| format!("CHAIN_ERROR: {e}"))?;
    let fallback = active_address(wallet.inner())?;

    query_activity_internal(&client, settings.intent_chain, &text, fallback.as_deref()).await
}

pub fn parse_activity_intent_internal(text: &str, chain: Chain) -> Result<ParsedIntent, String> {
    Ok(parser_for(chain)?.parse(text))
}

/// Compiled once per chain and shared by every command call.
fn parser_for(chain: Chain) -> Result<&'static IntentParser, String> {
    let cell = match chain {
        Chain::Algorand => &ALGORAND_PARSER,
        Chain::Core => &CORE_PARSER,
    };
    if let Some(parser) = cell.get() {
        return Ok(parser);
    }
    let parser = IntentParser::new(chain)?;
    Ok(cell.get_or_init(|| parser))
}

/// Parse `text`, resolve its endpoint and fetch it. Unknown intents and
/// missing addresses fail before any request is made.
pub async fn query_activity_internal(
    client: &AlgorandClient,
    chain: Chain,
    text: &str,
    fallback_address: Option<&str>,
) -> Result<ActivityQueryResult, String> {
    let parsed = parse_activity_intent_internal(text, chain)?;
    let query = resolve_query(&parsed, chain, fallback_address)?;

    log::info!("Activity query {:?} via {:?}", query.intent, query.service);
    let (url, response) = client
        .fetch_query(&query)
        .await
        .map_err(|e| format!("CHAIN_ERROR: {e}"))?;

    Ok(ActivityQueryResult {
        parsed,
        query,
        url,
        response,
    })
}

fn parse_chain(raw: &str) -> Result<Chain, String> {
    Chain::parse(&raw.trim().to_lowercase()).ok_or_else(|| format!("UNSUPPORTED_CHAIN: {raw}"))
}
