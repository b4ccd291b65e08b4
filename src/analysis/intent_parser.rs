use crate::models::intent::*;
use regex::Regex;

const ALGORAND_ADDRESS_PATTERN: &str = r"\b[A-Z2-7]{58}\b";
const EVM_ADDRESS_PATTERN: &str = r"\b0x[0-9a-fA-F]{40}\b";
/// A number that does not continue a word, sign, decimal or digit group.
/// Thousands separators are accepted only in well-formed `1,234,567` groups.
const AMOUNT_PATTERN: &str = r"(?i)(?:^|[^\w.,-])((?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.[0-9]+)?|\.[0-9]+)\s*(algo|core|usdc|usdt|eth|btc)\b";

const BALANCE_KEYWORDS: &str = r"(?i)\b(balance|balances|have|has|own|owns|worth|funds|how much)\b";
const PARTICIPATION_KEYWORDS: &str = r"(?i)\b(governance|governor|govern|vote|voted|votes|voting|stake|staked|staking|dao|participat\w*)\b";
const ASSET_KEYWORDS: &str = r"(?i)\b(asset|assets|token|tokens|nft|nfts|holdings|portfolio)\b";
const TRANSACTION_KEYWORDS: &str = r"(?i)\b(transaction|transactions|txn|txns|transfer|transfers|sent|received|history|activity)\b";

/// Rule-based classifier for free-text activity questions.
///
/// Keyword sets are checked in a fixed order (balance, participation,
/// assets, transactions) and the first hit wins, so "what did I vote with
/// my balance" is a balance query.
#[derive(Debug, Clone)]
pub struct IntentParser {
    chain: Chain,
    address: Regex,
    amount: Regex,
    classifiers: Vec<(Intent, Regex)>,
}

impl IntentParser {
    pub fn new(chain: Chain) -> Result<Self, String> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| format!("Invalid intent pattern {pattern}: {e}"))
        };

        Ok(Self {
            chain,
            address: compile(address_pattern(chain))?,
            amount: compile(AMOUNT_PATTERN)?,
            classifiers: vec![
                (Intent::Balance, compile(BALANCE_KEYWORDS)?),
                (Intent::Participation, compile(PARTICIPATION_KEYWORDS)?),
                (Intent::Assets, compile(ASSET_KEYWORDS)?),
                (Intent::Transactions, compile(TRANSACTION_KEYWORDS)?),
            ],
        })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn parse(&self, text: &str) -> ParsedIntent {
        let address = self.address.find(text).map(|m| m.as_str().to_string());

        let (amount, token) = self
            .amount
            .captures(text)
            .and_then(|caps| {
                let amount = parse_amount(caps.get(1)?.as_str())?;
                Some((Some(amount), Some(caps.get(2)?.as_str().to_lowercase())))
            })
            .unwrap_or((None, None));

        let intent = self
            .classifiers
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Unknown);

        ParsedIntent {
            intent,
            address,
            amount,
            token,
            raw_text: text.to_string(),
            api_endpoint: endpoint_for(self.chain, intent),
        }
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let digits = raw.replace(',', "");
    let digits = if digits.starts_with('.') {
        format!("0{digits}")
    } else {
        digits
    };
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn address_pattern(chain: Chain) -> &'static str {
    match chain {
        Chain::Algorand => ALGORAND_ADDRESS_PATTERN,
        Chain::Core => EVM_ADDRESS_PATTERN,
    }
}

/// Read-only endpoint each intent maps to on a given chain.
pub fn endpoint_for(chain: Chain, intent: Intent) -> Option<ApiEndpoint> {
    let (service, path) = match (chain, intent) {
        (_, Intent::Unknown) => return None,
        (Chain::Algorand, Intent::Balance) => (ApiService::Algod, "/v2/accounts/{address}"),
        (Chain::Algorand, Intent::Participation) => (
            ApiService::Indexer,
            "/v2/accounts/{address}/transactions?tx-type=keyreg",
        ),
        (Chain::Algorand, Intent::Assets) => {
            (ApiService::Indexer, "/v2/accounts/{address}/assets")
        }
        (Chain::Algorand, Intent::Transactions) => (
            ApiService::Indexer,
            "/v2/accounts/{address}/transactions?limit=50",
        ),
        (Chain::Core, Intent::Balance) => (
            ApiService::Core,
            "/api?module=account&action=balance&address={address}",
        ),
        (Chain::Core, Intent::Participation) => (
            ApiService::Core,
            "/api?module=account&action=txlistinternal&address={address}",
        ),
        (Chain::Core, Intent::Assets) => (
            ApiService::Core,
            "/api?module=account&action=tokentx&address={address}",
        ),
        (Chain::Core, Intent::Transactions) => (
            ApiService::Core,
            "/api?module=account&action=txlist&address={address}",
        ),
    };

    Some(ApiEndpoint {
        service,
        path_template: path.to_string(),
    })
}

/// Fill the endpoint's address, preferring the one found in the text.
///
/// The fallback (the connected wallet) is only used when it is an address
/// on `chain`; a wallet on another chain counts as no address at all.
pub fn resolve_query(
    parsed: &ParsedIntent,
    chain: Chain,
    fallback_address: Option<&str>,
) -> Result<ResolvedQuery, String> {
    let Some(endpoint) = parsed.api_endpoint.as_ref() else {
        return Err(format!(
            "UNKNOWN_INTENT: Could not understand \"{}\". Try asking about a balance, governance votes, assets or transactions.",
            parsed.raw_text.trim()
        ));
    };

    let (address, used_fallback_address) = match (parsed.address.as_deref(), fallback_address) {
        (Some(found), _) => (found.to_string(), false),
        (None, Some(fallback)) if is_valid_address(chain, fallback.trim()) => {
            (fallback.trim().to_string(), true)
        }
        (None, Some(fallback)) if !fallback.trim().is_empty() => {
            return Err(format!(
                "NO_ADDRESS: The connected wallet is not a {} address and the request names none",
                chain.as_str()
            ))
        }
        _ => {
            return Err(
                "NO_ADDRESS: No address in the request and no wallet connected".to_string(),
            )
        }
    };

    Ok(ResolvedQuery {
        intent: parsed.intent,
        service: endpoint.service,
        path: endpoint.with_address(&address),
        address,
        used_fallback_address,
    })
}

pub fn is_valid_address(chain: Chain, address: &str) -> bool {
    match chain {
        Chain::Algorand => {
            address.len() == 58
                && address
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
        }
        Chain::Core => {
            address.len() == 42
                && address.starts_with("0x")
                && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
        }
    }
}
