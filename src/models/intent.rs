use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Balance,
    Participation,
    Assets,
    Transactions,
    Unknown,
}

/// Which chain the free-text queries are parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Algorand,
    Core,
}

impl Chain {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "algorand" => Some(Chain::Algorand),
            "core" => Some(Chain::Core),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Algorand => "algorand",
            Chain::Core => "core",
        }
    }
}

/// Upstream API an endpoint template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiService {
    Algod,
    Indexer,
    Governance,
    Core,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub service: ApiService,
    /// Path relative to the service base URL, with an `{address}` placeholder.
    pub path_template: String,
}

impl ApiEndpoint {
    pub fn with_address(&self, address: &str) -> String {
        self.path_template.replace("{address}", address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub address: Option<String>,
    pub amount: Option<f64>,
    pub token: Option<String>,
    pub raw_text: String,
    pub api_endpoint: Option<ApiEndpoint>,
}

/// A parsed intent whose endpoint has a concrete address filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    pub intent: Intent,
    pub service: ApiService,
    pub address: String,
    pub path: String,
    pub used_fallback_address: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityQueryResult {
    pub parsed: ParsedIntent,
    pub query: ResolvedQuery,
    pub url: String,
    pub response: serde_json::Value,
}
