use crate::chain::client::{join_url, ChainError, HttpConfig, JsonClient};
use crate::models::intent::{ApiService, ResolvedQuery};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorandEndpoints {
    pub algod_url: String,
    pub indexer_url: String,
    pub governance_url: String,
    /// Etherscan-style explorer API used for Core chain queries. May be empty.
    #[serde(default)]
    pub core_api_url: String,
}

impl AlgorandEndpoints {
    pub fn base_url(&self, service: ApiService) -> &str {
        match service {
            ApiService::Algod => &self.algod_url,
            ApiService::Indexer => &self.indexer_url,
            ApiService::Governance => &self.governance_url,
            ApiService::Core => &self.core_api_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub assets: Vec<serde_json::Value>,
    #[serde(default, rename = "total-apps-opted-in")]
    pub total_apps_opted_in: u32,
    #[serde(default, rename = "reward-base", alias = "rewards-base")]
    pub reward_base: u64,
    #[serde(default, rename = "created-at-round")]
    pub created_at_round: Option<u64>,
}

/// Indexer `GET /v2/accounts/{address}` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountLookup {
    pub account: AccountInfo,
    #[serde(default, rename = "current-round")]
    pub current_round: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "tx-type")]
    pub tx_type: String,
    #[serde(default, rename = "application-transaction")]
    pub application_transaction: Option<serde_json::Value>,
    #[serde(default, rename = "round-time")]
    pub round_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TransactionPage {
    #[serde(default)]
    transactions: Vec<TransactionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernancePeriod {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernorRecord {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "committed-algo")]
    pub committed_algo: u64,
    #[serde(default, rename = "is-eligible")]
    pub is_eligible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorActivity {
    #[serde(default, rename = "type")]
    pub activity_type: String,
    #[serde(default, rename = "transaction-id")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A governance period in which the address was a registered governor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorParticipation {
    pub period_slug: String,
    pub committed_algo: u64,
    pub activities: Vec<GovernorActivity>,
}

/// Read-only client for the algod, indexer and governance APIs.
#[derive(Debug, Clone)]
pub struct AlgorandClient {
    endpoints: AlgorandEndpoints,
    http: JsonClient,
}

impl AlgorandClient {
    pub fn new(endpoints: AlgorandEndpoints, http: &HttpConfig) -> Result<Self, ChainError> {
        for (name, url) in [
            ("algod_url", &endpoints.algod_url),
            ("indexer_url", &endpoints.indexer_url),
            ("governance_url", &endpoints.governance_url),
        ] {
            if url.trim().is_empty() {
                return Err(ChainError::Config(format!("{name} is empty")));
            }
        }

        Ok(Self {
            endpoints,
            http: JsonClient::new(http)?,
        })
    }

    pub fn endpoints(&self) -> &AlgorandEndpoints {
        &self.endpoints
    }

    pub fn http(&self) -> &JsonClient {
        &self.http
    }

    pub async fn account(&self, address: &str) -> Result<AccountLookup, ChainError> {
        let url = join_url(&self.endpoints.indexer_url, &format!("/v2/accounts/{address}"));
        self.http.get_json("account", &url).await
    }

    /// Transactions after `after` (RFC 3339), up to the indexer page limit.
    pub async fn transactions_since(
        &self,
        address: &str,
        after: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<TransactionSummary>, ChainError> {
        let after_time = after.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let url = join_url(
            &self.endpoints.indexer_url,
            &format!("/v2/accounts/{address}/transactions?after-time={after_time}&limit=1000"),
        );
        let page: TransactionPage = self.http.get_json("transactions", &url).await?;
        Ok(page.transactions)
    }

    pub async fn governance_periods(&self) -> Result<Vec<GovernancePeriod>, ChainError> {
        let url = join_url(&self.endpoints.governance_url, "/periods/");
        let page: Paged<GovernancePeriod> = self.http.get_json("governance_periods", &url).await?;
        Ok(page.results)
    }

    pub async fn governor(&self, period_slug: &str, address: &str) -> Result<Option<GovernorRecord>, ChainError> {
        let url = join_url(
            &self.endpoints.governance_url,
            &format!("/periods/{period_slug}/governors/{address}/"),
        );
        self.http.get_json_optional("governor", &url).await
    }

    pub async fn governor_activities(
        &self,
        period_slug: &str,
        address: &str,
    ) -> Result<Vec<GovernorActivity>, ChainError> {
        let url = join_url(
            &self.endpoints.governance_url,
            &format!("/periods/{period_slug}/governors/{address}/activities/"),
        );
        let page: Option<Paged<GovernorActivity>> =
            self.http.get_json_optional("governor_activities", &url).await?;
        Ok(page.map(|p| p.results).unwrap_or_default())
    }

    /// Run a resolved free-text query against its service. Returns the
    /// requested URL alongside the raw JSON body.
    pub async fn fetch_query(&self, query: &ResolvedQuery) -> Result<(String, serde_json::Value), ChainError> {
        let base = self.endpoints.base_url(query.service);
        if base.trim().is_empty() {
            return Err(ChainError::Config(format!(
                "no base URL configured for {:?}",
                query.service
            )));
        }
        let url = join_url(base, &query.path);
        let body = self.http.get_json("activity_query", &url).await?;
        Ok((url, body))
    }

    /// Every period in which `address` was a governor, with its activities.
    ///
    /// A failing period is skipped with a warning rather than failing the
    /// whole lookup.
    pub async fn governor_participation(&self, address: &str) -> Result<Vec<GovernorParticipation>, ChainError> {
        let periods = self.governance_periods().await?;
        let mut participations = Vec::new();

        for period in periods {
            let record = match self.governor(&period.slug, address).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Governor lookup failed for period {}: {e}", period.slug);
                    continue;
                }
            };

            let activities = match self.governor_activities(&period.slug, address).await {
                Ok(activities) => activities,
                Err(e) => {
                    log::warn!("Activity lookup failed for period {}: {e}", period.slug);
                    Vec::new()
                }
            };

            participations.push(GovernorParticipation {
                period_slug: period.slug,
                committed_algo: record.committed_algo,
                activities,
            });
        }

        Ok(participations)
    }
}
