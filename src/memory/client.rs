//! Memory service adapter over the external HTTP API

use super::models::{scoped_user_id, MemoryCategory, MemoryFact, MemoryMetadata};
use super::service_config::MemoryServiceConfig;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Options for a memory search
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub categories: Option<Vec<MemoryCategory>>,
    pub min_relevance: Option<f32>,
}

/// Capability contract for a long-term memory store.
///
/// Implementations never surface transport failures: errors are converted
/// to empty/false results at this boundary, so the chat flow cannot be
/// broken by memory problems.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Whether the store can currently serve requests
    fn available(&self) -> bool;

    /// Ranked facts relevant to `query` for this user
    async fn search(&self, query: &str, user_id: &str, options: &SearchOptions)
        -> Vec<MemoryFact>;

    /// Persist a fact; returns the service-assigned id when accepted
    async fn add(&self, fact: &MemoryFact) -> Option<String>;

    /// All facts for a user, up to `limit`
    async fn get_all(&self, user_id: &str, limit: usize) -> Vec<MemoryFact>;

    /// Delete a fact by id
    async fn delete(&self, memory_id: &str) -> bool;
}

/// Store that is never available; used when memory is unconfigured
pub struct NullMemoryStore;

#[async_trait]
impl MemoryStore for NullMemoryStore {
    fn available(&self) -> bool {
        false
    }

    async fn search(
        &self,
        _query: &str,
        _user_id: &str,
        _options: &SearchOptions,
    ) -> Vec<MemoryFact> {
        Vec::new()
    }

    async fn add(&self, _fact: &MemoryFact) -> Option<String> {
        None
    }

    async fn get_all(&self, _user_id: &str, _limit: usize) -> Vec<MemoryFact> {
        Vec::new()
    }

    async fn delete(&self, _memory_id: &str) -> bool {
        false
    }
}

/// HTTP client for the external memory service.
///
/// Availability is a pure function of the configuration plus the last
/// known reachability of the upstream: one failed call marks the service
/// unreachable until a later call succeeds.
pub struct HttpMemoryClient {
    http: Client,
    config: MemoryServiceConfig,
    reachable: AtomicBool,
}

impl HttpMemoryClient {
    /// Create a new memory service client
    pub fn new(config: MemoryServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ContextError::Configuration(e.to_string()))?;

        if !config.configured() {
            warn!("Memory service not configured; memory features will be disabled");
        }

        Ok(Self {
            http,
            config,
            reachable: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &MemoryServiceConfig {
        &self.config
    }

    fn mark_reachable(&self, ok: bool) {
        self.reachable.store(ok, Ordering::Relaxed);
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.auth_token() {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    async fn post_search(
        &self,
        request: &SearchRequest<'_>,
    ) -> std::result::Result<Vec<WireFact>, String> {
        let url = format!("{}/v1/memories/search/", self.config.base_url);
        let response = self
            .authorized(self.http.post(&url).json(request))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, body));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MemoryStore for HttpMemoryClient {
    fn available(&self) -> bool {
        self.config.configured() && self.reachable.load(Ordering::Relaxed)
    }

    async fn search(
        &self,
        query: &str,
        user_id: &str,
        options: &SearchOptions,
    ) -> Vec<MemoryFact> {
        if !self.config.configured() {
            return Vec::new();
        }

        let start = Instant::now();
        let scoped = scoped_user_id(user_id);
        let request = SearchRequest {
            query,
            user_id: scoped.clone(),
            limit: options.limit.unwrap_or(self.config.max_context_memories),
            filters: SearchFilters {
                user_id: scoped,
                categories: options
                    .categories
                    .clone()
                    .filter(|c| !c.is_empty())
                    .map(|c| CategoryFilter { included: c }),
            },
        };

        let mut attempt = 0;
        let results = loop {
            attempt += 1;
            match self.post_search(&request).await {
                Ok(results) => {
                    self.mark_reachable(true);
                    METRICS
                        .memory_requests
                        .with_label_values(&["search", "success"])
                        .inc();
                    break results;
                }
                Err(err) => {
                    METRICS
                        .memory_requests
                        .with_label_values(&["search", "error"])
                        .inc();

                    if attempt > self.config.retry_attempts {
                        warn!(error = %err, attempts = attempt, "Memory search failed");
                        self.mark_reachable(false);
                        return Vec::new();
                    }

                    debug!(error = %err, attempt, "Memory search attempt failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff() * attempt as u32).await;
                }
            }
        };

        METRICS
            .memory_request_duration
            .with_label_values(&["search"])
            .observe(start.elapsed().as_secs_f64());

        let min_relevance = options.min_relevance;
        results
            .into_iter()
            .filter_map(|r| r.into_fact(user_id))
            .filter(|f| min_relevance.map_or(true, |min| f.relevance_score >= min))
            .collect()
    }

    async fn add(&self, fact: &MemoryFact) -> Option<String> {
        if !self.config.configured() {
            return None;
        }

        let start = Instant::now();
        let url = format!("{}/v1/memories/", self.config.base_url);
        let request = AddRequest {
            messages: vec![AddMessage {
                role: "user",
                content: &fact.content,
            }],
            user_id: scoped_user_id(&fact.user_id),
            version: "v2",
        };

        let outcome: std::result::Result<Vec<WireId>, String> = async {
            let response = self
                .authorized(self.http.post(&url).json(&request))
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("status {}", status));
            }
            response.json().await.map_err(|e| e.to_string())
        }
        .await;

        METRICS
            .memory_request_duration
            .with_label_values(&["add"])
            .observe(start.elapsed().as_secs_f64());

        match outcome {
            Ok(results) => {
                self.mark_reachable(true);
                METRICS
                    .memory_requests
                    .with_label_values(&["add", "success"])
                    .inc();
                let id = results.into_iter().next().and_then(|r| r.id);
                debug!(?id, "Memory added");
                id
            }
            Err(err) => {
                self.mark_reachable(false);
                METRICS
                    .memory_requests
                    .with_label_values(&["add", "error"])
                    .inc();
                warn!(error = %err, "Failed to add memory");
                None
            }
        }
    }

    async fn get_all(&self, user_id: &str, limit: usize) -> Vec<MemoryFact> {
        if !self.config.configured() {
            return Vec::new();
        }

        let url = format!(
            "{}/v1/memories/?user_id={}&limit={}",
            self.config.base_url,
            scoped_user_id(user_id),
            limit
        );

        let outcome: std::result::Result<ListPayload, String> = async {
            let response = self
                .authorized(self.http.get(&url))
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("status {}", status));
            }
            response.json().await.map_err(|e| e.to_string())
        }
        .await;

        match outcome {
            Ok(payload) => {
                self.mark_reachable(true);
                METRICS
                    .memory_requests
                    .with_label_values(&["get_all", "success"])
                    .inc();
                payload
                    .into_facts()
                    .into_iter()
                    .filter_map(|r| r.into_fact(user_id))
                    .collect()
            }
            Err(err) => {
                self.mark_reachable(false);
                METRICS
                    .memory_requests
                    .with_label_values(&["get_all", "error"])
                    .inc();
                warn!(error = %err, "Failed to list memories");
                Vec::new()
            }
        }
    }

    async fn delete(&self, memory_id: &str) -> bool {
        if !self.config.configured() {
            return false;
        }

        let url = format!("{}/v1/memories/{}/", self.config.base_url, memory_id);
        match self.authorized(self.http.delete(&url)).send().await {
            Ok(response) => {
                self.mark_reachable(true);
                let ok = response.status().is_success();
                let status = if ok { "success" } else { "error" };
                METRICS
                    .memory_requests
                    .with_label_values(&["delete", status])
                    .inc();
                ok
            }
            Err(err) => {
                self.mark_reachable(false);
                METRICS
                    .memory_requests
                    .with_label_values(&["delete", "error"])
                    .inc();
                warn!(error = %err, "Failed to delete memory");
                false
            }
        }
    }
}

// Wire types for the memory service API

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    user_id: String,
    limit: usize,
    filters: SearchFilters,
}

#[derive(Debug, Serialize)]
struct SearchFilters {
    user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<CategoryFilter>,
}

#[derive(Debug, Serialize)]
struct CategoryFilter {
    #[serde(rename = "in")]
    included: Vec<MemoryCategory>,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    messages: Vec<AddMessage<'a>>,
    user_id: String,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct AddMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireId {
    id: Option<String>,
}

/// One fact as returned by the service; fields vary between endpoints
#[derive(Debug, Deserialize)]
struct WireFact {
    id: String,
    #[serde(default)]
    memory: Option<String>,
    #[serde(default)]
    data: Option<WireFactData>,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<WireFactMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireFactData {
    memory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFactMetadata {
    chat_id: Option<String>,
    confidence: Option<f32>,
    source: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// List responses come either bare or wrapped in a `results` object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPayload {
    Wrapped { results: Vec<WireFact> },
    Bare(Vec<WireFact>),
}

impl ListPayload {
    fn into_facts(self) -> Vec<WireFact> {
        match self {
            Self::Wrapped { results } => results,
            Self::Bare(facts) => facts,
        }
    }
}

impl WireFact {
    fn into_fact(self, user_id: &str) -> Option<MemoryFact> {
        let content = self.memory.or_else(|| self.data.and_then(|d| d.memory))?;
        let wire_meta = self.metadata.unwrap_or_default();

        let category = self
            .categories
            .as_ref()
            .and_then(|c| c.first())
            .map(|tag| MemoryCategory::parse(tag))
            .unwrap_or_default();

        let mut metadata = MemoryMetadata::new(category).with_source(
            wire_meta
                .source
                .unwrap_or_else(|| "memory_service".to_string()),
        );
        metadata.chat_id = wire_meta.chat_id;
        metadata.confidence = wire_meta.confidence.unwrap_or(0.8);
        metadata.tags = self.categories.unwrap_or_default();
        metadata.expires_at = wire_meta.expires_at;
        if let Some(created_at) = self.created_at {
            metadata.timestamp = created_at;
        }

        Some(MemoryFact {
            id: Some(self.id),
            content,
            user_id: user_id.to_string(),
            relevance_score: self.score.unwrap_or(1.0),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_wire_shape() {
        let request = SearchRequest {
            query: "rust",
            user_id: "user_abcd1234".to_string(),
            limit: 5,
            filters: SearchFilters {
                user_id: "user_abcd1234".to_string(),
                categories: Some(CategoryFilter {
                    included: vec![MemoryCategory::UserPreference],
                }),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["filters"]["categories"]["in"][0], "user_preference");
        assert_eq!(json["limit"], 5);
    }

    #[test]
    fn test_wire_fact_content_fallback() {
        let raw = serde_json::json!({
            "id": "m1",
            "data": { "memory": "works at Acme" },
            "categories": ["personal_info"]
        });

        let fact: WireFact = serde_json::from_value(raw).unwrap();
        let fact = fact.into_fact("u1").unwrap();
        assert_eq!(fact.content, "works at Acme");
        assert_eq!(fact.metadata.category, MemoryCategory::PersonalInfo);
        assert_eq!(fact.relevance_score, 1.0);
    }

    #[test]
    fn test_wire_fact_without_content_is_skipped() {
        let raw = serde_json::json!({ "id": "m1" });
        let fact: WireFact = serde_json::from_value(raw).unwrap();
        assert!(fact.into_fact("u1").is_none());
    }

    #[test]
    fn test_list_payload_both_shapes() {
        let bare: ListPayload =
            serde_json::from_value(serde_json::json!([{ "id": "a", "memory": "x" }])).unwrap();
        assert_eq!(bare.into_facts().len(), 1);

        let wrapped: ListPayload = serde_json::from_value(
            serde_json::json!({ "results": [{ "id": "a", "memory": "x" }] }),
        )
        .unwrap();
        assert_eq!(wrapped.into_facts().len(), 1);
    }

    #[tokio::test]
    async fn test_null_store_is_inert() {
        let store = NullMemoryStore;
        assert!(!store.available());
        assert!(store
            .search("anything", "u1", &SearchOptions::default())
            .await
            .is_empty());
        assert!(store.get_all("u1", 10).await.is_empty());
        assert!(!store.delete("m1").await);
    }

    #[tokio::test]
    async fn test_unconfigured_client_short_circuits() {
        let client = HttpMemoryClient::new(MemoryServiceConfig::default()).unwrap();
        assert!(!client.available());
        assert!(client
            .search("query", "u1", &SearchOptions::default())
            .await
            .is_empty());
    }
}
