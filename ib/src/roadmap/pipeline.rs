//! Idea to roadmap: cache, provider, tolerant parse, fixed fallback

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::parse::parse_roadmap;
use super::types::{RoadmapOrigin, RoadmapResult, TARGET_TASKS};
use crate::cache::{CacheStore, roadmap_cache_key};
use crate::config::{CacheConfig, LlmConfig};
use crate::llm::{CompletionRequest, LlmClient};

const SYSTEM_PROMPT: &str = "You are a product manager. Describe the idea briefly (1–2 sentences) \
and give EXACTLY 6 concrete MVP tasks. Reply strictly in JSON: \
{ \"description\": \"…\", \"tasks\": [\"…\",…] } No text outside JSON.";

const FALLBACK_TASKS: [&str; TARGET_TASKS] = [
    "Define the value proposition and target audience",
    "Design the database: users/projects/tasks",
    "Set up the backend API and migrations",
    "Build the Telegram bot: /start /idea /projects /update /report",
    "Build the web panel (login, list, AI review)",
    "Docker compose, README, deployment",
];

/// Deterministic roadmap used whenever generation fails
pub fn fallback_roadmap(idea: &str) -> RoadmapResult {
    RoadmapResult {
        description: format!(
            "Idea: {}. The goal is to quickly build an MVP and validate the hypotheses.",
            idea
        ),
        tasks: FALLBACK_TASKS.iter().map(|t| t.to_string()).collect(),
    }
}

/// Tunables for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub ttl: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_tokens: 800,
            temperature: 0.2,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(llm: &LlmConfig, cache: &CacheConfig) -> Self {
        Self {
            ttl: cache.ttl(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }
}

/// Generation pipeline shared by every session
#[derive(Clone)]
pub struct RoadmapPipeline {
    cache: Arc<dyn CacheStore>,
    provider: Option<Arc<dyn LlmClient>>,
    settings: PipelineSettings,
}

impl RoadmapPipeline {
    /// `provider: None` disables generation; every miss then falls back
    pub fn new(cache: Arc<dyn CacheStore>, provider: Option<Arc<dyn LlmClient>>, settings: PipelineSettings) -> Self {
        Self {
            cache,
            provider,
            settings,
        }
    }

    /// Produce a roadmap for `idea`; never fails
    pub async fn generate(&self, idea: &str) -> RoadmapResult {
        self.generate_traced(idea).await.0
    }

    /// Like `generate`, also reporting where the result came from
    pub async fn generate_traced(&self, idea: &str) -> (RoadmapResult, RoadmapOrigin) {
        debug!(idea_len = idea.len(), "generate_traced: called");
        let key = roadmap_cache_key(idea);

        if let Some(hit) = self.lookup(&key).await {
            info!(%key, "generate_traced: cache hit");
            return (hit, RoadmapOrigin::Cache);
        }

        let (result, origin) = match self.ask_provider(idea).await {
            Some(result) => (result, RoadmapOrigin::Provider),
            None => (fallback_roadmap(idea), RoadmapOrigin::Fallback),
        };

        self.store(&key, &result).await;
        info!(%key, %origin, tasks = result.tasks.len(), "generate_traced: produced roadmap");
        (result, origin)
    }

    async fn lookup(&self, key: &str) -> Option<RoadmapResult> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "lookup: cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(%key, error = %e, "lookup: undecodable cache value, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, result: &RoadmapResult) {
        let json = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                warn!(%key, error = %e, "store: failed to encode roadmap");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &json, self.settings.ttl).await {
            warn!(%key, error = %e, "store: cache write failed");
        }
    }

    async fn ask_provider(&self, idea: &str) -> Option<RoadmapResult> {
        let Some(provider) = &self.provider else {
            debug!("ask_provider: generation disabled");
            return None;
        };

        let request = CompletionRequest::single(SYSTEM_PROMPT, format!("Idea: {}", idea), self.settings.max_tokens)
            .with_temperature(self.settings.temperature);

        let response = match provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(model = provider.model(), error = %e, "ask_provider: provider call failed");
                return None;
            }
        };

        debug!(
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "ask_provider: reply received"
        );
        let Some(text) = response.content else {
            warn!(model = provider.model(), "ask_provider: empty reply");
            return None;
        };

        match parse_roadmap(&text) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(model = provider.model(), error = %e, "ask_provider: unusable reply");
                None
            }
        }
    }
}
