//! Common traits for page generation agents

use std::time::Duration;

use async_trait::async_trait;
use pseo_core::{Message, Response};
use pseo_kb::KbError;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::{generate_bounded, parse_json, GenerationOptions, LlmError, SharedBackend};

/// Default upper bound for one LLM call
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent was handed a task it does not implement
    #[error("{agent} cannot handle '{action}'")]
    UnexpectedTask { agent: String, action: String },

    #[error("{agent} is missing required context: {what}")]
    MissingContext { agent: String, what: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Knowledge base error: {0}")]
    Kb(#[from] KbError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    pub fn unexpected(agent: AgentKind, message: &Message) -> Self {
        AgentError::UnexpectedTask {
            agent: agent.name().to_string(),
            action: message.task.action().to_string(),
        }
    }

    pub fn missing(agent: AgentKind, what: &str) -> Self {
        AgentError::MissingContext {
            agent: agent.name().to_string(),
            what: what.to_string(),
        }
    }
}

/// The closed set of agents in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentKind {
    Strategist,
    CompetitorResearch,
    AudienceInsight,
    Statistics,
    Copywriting,
    FaqGenerator,
    SeoOptimization,
    ComparisonTable,
    SchemaMarkup,
    QualityControl,
}

impl AgentKind {
    pub const ALL: [AgentKind; 10] = [
        AgentKind::Strategist,
        AgentKind::CompetitorResearch,
        AgentKind::AudienceInsight,
        AgentKind::Statistics,
        AgentKind::Copywriting,
        AgentKind::FaqGenerator,
        AgentKind::SeoOptimization,
        AgentKind::ComparisonTable,
        AgentKind::SchemaMarkup,
        AgentKind::QualityControl,
    ];

    /// Display name used in messages and research data keys
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Strategist => "PSEO_Strategist_Agent",
            AgentKind::CompetitorResearch => "Competitor_Research_Agent",
            AgentKind::AudienceInsight => "Audience_Insight_Agent",
            AgentKind::Statistics => "Statistics_Agent",
            AgentKind::Copywriting => "Copywriting_Agent",
            AgentKind::FaqGenerator => "FAQ_Generator_Agent",
            AgentKind::SeoOptimization => "SEO_Optimization_Agent",
            AgentKind::ComparisonTable => "Comparison_Table_Agent",
            AgentKind::SchemaMarkup => "Schema_Markup_Agent",
            AgentKind::QualityControl => "Quality_Control_Agent",
        }
    }

    /// Registry key: the name lower-cased without its `_agent` suffix
    pub fn key(&self) -> &'static str {
        match self {
            AgentKind::Strategist => "pseo_strategist",
            AgentKind::CompetitorResearch => "competitor_research",
            AgentKind::AudienceInsight => "audience_insight",
            AgentKind::Statistics => "statistics",
            AgentKind::Copywriting => "copywriting",
            AgentKind::FaqGenerator => "faq_generator",
            AgentKind::SeoOptimization => "seo_optimization",
            AgentKind::ComparisonTable => "comparison_table",
            AgentKind::SchemaMarkup => "schema_markup",
            AgentKind::QualityControl => "quality_control",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Common interface for all agents
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Handle one message.
    ///
    /// Degraded results come back as `Ok` responses with reduced confidence;
    /// `Err` is reserved for wiring defects and missing context.
    async fn execute(&self, message: &Message) -> Result<Response, AgentError>;
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Unique agent ID
    pub id: String,
    /// Upper bound for each LLM call
    pub llm_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

impl AgentConfig {
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }
}

/// Prompt the backend and parse the first JSON value of the reply.
///
/// Call failures (including timeouts) surface as `AgentError::Llm`,
/// unusable output as `AgentError::Parse`.
pub async fn ask_json<T: DeserializeOwned>(
    backend: &SharedBackend,
    config: &AgentConfig,
    prompt: &str,
    options: GenerationOptions,
) -> Result<T, AgentError> {
    let text = generate_bounded(backend.as_ref(), prompt, &options, config.llm_timeout).await?;
    debug!("[{}] LLM replied with {} chars", config.id, text.len());
    parse_json(&text).map_err(|e| AgentError::Parse(e.to_string()))
}
