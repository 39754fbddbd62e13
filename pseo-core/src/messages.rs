//! Inter-agent message protocol
//!
//! Every agent invocation is one `Message` in and one `Response` out:
//! - Messages are immutable once built and carry a run-unique task id
//! - Task payloads are a closed set of operations, one variant per action
//! - Responses echo the task id and report status, confidence and sources

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AgentTask, Blueprint, ComparisonRow, Faq, PageContent, PageOutput, QualityReport, SeoMetadata,
    Variables,
};

/// Research results keyed by the agent that produced them
pub type ResearchData = BTreeMap<String, Value>;

/// Message priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Outcome of an agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Failed,
    Partial,
}

/// The operation an agent is asked to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Turn a pattern and its variables into a blueprint and task list
    CreateBlueprint {
        pattern_id: String,
        variables: Variables,
    },

    /// Build or recall a competitor profile
    ResearchCompetitor {
        competitor: String,
        #[serde(default)]
        audience: Option<String>,
        #[serde(default)]
        required_data: Vec<String>,
    },

    /// Pain points, desires and objections for an audience
    ResearchAudience {
        audience: String,
        #[serde(default)]
        required_data: Vec<String>,
    },

    /// Market statistics supporting the page angle
    GatherStatistics {
        pattern_id: String,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        audience: Option<String>,
        #[serde(default)]
        platform: Option<String>,
    },

    /// Main landing page copy
    GenerateContent {
        sections: Vec<String>,
        variables: Variables,
    },

    GenerateFaqs {
        pattern_id: String,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Meta title, description and focus keyword
    GenerateMetadata { h1: String, pattern_id: String },

    GenerateComparisonTable {
        pattern_id: String,
        competitor: String,
        #[serde(default)]
        audience: Option<String>,
    },

    /// Structured data records (no LLM involved)
    GenerateSchema {
        pattern_id: String,
        url_slug: String,
        page_data: PageContent,
        #[serde(default)]
        faqs: Vec<Faq>,
        #[serde(default)]
        meta: SeoMetadata,
    },

    /// Score the assembled page carried in the context
    ReviewPage,
}

impl TaskPayload {
    /// Action name, matching the serialized tag
    pub fn action(&self) -> &'static str {
        match self {
            TaskPayload::CreateBlueprint { .. } => "create_blueprint",
            TaskPayload::ResearchCompetitor { .. } => "research_competitor",
            TaskPayload::ResearchAudience { .. } => "research_audience",
            TaskPayload::GatherStatistics { .. } => "gather_statistics",
            TaskPayload::GenerateContent { .. } => "generate_content",
            TaskPayload::GenerateFaqs { .. } => "generate_faqs",
            TaskPayload::GenerateMetadata { .. } => "generate_metadata",
            TaskPayload::GenerateComparisonTable { .. } => "generate_comparison_table",
            TaskPayload::GenerateSchema { .. } => "generate_schema",
            TaskPayload::ReviewPage => "review_page",
        }
    }
}

/// Shared context handed to an agent alongside its task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<Blueprint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: Variables,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub research_data: ResearchData,
    /// The assembled page, present only for quality review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageOutput>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blueprint(mut self, blueprint: Blueprint) -> Self {
        self.blueprint = Some(blueprint);
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_research(mut self, research_data: ResearchData) -> Self {
        self.research_data = research_data;
        self
    }

    pub fn with_page(mut self, page: PageOutput) -> Self {
        self.page = Some(page);
        self
    }

    /// Page variables: the explicit set, else the blueprint's
    pub fn page_variables(&self) -> &Variables {
        match &self.blueprint {
            Some(blueprint) if self.variables.is_empty() => &blueprint.pseo_variables,
            _ => &self.variables,
        }
    }

    /// Look up a variable, treating empty values as absent
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.page_variables()
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// A task sent from one agent to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub task_id: String,
    pub priority: Priority,
    pub task: TaskPayload,
    pub context: TaskContext,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        from: &str,
        to: &str,
        task_id: &str,
        priority: Priority,
        task: TaskPayload,
        context: TaskContext,
    ) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            task_id: task_id.to_string(),
            priority,
            task,
            context,
            timestamp: Utc::now(),
        }
    }
}

/// Provenance entry attached to a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Source {
    pub fn note(source_type: &str, note: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            note: Some(note.to_string()),
            model: None,
        }
    }

    pub fn model(source_type: &str, model: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            note: None,
            model: Some(model.to_string()),
        }
    }
}

/// Typed result data, one variant per task family
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ResponseData {
    #[default]
    Empty,
    Error {
        message: String,
    },
    Blueprint {
        blueprint: Blueprint,
        tasks: Vec<AgentTask>,
    },
    /// Loosely structured research findings, forwarded verbatim into prompts
    Research(Value),
    Content(PageContent),
    Faqs(Vec<Faq>),
    Metadata(SeoMetadata),
    ComparisonTable(Vec<ComparisonRow>),
    Schema(Vec<Value>),
    Quality(QualityReport),
}

impl ResponseData {
    pub fn error(message: impl Into<String>) -> Self {
        ResponseData::Error {
            message: message.into(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResponseData::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// The reply to a `Message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub from: String,
    pub to: String,
    /// Echo of the triggering message's task id
    pub task_id: String,
    pub status: ResponseStatus,
    pub data: ResponseData,
    pub sources: Vec<Source>,
    /// Wall-clock seconds spent in the agent
    pub execution_time: f64,
    pub confidence: f64,
    pub from_cache: bool,
    pub timestamp: DateTime<Utc>,
}

impl Response {
    /// Start a reply to `message`, addressed back to its sender
    pub fn builder(message: &Message, data: ResponseData) -> ResponseBuilder {
        ResponseBuilder::new(message, data)
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResponseStatus::Completed
    }
}

/// Builder for responses
pub struct ResponseBuilder {
    from: String,
    to: String,
    task_id: String,
    status: ResponseStatus,
    data: ResponseData,
    sources: Vec<Source>,
    execution_time: f64,
    confidence: f64,
    from_cache: bool,
}

impl ResponseBuilder {
    pub fn new(message: &Message, data: ResponseData) -> Self {
        Self {
            from: message.to.clone(),
            to: message.from.clone(),
            task_id: message.task_id.clone(),
            status: ResponseStatus::Completed,
            data,
            sources: Vec::new(),
            execution_time: 0.0,
            confidence: 1.0,
            from_cache: false,
        }
    }

    pub fn status(mut self, status: ResponseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn failed(self) -> Self {
        self.status(ResponseStatus::Failed)
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    /// Record the time elapsed since `start`
    pub fn elapsed(mut self, start: Instant) -> Self {
        self.execution_time = start.elapsed().as_secs_f64();
        self
    }

    pub fn build(self) -> Response {
        Response {
            from: self.from,
            to: self.to,
            task_id: self.task_id,
            status: self.status,
            data: self.data,
            sources: self.sources,
            execution_time: self.execution_time.max(0.0),
            confidence: self.confidence,
            from_cache: self.from_cache,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new(
            "Orchestrator",
            "FAQ_Generator_Agent",
            "task_1_1700000000",
            Priority::Medium,
            TaskPayload::GenerateFaqs {
                pattern_id: "1".to_string(),
                count: Some(5),
            },
            TaskContext::new(),
        )
    }

    #[test]
    fn test_response_addresses_sender() {
        let msg = message();
        let response = Response::builder(&msg, ResponseData::Faqs(Vec::new()))
            .confidence(1.7)
            .build();

        assert_eq!(response.from, "FAQ_Generator_Agent");
        assert_eq!(response.to, "Orchestrator");
        assert_eq!(response.task_id, msg.task_id);
        assert_eq!(response.confidence, 1.0);
        assert!(response.is_completed());
        assert!(response.execution_time >= 0.0);
    }

    #[test]
    fn test_task_action_matches_tag() {
        let msg = message();
        let json = serde_json::to_value(&msg.task).unwrap();
        assert_eq!(json["action"], msg.task.action());
        assert_eq!(TaskPayload::ReviewPage.action(), "review_page");
    }

    #[test]
    fn test_context_ignores_blank_variables() {
        let mut variables = Variables::new();
        variables.insert("competitor".to_string(), "  ".to_string());
        variables.insert("audience".to_string(), "Models".to_string());
        let ctx = TaskContext::new().with_variables(variables);

        assert_eq!(ctx.variable("competitor"), None);
        assert_eq!(ctx.variable("audience"), Some("Models"));
    }
}
