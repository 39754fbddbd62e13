//! Page blueprints and the planned task graph
//!
//! A blueprint is created once per page by the strategist and is read-only
//! afterward. The task list that accompanies it carries the only real
//! dependency structure in the pipeline: each task names the milestone it
//! waits for and whether it may run alongside its siblings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Priority, TaskPayload, Variables};

/// Variables whose prefixes make page ids readable
const PAGE_ID_VARIABLES: [&str; 3] = ["competitor", "audience", "platform"];

/// Editorial funnel classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Top,
    Mid,
    Bottom,
}

/// How much research a page needs before copy is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationModel {
    /// Template-driven copy with light research
    #[serde(rename = "Model 1")]
    Template,
    /// Research-backed copy
    #[serde(rename = "Model 2")]
    Research,
}

impl std::fmt::Display for GenerationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationModel::Template => write!(f, "Model 1"),
            GenerationModel::Research => write!(f, "Model 2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchKind {
    CompetitorAnalysis,
    AudienceInsights,
    MarketStatistics,
}

/// One piece of research the page depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequirement {
    #[serde(rename = "type")]
    pub kind: ResearchKind,
    pub target: String,
    pub required_data: Vec<String>,
}

/// The per-page plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub page_id: String,
    pub pattern_id: String,
    pub pattern_name: String,
    pub funnel_stage: FunnelStage,
    pub generation_model: GenerationModel,
    pub required_agents: Vec<String>,
    pub sections_needed: Vec<String>,
    pub research_requirements: Vec<ResearchRequirement>,
    pub priority: String,
    /// Whether the page carries a side-by-side comparison table
    #[serde(default)]
    pub comparison_table: bool,
    #[serde(default)]
    pub pseo_variables: Variables,
}

impl Blueprint {
    pub fn needs_research(&self) -> bool {
        !self.research_requirements.is_empty()
    }
}

/// Synchronization points between pipeline phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    ResearchComplete,
    ContentComplete,
    SupplementaryComplete,
    AllContentComplete,
}

/// A planned agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Human-readable agent name, resolved through the registry
    pub agent: String,
    pub task: TaskPayload,
    pub priority: Priority,
    /// May run concurrently with other tasks waiting on the same milestone
    pub parallel: bool,
    #[serde(default)]
    pub depends_on: Vec<Milestone>,
}

impl AgentTask {
    pub fn new(agent: &str, task: TaskPayload, priority: Priority) -> Self {
        Self {
            agent: agent.to_string(),
            task,
            priority,
            parallel: false,
            depends_on: Vec::new(),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn after(mut self, milestone: Milestone) -> Self {
        if !self.depends_on.contains(&milestone) {
            self.depends_on.push(milestone);
        }
        self
    }

    pub fn action(&self) -> &'static str {
        self.task.action()
    }

    /// The milestone this task waits for, `None` for tasks that start right away
    pub fn gate(&self) -> Option<Milestone> {
        self.depends_on.last().copied()
    }
}

/// Select the tasks gated on `milestone` (or ungated, for `None`), in plan order
pub fn tasks_gated_on(tasks: &[AgentTask], milestone: Option<Milestone>) -> Vec<AgentTask> {
    tasks
        .iter()
        .filter(|t| t.gate() == milestone)
        .cloned()
        .collect()
}

/// Deterministic page identifier.
///
/// `pat{id}` followed by short lowercase prefixes of the competitor,
/// audience and platform values, then an 8-hex digest of the full
/// variable set so that values sharing a prefix never collide.
pub fn page_id(pattern_id: &str, variables: &Variables) -> String {
    let mut parts = vec![format!("pat{}", pattern_id)];

    for name in PAGE_ID_VARIABLES {
        if let Some(value) = variables.get(name) {
            let prefix: String = value.chars().take(5).collect();
            parts.push(prefix.to_lowercase().replace(' ', ""));
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(pattern_id.as_bytes());
    for (name, value) in variables {
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([b'=']);
        hasher.update(value.as_bytes());
    }
    parts.push(format!("{:x}", hasher.finalize())[..8].to_string());

    parts.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_page_id_is_stable() {
        let v = vars(&[("competitor", "Higgsfield"), ("audience", "OnlyFans Creators")]);
        let first = page_id("1", &v);
        let second = page_id("1", &v.clone());

        assert_eq!(first, second);
        assert!(first.starts_with("pat1_higgs_onlyf_"));
    }

    #[test]
    fn test_page_id_separates_shared_prefixes() {
        let a = vars(&[("competitor", "Leonardo AI"), ("audience", "Models")]);
        let b = vars(&[("competitor", "Leonardo"), ("audience", "Models")]);

        assert_ne!(page_id("1", &a), page_id("1", &b));
        assert_ne!(page_id("1", &a), page_id("4", &a));
    }

    #[test]
    fn test_tasks_gated_on() {
        let tasks = vec![
            AgentTask::new("A", TaskPayload::ReviewPage, Priority::High).parallel(),
            AgentTask::new("B", TaskPayload::ReviewPage, Priority::High)
                .after(Milestone::ResearchComplete),
            AgentTask::new("C", TaskPayload::ReviewPage, Priority::High).parallel(),
        ];

        let first: Vec<_> = tasks_gated_on(&tasks, None)
            .into_iter()
            .map(|t| t.agent)
            .collect();
        assert_eq!(first, vec!["A", "C"]);
        assert_eq!(
            tasks_gated_on(&tasks, Some(Milestone::ResearchComplete)).len(),
            1
        );
    }

    #[test]
    fn test_generation_model_labels() {
        let json = serde_json::to_string(&GenerationModel::Research).unwrap();
        assert_eq!(json, "\"Model 2\"");
        assert_eq!(GenerationModel::Template.to_string(), "Model 1");
    }
}
