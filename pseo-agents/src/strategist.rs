//! PSEO Strategist Agent
//!
//! Turns a pattern id and its variables into a blueprint plus the ordered
//! task plan the orchestrator executes. No LLM involved.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use pseo_core::{
    page_id, AgentTask, Blueprint, FunnelStage, GenerationModel, Message, Milestone, Pattern,
    PatternLibrary, Priority, ResearchKind, ResearchRequirement, Response, ResponseData,
    TaskPayload, Variables, DEFAULT_AUDIENCE, DEFAULT_PLATFORM,
};

use crate::{Agent, AgentError, AgentKind};

/// FAQ pairs requested by the default plan
pub const PLANNED_FAQ_COUNT: usize = 5;

/// Planning agent
pub struct StrategistAgent {
    library: Arc<PatternLibrary>,
}

impl StrategistAgent {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self { library }
    }

    /// Build the blueprint and plan for a known pattern
    pub fn plan(&self, pattern: &Pattern, variables: &Variables) -> (Blueprint, Vec<AgentTask>) {
        let missing = pattern.missing_variables(variables);
        if !missing.is_empty() {
            warn!(
                "Pattern {} ({}) is missing variables: {}",
                pattern.id,
                pattern.name,
                missing.join(", ")
            );
        }

        let (funnel_stage, generation_model) = classify(&pattern.id);

        let blueprint = Blueprint {
            page_id: page_id(&pattern.id, variables),
            pattern_id: pattern.id.clone(),
            pattern_name: pattern.name.clone(),
            funnel_stage,
            generation_model,
            required_agents: required_agents(&pattern.id, generation_model),
            sections_needed: sections_for(pattern),
            research_requirements: research_needs(pattern, variables),
            priority: pattern.priority.clone(),
            comparison_table: pattern.show_comparison_table,
            pseo_variables: variables.clone(),
        };

        let tasks = plan_tasks(&blueprint, variables);
        (blueprint, tasks)
    }
}

#[async_trait]
impl Agent for StrategistAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Strategist
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::CreateBlueprint {
            pattern_id,
            variables,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };

        let Some(pattern) = self.library.get(pattern_id) else {
            warn!("Pattern {} not found", pattern_id);
            return Ok(Response::builder(
                message,
                ResponseData::error(format!("Pattern {} not found", pattern_id)),
            )
            .failed()
            .elapsed(start)
            .build());
        };

        let (blueprint, tasks) = self.plan(pattern, variables);
        info!(
            "Blueprint {} ({}, {} research tasks, {} planned tasks)",
            blueprint.page_id,
            blueprint.generation_model,
            blueprint.research_requirements.len(),
            tasks.len()
        );

        Ok(
            Response::builder(message, ResponseData::Blueprint { blueprint, tasks })
                .confidence(1.0)
                .elapsed(start)
                .build(),
        )
    }
}

/// Funnel stage and generation model per pattern
pub fn classify(pattern_id: &str) -> (FunnelStage, GenerationModel) {
    match pattern_id {
        "1" | "4" | "5" => (FunnelStage::Bottom, GenerationModel::Research),
        "2" | "3" | "6" => (FunnelStage::Mid, GenerationModel::Template),
        _ => (FunnelStage::Top, GenerationModel::Template),
    }
}

/// Agents credited on the page. Fixed per model and pattern, independent of
/// which tasks the plan ends up dispatching.
pub fn required_agents(pattern_id: &str, model: GenerationModel) -> Vec<String> {
    let kinds: &[AgentKind] = match (model, pattern_id) {
        (GenerationModel::Research, "1" | "4") => &[
            AgentKind::Strategist,
            AgentKind::CompetitorResearch,
            AgentKind::AudienceInsight,
            AgentKind::Copywriting,
            AgentKind::FaqGenerator,
            AgentKind::SeoOptimization,
            AgentKind::QualityControl,
        ],
        (GenerationModel::Research, _) => &[AgentKind::Strategist],
        (GenerationModel::Template, _) => &[
            AgentKind::Strategist,
            AgentKind::Copywriting,
            AgentKind::FaqGenerator,
            AgentKind::SeoOptimization,
        ],
    };
    kinds.iter().map(|kind| kind.name().to_string()).collect()
}

fn sections_for(pattern: &Pattern) -> Vec<String> {
    let mut sections = vec![
        "hero_section",
        "problem_agitation",
        "solution_overview",
        "faq",
        "final_cta",
    ];
    if pattern.show_comparison_table {
        sections.insert(3, "comparison_table");
    }
    sections.insert(4, "feature_sections");
    sections.into_iter().map(str::to_string).collect()
}

fn non_blank<'a>(variables: &'a Variables, name: &str) -> Option<&'a str> {
    variables
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn research_needs(pattern: &Pattern, variables: &Variables) -> Vec<ResearchRequirement> {
    let mut needs = Vec::new();

    if pattern.show_comparison_table {
        if let Some(competitor) = non_blank(variables, "competitor") {
            needs.push(ResearchRequirement {
                kind: ResearchKind::CompetitorAnalysis,
                target: competitor.to_string(),
                required_data: strings(&[
                    "features_list",
                    "pricing_tiers",
                    "pros_cons",
                    "audience_fit",
                    "nsfw_support",
                ]),
            });
        }
    }

    if let Some(audience) = non_blank(variables, "audience") {
        needs.push(ResearchRequirement {
            kind: ResearchKind::AudienceInsights,
            target: audience.to_string(),
            required_data: strings(&["pain_points", "desires", "objections", "current_solutions"]),
        });
    }

    if pattern.id == "6" {
        needs.push(ResearchRequirement {
            kind: ResearchKind::MarketStatistics,
            target: "creator_economy".to_string(),
            required_data: strings(&[
                "burnout_stats",
                "demand_supply_ratio",
                "platform_growth",
                "industry_benchmarks",
            ]),
        });
    }

    needs
}

/// The statistics task that accompanies any research phase
pub fn statistics_task(blueprint: &Blueprint, variables: &Variables) -> AgentTask {
    AgentTask::new(
        AgentKind::Statistics.name(),
        TaskPayload::GatherStatistics {
            pattern_id: blueprint.pattern_id.clone(),
            topic: Some(blueprint.pattern_name.clone()),
            audience: Some(non_blank(variables, "audience").unwrap_or(DEFAULT_AUDIENCE).to_string()),
            platform: Some(non_blank(variables, "platform").unwrap_or(DEFAULT_PLATFORM).to_string()),
        },
        Priority::Medium,
    )
    .parallel()
}

fn plan_tasks(blueprint: &Blueprint, variables: &Variables) -> Vec<AgentTask> {
    let mut tasks = Vec::new();

    for requirement in &blueprint.research_requirements {
        let task = match requirement.kind {
            ResearchKind::CompetitorAnalysis => AgentTask::new(
                AgentKind::CompetitorResearch.name(),
                TaskPayload::ResearchCompetitor {
                    competitor: requirement.target.clone(),
                    audience: non_blank(variables, "audience").map(str::to_string),
                    required_data: requirement.required_data.clone(),
                },
                Priority::High,
            ),
            ResearchKind::AudienceInsights => AgentTask::new(
                AgentKind::AudienceInsight.name(),
                TaskPayload::ResearchAudience {
                    audience: requirement.target.clone(),
                    required_data: requirement.required_data.clone(),
                },
                Priority::High,
            ),
            ResearchKind::MarketStatistics => statistics_task(blueprint, variables),
        };
        tasks.push(task.parallel());
    }

    if blueprint.needs_research()
        && !tasks
            .iter()
            .any(|t| matches!(t.task, TaskPayload::GatherStatistics { .. }))
    {
        tasks.push(statistics_task(blueprint, variables));
    }

    tasks.push(
        AgentTask::new(
            AgentKind::Copywriting.name(),
            TaskPayload::GenerateContent {
                sections: blueprint.sections_needed.clone(),
                variables: variables.clone(),
            },
            Priority::High,
        )
        .after(Milestone::ResearchComplete),
    );

    tasks.push(
        AgentTask::new(
            AgentKind::FaqGenerator.name(),
            TaskPayload::GenerateFaqs {
                pattern_id: blueprint.pattern_id.clone(),
                count: Some(PLANNED_FAQ_COUNT),
            },
            Priority::Medium,
        )
        .parallel()
        .after(Milestone::ContentComplete),
    );

    // h1 is filled in once content exists
    tasks.push(
        AgentTask::new(
            AgentKind::SeoOptimization.name(),
            TaskPayload::GenerateMetadata {
                h1: String::new(),
                pattern_id: blueprint.pattern_id.clone(),
            },
            Priority::Medium,
        )
        .parallel()
        .after(Milestone::ContentComplete),
    );

    if blueprint.comparison_table {
        tasks.push(
            AgentTask::new(
                AgentKind::ComparisonTable.name(),
                TaskPayload::GenerateComparisonTable {
                    pattern_id: blueprint.pattern_id.clone(),
                    competitor: non_blank(variables, "competitor")
                        .unwrap_or_default()
                        .to_string(),
                    audience: Some(
                        non_blank(variables, "audience")
                            .unwrap_or(DEFAULT_AUDIENCE)
                            .to_string(),
                    ),
                },
                Priority::High,
            )
            .parallel()
            .after(Milestone::ContentComplete),
        );
    }

    tasks.push(
        AgentTask::new(
            AgentKind::SchemaMarkup.name(),
            TaskPayload::GenerateSchema {
                pattern_id: blueprint.pattern_id.clone(),
                url_slug: String::new(),
                page_data: Default::default(),
                faqs: Vec::new(),
                meta: Default::default(),
            },
            Priority::Medium,
        )
        .after(Milestone::SupplementaryComplete),
    );

    tasks.push(
        AgentTask::new(
            AgentKind::QualityControl.name(),
            TaskPayload::ReviewPage,
            Priority::High,
        )
        .after(Milestone::AllContentComplete),
    );

    tasks
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
