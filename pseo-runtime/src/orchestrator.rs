//! Page Orchestrator
//!
//! Drives one page through a forward-only sequence of phases:
//! - PLANNING: the strategist turns (pattern, variables) into a blueprint and plan
//! - RESEARCH: research tasks plus statistics as one concurrent group
//! - CONTENT: copywriting with all research in context
//! - SUPPLEMENTARY: FAQ, SEO and comparison table as one concurrent group
//! - SCHEMA, ASSEMBLY, QUALITY_CONTROL
//!
//! Planning and content failures abort the run. Everything else degrades.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use pseo_agents::{
    statistics_task, AgentError, AgentKind, HookError, HookList, RandomHook, SharedBackend,
    SharedHookSelector, DEFAULT_LLM_TIMEOUT,
};
use pseo_core::{
    tasks_gated_on, AgentTask, Blueprint, ComparisonRow, Faq, Milestone, PageContent, PageOutput,
    PatternError, PatternLibrary, Priority, ResearchData, Response, ResponseData, SeoMetadata,
    TaskContext, TaskPayload, Variables,
};
use pseo_kb::{KbError, KnowledgeBase};

use crate::{assemble, AgentManager, AgentRegistry, DispatchError, PageParts, RegistryError, ORCHESTRATOR};

/// Knowledge base location used unless configured otherwise
pub const DEFAULT_KB_PATH: &str = "data/competitor_kb.json";

/// Override file names looked up in a config directory
pub const PATTERNS_FILE: &str = "patterns.toml";
pub const HOOKS_FILE: &str = "hooks.toml";

/// Pipeline phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Planning,
    Research,
    Content,
    Supplementary,
    Schema,
    Assembly,
    QualityControl,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Planning => "PLANNING",
            Phase::Research => "RESEARCH",
            Phase::Content => "CONTENT",
            Phase::Supplementary => "SUPPLEMENTARY",
            Phase::Schema => "SCHEMA",
            Phase::Assembly => "ASSEMBLY",
            Phase::QualityControl => "QUALITY_CONTROL",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A phase the page cannot do without did not complete
    #[error("{phase} blocked by {agent}: {details}")]
    Blocking {
        phase: Phase,
        agent: String,
        details: String,
    },

    #[error("Wiring defect: {0}")]
    Wiring(#[from] RegistryError),

    #[error("Phase order violated: {from} -> {to}")]
    PhaseOrder { from: Phase, to: Phase },

    #[error("{agent} failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },
}

impl From<DispatchError> for PipelineError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Wiring(e) => PipelineError::Wiring(e),
            DispatchError::Agent { agent, source } => PipelineError::Agent { agent, source },
        }
    }
}

/// Errors that are defects in the pipeline itself, never degraded
fn is_wiring(error: &DispatchError) -> bool {
    matches!(
        error,
        DispatchError::Wiring(_)
            | DispatchError::Agent {
                source: AgentError::UnexpectedTask { .. },
                ..
            }
    )
}

/// Map a dispatch error in a phase the run depends on
fn escalate(phase: Phase, error: DispatchError) -> PipelineError {
    if is_wiring(&error) {
        return error.into();
    }
    match error {
        DispatchError::Agent { agent, source } => PipelineError::Blocking {
            phase,
            agent,
            details: source.to_string(),
        },
        other => other.into(),
    }
}

fn blocked(phase: Phase, agent: &str, details: impl Into<String>) -> PipelineError {
    PipelineError::Blocking {
        phase,
        agent: agent.to_string(),
        details: details.into(),
    }
}

/// The payload of a completed response, or a blocking error
fn require_completed(phase: Phase, agent: &str, response: Response) -> Result<ResponseData, PipelineError> {
    if response.is_completed() {
        return Ok(response.data);
    }
    let details = response
        .data
        .error_message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("status {:?}", response.status));
    Err(blocked(phase, agent, details))
}

/// Phase timings for one run
struct PhaseClock {
    current: Phase,
    started: Instant,
    timings: Vec<(Phase, Duration)>,
}

impl PhaseClock {
    fn start() -> Self {
        info!("Phase {}", Phase::Planning);
        Self {
            current: Phase::Planning,
            started: Instant::now(),
            timings: Vec::new(),
        }
    }

    fn advance(&mut self, next: Phase) -> Result<(), PipelineError> {
        if next <= self.current {
            return Err(PipelineError::PhaseOrder {
                from: self.current,
                to: next,
            });
        }
        self.timings.push((self.current, self.started.elapsed()));
        self.current = next;
        self.started = Instant::now();
        info!("Phase {}", next);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<(Phase, Duration)>, PipelineError> {
        self.advance(Phase::Done)?;
        Ok(self.timings)
    }
}

/// Summary of one page generation
#[derive(Debug)]
pub struct GenerationRun {
    pub page: PageOutput,
    /// Time spent in each phase, in order
    pub phases: Vec<(Phase, Duration)>,
    /// Log entries added during the run; includes concurrent runs on the same orchestrator
    pub messages_exchanged: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Supplementary {
    faqs: Vec<Faq>,
    metadata: SeoMetadata,
    comparison_table: Vec<ComparisonRow>,
}

/// Setup errors while building an orchestrator from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Pattern library: {0}")]
    Patterns(#[from] PatternError),

    #[error("Hook list: {0}")]
    Hooks(#[from] HookError),

    #[error("Knowledge base: {0}")]
    Kb(#[from] KbError),
}

/// Pipeline configuration
pub struct PipelineConfig {
    /// LLM backend (pre-constructed)
    pub backend: SharedBackend,
    /// Knowledge base file; `None` keeps profiles in memory
    pub kb_path: Option<PathBuf>,
    /// Directory with `patterns.toml` / `hooks.toml` overrides
    pub config_dir: Option<PathBuf>,
    /// FAQ pairs per page, overriding the plan
    pub faq_count: Option<usize>,
    /// Upper bound for each LLM call
    pub llm_timeout: Duration,
}

impl PipelineConfig {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            kb_path: Some(PathBuf::from(DEFAULT_KB_PATH)),
            config_dir: None,
            faq_count: None,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn with_kb_path(mut self, path: Option<PathBuf>) -> Self {
        self.kb_path = path;
        self
    }

    pub fn with_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config_dir = dir;
        self
    }

    pub fn with_faq_count(mut self, count: Option<usize>) -> Self {
        self.faq_count = count;
        self
    }

    pub fn with_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }

    fn override_file(&self, name: &str) -> Option<PathBuf> {
        self.config_dir
            .as_deref()
            .map(|dir| dir.join(name))
            .filter(|path| path.exists())
    }

    /// The configured pattern library, embedded unless overridden
    pub fn load_patterns(&self) -> Result<PatternLibrary, PatternError> {
        match self.override_file(PATTERNS_FILE) {
            Some(path) => {
                info!("Loading patterns from {}", path.display());
                PatternLibrary::load_from_file(path)
            }
            None => PatternLibrary::load_embedded(),
        }
    }

    pub fn load_hooks(&self) -> Result<HookList, HookError> {
        match self.override_file(HOOKS_FILE) {
            Some(path) => {
                info!("Loading hooks from {}", path.display());
                HookList::load_from_file(path)
            }
            None => HookList::load_embedded(),
        }
    }

    pub fn open_kb(&self) -> Result<KnowledgeBase, KbError> {
        match self.kb_path.as_deref() {
            Some(path) => KnowledgeBase::open(path),
            None => Ok(KnowledgeBase::in_memory()),
        }
    }
}

/// The page generation pipeline
pub struct Orchestrator {
    manager: AgentManager,
    library: Arc<PatternLibrary>,
    faq_count: Option<usize>,
}

impl Orchestrator {
    /// Load libraries, open the knowledge base and register every agent
    pub fn new(config: PipelineConfig) -> Result<Self, SetupError> {
        let library = Arc::new(config.load_patterns()?);
        let hooks: SharedHookSelector = Arc::new(RandomHook::new(config.load_hooks()?));
        let kb = Arc::new(config.open_kb()?);

        info!(
            "Pipeline ready: {} patterns, model {}, knowledge base {}",
            library.len(),
            config.backend.model_name(),
            kb.path().map_or_else(|| "in memory".to_string(), |p: &Path| p.display().to_string())
        );

        let registry = AgentRegistry::standard(
            config.backend,
            kb,
            library.clone(),
            hooks,
            config.llm_timeout,
        );

        Ok(Self::with_registry(registry, library).with_faq_count(config.faq_count))
    }

    /// Use a prepared registry
    pub fn with_registry(registry: AgentRegistry, library: Arc<PatternLibrary>) -> Self {
        Self {
            manager: AgentManager::new(registry),
            library,
            faq_count: None,
        }
    }

    pub fn with_faq_count(mut self, count: Option<usize>) -> Self {
        self.faq_count = count;
        self
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn manager(&self) -> &AgentManager {
        &self.manager
    }

    /// Generate one page
    pub async fn generate_page(
        &self,
        pattern_id: &str,
        variables: Variables,
    ) -> Result<PageOutput, PipelineError> {
        Ok(self.generate_run(pattern_id, variables).await?.page)
    }

    /// Generate one page and report phase timings
    pub async fn generate_run(
        &self,
        pattern_id: &str,
        variables: Variables,
    ) -> Result<GenerationRun, PipelineError> {
        let started = Instant::now();
        let log_start = self.manager.messages_exchanged();
        info!("Generating page for pattern {}", pattern_id);

        let result = self.run_phases(pattern_id, variables).await;
        let (page, phases) = match result {
            Ok(done) => done,
            Err(e) => {
                error!("Page generation for pattern {} aborted: {}", pattern_id, e);
                return Err(e);
            }
        };

        let elapsed = started.elapsed();
        info!(
            "Page {} complete in {:.2}s: quality {:.2}, {:?}",
            page.page_id,
            elapsed.as_secs_f64(),
            page.quality_score,
            page.uniqueness_check
        );

        Ok(GenerationRun {
            page,
            phases,
            messages_exchanged: self.manager.messages_exchanged() - log_start,
            elapsed,
        })
    }

    async fn run_phases(
        &self,
        pattern_id: &str,
        variables: Variables,
    ) -> Result<(PageOutput, Vec<(Phase, Duration)>), PipelineError> {
        let mut clock = PhaseClock::start();

        let (blueprint, tasks) = self.plan(pattern_id, variables).await?;
        let strategist = AgentKind::Strategist.name();
        let pattern = self.library.get(&blueprint.pattern_id).ok_or_else(|| {
            blocked(
                Phase::Planning,
                strategist,
                format!("Pattern {} is not in the library", blueprint.pattern_id),
            )
        })?;
        info!(
            "Blueprint {}: {}, {} agents, {} research tasks",
            blueprint.page_id,
            blueprint.generation_model,
            blueprint.required_agents.len(),
            blueprint.research_requirements.len()
        );

        let base = TaskContext::new()
            .with_blueprint(blueprint.clone())
            .with_variables(blueprint.pseo_variables.clone());

        clock.advance(Phase::Research)?;
        let research = self.research(&blueprint, &tasks, &base).await?;

        clock.advance(Phase::Content)?;
        let context = base.clone().with_research(research.clone());
        let content = self.content(&blueprint, &tasks, &context).await?;

        clock.advance(Phase::Supplementary)?;
        let supplementary = self
            .supplementary(&blueprint, &tasks, &content, &context)
            .await?;

        clock.advance(Phase::Schema)?;
        let url_slug = pattern.render_url(&blueprint.pseo_variables);
        let schemas = self
            .schema(&blueprint, &tasks, &url_slug, &content, &supplementary, &base)
            .await?;

        clock.advance(Phase::Assembly)?;
        let mut page = assemble(
            PageParts {
                blueprint: &blueprint,
                pattern,
                content,
                faqs: supplementary.faqs,
                metadata: supplementary.metadata,
                comparison_table: supplementary.comparison_table,
                schemas,
                research: &research,
            },
            Utc::now(),
        );
        info!("Page assembled: {}", page.page_id);

        clock.advance(Phase::QualityControl)?;
        self.quality_control(&blueprint, &mut page).await?;

        Ok((page, clock.finish()?))
    }

    async fn plan(
        &self,
        pattern_id: &str,
        variables: Variables,
    ) -> Result<(Blueprint, Vec<AgentTask>), PipelineError> {
        let agent = AgentKind::Strategist.name();
        let response = self
            .manager
            .send_message(
                ORCHESTRATOR,
                agent,
                TaskPayload::CreateBlueprint {
                    pattern_id: pattern_id.to_string(),
                    variables,
                },
                TaskContext::new(),
                Priority::High,
            )
            .await
            .map_err(|e| escalate(Phase::Planning, e))?;

        match require_completed(Phase::Planning, agent, response)? {
            ResponseData::Blueprint { blueprint, tasks } => Ok((blueprint, tasks)),
            _ => Err(blocked(Phase::Planning, agent, "response carried no blueprint")),
        }
    }

    async fn research(
        &self,
        blueprint: &Blueprint,
        tasks: &[AgentTask],
        context: &TaskContext,
    ) -> Result<ResearchData, PipelineError> {
        let mut research = ResearchData::new();
        if !blueprint.needs_research() {
            info!("No research requirements");
            return Ok(research);
        }

        let mut group = tasks_gated_on(tasks, None);
        if !group
            .iter()
            .any(|t| matches!(t.task, TaskPayload::GatherStatistics { .. }))
        {
            group.push(statistics_task(blueprint, &blueprint.pseo_variables));
        }
        info!("Running {} research tasks", group.len());

        let outcome = self.manager.execute_group(&group, context).await?;
        for (agent, response) in outcome.responses {
            let completed = response.is_completed();
            match response.data {
                ResponseData::Research(data) if completed => {
                    research.insert(agent, data);
                }
                _ => warn!("Dropping research from {} ({:?})", agent, response.status),
            }
        }

        info!("Research complete: {} datasets", research.len());
        Ok(research)
    }

    async fn content(
        &self,
        blueprint: &Blueprint,
        tasks: &[AgentTask],
        context: &TaskContext,
    ) -> Result<PageContent, PipelineError> {
        let task = tasks
            .iter()
            .find(|t| matches!(t.task, TaskPayload::GenerateContent { .. }))
            .cloned()
            .unwrap_or_else(|| {
                AgentTask::new(
                    AgentKind::Copywriting.name(),
                    TaskPayload::GenerateContent {
                        sections: blueprint.sections_needed.clone(),
                        variables: blueprint.pseo_variables.clone(),
                    },
                    Priority::High,
                )
            });

        let response = self
            .manager
            .send_message(ORCHESTRATOR, &task.agent, task.task, context.clone(), task.priority)
            .await
            .map_err(|e| escalate(Phase::Content, e))?;

        match require_completed(Phase::Content, &task.agent, response)? {
            ResponseData::Content(content) => {
                info!("Content generated: {}", content.hero.h1);
                Ok(content)
            }
            _ => Err(blocked(Phase::Content, &task.agent, "response carried no page content")),
        }
    }

    async fn supplementary(
        &self,
        blueprint: &Blueprint,
        tasks: &[AgentTask],
        content: &PageContent,
        context: &TaskContext,
    ) -> Result<Supplementary, PipelineError> {
        let mut group = tasks_gated_on(tasks, Some(Milestone::ContentComplete));
        if !blueprint.comparison_table {
            group.retain(|t| !matches!(t.task, TaskPayload::GenerateComparisonTable { .. }));
        }
        for task in &mut group {
            match &mut task.task {
                TaskPayload::GenerateMetadata { h1, .. } => *h1 = content.hero.h1.clone(),
                TaskPayload::GenerateFaqs { count, .. } => {
                    if let Some(n) = self.faq_count {
                        *count = Some(n);
                    }
                }
                _ => {}
            }
        }

        let outcome = self.manager.execute_group(&group, context).await?;

        let mut supplementary = Supplementary::default();
        for (agent, response) in outcome.responses {
            if !response.is_completed() {
                warn!("{} did not complete ({:?})", agent, response.status);
                continue;
            }
            match response.data {
                ResponseData::Faqs(faqs) => supplementary.faqs = faqs,
                ResponseData::Metadata(metadata) => supplementary.metadata = metadata,
                ResponseData::ComparisonTable(rows) => supplementary.comparison_table = rows,
                _ => warn!("Ignoring unexpected data from {}", agent),
            }
        }

        info!(
            "Supplementary content: {} FAQs, {} comparison rows",
            supplementary.faqs.len(),
            supplementary.comparison_table.len()
        );
        Ok(supplementary)
    }

    async fn schema(
        &self,
        blueprint: &Blueprint,
        tasks: &[AgentTask],
        url_slug: &str,
        content: &PageContent,
        supplementary: &Supplementary,
        context: &TaskContext,
    ) -> Result<Vec<serde_json::Value>, PipelineError> {
        let priority = tasks
            .iter()
            .find(|t| matches!(t.task, TaskPayload::GenerateSchema { .. }))
            .map_or(Priority::Medium, |t| t.priority);

        let result = self
            .manager
            .send_message(
                ORCHESTRATOR,
                AgentKind::SchemaMarkup.name(),
                TaskPayload::GenerateSchema {
                    pattern_id: blueprint.pattern_id.clone(),
                    url_slug: url_slug.to_string(),
                    page_data: content.clone(),
                    faqs: supplementary.faqs.clone(),
                    meta: supplementary.metadata.clone(),
                },
                context.clone(),
                priority,
            )
            .await;

        match result {
            Ok(response) => {
                let completed = response.is_completed();
                match response.data {
                    ResponseData::Schema(schemas) if completed => {
                        info!("Generated {} schema types", schemas.len());
                        Ok(schemas)
                    }
                    _ => {
                        warn!("Schema markup did not complete, continuing without it");
                        Ok(Vec::new())
                    }
                }
            }
            Err(e) if is_wiring(&e) => Err(e.into()),
            Err(e) => {
                warn!("Schema markup failed, continuing without it: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Record the verdict on the page; an erroring reviewer leaves it pending
    async fn quality_control(
        &self,
        blueprint: &Blueprint,
        page: &mut PageOutput,
    ) -> Result<(), PipelineError> {
        let context = TaskContext::new()
            .with_blueprint(blueprint.clone())
            .with_page(page.clone());

        let result = self
            .manager
            .send_message(
                ORCHESTRATOR,
                AgentKind::QualityControl.name(),
                TaskPayload::ReviewPage,
                context,
                Priority::High,
            )
            .await;

        match result {
            Ok(response) => match &response.data {
                ResponseData::Quality(report) => {
                    page.apply_quality(report);
                    info!(
                        "Quality score {:.2}: {:?}",
                        report.overall_score, report.approval_status
                    );
                    for issue in report.issues.iter().take(3) {
                        warn!("Quality issue: {}", issue);
                    }
                }
                _ => warn!("Quality control returned no report; page left pending"),
            },
            Err(e) if is_wiring(&e) => return Err(e.into()),
            Err(e) => warn!("Quality control failed; page left pending: {}", e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pseo_agents::{
        fallback_faqs, required_agents, review_page, Agent, FixedHook, GenerationOptions,
        LlmBackend, LlmError, PLANNED_FAQ_COUNT,
    };
    use pseo_core::{ApprovalStatus, GenerationModel, Message};

    /// Replies chosen by the first marker found in the prompt
    struct ScriptedBackend {
        script: Vec<(&'static str, &'static str)>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            self.script
                .iter()
                .find(|(marker, _)| prompt.contains(marker))
                .map(|(_, reply)| reply.to_string())
                .ok_or_else(|| LlmError::Api("no scripted reply".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const CONTENT: &str = r#"{
        "hero": {
            "h1": "Sozee vs Higgsfield for OnlyFans Creators",
            "eyebrow": "Comparison",
            "subtitle": "Instant likeness from 3 photos, no training required.",
            "primary_cta": "Start Creating Free",
            "secondary_cta": "See Pricing"
        },
        "problem": "Fans want a hundred posts for every one you can shoot. Burnout follows.",
        "solution": "Sozee turns 3 photos into unlimited hyper-realistic content in seconds.",
        "features": [
            {"title": "Instant likeness", "content": "Upload 3 photos and start creating."},
            {"title": "NSFW support", "content": "Full SFW and NSFW creation for creator platforms."}
        ],
        "final_cta": "Start your free trial today."
    }"#;

    const FAQS: &str = r#"[
        {"question": "How is Sozee different from Higgsfield?", "answer": "Sozee needs only 3 photos."},
        {"question": "Is Sozee easier to use than Higgsfield?", "answer": "Yes, there is no training step."},
        {"question": "Can I switch from Higgsfield to Sozee easily?", "answer": "Upload 3 photos and go."},
        {"question": "Does Sozee support NSFW content?", "answer": "Yes, both SFW and NSFW."},
        {"question": "How much does Sozee cost?", "answer": "Creators pay $15/week."}
    ]"#;

    const TABLE: &str = r#"[
        {"feature": "Setup", "sozee": "3 photos", "competitor": "Training required", "sozee_advantage": true},
        {"feature": "Speed", "sozee": "30 seconds", "competitor": "Minutes", "sozee_advantage": true},
        {"feature": "NSFW", "sozee": "Supported", "competitor": "Not supported (SFW only)", "sozee_advantage": true},
        {"feature": "Creator focus", "sozee": "Built for creators", "competitor": "General video", "sozee_advantage": true},
        {"feature": "Privacy", "sozee": "Isolated models", "competitor": "Cloud-based", "sozee_advantage": true},
        {"feature": "Realism", "sozee": "Hyper-realistic", "competitor": "Stylized", "sozee_advantage": true},
        {"feature": "Pricing", "sozee": "$15/week", "competitor": "$9/month", "sozee_advantage": false}
    ]"#;

    fn script() -> Vec<(&'static str, &'static str)> {
        vec![
            ("creating one landing page section", r#"{"headline": "Key differences", "points": ["3 photos", "No training"]}"#),
            ("creating PSEO landing page content", CONTENT),
            ("creating a feature comparison table", TABLE),
            ("creating FAQ content", FAQS),
            (
                "SEO expert creating metadata",
                r#"{"meta_title": "Sozee vs Higgsfield for OnlyFans Creators | Compared", "meta_description": "Compare Sozee and Higgsfield for OnlyFans Creators. Instant 3-photo setup, NSFW support and pricing side by side. Start your free trial today.", "focus_keyword": "sozee vs higgsfield"}"#,
            ),
            (
                "as a competitive AI content tool",
                r#"{"category": "AI Video Platform", "features": {"nsfw_support": false}, "pricing": {"estimate": "$9/month"}}"#,
            ),
            (
                "expert market researcher",
                r#"{"pain_points": ["Burnout", "Content demand"], "desires": ["More time"]}"#,
            ),
            (
                "market research analyst",
                r#"{"key_statistics": [{"stat": "100:1 demand ratio", "credibility": "high"}, {"stat": "Rumor", "credibility": "low"}]}"#,
            ),
        ]
    }

    /// Agent whose every call errors out
    struct Unavailable(AgentKind);

    #[async_trait]
    impl Agent for Unavailable {
        fn kind(&self) -> AgentKind {
            self.0
        }

        async fn execute(&self, _message: &Message) -> Result<Response, AgentError> {
            Err(AgentError::Parse("service unavailable".to_string()))
        }
    }

    fn orchestrator(script: Vec<(&'static str, &'static str)>) -> (Orchestrator, Arc<KnowledgeBase>) {
        orchestrator_without(script, &[])
    }

    fn orchestrator_without(
        script: Vec<(&'static str, &'static str)>,
        unavailable: &[AgentKind],
    ) -> (Orchestrator, Arc<KnowledgeBase>) {
        let library = Arc::new(PatternLibrary::load_embedded().unwrap());
        let kb = Arc::new(KnowledgeBase::in_memory());
        let mut registry = AgentRegistry::standard(
            Arc::new(ScriptedBackend { script }),
            kb.clone(),
            library.clone(),
            Arc::new(FixedHook("Your content, multiplied".to_string())),
            Duration::from_secs(5),
        );
        for kind in unavailable {
            registry.register(Arc::new(Unavailable(*kind)));
        }
        (Orchestrator::with_registry(registry, library), kb)
    }

    fn variables(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_comparison_page_end_to_end() {
        let (orchestrator, kb) = orchestrator(script());
        let run = orchestrator
            .generate_run(
                "1",
                variables(&[("competitor", "Higgsfield"), ("audience", "OnlyFans Creators")]),
            )
            .await
            .unwrap();
        let page = &run.page;

        assert_eq!(page.pattern_id, "1");
        assert_eq!(page.post_title, "Sozee vs Higgsfield for OnlyFans Creators");
        assert_eq!(page.url_slug, "/compare/sozee-vs-higgsfield-for-onlyfans-creators");
        assert_eq!(page.faq_json.len(), 5);
        assert_eq!(page.comparison_table_json.len(), 7);
        assert_eq!(page.meta_title, "Sozee vs Higgsfield for OnlyFans Creators | Compared");
        assert_eq!(page.pattern_sections.len(), 2);
        assert_eq!(page.research_sources.len(), 3);
        assert_eq!(page.agents_used, required_agents("1", GenerationModel::Research));
        assert!(!page.agents_used.contains(&"Comparison_Table_Agent".to_string()));

        let types: Vec<&str> = page
            .schema_markup
            .iter()
            .filter_map(|s| s["@type"].as_str())
            .collect();
        assert!(types.contains(&"FAQPage"));
        assert!(types.contains(&"Product"));

        assert!((0.0..=1.0).contains(&page.quality_score));
        assert_ne!(page.uniqueness_check, ApprovalStatus::Pending);

        let phases: Vec<Phase> = run.phases.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Planning,
                Phase::Research,
                Phase::Content,
                Phase::Supplementary,
                Phase::Schema,
                Phase::Assembly,
                Phase::QualityControl,
            ]
        );
        // ten dispatches, each answered
        assert_eq!(run.messages_exchanged, 20);
        assert!(kb.profile_exists("Higgsfield").unwrap());
    }

    #[tokio::test]
    async fn test_failed_side_agents_degrade() {
        let script: Vec<_> = script()
            .into_iter()
            .filter(|(marker, _)| !matches!(*marker, "market research analyst" | "creating FAQ content"))
            .collect();
        let (orchestrator, _) = orchestrator_without(
            script,
            &[AgentKind::AudienceInsight, AgentKind::SeoOptimization],
        );
        let v = variables(&[("competitor", "Higgsfield"), ("audience", "OnlyFans Creators")]);

        let run = orchestrator.generate_run("1", v.clone()).await.unwrap();
        let page = &run.page;

        // audience research dropped, statistics fell back to stock data
        let sources: Vec<&str> = page.research_sources.iter().map(|s| s.agent.as_str()).collect();
        assert_eq!(sources, vec!["Competitor_Research_Agent", "Statistics_Agent"]);

        // metadata defaulted to the hero copy
        assert_eq!(page.meta_title, page.post_title);
        assert_eq!(page.meta_description, page.hero_section.subtitle);

        let expected_faqs = fallback_faqs("1", &v, PLANNED_FAQ_COUNT);
        assert_eq!(page.faq_json, expected_faqs);
        assert_eq!(page.comparison_table_json.len(), 7);
        assert_ne!(page.uniqueness_check, ApprovalStatus::Pending);
        // two of the ten dispatches never answered
        assert_eq!(run.messages_exchanged, 18);
    }

    #[tokio::test]
    async fn test_rejected_page_is_still_returned() {
        let (orchestrator, _) = orchestrator_without(
            vec![(
                "creating PSEO landing page content",
                r#"{"hero": {"h1": "Guaranteed 300% more fans: revolutionize, revolutionize, revolutionize, revolutionize. It cannot fail, impossible to beat, no terrible failure"}}"#,
            )],
            &[AgentKind::SeoOptimization],
        );

        let page = orchestrator
            .generate_page(
                "4",
                variables(&[("competitor", "Krea"), ("audience", "Fitness Models")]),
            )
            .await
            .unwrap();

        assert_eq!(page.uniqueness_check, ApprovalStatus::Rejected);
        assert!(page.quality_score < 0.7);
        assert!(page.problem_agitation.is_empty());
        let report = review_page(&page);
        assert!(!report.passed());
        assert!((page.quality_score - report.overall_score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_pattern_blocks_planning() {
        let (orchestrator, _) = orchestrator(script());
        let err = orchestrator
            .generate_page("42", variables(&[("audience", "Creators")]))
            .await
            .unwrap_err();

        match err {
            PipelineError::Blocking { phase, agent, details } => {
                assert_eq!(phase, Phase::Planning);
                assert_eq!(agent, "PSEO_Strategist_Agent");
                assert!(details.contains("42"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_copywriting_failure_aborts_run() {
        let (orchestrator, _) = orchestrator(Vec::new());
        let err = orchestrator
            .generate_page(
                "4",
                variables(&[("competitor", "Krea"), ("audience", "Fitness Models")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Blocking { phase: Phase::Content, ref agent, .. } if agent == "Copywriting_Agent"
        ));
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut clock = PhaseClock::start();
        clock.advance(Phase::Research).unwrap();
        clock.advance(Phase::Content).unwrap();

        assert!(matches!(
            clock.advance(Phase::Research),
            Err(PipelineError::PhaseOrder { from: Phase::Content, to: Phase::Research })
        ));
        assert!(clock.advance(Phase::Content).is_err());

        let timings = clock.finish().unwrap();
        assert_eq!(timings.len(), 3);
    }

    #[test]
    fn test_config_dir_without_overrides_uses_embedded() {
        let dir = std::env::temp_dir().join(format!("pseo-config-{}", uuid::Uuid::new_v4()));
        let config = PipelineConfig::new(Arc::new(ScriptedBackend { script: Vec::new() }))
            .with_kb_path(None)
            .with_config_dir(Some(dir));

        assert_eq!(config.load_patterns().unwrap().len(), 6);
        assert!(!config.load_hooks().unwrap().is_empty());
        assert!(config.open_kb().unwrap().path().is_none());
    }
}
