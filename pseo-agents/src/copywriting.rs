//! Copywriting Agent
//!
//! Turns the blueprint and collected research into landing page copy.
//! The main copy and every pattern-specific section are separate LLM
//! calls issued concurrently; a failed section is simply left out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use pseo_core::{
    render_placeholders, Blueprint, Hero, Message, PageContent, Pattern, PatternLibrary,
    ResearchData, Response, ResponseData, SectionTemplate, Source, TaskPayload, Variables,
    DEFAULT_AUDIENCE,
};

use crate::{
    ask_json, coerce, Agent, AgentConfig, AgentError, AgentKind, GenerationOptions, SharedBackend,
    SharedHookSelector,
};

/// Research excerpt length per agent in prompts
const RESEARCH_EXCERPT_CHARS: usize = 1000;

const FALLBACK_H1: &str = "Sozee AI Content Studio";

const COPY_PROMPT: &str = r#"You are an expert copywriter for Sozee.ai, creating PSEO landing page content.

**PATTERN CONTEXT:**
- Pattern: {pattern_name} (Pattern {pattern_id})
- H1 Title: {h1}
- Eyebrow: {eyebrow}
- Pattern Angle: {angle}

**TARGET VARIABLES:**
{variables}

**SECTIONS REQUESTED:** {sections}

**VIRAL HOOK TO USE:**
{hook}
(Use this as the opening sentence or headline of the problem section)

**RESEARCH DATA:**
{research}

**For this pattern, emphasize:**
{emphasis}

**SOZEE KEY DIFFERENTIATORS:**
- 3 PHOTOS MINIMUM: instant likeness reconstruction, no training, no waiting
- THE CONTENT CRISIS SOLUTION: solves the 100:1 demand ratio (fans want 100x more content)
- HYPER-REALISTIC: indistinguishable from real photoshoots, not "AI art"
- TOTAL PRIVACY: your likeness is yours alone, isolated models never used for training
- INFINITE CONTENT ENGINE: 3 photos to unlimited photos and videos
- MONETIZATION-FIRST DESIGN: built for creator businesses
- SFW & NSFW CAPABILITIES: complete creative freedom
- AGENCY WORKFLOWS: team access, approval flows, multi-creator support

**BRAND VOICE:**
Direct, confident, slightly edgy. Speak to the Content Crisis and creator burnout.
Use "you" language. Be specific with numbers (3 photos, 100:1 ratio, infinite content).

**WRITING GUIDELINES:**
- Keep paragraphs SHORT (2-4 sentences max)
- Use specific examples from the research data
- Include real pain points identified for {audience}
- Emphasize OUTCOMES over features
- Natural keyword integration (no stuffing)

**OUTPUT AS JSON:**
{
  "hero": {
    "h1": "{h1}",
    "eyebrow": "{eyebrow}",
    "subtitle": "Compelling subtitle under 150 chars",
    "primary_cta": "{primary_cta}",
    "secondary_cta": "{secondary_cta}"
  },
  "problem": "Problem agitation in Markdown (start with the hook, 3-4 paragraphs + 3 bullets)",
  "solution": "Solution overview in Markdown (Sozee value prop + 3 benefits)",
  "features": [{"title": "Feature", "content": "Benefit-focused description"}],
  "comparison_table": {comparison_instruction},
  "final_cta": "Final call to action (reinforce the pattern angle)"
}

Return ONLY valid JSON."#;

const SECTION_PROMPT: &str = r#"You are an expert copywriter for Sozee.ai creating one landing page section.

**SECTION: {name}** (ID: {id})

**TASK:**
{task}

**COMPONENTS TO GENERATE:** {components}

**VARIABLES:**
{variables}

**RESEARCH DATA:**
{research}

**OUTPUT FORMAT (JSON):**
{
  "heading": "Section heading (8-12 words, benefit-focused)",
  "subheading": "Optional intro (2-3 sentences) or null",
  "content": [
    {"item_heading": "Heading or null", "item_body": "Body (markdown supported)", "icon_suggestion": "icon name or null"}
  ],
  "visual_style": "{visual_style}",
  "cta_text": "Optional CTA text or null"
}

Return ONLY valid JSON matching this structure."#;

const COMPARISON_INSTRUCTION: &str = r#"[
    {"feature": "Setup", "sozee": "3 photos, no training", "competitor": "Use competitor data"},
    {"feature": "NSFW Support", "sozee": "Full support", "competitor": "Use competitor data"},
    {"feature": "Creator Focus", "sozee": "Built for OnlyFans", "competitor": "Use competitor data"}
  ]"#;

fn var<'a>(variables: &'a Variables, name: &str, default: &'a str) -> &'a str {
    variables
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// Copy angle for a pattern
pub fn pattern_angle(pattern_id: &str, variables: &Variables) -> String {
    let competitor = var(variables, "competitor", "");
    let audience = var(variables, "audience", DEFAULT_AUDIENCE);
    let use_case = var(variables, "use_case", "");

    match pattern_id {
        "1" => format!("COMPARISON ANGLE: Emphasize how Sozee differs from {competitor}. Show side-by-side feature comparison. Highlight Sozee's creator-specific advantages (instant likeness, NSFW support, OnlyFans optimization)."),
        "2" => format!("BEST TOOL ANGLE: Position Sozee as the #1 ranked {use_case} tool for {audience}. Support with specific advantages. Use authoritative language."),
        "3" => format!("DIRECT TOOL ANGLE: Explain exactly what Sozee does and why it's perfect for {audience}. Focus on specific use case benefits. Be clear and benefit-focused."),
        "4" => format!("ALTERNATIVE ANGLE: Explain why {audience} are switching from {competitor} to Sozee. Address {competitor}'s limitations directly. Position Sozee as the better choice."),
        "5" => format!("REVIEW ANGLE: Provide an honest, balanced evaluation of Sozee for {audience}. Include pros, cons and recommendations. Be trustworthy and authoritative."),
        "6" => "CONTENT CRISIS ANGLE: Emphasize the 100:1 supply/demand problem. Show how Sozee solves creator burnout and content bottlenecks. Use urgent language around the crisis.".to_string(),
        _ => "Focus on Sozee's value proposition and benefits.".to_string(),
    }
}

fn pattern_emphasis(pattern_id: &str, variables: &Variables) -> String {
    let competitor = var(variables, "competitor", "");

    match pattern_id {
        "1" => format!("- Why Sozee is better than {competitor} for creators\n- Specific feature differences (setup, NSFW, ease of use)\n- Creator-specific advantages\n- Pricing comparison if available"),
        "2" => "- Why Sozee ranks #1\n- Unique creator-focused features\n- Success stories or results\n- What makes it better than alternatives".to_string(),
        "3" => "- Specific benefits for this platform\n- How easy it is to use\n- Speed and quality of results\n- Perfect use case fit".to_string(),
        "4" => format!("- Why users are leaving {competitor}\n- What {competitor} lacks\n- Migration ease\n- Immediate benefits of switching"),
        "5" => "- Honest pros and cons\n- Who it's perfect for\n- Value for money\n- Recommendation strength".to_string(),
        "6" => "- The 100:1 crisis reality\n- Creator burnout epidemic\n- How Sozee uniquely solves it\n- Dramatic before/after outcomes".to_string(),
        _ => "- Key benefits\n- Use case fit\n- Call to action".to_string(),
    }
}

fn format_variables(variables: &Variables) -> String {
    variables
        .iter()
        .map(|(name, value)| {
            let label = name
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    chars
                        .next()
                        .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!("- {}: {}", label, value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_research(research: &ResearchData) -> String {
    if research.is_empty() {
        return "No research data available".to_string();
    }

    research
        .iter()
        .map(|(agent, data)| {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_default();
            let excerpt: String = pretty.chars().take(RESEARCH_EXCERPT_CHARS).collect();
            format!("**From {}:**\n{}", agent, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Minimal templated copy used when the model output is unusable
pub fn fallback_content(pattern: &Pattern, h1: &str, hook: &str) -> PageContent {
    PageContent {
        hero: Hero {
            h1: if h1.trim().is_empty() {
                FALLBACK_H1.to_string()
            } else {
                h1.to_string()
            },
            eyebrow: String::new(),
            subtitle: "Transform your content creation workflow".to_string(),
            primary_cta: pattern.primary_cta.clone(),
            secondary_cta: pattern.secondary_cta.clone(),
        },
        problem: format!("# The Challenge\n\n{}", hook),
        solution: "Sozee solves this with AI-powered content generation.".to_string(),
        final_cta: "Ready to transform your content? Start your free trial today.".to_string(),
        ..PageContent::default()
    }
}

pub struct CopywritingAgent {
    config: AgentConfig,
    backend: SharedBackend,
    library: Arc<PatternLibrary>,
    hooks: SharedHookSelector,
}

impl CopywritingAgent {
    pub fn new(
        config: AgentConfig,
        backend: SharedBackend,
        library: Arc<PatternLibrary>,
        hooks: SharedHookSelector,
    ) -> Self {
        Self {
            config,
            backend,
            library,
            hooks,
        }
    }

    /// One pattern section; `None` if the call or its output fails
    async fn generate_section(
        &self,
        section: &SectionTemplate,
        variables: &Variables,
        research: &str,
    ) -> Option<(String, Value)> {
        let task = render_placeholders(
            section.generation_prompt.as_deref().unwrap_or_default(),
            variables,
        );
        let prompt = SECTION_PROMPT
            .replace("{name}", &section.name)
            .replace("{id}", &section.id)
            .replace("{task}", &task)
            .replace("{components}", &section.components.join(", "))
            .replace("{visual_style}", section.visual_style.as_deref().unwrap_or("default"))
            .replace("{variables}", &format_variables(variables))
            .replace("{research}", research);

        match ask_json::<Value>(&self.backend, &self.config, &prompt, GenerationOptions::new(2000, 0.8)).await {
            Ok(content) if content.is_object() => Some((section.id.clone(), content)),
            Ok(_) => {
                warn!("Section {} came back as a non-object", section.id);
                None
            }
            Err(e) => {
                warn!("Error generating section {}: {}", section.id, e);
                None
            }
        }
    }

    fn copy_prompt(
        &self,
        blueprint: &Blueprint,
        pattern: &Pattern,
        variables: &Variables,
        sections: &[String],
        h1: &str,
        hook: &str,
        research: &str,
    ) -> String {
        let eyebrow = pattern.render_eyebrow(variables);
        let comparison = if pattern.show_comparison_table {
            COMPARISON_INSTRUCTION
        } else {
            "[]"
        };

        COPY_PROMPT
            .replace("{pattern_name}", &blueprint.pattern_name)
            .replace("{pattern_id}", &pattern.id)
            .replace("{h1}", h1)
            .replace("{eyebrow}", &eyebrow)
            .replace("{angle}", &pattern_angle(&pattern.id, variables))
            .replace("{emphasis}", &pattern_emphasis(&pattern.id, variables))
            .replace("{variables}", &format_variables(variables))
            .replace("{sections}", &sections.join(", "))
            .replace("{hook}", hook)
            .replace("{research}", research)
            .replace("{audience}", var(variables, "audience", DEFAULT_AUDIENCE))
            .replace("{primary_cta}", &pattern.primary_cta)
            .replace("{secondary_cta}", &pattern.secondary_cta)
            .replace("{comparison_instruction}", comparison)
    }
}

#[async_trait]
impl Agent for CopywritingAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Copywriting
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GenerateContent {
            sections,
            variables,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let blueprint = message
            .context
            .blueprint
            .as_ref()
            .ok_or_else(|| AgentError::missing(self.kind(), "blueprint"))?;

        let Some(pattern) = self.library.get(&blueprint.pattern_id) else {
            return Ok(Response::builder(
                message,
                ResponseData::error(format!("Pattern {} not found", blueprint.pattern_id)),
            )
            .failed()
            .elapsed(start)
            .build());
        };

        let variables = if variables.is_empty() {
            message.context.page_variables()
        } else {
            variables
        };
        let h1 = pattern.render_h1(variables);
        let hook = self.hooks.select();
        let research = format_research(&message.context.research_data);
        let prompt = self.copy_prompt(blueprint, pattern, variables, sections, &h1, &hook, &research);

        info!("Writing copy for '{}'", h1);
        let section_calls = pattern
            .generated_sections()
            .map(|section| self.generate_section(section, variables, &research));
        let (section_results, main) = tokio::join!(
            join_all(section_calls),
            ask_json::<Value>(
                &self.backend,
                &self.config,
                &prompt,
                GenerationOptions::new(4000, 0.8),
            )
        );
        let pattern_sections: BTreeMap<String, Value> =
            section_results.into_iter().flatten().collect();

        let response = match main.and_then(|copy| coerce::page_content(&copy)) {
            Ok(mut content) => {
                if content.hero.h1.trim().is_empty() {
                    content.hero.h1 = h1;
                }
                if content.hero.eyebrow.trim().is_empty() {
                    content.hero.eyebrow = pattern.render_eyebrow(variables);
                }
                if content.hero.primary_cta.trim().is_empty() {
                    content.hero.primary_cta = pattern.primary_cta.clone();
                }
                if content.hero.secondary_cta.trim().is_empty() {
                    content.hero.secondary_cta = pattern.secondary_cta.clone();
                }
                content.pattern_sections = pattern_sections;

                info!(
                    "Content generation complete ({} pattern-specific sections)",
                    content.pattern_sections.len()
                );
                Response::builder(message, ResponseData::Content(content))
                    .source(Source::model("ai_generation", self.backend.model_name()))
                    .confidence(0.9)
            }
            Err(AgentError::Llm(e)) => {
                warn!("Copy generation call failed: {}", e);
                Response::builder(message, ResponseData::error(e.to_string())).failed()
            }
            Err(e) => {
                warn!("Copy output unusable, using minimal content: {}", e);
                let mut content = fallback_content(pattern, &h1, &hook);
                content.pattern_sections = pattern_sections;
                Response::builder(message, ResponseData::Content(content))
                    .source(Source::note("fallback", "Templated minimal copy"))
                    .confidence(0.5)
            }
        };

        Ok(response.elapsed(start).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, shared, vars, MockBackend};
    use crate::{FixedHook, StrategistAgent};
    use pseo_core::TaskContext;

    fn setup(backend: &Arc<MockBackend>) -> (CopywritingAgent, Message) {
        let library = Arc::new(PatternLibrary::load_embedded().unwrap());
        let variables = vars(&[("competitor", "Higgsfield"), ("audience", "OnlyFans Creators")]);
        let pattern = library.get("1").unwrap().clone();
        let (blueprint, _) = StrategistAgent::new(library.clone()).plan(&pattern, &variables);

        let agent = CopywritingAgent::new(
            AgentConfig::default(),
            shared(backend),
            library,
            Arc::new(FixedHook("Fans want 100x more content".to_string())),
        );
        let msg = message(
            AgentKind::Copywriting,
            TaskPayload::GenerateContent {
                sections: blueprint.sections_needed.clone(),
                variables: Variables::new(),
            },
            TaskContext::new().with_blueprint(blueprint),
        );
        (agent, msg)
    }

    #[tokio::test]
    async fn test_fills_hero_and_pattern_sections() {
        let backend = MockBackend::replying(
            r#"{"hero": {"h1": "", "subtitle": "Stop the grind"}, "problem": "P", "solution": "S", "final_cta": "F"}"#,
        );
        let (agent, msg) = setup(&backend);

        let response = agent.execute(&msg).await.unwrap();
        let ResponseData::Content(content) = &response.data else {
            panic!("unexpected data");
        };

        assert_eq!(content.hero.h1, "Sozee vs Higgsfield for OnlyFans Creators");
        assert_eq!(content.hero.primary_cta, "Start Creating Free");
        assert_eq!(content.hero.subtitle, "Stop the grind");
        assert_eq!(
            content.pattern_sections.keys().collect::<Vec<_>>(),
            vec!["key_differences", "use_case_fit"]
        );
        assert_eq!(response.confidence, 0.9);
        assert_eq!(backend.calls(), 3);
        assert!(backend
            .prompts()
            .iter()
            .any(|p| p.contains("Fans want 100x more content")));
    }

    #[tokio::test]
    async fn test_loosely_typed_copy_is_kept() {
        let backend = MockBackend::replying(
            r#"{"hero": {"h1": "Sozee vs Higgsfield", "subtitle": null},
                "problem": "Burnout is real.", "solution": "Three photos.",
                "features": ["Instant likeness"],
                "comparison_table": [{"feature": "Setup", "sozee": "3 photos", "competitor": "Training", "sozee_advantage": "yes"}],
                "final_cta": "Start now"}"#,
        );
        let (agent, msg) = setup(&backend);

        let response = agent.execute(&msg).await.unwrap();
        let ResponseData::Content(content) = &response.data else {
            panic!("unexpected data");
        };

        assert_eq!(response.confidence, 0.9);
        assert_eq!(content.problem, "Burnout is real.");
        assert_eq!(content.hero.subtitle, "");
        assert_eq!(content.features[0].title, "Instant likeness");
        assert_eq!(content.comparison_table[0].sozee_advantage, Some(true));
    }

    #[tokio::test]
    async fn test_unparseable_output_gives_minimal_copy() {
        let backend = MockBackend::replying("Sorry, I can't help with that");
        let (agent, msg) = setup(&backend);

        let response = agent.execute(&msg).await.unwrap();
        assert!(response.is_completed());
        assert_eq!(response.confidence, 0.5);
        let ResponseData::Content(content) = &response.data else {
            panic!("unexpected data");
        };
        assert_eq!(content.problem, "# The Challenge\n\nFans want 100x more content");
        assert!(content.pattern_sections.is_empty());
    }

    #[tokio::test]
    async fn test_call_failure_fails_response() {
        let backend = MockBackend::failing();
        let (agent, msg) = setup(&backend);

        let response = agent.execute(&msg).await.unwrap();
        assert!(!response.is_completed());
        assert!(response.data.error_message().is_some());
    }

    #[tokio::test]
    async fn test_blueprint_required() {
        let backend = MockBackend::replying("{}");
        let (agent, mut msg) = setup(&backend);
        msg.context.blueprint = None;

        let err = agent.execute(&msg).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingContext { .. }));
        assert_eq!(backend.calls(), 0);
    }
}
