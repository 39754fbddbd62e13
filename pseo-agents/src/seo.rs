//! SEO Optimization Agent
//!
//! Meta title, description and focus keyword. Length targets are soft on
//! the model path and hard on the fallback path.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use pseo_core::{Message, Response, ResponseData, SeoMetadata, Source, TaskPayload, Variables, BRAND_NAME};

use crate::{ask_json, coerce, Agent, AgentConfig, AgentError, AgentKind, GenerationOptions, SharedBackend};

pub const TITLE_MIN: usize = 50;
pub const TITLE_MAX: usize = 60;
pub const DESCRIPTION_MIN: usize = 150;
pub const DESCRIPTION_MAX: usize = 160;

const FALLBACK_H1: &str = "Sozee AI Content Studio";

const SEO_PROMPT: &str = r#"You are an SEO expert creating metadata for a Sozee landing page.

**H1**: {h1}
**Pattern**: {pattern_id}
**Variables**: {variables}

**CRITICAL Requirements:**
1. meta_title: 50-60 characters, must include "Sozee", front-load the primary keyword
2. meta_description: 150-160 characters, main benefit plus a CTA phrase ("Start free trial", "Compare features")
3. focus_keyword: primary keyword phrase from the H1
4. secondary_keywords: 3-5 related phrases

**PATTERN-SPECIFIC GUIDANCE:**
{examples}

**Output as JSON:**
{
  "meta_title": "50-60 char title with Sozee",
  "meta_description": "150-160 char description with benefit and CTA",
  "focus_keyword": "primary keyword phrase",
  "secondary_keywords": ["..."]
}

Count characters! Return ONLY valid JSON."#;

fn var<'a>(variables: &'a Variables, name: &str, default: &'a str) -> &'a str {
    variables
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn meta_examples(pattern_id: &str, variables: &Variables) -> String {
    let competitor = var(variables, "competitor", "[competitor]");
    let audience = var(variables, "audience", "[audience]");
    let use_case = var(variables, "use_case", "[use case]");
    let platform = var(variables, "platform", "[platform]");

    match pattern_id {
        "1" => format!("Title: \"Sozee vs {competitor} for {audience} | AI Comparison\"\nDescription: \"Compare Sozee and {competitor} for {audience}. See features, pricing, and which AI content tool solves the content crisis. Free trial available.\""),
        "2" => format!("Title: \"Best {use_case} for {audience} | Sozee\"\nDescription: \"Discover the best {use_case} for {audience}. Solve creator burnout with AI-powered content. Start free trial today.\""),
        "3" => format!("Title: \"{platform} Tools | Sozee AI Content Studio\"\nDescription: \"Professional {platform} content tools. Generate unlimited hyper-realistic content and scale without burnout. Start your free trial today.\""),
        "4" => format!("Title: \"{competitor} Alternative for {audience} | Sozee\"\nDescription: \"Looking for a {competitor} alternative? {audience} are switching to Sozee for instant setup and NSFW support. Compare features now.\""),
        "5" => format!("Title: \"Sozee Review for {audience} | Honest AI Tool Analysis\"\nDescription: \"Honest Sozee review for {audience}. Pros, cons, pricing, and features. Is Sozee worth it for AI content creation? Read our analysis.\""),
        "6" => format!("Title: \"Content Crisis Solution for {audience} | Sozee\"\nDescription: \"Solve the content crisis for {audience}. Generate unlimited AI content and scale without creator burnout. See how Sozee solves the 100:1 problem.\""),
        _ => "Create compelling SEO metadata".to_string(),
    }
}

/// First `max` characters (Unicode scalar values) of `text`
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Templated metadata within the hard length bounds
pub fn fallback_metadata(h1: &str) -> SeoMetadata {
    let h1 = if h1.trim().is_empty() { FALLBACK_H1 } else { h1.trim() };
    SeoMetadata {
        meta_title: truncate_chars(&format!("{} | {}", h1, BRAND_NAME), TITLE_MAX),
        meta_description: truncate_chars(
            &format!(
                "{}. AI-powered content generation for creators. Start your free trial today and transform your workflow.",
                h1
            ),
            DESCRIPTION_MAX,
        ),
        focus_keyword: h1.to_lowercase(),
        secondary_keywords: Vec::new(),
    }
}

fn warn_on_lengths(metadata: &SeoMetadata) {
    let title = metadata.meta_title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&title) {
        warn!("Meta title length: {} (should be {}-{})", title, TITLE_MIN, TITLE_MAX);
    }
    let description = metadata.meta_description.chars().count();
    if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&description) {
        warn!(
            "Meta description length: {} (should be {}-{})",
            description, DESCRIPTION_MIN, DESCRIPTION_MAX
        );
    }
}

pub struct SeoOptimizationAgent {
    config: AgentConfig,
    backend: SharedBackend,
}

impl SeoOptimizationAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend) -> Self {
        Self { config, backend }
    }
}

#[async_trait]
impl Agent for SeoOptimizationAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SeoOptimization
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GenerateMetadata { h1, pattern_id } = &message.task else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let variables = message.context.page_variables();

        let prompt = SEO_PROMPT
            .replace("{h1}", h1)
            .replace("{pattern_id}", pattern_id)
            .replace("{variables}", &serde_json::to_string(variables)?)
            .replace("{examples}", &meta_examples(pattern_id, variables));

        let result: Result<SeoMetadata, AgentError> = ask_json::<Value>(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(500, 0.5),
        )
        .await
        .and_then(|reply| coerce::seo_metadata(&reply));

        let response = match result {
            Ok(metadata)
                if !metadata.meta_title.trim().is_empty()
                    && !metadata.meta_description.trim().is_empty() =>
            {
                warn_on_lengths(&metadata);
                info!("SEO metadata generated");
                Response::builder(message, ResponseData::Metadata(metadata))
                    .source(Source::model("ai_generation", self.backend.model_name()))
                    .confidence(0.95)
            }
            other => {
                match other {
                    Err(e) => warn!("Error generating metadata: {}", e),
                    Ok(_) => warn!("Metadata is missing a title or description"),
                }
                Response::builder(message, ResponseData::Metadata(fallback_metadata(h1)))
                    .source(Source::note("fallback", "Templated metadata"))
                    .confidence(0.6)
            }
        };

        Ok(response.elapsed(start).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, shared, MockBackend};
    use pseo_core::TaskContext;

    fn msg(h1: &str) -> Message {
        message(
            AgentKind::SeoOptimization,
            TaskPayload::GenerateMetadata {
                h1: h1.to_string(),
                pattern_id: "1".to_string(),
            },
            TaskContext::new(),
        )
    }

    #[test]
    fn test_fallback_bounds_for_long_h1() {
        let h1 = "Sozee vs An Extraordinarily Long Competitor Name for Every Kind of Independent Creator Out There Today";
        let meta = fallback_metadata(h1);

        assert!(meta.meta_title.chars().count() <= TITLE_MAX);
        assert!(meta.meta_description.chars().count() <= DESCRIPTION_MAX);
        assert_eq!(meta.focus_keyword, h1.to_lowercase());
    }

    #[test]
    fn test_fallback_counts_characters_not_bytes() {
        let h1 = "Créateurs ".repeat(10);
        let meta = fallback_metadata(&h1);
        assert_eq!(meta.meta_title.chars().count(), TITLE_MAX);
        assert_eq!(fallback_metadata("").meta_title, "Sozee AI Content Studio | Sozee");
    }

    #[tokio::test]
    async fn test_model_metadata_kept_despite_length() {
        let backend = MockBackend::replying(
            r#"{"meta_title": "Sozee vs Higgsfield", "meta_description": "Short.", "focus_keyword": "sozee vs higgsfield"}"#,
        );
        let agent = SeoOptimizationAgent::new(AgentConfig::default(), shared(&backend));

        let response = agent.execute(&msg("Sozee vs Higgsfield")).await.unwrap();
        let ResponseData::Metadata(meta) = &response.data else {
            panic!("unexpected data");
        };
        assert_eq!(meta.meta_title, "Sozee vs Higgsfield");
        assert_eq!(response.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_null_keywords_keep_model_metadata() {
        let backend = MockBackend::replying(
            r#"{"meta_title": "Sozee vs Higgsfield", "meta_description": "Compare both tools.", "secondary_keywords": null}"#,
        );
        let agent = SeoOptimizationAgent::new(AgentConfig::default(), shared(&backend));

        let response = agent.execute(&msg("Sozee vs Higgsfield")).await.unwrap();
        let ResponseData::Metadata(meta) = &response.data else {
            panic!("unexpected data");
        };
        assert_eq!(response.confidence, 0.95);
        assert_eq!(meta.meta_description, "Compare both tools.");
        assert!(meta.secondary_keywords.is_empty());
    }

    #[tokio::test]
    async fn test_empty_title_falls_back() {
        let backend = MockBackend::replying(r#"{"meta_title": "", "meta_description": "x"}"#);
        let agent = SeoOptimizationAgent::new(AgentConfig::default(), shared(&backend));

        let response = agent.execute(&msg("Krea Alternative")).await.unwrap();
        let ResponseData::Metadata(meta) = &response.data else {
            panic!("unexpected data");
        };
        assert_eq!(meta.meta_title, "Krea Alternative | Sozee");
        assert_eq!(response.confidence, 0.6);
    }
}
