//! FAQ Generator Agent

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use pseo_core::{Faq, Message, Response, ResponseData, Source, TaskPayload, Variables};

use crate::{ask_json, coerce, Agent, AgentConfig, AgentError, AgentKind, GenerationOptions, SharedBackend};

/// Questions requested when the task does not say
pub const DEFAULT_FAQ_COUNT: usize = 10;

const FAQ_PROMPT: &str = r#"You are creating FAQ content for a Sozee landing page.

**Page Context**: {context}
**Pattern ID**: {pattern_id}
**Variables**: {variables}

**Task**: Create {count} frequently asked questions and answers.

**PATTERN-SPECIFIC QUESTION TYPES** (use these as templates):
{question_types}

**Requirements:**
1. Questions MUST be natural language queries users would actually search
2. Include long-tail keywords in questions
3. Answers should be 2-3 sentences, informative and helpful
4. Address objections specific to this page
5. Mention Sozee naturally where appropriate
6. Be FACTUAL: don't invent features or pricing

**Sozee Key Facts:**
- Setup: upload 3 photos, instant likeness reconstruction, no training
- Generation: about 30 seconds per photo or video
- Privacy: isolated models never used to train other users
- Content: full SFW & NSFW support
- Platforms: built for OnlyFans, Fansly and FanVue creators
- Pricing: Creators $15/week, Agencies $33/week, free trial without credit card

**Output as JSON array:**
[
  {"question": "Natural question with keywords?", "answer": "Helpful 2-3 sentence answer mentioning Sozee."}
]

Return ONLY a valid JSON array with exactly {count} Q&A pairs."#;

const FALLBACK_FAQS: [(&str, &str); 11] = [
    ("What is Sozee?", "Sozee is the AI Content Studio for the creator economy. Upload just 3 photos and instantly generate unlimited hyper-realistic photos and videos. Built specifically for OnlyFans, Fansly, and FanVue creators."),
    ("How many photos do I need to upload?", "Just 3 photos minimum. Sozee instantly reconstructs your likeness with hyper-realistic accuracy: no training, no waiting, no technical setup required."),
    ("Does Sozee offer a free trial?", "Yes, Sozee offers a free trial with no credit card required. Test the instant 3-photo setup and unlimited content generation before committing to a paid plan."),
    ("How realistic is Sozee-generated content?", "Sozee generates hyper-realistic content that's indistinguishable from real photoshoots. From just 3 photos, you get perfect likeness consistency across unlimited content."),
    ("Does Sozee support NSFW content?", "Yes, Sozee fully supports both SFW and NSFW content creation, making it ideal for OnlyFans creators and adult content professionals who need unrestricted creative capabilities."),
    ("How much does Sozee cost?", "Sozee offers two pricing tiers: Creators plan at $15/week and Agencies plan at $33/week. Both include unlimited content generation from just 3 photos."),
    ("Do I need technical skills to use Sozee?", "No technical skills required. Upload 3 photos and start generating instantly. Built for creators, not developers."),
    ("How fast can I generate content with Sozee?", "Instant setup with just 3 photos. Then generate new photos and videos in approximately 30 seconds each."),
    ("What is the Content Crisis?", "The Content Crisis is the 100:1 demand ratio: fans want 100 pieces of content, creators can produce 1. Sozee closes the gap with infinite content from 3 photos."),
    ("Is my likeness private on Sozee?", "Your likeness is yours alone. Sozee uses isolated AI models that are never used to train other users' models."),
    ("Can I use Sozee for multiple platforms?", "Yes, Sozee-generated content can be used across OnlyFans, Instagram, TikTok and other creator platforms, optimized for their aspect ratios."),
];

const TEMPLATED_ANSWER: &str = "Sozee turns 3 photos into unlimited hyper-realistic content with no training and no technical setup. Start a free trial to see the results for yourself.";

fn var<'a>(variables: &'a Variables, name: &str, default: &'a str) -> &'a str {
    variables
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn page_context(pattern_id: &str, variables: &Variables) -> String {
    let competitor = var(variables, "competitor", "competitor");
    let audience = var(variables, "audience", "creators");

    match pattern_id {
        "1" => format!("Comparing Sozee vs {competitor} for {audience}"),
        "2" => format!(
            "Best {} for {audience} on {}",
            var(variables, "use_case", "AI tool"),
            var(variables, "platform", "social media")
        ),
        "3" => format!(
            "Sozee as a {} for {}",
            var(variables, "tool_type", "content tool"),
            var(variables, "platform", "content creation")
        ),
        "4" => format!("Sozee as an alternative to {competitor}"),
        "5" => format!("Review of Sozee for {audience}"),
        "6" => format!("Solving content creation challenges for {audience}"),
        _ => "Sozee AI content generation platform".to_string(),
    }
}

/// Question templates for a pattern, in the order they are offered to the model
pub fn pattern_questions(pattern_id: &str, variables: &Variables) -> Vec<String> {
    let competitor = var(variables, "competitor", "[competitor]");
    let audience = var(variables, "audience", "[audience]");
    let use_case = var(variables, "use_case", "[use case]");
    let platform = var(variables, "platform", "[platform]");

    match pattern_id {
        "1" => vec![
            format!("How is Sozee different from {competitor}?"),
            format!("Is Sozee easier to use than {competitor}?"),
            format!("Can I switch from {competitor} to Sozee easily?"),
            format!("What features does Sozee have that {competitor} doesn't?"),
            format!("Which is better for {audience}: Sozee or {competitor}?"),
        ],
        "2" => vec![
            format!("What makes Sozee the best {use_case} tool for {audience}?"),
            "How does Sozee compare to other tools?".to_string(),
            format!("Why should {audience} choose Sozee?"),
            format!("Is Sozee really better than competitors for {use_case}?"),
            format!("What do {audience} say about Sozee?"),
        ],
        "3" => vec![
            "How does Sozee work?".to_string(),
            format!("Is Sozee optimized for {platform}?"),
            "How realistic will my Sozee-generated content look?".to_string(),
            "How fast can I generate content with Sozee?".to_string(),
            "What's included in the Sozee free trial?".to_string(),
        ],
        "4" => vec![
            format!("Why should I switch from {competitor} to Sozee?"),
            format!("Is migrating from {competitor} to Sozee easy?"),
            format!("Will I lose my existing content if I switch from {competitor}?"),
            "How much will I save by switching to Sozee?".to_string(),
            format!("What makes Sozee better than {competitor} for {audience}?"),
        ],
        "5" => vec![
            format!("Is Sozee worth it for {audience}?"),
            "What are Sozee's pros and cons?".to_string(),
            "How much does Sozee cost?".to_string(),
            format!("What do real {audience} say about Sozee?"),
            "Who should NOT use Sozee?".to_string(),
        ],
        "6" => vec![
            format!("What is the content crisis for {audience}?"),
            "How does Sozee solve the 100:1 content supply/demand problem?".to_string(),
            "Can I really generate unlimited content with Sozee?".to_string(),
            "Will my fans notice if I use Sozee AI content?".to_string(),
            format!("What's the ROI of Sozee for {audience}?"),
        ],
        _ => Vec::new(),
    }
}

/// Pre-written answers, padded with templated pattern questions, exactly `count` long
pub fn fallback_faqs(pattern_id: &str, variables: &Variables, count: usize) -> Vec<Faq> {
    let pool: Vec<Faq> = FALLBACK_FAQS
        .iter()
        .map(|(q, a)| Faq::new(*q, *a))
        .chain(
            pattern_questions(pattern_id, variables)
                .into_iter()
                .map(|q| Faq::new(q, TEMPLATED_ANSWER)),
        )
        .collect();

    pool.iter().cycle().take(count).cloned().collect()
}

pub struct FaqGeneratorAgent {
    config: AgentConfig,
    backend: SharedBackend,
}

impl FaqGeneratorAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend) -> Self {
        Self { config, backend }
    }
}

#[async_trait]
impl Agent for FaqGeneratorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::FaqGenerator
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GenerateFaqs { pattern_id, count } = &message.task else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let count = count.unwrap_or(DEFAULT_FAQ_COUNT);
        let variables = message.context.page_variables();

        let prompt = FAQ_PROMPT
            .replace("{context}", &page_context(pattern_id, variables))
            .replace("{pattern_id}", pattern_id)
            .replace("{variables}", &serde_json::to_string(variables)?)
            .replace("{count}", &count.to_string())
            .replace(
                "{question_types}",
                &pattern_questions(pattern_id, variables)
                    .iter()
                    .map(|q| format!("- {}", q))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );

        let result: Result<Vec<Faq>, AgentError> = ask_json::<Value>(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(4000, 0.6),
        )
        .await
        .map(|reply| coerce::faqs(&reply));

        let response = match result {
            Ok(faqs) if !faqs.is_empty() => {
                if faqs.len() != count {
                    warn!("Expected {} FAQs, got {}", count, faqs.len());
                }
                info!("Generated {} FAQ pairs", faqs.len());
                Response::builder(message, ResponseData::Faqs(faqs))
                    .source(Source::model("ai_generation", self.backend.model_name()))
                    .confidence(0.9)
            }
            other => {
                if let Err(e) = other {
                    warn!("Error generating FAQs: {}", e);
                } else {
                    warn!("Model returned no FAQs");
                }
                Response::builder(
                    message,
                    ResponseData::Faqs(fallback_faqs(pattern_id, variables, count)),
                )
                .source(Source::note("fallback", "Pre-written FAQ library"))
                .confidence(0.6)
            }
        };

        Ok(response.elapsed(start).build())
    }
}
