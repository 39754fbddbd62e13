//! Competitor Research Agent
//!
//! Knowledge base first, then the local cache, then fresh LLM research
//! which is written back to both.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use pseo_core::{Message, Response, ResponseData, Source, TaskPayload};
use pseo_kb::KnowledgeBase;

use crate::{
    ask_json, Agent, AgentConfig, AgentError, AgentKind, CachedResearch, GenerationOptions,
    ResearchCache, SharedBackend,
};

const COMPETITOR_PROMPT: &str = r#"You are researching {competitor} as a competitive AI content tool.

**Task**: Create a structured competitor profile for the Knowledge Base.

**Context**: We're comparing {competitor} to Sozee for {audience}. Be FACTUAL and accurate.

**Instructions:**
1. Research {competitor}'s actual capabilities, pricing, and positioning
2. Be specific about technical requirements and limitations
3. Identify target audience and use cases
4. Note NSFW support (critical for creator platforms)
5. Include specific pricing if known, otherwise estimate range
6. Focus on facts, not marketing claims

**Data points needed:** {required_data}

**REQUIRED OUTPUT STRUCTURE:**
{
  "category": "Tool category (e.g., 'AI Image Generator')",
  "target_audience": "Primary users",
  "positioning": "One-line market position",
  "setup": {
    "photos_required": "Specific requirement",
    "training_time": "Training duration",
    "technical_skills": "Low / Moderate / High"
  },
  "features": {
    "nsfw_support": true/false/"Limited",
    "creator_focus": true/false,
    "platform_focus": "Target platforms",
    "privacy_model": "Privacy approach",
    "content_types": ["Image", "Video"],
    "hyper_realistic": "Quality description"
  },
  "pricing": {"known": true/false, "estimate": "$X-Y/month", "free_trial": true/false},
  "strengths": ["...", "...", "..."],
  "weaknesses": ["...", "...", "..."]
}

Return ONLY valid JSON. If unsure, give category-level estimates rather than leaving fields empty."#;

/// Profile used when research fails
pub fn generic_profile() -> Value {
    json!({
        "category": "AI Content Generation Tool",
        "target_audience": "General users, creators",
        "positioning": "AI content platform",
        "setup": {
            "photos_required": "Multiple training images required",
            "training_time": "Requires model training",
            "technical_skills": "Moderate"
        },
        "features": {
            "nsfw_support": false,
            "creator_focus": false,
            "platform_focus": "General purpose",
            "privacy_model": "Cloud-based",
            "content_types": ["Images"],
            "hyper_realistic": "AI-generated aesthetic"
        },
        "pricing": {
            "known": false,
            "estimate": "$20-50/month",
            "free_trial": true
        },
        "strengths": ["AI content generation"],
        "weaknesses": ["Not creator-focused", "Training required", "Limited information available"]
    })
}

pub struct CompetitorResearchAgent {
    config: AgentConfig,
    backend: SharedBackend,
    kb: Arc<KnowledgeBase>,
    cache: ResearchCache,
}

impl CompetitorResearchAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend, kb: Arc<KnowledgeBase>) -> Self {
        Self {
            config,
            backend,
            kb,
            cache: ResearchCache::new(),
        }
    }

    async fn research(
        &self,
        competitor: &str,
        audience: &str,
        required_data: &[String],
    ) -> Result<Value, AgentError> {
        let prompt = COMPETITOR_PROMPT
            .replace("{competitor}", competitor)
            .replace("{audience}", audience)
            .replace("{required_data}", &required_data.join(", "));

        let profile: Value = ask_json(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(2000, 0.3),
        )
        .await?;

        if !profile.is_object() {
            return Err(AgentError::Parse("competitor profile is not an object".to_string()));
        }
        Ok(profile)
    }
}

impl CachedResearch for CompetitorResearchAgent {
    fn cache(&self) -> &ResearchCache {
        &self.cache
    }
}

#[async_trait]
impl Agent for CompetitorResearchAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::CompetitorResearch
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::ResearchCompetitor {
            competitor,
            audience,
            required_data,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let audience = audience.as_deref().unwrap_or_default();

        match self.kb.get_profile(competitor) {
            Ok(Some(profile)) => {
                info!("Using knowledge base profile for {}", competitor);
                return Ok(Response::builder(
                    message,
                    ResponseData::Research(json!({ "competitor_data": profile })),
                )
                .source(Source::note("knowledge_base", "Retrieved from competitor KB"))
                .confidence(0.95)
                .elapsed(start)
                .build());
            }
            Ok(None) => {}
            Err(e) => warn!("Knowledge base read failed for {}: {}", competitor, e),
        }

        let cache_key = format!("{}_{}", competitor, audience);
        if let Some(cached) = self.cache_get(&cache_key) {
            info!("Using cached research for {}", competitor);
            return Ok(Response::builder(
                message,
                ResponseData::Research(json!({ "competitor_data": cached })),
            )
            .confidence(0.9)
            .from_cache(true)
            .elapsed(start)
            .build());
        }

        info!("Researching {} (not in knowledge base)", competitor);
        let response = match self.research(competitor, audience, required_data).await {
            Ok(profile) => {
                if let Err(e) = self.kb.save_profile(competitor, profile.clone()) {
                    warn!("Could not save {} to knowledge base: {}", competitor, e);
                }
                self.cache_put(&cache_key, profile.clone());

                Response::builder(
                    message,
                    ResponseData::Research(json!({ "competitor_data": profile })),
                )
                .source(Source::model("ai_research", self.backend.model_name()))
            }
            Err(e) => {
                warn!("Research for {} failed, using generic profile: {}", competitor, e);
                Response::builder(
                    message,
                    ResponseData::Research(json!({ "competitor_data": generic_profile() })),
                )
                .source(Source::note("fallback", "Generic category profile"))
            }
        };

        Ok(response.confidence(0.85).elapsed(start).build())
    }
}
