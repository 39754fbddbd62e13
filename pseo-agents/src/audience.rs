//! Audience Insight Agent

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use pseo_core::{Message, Response, ResponseData, Source, TaskPayload};

use crate::{
    ask_json, Agent, AgentConfig, AgentError, AgentKind, CachedResearch, GenerationOptions,
    ResearchCache, SharedBackend,
};

const AUDIENCE_PROMPT: &str = r#"You are an expert market researcher analyzing the {audience} audience.

**Your Task**: Deep dive into the psychology, pain points and desires of {audience}.

**Required Research Areas:** {required_data}

Cover 3-5 specific pain points, 3-5 desires, 3-5 objections, 2-3 current solutions,
3-4 emotional triggers and their content preferences.

**Context: Sozee AI Content Platform**
- AI photo/video generation from 3 photos, no training and no waiting
- Built for OnlyFans creators, SFW & NSFW capable
- Solves the "100:1 content crisis" (fans want 100x more content than creators can produce)

**Output as JSON:**
{
  "audience_segment": "{audience}",
  "pain_points": [{"pain": "...", "intensity": "high/medium/low", "frequency": "daily/weekly/monthly"}],
  "desires": [{"desire": "...", "motivation": "...", "priority": "high/medium/low"}],
  "objections": [{"objection": "...", "severity": "deal_breaker/significant/minor", "response": "How Sozee addresses this"}],
  "current_solutions": [{"solution": "...", "limitations": "...", "replacement_opportunity": "..."}],
  "emotional_triggers": [{"emotion": "...", "trigger": "...", "messaging": "..."}],
  "content_preferences": {"platforms": ["..."], "format": "video/text/visual", "tone": "casual/professional/edgy"},
  "key_insights": ["...", "...", "..."]
}

Return ONLY valid JSON. Be specific and actionable."#;

/// Insights used when research fails
pub fn fallback_insights(audience: &str) -> Value {
    json!({
        "audience_segment": audience,
        "pain_points": [
            {"pain": "Content creation burnout from constant demand", "intensity": "high", "frequency": "daily"},
            {"pain": "Difficulty maintaining consistent posting schedule", "intensity": "high", "frequency": "weekly"}
        ],
        "desires": [
            {
                "desire": "Automate content creation while maintaining quality",
                "motivation": "Reduce time spent on repetitive tasks",
                "priority": "high"
            }
        ],
        "objections": [
            {
                "objection": "AI-generated content may look fake or low quality",
                "severity": "significant",
                "response": "Sozee creates hyper-realistic content from just 3 photos"
            }
        ],
        "current_solutions": [
            {
                "solution": "Manual photo/video creation",
                "limitations": "Time-consuming, expensive, unsustainable",
                "replacement_opportunity": "Sozee generates content in seconds instead of hours"
            }
        ],
        "emotional_triggers": [
            {"emotion": "Relief", "trigger": "Freedom from the content grind", "messaging": "Focus on liberation from burnout"}
        ],
        "content_preferences": {
            "platforms": ["Twitter/X", "Reddit", "Discord"],
            "format": "visual",
            "tone": "casual"
        },
        "key_insights": [
            format!("{} are overwhelmed by content demands and seeking automation", audience),
            "Quality is paramount: generic AI content won't work",
            "They value tools built specifically for their niche"
        ]
    })
}

pub struct AudienceInsightAgent {
    config: AgentConfig,
    backend: SharedBackend,
    cache: ResearchCache,
}

impl AudienceInsightAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend) -> Self {
        Self {
            config,
            backend,
            cache: ResearchCache::new(),
        }
    }
}

impl CachedResearch for AudienceInsightAgent {
    fn cache(&self) -> &ResearchCache {
        &self.cache
    }
}

#[async_trait]
impl Agent for AudienceInsightAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::AudienceInsight
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::ResearchAudience {
            audience,
            required_data,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };

        let cache_key = format!("audience_{}", audience);
        if let Some(cached) = self.cache_get(&cache_key) {
            info!("Using cached insights for {}", audience);
            return Ok(Response::builder(message, ResponseData::Research(cached))
                .confidence(0.9)
                .from_cache(true)
                .elapsed(start)
                .build());
        }

        let prompt = AUDIENCE_PROMPT
            .replace("{audience}", audience)
            .replace("{required_data}", &required_data.join(", "));

        let result: Result<Value, AgentError> = ask_json(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(3000, 0.7),
        )
        .await;

        let insights = match result {
            Ok(insights) if insights.is_object() => Some(insights),
            Ok(_) => {
                warn!("Audience research for {} returned a non-object", audience);
                None
            }
            Err(e) => {
                warn!("Audience research for {} failed: {}", audience, e);
                None
            }
        };

        let response = match insights {
            Some(insights) => {
                info!(
                    "Audience insights for {}: {} pain points",
                    audience,
                    insights["pain_points"].as_array().map_or(0, Vec::len)
                );
                self.cache_put(&cache_key, insights.clone());
                Response::builder(message, ResponseData::Research(insights))
                    .source(Source::model("ai_synthesis", self.backend.model_name()))
                    .confidence(0.85)
            }
            None => Response::builder(message, ResponseData::Research(fallback_insights(audience)))
                .source(Source::note("fallback", "Generic creator insights"))
                .confidence(0.6),
        };

        Ok(response.elapsed(start).build())
    }
}
