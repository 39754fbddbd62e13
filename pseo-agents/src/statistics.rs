//! Statistics Agent
//!
//! Gathers market statistics for the page angle and keeps only those
//! the model rates as high or medium credibility.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use pseo_core::{Message, Response, ResponseData, Source, TaskPayload, DEFAULT_AUDIENCE, DEFAULT_PLATFORM};

use crate::{
    ask_json, Agent, AgentConfig, AgentError, AgentKind, CachedResearch, GenerationOptions,
    ResearchCache, SharedBackend,
};

const STATISTICS_PROMPT: &str = r#"You are a market research analyst gathering CREDIBLE statistics for a landing page.

**Landing Page Topic**: {topic}
**Target Audience**: {audience}
**Platform**: {platform}
**Pattern**: Pattern {pattern_id}

**Research Focus**:
{focus}

**Your Task**: Find 5-8 CREDIBLE statistics that support the landing page's value proposition.

1. Prefer industry reports, academic studies, platform data and credible news sources
2. Statistics must be relevant to {audience} and {platform}
3. DO NOT HALLUCINATE: use ranges or qualitative statements when unsure

**OUTPUT AS JSON:**
{
  "key_statistics": [
    {
      "stat": "The statistic",
      "context": "What this means for the audience",
      "source_type": "Industry Report / Platform Data / Survey / Study",
      "year": "2024 / Recent / Not specified",
      "relevance": "Why this matters for this page",
      "credibility": "high / medium / low"
    }
  ],
  "market_trends": [{"trend": "...", "impact": "How this affects {audience}"}],
  "supporting_facts": ["..."]
}

Return ONLY valid JSON."#;

fn research_focus(pattern_id: &str, audience: &str, platform: &str) -> String {
    match pattern_id {
        "1" => format!("Statistics comparing tools in the space: market share, satisfaction and feature adoption for {platform} creators."),
        "2" => format!("Statistics supporting a 'best tool' claim: satisfaction, growth and adoption in the {audience} segment."),
        "3" => format!("Platform statistics: {platform} user counts, content volumes and creator earnings."),
        "4" => "Statistics on why users switch tools: migration trends, dissatisfaction with current solutions, reasons for switching.".to_string(),
        "5" => format!("Balanced statistics for an honest review: positive trends and challenges faced by {audience}."),
        "6" => "Statistics on the CONTENT CRISIS: burnout rates, production time versus demand, supply/demand ratios and time spent creating. Emphasize the scale of the problem.".to_string(),
        _ => format!("General statistics about {audience} and {platform}."),
    }
}

/// Statistics used when research fails
pub fn fallback_statistics(audience: &str, platform: &str) -> Value {
    json!({
        "key_statistics": [
            {
                "stat": "Content creators report spending 50-70% of their time on content production",
                "context": format!("Content creation is the primary time investment for {}", audience),
                "source_type": "Industry Reports",
                "year": "Recent",
                "relevance": "Highlights the content production bottleneck",
                "credibility": "medium"
            },
            {
                "stat": "The creator economy is valued at over $100 billion globally",
                "context": "Rapidly growing market with increasing opportunity",
                "source_type": "Industry Report",
                "year": "2024",
                "relevance": "Shows market size and opportunity",
                "credibility": "high"
            },
            {
                "stat": "Top-performing creators post 3-5 times more frequently than average creators",
                "context": "Content volume directly correlates with success",
                "source_type": "Platform Data",
                "year": "Recent",
                "relevance": "Emphasizes importance of content volume",
                "credibility": "medium"
            },
            {
                "stat": format!("Majority of {} cite burnout and time constraints as top challenges", audience),
                "context": "Content creation burnout is a widespread problem",
                "source_type": "Creator Surveys",
                "year": "Recent",
                "relevance": "Validates the pain point AI tools solve",
                "credibility": "medium"
            }
        ],
        "market_trends": [
            {
                "trend": "AI-assisted content creation is rapidly growing in creator tools",
                "impact": format!("More {} are adopting AI to scale content production", audience)
            },
            {
                "trend": format!("{} algorithms increasingly favor consistent, high-volume posting", platform),
                "impact": "Creators face pressure to produce more content faster"
            }
        ],
        "supporting_facts": [
            format!("Content creation is the most time-intensive aspect of being a {} creator", platform),
            "AI tools are becoming essential for scaling content production",
            "Supply/demand gap: creators can produce a fraction of what audiences consume"
        ]
    })
}

/// Drop statistics not rated high or medium; `None` if the shape is wrong
fn filter_credible(mut statistics: Value) -> Option<Value> {
    let stats = statistics.get_mut("key_statistics")?.as_array_mut()?;
    stats.retain(|stat| {
        matches!(
            stat.get("credibility").and_then(Value::as_str),
            Some("high" | "medium")
        )
    });
    Some(statistics)
}

pub struct StatisticsAgent {
    config: AgentConfig,
    backend: SharedBackend,
    cache: ResearchCache,
}

impl StatisticsAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend) -> Self {
        Self {
            config,
            backend,
            cache: ResearchCache::new(),
        }
    }
}

impl CachedResearch for StatisticsAgent {
    fn cache(&self) -> &ResearchCache {
        &self.cache
    }
}

#[async_trait]
impl Agent for StatisticsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Statistics
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GatherStatistics {
            pattern_id,
            topic,
            audience,
            platform,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let audience = audience.as_deref().unwrap_or(DEFAULT_AUDIENCE);
        let platform = platform.as_deref().unwrap_or(DEFAULT_PLATFORM);
        let topic = topic.as_deref().unwrap_or_default();

        let cache_key = format!("stats_{}_{}_{}", pattern_id, audience, platform);
        if let Some(cached) = self.cache_get(&cache_key) {
            info!("Using cached statistics for {} on {}", audience, platform);
            return Ok(Response::builder(message, ResponseData::Research(cached))
                .confidence(0.9)
                .from_cache(true)
                .elapsed(start)
                .build());
        }

        let prompt = STATISTICS_PROMPT
            .replace("{topic}", topic)
            .replace("{pattern_id}", pattern_id)
            .replace("{focus}", &research_focus(pattern_id, audience, platform))
            .replace("{audience}", audience)
            .replace("{platform}", platform);

        let result: Result<Value, AgentError> = ask_json(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(2500, 0.4),
        )
        .await;

        let statistics = match result {
            Ok(raw) => {
                let filtered = filter_credible(raw);
                if filtered.is_none() {
                    warn!("Statistics response is missing key_statistics");
                }
                filtered
            }
            Err(e) => {
                warn!("Statistics research failed: {}", e);
                None
            }
        };

        let response = match statistics {
            Some(statistics) => {
                info!(
                    "Gathered {} credible statistics",
                    statistics["key_statistics"].as_array().map_or(0, Vec::len)
                );
                self.cache_put(&cache_key, statistics.clone());
                Response::builder(message, ResponseData::Research(statistics))
                    .source(Source::model("ai_research", self.backend.model_name()))
                    .confidence(0.85)
            }
            None => Response::builder(
                message,
                ResponseData::Research(fallback_statistics(audience, platform)),
            )
            .source(Source::note("fallback", "General creator economy facts"))
            .confidence(0.6),
        };

        Ok(response.elapsed(start).build())
    }
}
