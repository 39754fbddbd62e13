//! Comparison Table Agent
//!
//! Sozee-vs-competitor feature rows for comparison and alternative pages.
//! The competitor column is grounded in the knowledge base profile overlaid
//! with this run's research, on top of a category-level generic profile so
//! that no cell is ever left unknown.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use pseo_core::{ComparisonRow, Message, ResearchData, Response, ResponseData, Source, TaskPayload, DEFAULT_AUDIENCE};
use pseo_kb::{overlay_non_empty, KnowledgeBase};

use crate::{
    ask_json, coerce, generic_profile, Agent, AgentConfig, AgentError, AgentKind, GenerationOptions,
    SharedBackend,
};

pub const MIN_ROWS: usize = 6;
pub const MAX_ROWS: usize = 8;

const COMPARISON_PROMPT: &str = r#"You are creating a feature comparison table for a landing page comparing Sozee vs {competitor}.

**Pattern**: Pattern {pattern_id} ({pattern_label})
**Target Audience**: {audience}

**SOZEE'S ACTUAL FEATURES** (use these EXACT values):
{sozee_features}

**COMPETITOR PROFILE** (use this to fill the competitor column):
{competitor_profile}

**Your Task**: Create a comparison table with 6-8 key features that matter most to {audience}.

**CRITICAL REQUIREMENTS:**
1. Be 100% FACTUAL: only use the Sozee features and competitor profile above
2. Focus on differentiation where Sozee has clear advantages
3. Use specific values ("3 photos" not "few", "$15/week" not "affordable")
4. Cover setup, SFW/NSFW support, platform focus, ease of use, pricing and speed
5. Where the profile is silent, use its category-level description; DO NOT invent competitor features

**OUTPUT AS JSON ARRAY:**
[
  {"feature": "Feature name", "sozee": "Sozee's value", "competitor": "Competitor's value", "sozee_advantage": true}
]

Return ONLY a valid JSON array with 6-8 rows."#;

/// Sozee facts the table is allowed to state
pub fn sozee_features() -> Value {
    json!({
        "setup": {
            "photos_required": "3 photos minimum",
            "training_time": "Instant (no training required)",
            "technical_skills": "None required"
        },
        "output_quality": {
            "realism": "Hyper-realistic (indistinguishable from real photoshoots)",
            "consistency": "Perfect likeness consistency across unlimited content"
        },
        "content_support": {
            "sfw": true,
            "nsfw": true,
            "content_types": "Photos & videos"
        },
        "privacy": {
            "model_isolation": "Your likeness is yours alone",
            "training_data_use": "Never used to train other users' models"
        },
        "platform_focus": {
            "primary": "OnlyFans, Fansly, FanVue",
            "also_supports": "TikTok, Instagram, X"
        },
        "generation_speed": {
            "photo": "30 seconds per photo",
            "video": "30 seconds per video"
        },
        "pricing": {
            "creators": "$15/week",
            "agencies": "$33/week",
            "free_trial": "Yes (no credit card required)"
        },
        "special_features": {
            "tiktok_cloning": "1-click TikTok clone",
            "fan_requests": "Instant custom request fulfillment"
        }
    })
}

/// Generic profile, overlaid with the stored profile, then with this run's research
pub fn merged_profile(stored: Option<&Value>, research: &ResearchData) -> Value {
    let mut profile = generic_profile();
    if let Some(stored) = stored {
        overlay_non_empty(&mut profile, stored);
    }
    if let Some(researched) = research
        .get(AgentKind::CompetitorResearch.name())
        .and_then(|data| data.get("competitor_data"))
    {
        overlay_non_empty(&mut profile, researched);
    }
    profile
}

/// Display text for a profile field, `None` if absent or blank
fn text_at(profile: &Value, path: &[&str]) -> Option<String> {
    let value = path.iter().try_fold(profile, |node, key| node.get(key))?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn nsfw_support(profile: &Value) -> String {
    match profile.pointer("/features/nsfw_support") {
        Some(Value::Bool(true)) => "Supported".to_string(),
        Some(Value::Bool(false)) => "Not supported (SFW only)".to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => "Not supported (SFW only)".to_string(),
    }
}

/// Nine factual rows built from a merged profile
pub fn fallback_table(profile: &Value) -> Vec<ComparisonRow> {
    let field = |path: &[&str], default: &str| text_at(profile, path).unwrap_or_else(|| default.to_string());

    vec![
        ComparisonRow::new(
            "Setup Time",
            "Instant (3 photos, no training)",
            field(&["setup", "training_time"], "Requires model training"),
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Photos Required",
            "3 photos minimum",
            field(&["setup", "photos_required"], "Multiple training images required"),
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Output Quality",
            "Hyper-realistic (indistinguishable from real)",
            field(&["features", "hyper_realistic"], "AI-generated aesthetic"),
        )
        .with_advantage(true),
        ComparisonRow::new("NSFW Content Support", "Full support (no censorship)", nsfw_support(profile))
            .with_advantage(true),
        ComparisonRow::new(
            "Built For",
            "OnlyFans/Fansly/FanVue creators",
            field(&["target_audience"], "General use"),
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Privacy",
            "Your likeness is yours alone (isolated models)",
            field(&["features", "privacy_model"], "Cloud-based"),
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Technical Skills Required",
            "None",
            field(&["setup", "technical_skills"], "Moderate"),
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Content Generation Speed",
            "30 seconds per photo/video",
            "Varies by plan and queue",
        )
        .with_advantage(true),
        ComparisonRow::new(
            "Pricing (Creators)",
            "$15/week",
            field(&["pricing", "estimate"], "$20-50/month"),
        )
        .with_advantage(false),
    ]
}

pub struct ComparisonTableAgent {
    config: AgentConfig,
    backend: SharedBackend,
    kb: Arc<KnowledgeBase>,
}

impl ComparisonTableAgent {
    pub fn new(config: AgentConfig, backend: SharedBackend, kb: Arc<KnowledgeBase>) -> Self {
        Self { config, backend, kb }
    }
}

#[async_trait]
impl Agent for ComparisonTableAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ComparisonTable
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GenerateComparisonTable {
            pattern_id,
            competitor,
            audience,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let audience = audience.as_deref().unwrap_or(DEFAULT_AUDIENCE);

        let stored = self.kb.get_profile(competitor).unwrap_or_else(|e| {
            warn!("Knowledge base read failed for {}: {}", competitor, e);
            None
        });
        let profile = merged_profile(stored.as_ref(), &message.context.research_data);

        let prompt = COMPARISON_PROMPT
            .replace("{competitor}", competitor)
            .replace("{pattern_id}", pattern_id)
            .replace(
                "{pattern_label}",
                if pattern_id == "1" { "Competitor Comparison" } else { "Alternative" },
            )
            .replace("{audience}", audience)
            .replace("{sozee_features}", &serde_json::to_string_pretty(&sozee_features())?)
            .replace("{competitor_profile}", &serde_json::to_string_pretty(&profile)?);

        let result: Result<Vec<ComparisonRow>, AgentError> = ask_json::<Value>(
            &self.backend,
            &self.config,
            &prompt,
            GenerationOptions::new(2000, 0.3),
        )
        .await
        .and_then(|reply| coerce::comparison_table(&reply));

        let response = match result {
            Ok(rows) if !rows.is_empty() => {
                if !(MIN_ROWS..=MAX_ROWS).contains(&rows.len()) {
                    warn!(
                        "Comparison table has {} rows (expected {}-{})",
                        rows.len(),
                        MIN_ROWS,
                        MAX_ROWS
                    );
                }
                info!("Generated comparison table with {} features", rows.len());
                Response::builder(message, ResponseData::ComparisonTable(rows))
                    .source(Source::model("ai_generation", self.backend.model_name()))
                    .confidence(0.95)
            }
            other => {
                match other {
                    Err(e) => warn!("Error generating comparison table: {}", e),
                    Ok(_) => warn!("Model returned an empty comparison table"),
                }
                Response::builder(message, ResponseData::ComparisonTable(fallback_table(&profile)))
                    .source(Source::note("fallback", "Built from competitor profile"))
                    .confidence(0.7)
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

    fn msg(context: TaskContext) -> Message {
        message(
            AgentKind::ComparisonTable,
            TaskPayload::GenerateComparisonTable {
                pattern_id: "1".to_string(),
                competitor: "Higgsfield".to_string(),
                audience: Some("OnlyFans Creators".to_string()),
            },
            context,
        )
    }

    fn rows(response: &Response) -> &[ComparisonRow] {
        match &response.data {
            ResponseData::ComparisonTable(rows) => rows,
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_research_wins_over_stored_profile() {
        let stored = json!({"pricing": {"estimate": "$10/month"}, "target_audience": "Filmmakers"});
        let mut research = ResearchData::new();
        research.insert(
            "Competitor_Research_Agent".to_string(),
            json!({"competitor_data": {"pricing": {"estimate": "$9/month"}, "target_audience": ""}}),
        );

        let profile = merged_profile(Some(&stored), &research);
        assert_eq!(profile["pricing"]["estimate"], "$9/month");
        assert_eq!(profile["target_audience"], "Filmmakers");
        assert_eq!(profile["setup"]["technical_skills"], "Moderate");
    }

    #[test]
    fn test_fallback_never_unknown() {
        let table = fallback_table(&merged_profile(None, &ResearchData::new()));

        assert_eq!(table.len(), 9);
        for row in &table {
            assert!(!row.competitor.is_empty());
            assert!(!row.competitor.to_lowercase().contains("unknown"));
            assert!(!row.competitor.contains("Not specified"));
        }
        assert_eq!(table[3].competitor, "Not supported (SFW only)");
        assert_eq!(table[8].sozee_advantage, Some(false));
    }

    #[tokio::test]
    async fn test_rows_missing_fields_fall_back() {
        let backend = MockBackend::replying(r#"[{"feature": "Setup", "sozee": "3 photos"}]"#);
        let kb = Arc::new(KnowledgeBase::in_memory());
        kb.save_profile("Higgsfield", json!({"features": {"nsfw_support": "Limited"}}))
            .unwrap();
        let agent = ComparisonTableAgent::new(AgentConfig::default(), shared(&backend), kb);

        let response = agent.execute(&msg(TaskContext::new())).await.unwrap();
        assert_eq!(response.confidence, 0.7);
        assert_eq!(rows(&response).len(), 9);
        assert_eq!(rows(&response)[3].competitor, "Limited");
    }

    #[tokio::test]
    async fn test_short_table_is_kept() {
        let backend = MockBackend::replying(
            r#"[{"feature": "Setup", "sozee": "3 photos", "competitor": "20 images", "sozee_advantage": true},
               {"feature": "NSFW", "sozee": "Yes", "competitor": "No"}]"#,
        );
        let agent = ComparisonTableAgent::new(
            AgentConfig::default(),
            shared(&backend),
            Arc::new(KnowledgeBase::in_memory()),
        );

        let response = agent.execute(&msg(TaskContext::new())).await.unwrap();
        assert_eq!(response.confidence, 0.95);
        assert_eq!(rows(&response).len(), 2);
        assert_eq!(rows(&response)[1].sozee_advantage, None);
        assert!(backend.prompts()[0].contains("$15/week"));
    }

    #[tokio::test]
    async fn test_loose_cell_types_accepted() {
        let backend = MockBackend::replying(
            r#"[{"feature": "Setup", "sozee": "3 photos", "competitor": "20 images", "sozee_advantage": "yes"},
               {"feature": "Free tier", "sozee": true, "competitor": false, "sozee_advantage": null}]"#,
        );
        let agent = ComparisonTableAgent::new(
            AgentConfig::default(),
            shared(&backend),
            Arc::new(KnowledgeBase::in_memory()),
        );

        let response = agent.execute(&msg(TaskContext::new())).await.unwrap();
        assert_eq!(response.confidence, 0.95);
        assert_eq!(rows(&response)[0].sozee_advantage, Some(true));
        assert_eq!(rows(&response)[1].sozee, "true");
        assert_eq!(rows(&response)[1].sozee_advantage, None);
    }
}
