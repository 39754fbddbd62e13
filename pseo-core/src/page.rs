//! Page content and the assembled page record
//!
//! `PageOutput` is built once by the assembler, updated once by quality
//! control, then persisted. Only the public view may be handed to
//! publishing systems: it never carries scores, variables or agent traces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApprovalStatus, GenerationModel, QualityReport, ResponseStatus, Variables};

/// Hero block at the top of the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    pub h1: String,
    pub eyebrow: String,
    pub subtitle: String,
    pub primary_cta: String,
    pub secondary_cta: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

impl Faq {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// One row of the brand-vs-competitor table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub feature: String,
    pub sozee: String,
    pub competitor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sozee_advantage: Option<bool>,
}

impl ComparisonRow {
    pub fn new(feature: &str, sozee: &str, competitor: impl Into<String>) -> Self {
        Self {
            feature: feature.to_string(),
            sozee: sozee.to_string(),
            competitor: competitor.into(),
            sozee_advantage: None,
        }
    }

    pub fn with_advantage(mut self, sozee_advantage: bool) -> Self {
        self.sozee_advantage = Some(sozee_advantage);
        self
    }
}

/// Search metadata for the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoMetadata {
    pub meta_title: String,
    pub meta_description: String,
    pub focus_keyword: String,
    pub secondary_keywords: Vec<String>,
}

/// Copy produced by the copywriting agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContent {
    pub hero: Hero,
    pub problem: String,
    pub solution: String,
    pub features: Vec<Feature>,
    pub comparison_table: Vec<ComparisonRow>,
    pub final_cta: String,
    /// Pattern-specific sections keyed by section id
    pub pattern_sections: BTreeMap<String, Value>,
}

/// Where a piece of research came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSource {
    pub agent: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub timestamp: DateTime<Utc>,
}

/// The assembled landing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutput {
    pub page_id: String,
    pub pattern_id: String,
    pub status: ResponseStatus,

    // SEO
    pub post_title: String,
    pub url_slug: String,
    pub meta_title: String,
    pub meta_description: String,

    // Content
    pub hero_section: Hero,
    pub problem_agitation: String,
    pub solution_overview: String,
    pub comparison_table_json: Vec<ComparisonRow>,
    pub feature_sections: Vec<Feature>,
    pub faq_json: Vec<Faq>,
    pub final_cta: String,
    pub schema_markup: Vec<Value>,
    #[serde(default)]
    pub pattern_sections: BTreeMap<String, Value>,

    // Internal
    pub pseo_variables: Variables,
    pub research_sources: Vec<ResearchSource>,
    pub quality_score: f64,
    pub uniqueness_check: ApprovalStatus,
    pub generation_model: GenerationModel,
    pub agents_used: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// User-facing fields only
#[derive(Debug, Serialize)]
pub struct PublicPage<'a> {
    pub page_id: &'a str,
    pub pattern_id: &'a str,
    pub status: ResponseStatus,
    pub post_title: &'a str,
    pub url_slug: &'a str,
    pub meta_title: &'a str,
    pub meta_description: &'a str,
    pub hero_section: &'a Hero,
    pub problem_agitation: &'a str,
    pub solution_overview: &'a str,
    pub comparison_table_json: &'a [ComparisonRow],
    pub feature_sections: &'a [Feature],
    pub faq_json: &'a [Faq],
    pub final_cta: &'a str,
    pub schema_markup: &'a [Value],
    pub pattern_sections: &'a BTreeMap<String, Value>,
    pub generated_at: DateTime<Utc>,
}

impl PageOutput {
    /// Record the quality verdict on the page
    pub fn apply_quality(&mut self, report: &QualityReport) {
        self.quality_score = report.overall_score.clamp(0.0, 1.0);
        self.uniqueness_check = report.approval_status;
    }

    pub fn public_view(&self) -> PublicPage<'_> {
        PublicPage {
            page_id: &self.page_id,
            pattern_id: &self.pattern_id,
            status: self.status,
            post_title: &self.post_title,
            url_slug: &self.url_slug,
            meta_title: &self.meta_title,
            meta_description: &self.meta_description,
            hero_section: &self.hero_section,
            problem_agitation: &self.problem_agitation,
            solution_overview: &self.solution_overview,
            comparison_table_json: &self.comparison_table_json,
            feature_sections: &self.feature_sections,
            faq_json: &self.faq_json,
            final_cta: &self.final_cta,
            schema_markup: &self.schema_markup,
            pattern_sections: &self.pattern_sections,
            generated_at: self.generated_at,
        }
    }

    /// Pretty JSON of either the public or the full view
    pub fn to_json(&self, public_only: bool) -> serde_json::Result<String> {
        if public_only {
            serde_json::to_string_pretty(&self.public_view())
        } else {
            serde_json::to_string_pretty(self)
        }
    }
}
