//! Page assembly: a pure merge of agent outputs into one `PageOutput`

use chrono::{DateTime, Utc};
use serde_json::Value;

use pseo_core::{
    ApprovalStatus, Blueprint, ComparisonRow, Faq, PageContent, PageOutput, Pattern,
    ResearchData, ResearchSource, ResponseStatus, SeoMetadata,
};

/// Everything the pipeline produced for one page
pub struct PageParts<'a> {
    pub blueprint: &'a Blueprint,
    pub pattern: &'a Pattern,
    pub content: PageContent,
    pub faqs: Vec<Faq>,
    pub metadata: SeoMetadata,
    pub comparison_table: Vec<ComparisonRow>,
    pub schemas: Vec<Value>,
    pub research: &'a ResearchData,
}

fn or_else(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// One source entry per research dataset
pub fn research_sources(research: &ResearchData, at: DateTime<Utc>) -> Vec<ResearchSource> {
    research
        .keys()
        .map(|agent| ResearchSource {
            agent: agent.clone(),
            source_type: "ai_research".to_string(),
            timestamp: at,
        })
        .collect()
}

/// Merge the parts. Quality fields start at zero / pending.
pub fn assemble(parts: PageParts<'_>, generated_at: DateTime<Utc>) -> PageOutput {
    let PageParts {
        blueprint,
        pattern,
        content,
        faqs,
        metadata,
        comparison_table,
        schemas,
        research,
    } = parts;

    let hero = content.hero;
    let comparison_table = if comparison_table.is_empty() {
        content.comparison_table
    } else {
        comparison_table
    };

    PageOutput {
        page_id: blueprint.page_id.clone(),
        pattern_id: blueprint.pattern_id.clone(),
        status: ResponseStatus::Completed,
        post_title: hero.h1.clone(),
        url_slug: pattern.render_url(&blueprint.pseo_variables),
        meta_title: or_else(metadata.meta_title, &hero.h1),
        meta_description: or_else(metadata.meta_description, &hero.subtitle),
        problem_agitation: content.problem,
        solution_overview: content.solution,
        comparison_table_json: comparison_table,
        feature_sections: content.features,
        faq_json: faqs,
        final_cta: content.final_cta,
        schema_markup: schemas,
        pattern_sections: content.pattern_sections,
        hero_section: hero,
        pseo_variables: blueprint.pseo_variables.clone(),
        research_sources: research_sources(research, generated_at),
        quality_score: 0.0,
        uniqueness_check: ApprovalStatus::Pending,
        generation_model: blueprint.generation_model,
        agents_used: blueprint.required_agents.clone(),
        generated_at,
    }
}
