//! Quality Control Agent
//!
//! Scores an assembled page against a fixed rubric of six checks. Every
//! check starts at 1.0 and loses a fixed penalty per defect; the overall
//! score is their mean. No LLM is involved.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use pseo_core::{CheckResult, Hero, Message, PageOutput, QualityReport, Response, ResponseData, Source, TaskPayload, BRAND_NAME};

use crate::seo::{DESCRIPTION_MAX, DESCRIPTION_MIN, TITLE_MAX, TITLE_MIN};
use crate::{Agent, AgentError, AgentKind};

static RED_FLAGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\$\d+,\d+\+").unwrap(),
            "Specific pricing claims that may be inaccurate",
        ),
        (
            Regex::new(r"(?i)\d{2,}%\s*(increase|decrease|more|less)").unwrap(),
            "Specific percentage claims without source",
        ),
        (
            Regex::new(r"(?i)\b(guaranteed|promise|never|always)\s+\w+").unwrap(),
            "Absolute claims that may be too strong",
        ),
    ]
});

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

const VALUE_PROPS: [&str; 4] = ["photos", "likeness", "AI", "content"];
const NEGATIVE_WORDS: [&str; 5] = ["cannot", "impossible", "won't work", "failure", "terrible"];
const OVERUSED_PHRASES: [&str; 6] = [
    "revolutionize",
    "game-changer",
    "cutting-edge",
    "state-of-the-art",
    "best-in-class",
    "industry-leading",
];

/// Patterns whose copy must name the competitor
const COMPETITOR_PATTERNS: [&str; 3] = ["1", "4", "5"];

/// Visible copy the text heuristics run over
fn page_text(page: &PageOutput) -> String {
    [
        page.hero_section.h1.as_str(),
        page.hero_section.subtitle.as_str(),
        page.problem_agitation.as_str(),
        page.solution_overview.as_str(),
        page.final_cta.as_str(),
        page.meta_description.as_str(),
    ]
    .join(" ")
}

fn check_seo(page: &PageOutput) -> CheckResult {
    let mut check = CheckResult::new();

    let title = page.meta_title.trim();
    let title_len = title.chars().count();
    if title.is_empty() {
        check.error("Missing meta_title", 0.3);
    } else if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
        check.warn(
            format!("Meta title length {} chars (should be {}-{})", title_len, TITLE_MIN, TITLE_MAX),
            0.1,
        );
    }
    if !title.is_empty() && !title.contains(BRAND_NAME) {
        check.warn("Meta title missing 'Sozee' brand mention", 0.05);
    }

    let description = page.meta_description.trim();
    let description_len = description.chars().count();
    if description.is_empty() {
        check.error("Missing meta_description", 0.3);
    } else if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&description_len) {
        check.warn(
            format!(
                "Meta description length {} chars (should be {}-{})",
                description_len, DESCRIPTION_MIN, DESCRIPTION_MAX
            ),
            0.1,
        );
    }

    let slug = &page.url_slug;
    if slug.is_empty() {
        check.error("Missing URL slug", 0.2);
    } else if slug.contains(' ') || *slug != slug.to_lowercase() {
        check.error("URL slug contains spaces or uppercase", 0.15);
    }

    check
}

fn check_completeness(page: &PageOutput) -> CheckResult {
    let mut check = CheckResult::new();

    let required = [
        ("post_title", page.post_title.trim().is_empty()),
        ("hero_section", page.hero_section == Hero::default()),
        ("problem_agitation", page.problem_agitation.trim().is_empty()),
        ("solution_overview", page.solution_overview.trim().is_empty()),
        ("final_cta", page.final_cta.trim().is_empty()),
    ];
    for (field, missing) in required {
        if missing {
            check.error(format!("Missing required field: {}", field), 0.2);
        }
    }

    if page.hero_section.h1.trim().is_empty() {
        check.error("Hero section missing H1", 0.15);
    }
    if page.hero_section.subtitle.trim().is_empty() {
        check.warn("Hero section missing subtitle", 0.05);
    }
    if page.problem_agitation.chars().count() < 200 {
        check.warn("Problem section seems too short", 0.05);
    }
    if page.solution_overview.chars().count() < 150 {
        check.warn("Solution section seems too short", 0.05);
    }

    check
}

fn check_brand_voice(text: &str) -> CheckResult {
    let mut check = CheckResult::new();
    let lower = text.to_lowercase();

    if !text.contains(BRAND_NAME) {
        check.error("Content missing 'Sozee' brand mention", 0.3);
    }

    let missing: Vec<&str> = VALUE_PROPS
        .iter()
        .filter(|prop| !lower.contains(&prop.to_lowercase()))
        .copied()
        .collect();
    if missing.len() > 2 {
        check.warn(
            format!("Missing key value propositions: {}", missing.join(", ")),
            0.1,
        );
    }

    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    if negative > 3 {
        check.warn("Content may be overly negative", 0.1);
    }

    check
}

fn check_factual_accuracy(page: &PageOutput, text: &str) -> CheckResult {
    let mut check = CheckResult::new();

    for (pattern, warning) in RED_FLAGS.iter() {
        if pattern.is_match(text) {
            check.warn(*warning, 0.05);
        }
    }

    let competitor = page
        .pseo_variables
        .get("competitor")
        .map(|c| c.trim())
        .unwrap_or_default();
    if !competitor.is_empty()
        && COMPETITOR_PATTERNS.contains(&page.pattern_id.as_str())
        && !text.contains(competitor)
    {
        check.warn(format!("Competitor '{}' not mentioned in content", competitor), 0.1);
    }

    check
}

fn check_uniqueness(text: &str) -> CheckResult {
    let mut check = CheckResult::new();
    let lower = text.to_lowercase();

    let overused: usize = OVERUSED_PHRASES.iter().map(|p| lower.matches(p).count()).sum();
    if overused > 3 {
        check.warn("Content uses too many generic marketing phrases", 0.1);
    }

    let starts: Vec<String> = SENTENCE_BREAK
        .split(text)
        .filter_map(|sentence| sentence.split_whitespace().next())
        .map(str::to_lowercase)
        .collect();
    if starts.len() > 5 {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for start in &starts {
            *counts.entry(start.as_str()).or_default() += 1;
        }
        if let Some((word, count)) = counts.into_iter().max_by_key(|(word, count)| (*count, *word)) {
            if count as f64 > starts.len() as f64 * 0.3 {
                check.warn(format!("Too many sentences start with '{}'", word), 0.1);
            }
        }
    }

    check
}

fn check_technical(page: &PageOutput) -> CheckResult {
    let mut check = CheckResult::new();

    if page
        .comparison_table_json
        .iter()
        .any(|row| row.feature.trim().is_empty() || row.sozee.trim().is_empty() || row.competitor.trim().is_empty())
    {
        check.error("comparison_table_json has incomplete rows", 0.2);
    }
    if page
        .faq_json
        .iter()
        .any(|faq| faq.question.trim().is_empty() || faq.answer.trim().is_empty())
    {
        check.error("faq_json has incomplete entries", 0.2);
    }
    if page.schema_markup.iter().any(|record| record.get("@type").is_none()) {
        check.warn("schema_markup record without @type", 0.05);
    }

    let problem = &page.problem_agitation;
    if problem.contains('#') && !problem.contains('\n') {
        check.warn("Markdown formatting may be broken", 0.05);
    }

    check
}

fn recommendations(report: &QualityReport) -> Vec<String> {
    let score = |name: &str| report.checks.get(name).map_or(1.0, |c| c.score);
    let mut recommendations = Vec::new();

    if !report.issues.is_empty() {
        let critical: Vec<&str> = report.issues.iter().take(3).map(String::as_str).collect();
        recommendations.push(format!("FIX CRITICAL ISSUES: {}", critical.join(", ")));
    }
    if score("seo_validation") < 0.8 {
        recommendations.push("Review and optimize SEO metadata (title, description, URL)".to_string());
    }
    if score("content_completeness") < 0.8 {
        recommendations.push("Add missing content sections or expand existing ones".to_string());
    }
    if score("brand_voice") < 0.8 {
        recommendations.push("Strengthen brand voice and value proposition messaging".to_string());
    }
    if score("uniqueness") < 0.9 {
        recommendations.push("Reduce generic marketing language and vary sentence structure".to_string());
    }

    recommendations
}

/// Run the full rubric over a page
pub fn review_page(page: &PageOutput) -> QualityReport {
    let text = page_text(page);

    let mut checks = BTreeMap::new();
    checks.insert("seo_validation".to_string(), check_seo(page));
    checks.insert("content_completeness".to_string(), check_completeness(page));
    checks.insert("brand_voice".to_string(), check_brand_voice(&text));
    checks.insert("factual_accuracy".to_string(), check_factual_accuracy(page, &text));
    checks.insert("uniqueness".to_string(), check_uniqueness(&text));
    checks.insert("technical_validation".to_string(), check_technical(page));

    let mut report = QualityReport::from_checks(checks);
    report.recommendations = recommendations(&report);
    report
}

#[derive(Default)]
pub struct QualityControlAgent;

impl QualityControlAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for QualityControlAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::QualityControl
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::ReviewPage = &message.task else {
            return Err(AgentError::unexpected(self.kind(), message));
        };
        let page = message
            .context
            .page
            .as_ref()
            .ok_or_else(|| AgentError::missing(self.kind(), "page"))?;

        let report = review_page(page);
        info!(
            "Quality score {:.2}: {} ({} issues, {} warnings)",
            report.overall_score,
            report.approval_status,
            report.issues.len(),
            report.warnings.len()
        );

        let confidence = report.overall_score;
        let builder = if report.passed() {
            Response::builder(message, ResponseData::Quality(report))
        } else {
            Response::builder(message, ResponseData::Quality(report)).failed()
        };

        Ok(builder
            .source(Source::note("rubric", "Six fixed checks"))
            .confidence(confidence)
            .elapsed(start)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, vars};
    use chrono::Utc;
    use pseo_core::{ApprovalStatus, ComparisonRow, Faq, GenerationModel, ResponseStatus, TaskContext};

    fn good_page() -> PageOutput {
        PageOutput {
            page_id: "pat1_higgs_onlyf_12345678".to_string(),
            pattern_id: "1".to_string(),
            status: ResponseStatus::Completed,
            post_title: "Sozee vs Higgsfield for OnlyFans Creators".to_string(),
            url_slug: "/compare/sozee-vs-higgsfield-for-onlyfans-creators".to_string(),
            meta_title: "Sozee vs Higgsfield for OnlyFans Creators | AI Compare".to_string(),
            meta_description: "Compare Sozee and Higgsfield for OnlyFans creators. See setup, realism, privacy and pricing side by side, then start your free Sozee trial today. Try it now!".to_string(),
            hero_section: Hero {
                h1: "Sozee vs Higgsfield for OnlyFans Creators".to_string(),
                eyebrow: "HEAD-TO-HEAD COMPARISON".to_string(),
                subtitle: "Three photos in, unlimited content out.".to_string(),
                primary_cta: "Start Creating Free".to_string(),
                secondary_cta: "See the Full Comparison".to_string(),
            },
            problem_agitation: "# The Content Crisis\n\nFans want a hundred posts for every one you can shoot. Burnout follows fast when every new set means another day of lighting, makeup and editing. Higgsfield helps with video effects, yet it was built for filmmakers rather than subscription creators.".to_string(),
            solution_overview: "Sozee rebuilds your likeness from 3 photos with no training. You generate hyper-realistic sets in seconds and your AI model stays private to you. Scale your content without scaling your hours.".to_string(),
            comparison_table_json: vec![ComparisonRow::new("Setup", "3 photos", "Training required")],
            feature_sections: Vec::new(),
            faq_json: vec![Faq::new("Is Sozee private?", "Yes.")],
            final_cta: "Ready to end the content grind? Start with Sozee today.".to_string(),
            schema_markup: Vec::new(),
            pattern_sections: BTreeMap::new(),
            pseo_variables: vars(&[("competitor", "Higgsfield"), ("audience", "OnlyFans Creators")]),
            research_sources: Vec::new(),
            quality_score: 0.0,
            uniqueness_check: ApprovalStatus::Pending,
            generation_model: GenerationModel::Research,
            agents_used: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_complete_page_is_approved() {
        let report = review_page(&good_page());

        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report.overall_score >= 0.8);
        assert_eq!(report.approval_status, ApprovalStatus::Approved);
        assert_eq!(report.checks.len(), 6);
    }

    #[test]
    fn test_adding_defects_never_raises_score() {
        let mut page = good_page();
        let base = review_page(&page).overall_score;

        page.meta_title.clear();
        let fewer_meta = review_page(&page).overall_score;
        assert!(fewer_meta < base);

        page.url_slug = "/Compare/Sozee VS".to_string();
        let bad_slug = review_page(&page).overall_score;
        assert!(bad_slug < fewer_meta);

        page.problem_agitation = "Guaranteed results, 300% more fans".to_string();
        assert!(review_page(&page).overall_score <= bad_slug);
    }

    #[test]
    fn test_missing_meta_recommendations_lead() {
        let mut page = good_page();
        page.meta_title.clear();
        page.meta_description.clear();

        let report = review_page(&page);
        assert!(report.recommendations[0].starts_with("FIX CRITICAL ISSUES: Missing meta_title"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Review and optimize SEO metadata")));
    }

    #[test]
    fn test_competitor_must_be_named() {
        let mut page = good_page();
        page.pseo_variables = vars(&[("competitor", "Krea")]);

        let report = review_page(&page);
        assert!(report
            .warnings
            .contains(&"Competitor 'Krea' not mentioned in content".to_string()));
    }

    #[tokio::test]
    async fn test_empty_page_fails_review() {
        let mut page = good_page();
        page.post_title.clear();
        page.hero_section = Hero::default();
        page.problem_agitation.clear();
        page.solution_overview.clear();
        page.final_cta.clear();
        page.meta_title.clear();
        page.meta_description.clear();
        page.url_slug.clear();

        let msg = message(AgentKind::QualityControl, TaskPayload::ReviewPage, TaskContext::new().with_page(page));
        let response = QualityControlAgent::new().execute(&msg).await.unwrap();

        assert_eq!(response.status, ResponseStatus::Failed);
        let ResponseData::Quality(report) = &response.data else {
            panic!("unexpected data");
        };
        assert_eq!(report.approval_status, ApprovalStatus::Rejected);
        assert_eq!(response.confidence, report.overall_score);
    }

    #[tokio::test]
    async fn test_page_required() {
        let msg = message(AgentKind::QualityControl, TaskPayload::ReviewPage, TaskContext::new());
        let err = QualityControlAgent::new().execute(&msg).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingContext { .. }));
    }
}
