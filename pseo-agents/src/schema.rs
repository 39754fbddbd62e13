//! Schema Markup Agent
//!
//! Schema.org JSON-LD records for rich results. No LLM call: the output is
//! a pure function of the message, dates included.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::info;

use pseo_core::{Faq, Message, PageContent, Response, ResponseData, SeoMetadata, Source, TaskPayload, BRAND_NAME, BRAND_URL};

use crate::{Agent, AgentError, AgentKind};

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Questions carried by the FAQPage record
pub const MAX_SCHEMA_FAQS: usize = 10;

/// Characters of the problem section used as a review body
const REVIEW_BODY_CHARS: usize = 500;

const PRODUCT_NAME: &str = "Sozee AI Content Studio";

fn h1_or<'a>(page: &'a PageContent, default: &'a str) -> &'a str {
    let h1 = page.hero.h1.trim();
    if h1.is_empty() {
        default
    } else {
        h1
    }
}

fn organization() -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "Organization",
        "name": BRAND_NAME,
        "url": BRAND_URL,
        "logo": format!("{}/logo.png", BRAND_URL),
        "description": "AI-powered content generation platform built specifically for creators. Instant likeness from 3 photos, 1-click TikTok cloning, and complete SFW/NSFW support.",
        "sameAs": [
            "https://twitter.com/sozee_ai",
            "https://www.linkedin.com/company/sozee-ai"
        ],
        "foundingDate": "2024",
        "areaServed": "Worldwide",
        "contactPoint": {
            "@type": "ContactPoint",
            "contactType": "Customer Support",
            "url": format!("{}/contact", BRAND_URL)
        }
    })
}

fn web_page(page: &PageContent, meta: &SeoMetadata, url: &str, date: &str) -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "WebPage",
        "name": h1_or(page, PRODUCT_NAME),
        "description": meta.meta_description,
        "url": url,
        "datePublished": date,
        "dateModified": date,
        "inLanguage": "en-US",
        "publisher": {"@type": "Organization", "name": BRAND_NAME}
    })
}

fn faq_page(faqs: &[Faq]) -> Value {
    let entities: Vec<Value> = faqs
        .iter()
        .take(MAX_SCHEMA_FAQS)
        .map(|faq| {
            json!({
                "@type": "Question",
                "name": faq.question,
                "acceptedAnswer": {"@type": "Answer", "text": faq.answer}
            })
        })
        .collect();

    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "FAQPage",
        "mainEntity": entities
    })
}

fn aggregate_rating() -> Value {
    json!({
        "@type": "AggregateRating",
        "ratingValue": "4.8",
        "reviewCount": "250",
        "bestRating": "5",
        "worstRating": "1"
    })
}

fn weekly_price() -> Value {
    json!({
        "@type": "UnitPriceSpecification",
        "price": "15.00",
        "priceCurrency": "USD",
        "unitText": "WEEK"
    })
}

fn product() -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "Product",
        "name": PRODUCT_NAME,
        "description": "AI-powered content generation platform with instant 3-photo setup, 1-click TikTok cloning, and NSFW support built for creators.",
        "brand": {"@type": "Brand", "name": BRAND_NAME},
        "offers": {
            "@type": "AggregateOffer",
            "lowPrice": "15",
            "highPrice": "33",
            "priceCurrency": "USD",
            "priceSpecification": weekly_price(),
            "availability": "https://schema.org/InStock",
            "url": format!("{}/pricing", BRAND_URL)
        },
        "aggregateRating": aggregate_rating()
    })
}

fn software_application() -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "SoftwareApplication",
        "name": PRODUCT_NAME,
        "applicationCategory": "BusinessApplication",
        "operatingSystem": "Web-based",
        "offers": {
            "@type": "Offer",
            "price": "15.00",
            "priceCurrency": "USD",
            "priceSpecification": weekly_price()
        },
        "aggregateRating": aggregate_rating(),
        "featureList": [
            "Instant likeness from 3 photos",
            "1-click TikTok cloning",
            "SFW and NSFW content support",
            "Hyper-realistic AI generation",
            "Built for OnlyFans and creator platforms",
            "30-second content generation"
        ]
    })
}

fn review(page: &PageContent, date: &str) -> Value {
    let body: String = page.problem.chars().take(REVIEW_BODY_CHARS).collect();
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "Review",
        "itemReviewed": {
            "@type": "SoftwareApplication",
            "name": PRODUCT_NAME,
            "applicationCategory": "BusinessApplication"
        },
        "reviewRating": {
            "@type": "Rating",
            "ratingValue": "4.8",
            "bestRating": "5",
            "worstRating": "1"
        },
        "author": {"@type": "Organization", "name": "Sozee Review Team"},
        "reviewBody": body,
        "datePublished": date
    })
}

fn breadcrumbs(page: &PageContent, url: &str) -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "BreadcrumbList",
        "itemListElement": [
            {"@type": "ListItem", "position": 1, "name": "Home", "item": BRAND_URL},
            {"@type": "ListItem", "position": 2, "name": h1_or(page, BRAND_NAME), "item": url}
        ]
    })
}

/// All records for one page, in emission order
pub fn build_schemas(
    pattern_id: &str,
    url_slug: &str,
    page: &PageContent,
    faqs: &[Faq],
    meta: &SeoMetadata,
    generated_at: DateTime<Utc>,
) -> Vec<Value> {
    let url = format!("{}{}", BRAND_URL, url_slug);
    let date = generated_at.format("%Y-%m-%d").to_string();

    let mut schemas = vec![organization(), web_page(page, meta, &url, &date)];
    if !faqs.is_empty() {
        schemas.push(faq_page(faqs));
    }
    match pattern_id {
        "1" | "4" => schemas.push(product()),
        "2" => schemas.push(software_application()),
        "5" => schemas.push(review(page, &date)),
        _ => {}
    }
    schemas.push(breadcrumbs(page, &url));
    schemas
}

/// Wrap records in a single JSON-LD script tag, using `@graph` for several
pub fn render_json_ld(schemas: &[Value]) -> serde_json::Result<String> {
    let body = match schemas {
        [single] => serde_json::to_string_pretty(single)?,
        _ => serde_json::to_string_pretty(&json!({
            "@context": SCHEMA_CONTEXT,
            "@graph": schemas
        }))?,
    };
    Ok(format!("<script type=\"application/ld+json\">\n{}\n</script>", body))
}

#[derive(Default)]
pub struct SchemaMarkupAgent;

impl SchemaMarkupAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for SchemaMarkupAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SchemaMarkup
    }

    async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
        let start = Instant::now();
        let TaskPayload::GenerateSchema {
            pattern_id,
            url_slug,
            page_data,
            faqs,
            meta,
        } = &message.task
        else {
            return Err(AgentError::unexpected(self.kind(), message));
        };

        let schemas = build_schemas(pattern_id, url_slug, page_data, faqs, meta, message.timestamp);
        info!("Generated {} schema types", schemas.len());

        Ok(Response::builder(message, ResponseData::Schema(schemas))
            .source(Source::note("template", "Schema.org records"))
            .confidence(0.95)
            .elapsed(start)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;
    use chrono::TimeZone;
    use pseo_core::{Hero, TaskContext};

    fn page() -> PageContent {
        PageContent {
            hero: Hero {
                h1: "Sozee Review for Fitness Models".to_string(),
                ..Hero::default()
            },
            problem: "x".repeat(800),
            ..PageContent::default()
        }
    }

    fn types(schemas: &[Value]) -> Vec<&str> {
        schemas.iter().map(|s| s["@type"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_review_page_records() {
        let faqs: Vec<Faq> = (0..12).map(|i| Faq::new(format!("Q{i}?"), "A.")).collect();
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        let schemas = build_schemas("5", "/review/sozee", &page(), &faqs, &SeoMetadata::default(), at);

        assert_eq!(
            types(&schemas),
            vec!["Organization", "WebPage", "FAQPage", "Review", "BreadcrumbList"]
        );
        assert_eq!(schemas[1]["url"], "https://sozee.ai/review/sozee");
        assert_eq!(schemas[1]["datePublished"], "2025-03-09");
        assert_eq!(schemas[2]["mainEntity"].as_array().unwrap().len(), MAX_SCHEMA_FAQS);
        assert_eq!(schemas[3]["reviewBody"].as_str().unwrap().len(), 500);
    }

    #[test]
    fn test_no_faqs_no_pattern_record() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let schemas = build_schemas("6", "/crisis", &PageContent::default(), &[], &SeoMetadata::default(), at);

        assert_eq!(types(&schemas), vec!["Organization", "WebPage", "BreadcrumbList"]);
        assert_eq!(schemas[1]["name"], "Sozee AI Content Studio");
    }

    #[test]
    fn test_json_ld_graph() {
        let single = render_json_ld(&[organization()]).unwrap();
        assert!(single.starts_with("<script type=\"application/ld+json\">"));
        assert!(!single.contains("@graph"));

        let graph = render_json_ld(&[organization(), product()]).unwrap();
        assert!(graph.contains("@graph"));
        assert!(graph.ends_with("</script>"));
    }

    #[tokio::test]
    async fn test_output_depends_only_on_message() {
        let msg = message(
            AgentKind::SchemaMarkup,
            TaskPayload::GenerateSchema {
                pattern_id: "1".to_string(),
                url_slug: "/compare/sozee-vs-krea".to_string(),
                page_data: page(),
                faqs: vec![Faq::new("Q?", "A.")],
                meta: SeoMetadata::default(),
            },
            TaskContext::new(),
        );
        let agent = SchemaMarkupAgent::new();

        let first = agent.execute(&msg).await.unwrap();
        let second = agent.execute(&msg).await.unwrap();
        let (ResponseData::Schema(a), ResponseData::Schema(b)) = (&first.data, &second.data) else {
            panic!("unexpected data");
        };
        assert_eq!(a, b);
        assert_eq!(types(a)[3], "Product");
    }
}
