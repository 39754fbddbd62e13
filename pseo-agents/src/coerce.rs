//! Field-by-field conversion of model JSON into page types
//!
//! Models get optional fields wrong all the time (`null`, a string where an
//! object was asked for, `"yes"` for a boolean). A bad optional field turns
//! into its default; a bad list item is dropped. Only a reply with the wrong
//! overall shape is rejected.

use serde_json::Value;

use pseo_core::{ComparisonRow, Faq, Feature, Hero, PageContent, SeoMetadata};

use crate::AgentError;

/// Scalar as text; anything else is empty
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Array items as text, or a single string split on commas
pub fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text).filter(|s| !s.is_empty()).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Items of a list, also accepting `{"<key>": [...]}` wrappers
fn items<'a>(value: &'a Value, wrapper: &str) -> &'a [Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get(wrapper)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn hero(value: &Value) -> Hero {
    Hero {
        h1: text(&value["h1"]),
        eyebrow: text(&value["eyebrow"]),
        subtitle: text(&value["subtitle"]),
        primary_cta: text(&value["primary_cta"]),
        secondary_cta: text(&value["secondary_cta"]),
    }
}

/// A feature object, or a bare string used as its title
fn feature(value: &Value) -> Option<Feature> {
    let feature = match value {
        Value::String(s) => Feature {
            title: s.trim().to_string(),
            content: String::new(),
        },
        Value::Object(_) => Feature {
            title: text(&value["title"]),
            content: text(&value["content"]),
        },
        _ => return None,
    };
    (!feature.title.is_empty() || !feature.content.is_empty()).then_some(feature)
}

/// A comparison row needs its feature name
pub fn comparison_row(value: &Value) -> Option<ComparisonRow> {
    let feature = text(&value["feature"]);
    if feature.is_empty() {
        return None;
    }
    Some(ComparisonRow {
        feature,
        sozee: text(&value["sozee"]),
        competitor: text(&value["competitor"]),
        sozee_advantage: flag(&value["sozee_advantage"]),
    })
}

pub fn comparison_rows(value: &Value) -> Vec<ComparisonRow> {
    items(value, "comparison_table")
        .iter()
        .filter_map(comparison_row)
        .collect()
}

/// A standalone table: a list whose every row carries all three columns
pub fn comparison_table(value: &Value) -> Result<Vec<ComparisonRow>, AgentError> {
    let rows = value
        .as_array()
        .ok_or_else(|| AgentError::Parse("comparison table must be a JSON list".to_string()))?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let complete = ["feature", "sozee", "competitor"]
                .iter()
                .all(|key| row.get(key).is_some_and(|cell| !cell.is_null()));
            complete
                .then(|| comparison_row(row))
                .flatten()
                .ok_or_else(|| AgentError::Parse(format!("comparison row {} is incomplete", i)))
        })
        .collect()
}

/// A FAQ pair needs both halves
pub fn faq(value: &Value) -> Option<Faq> {
    let question = text(&value["question"]);
    let answer = text(&value["answer"]);
    (!question.is_empty() && !answer.is_empty()).then(|| Faq::new(question, answer))
}

pub fn faqs(value: &Value) -> Vec<Faq> {
    items(value, "faqs").iter().filter_map(faq).collect()
}

fn expect_object(value: &Value, what: &str) -> Result<(), AgentError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(AgentError::Parse(format!("{} must be a JSON object", what)))
    }
}

/// Main page copy; `pattern_sections` is filled by the caller
pub fn page_content(value: &Value) -> Result<PageContent, AgentError> {
    expect_object(value, "page copy")?;
    Ok(PageContent {
        hero: hero(&value["hero"]),
        problem: text(&value["problem"]),
        solution: text(&value["solution"]),
        features: items(&value["features"], "features")
            .iter()
            .filter_map(feature)
            .collect(),
        comparison_table: comparison_rows(&value["comparison_table"]),
        final_cta: text(&value["final_cta"]),
        ..PageContent::default()
    })
}

pub fn seo_metadata(value: &Value) -> Result<SeoMetadata, AgentError> {
    expect_object(value, "SEO metadata")?;
    Ok(SeoMetadata {
        meta_title: text(&value["meta_title"]),
        meta_description: text(&value["meta_description"]),
        focus_keyword: text(&value["focus_keyword"]),
        secondary_keywords: text_list(&value["secondary_keywords"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bad_optional_fields_default() {
        let copy = json!({
            "hero": {"h1": "Sozee vs Higgsfield", "subtitle": null, "primary_cta": 42},
            "problem": "Creators burn out.",
            "features": ["Instant likeness", {"title": "Privacy", "content": "Isolated models"}, 7],
            "comparison_table": [
                {"feature": "Setup", "sozee": "3 photos", "competitor": "Training", "sozee_advantage": "yes"},
                {"sozee": "no feature name"}
            ],
            "final_cta": ["not", "text"]
        });

        let content = page_content(&copy).unwrap();
        assert_eq!(content.hero.h1, "Sozee vs Higgsfield");
        assert_eq!(content.hero.subtitle, "");
        assert_eq!(content.hero.primary_cta, "42");
        assert_eq!(content.problem, "Creators burn out.");
        assert_eq!(content.features.len(), 2);
        assert_eq!(content.features[0].title, "Instant likeness");
        assert_eq!(content.comparison_table.len(), 1);
        assert_eq!(content.comparison_table[0].sozee_advantage, Some(true));
        assert_eq!(content.final_cta, "");
    }

    #[test]
    fn test_wrong_shape_rejected() {
        assert!(matches!(page_content(&json!(["hero"])), Err(AgentError::Parse(_))));
        assert!(seo_metadata(&json!("title")).is_err());
    }

    #[test]
    fn test_standalone_table_needs_every_column() {
        let table = json!([
            {"feature": "Setup", "sozee": "3 photos", "competitor": "20 images", "sozee_advantage": "yes"},
            {"feature": "NSFW", "sozee": "Full", "competitor": 0}
        ]);
        let rows = comparison_table(&table).unwrap();
        assert_eq!(rows[0].sozee_advantage, Some(true));
        assert_eq!(rows[1].competitor, "0");

        let missing = json!([{"feature": "Setup", "sozee": "3 photos"}]);
        assert!(comparison_table(&missing).is_err());
        assert!(comparison_table(&json!({"feature": "Setup"})).is_err());
    }

    #[test]
    fn test_faqs_keep_good_rows() {
        let reply = json!([
            {"question": "Is it private?", "answer": "Yes."},
            {"question": "Missing answer"},
            {"question": "Price?", "answer": null},
            {"question": "How fast?", "answer": "Minutes."}
        ]);
        let pairs = faqs(&reply);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].question, "How fast?");

        let wrapped = json!({"faqs": [{"question": "Q?", "answer": "A."}]});
        assert_eq!(faqs(&wrapped).len(), 1);
    }

    #[test]
    fn test_seo_keywords() {
        let meta = seo_metadata(&json!({
            "meta_title": "Sozee vs Higgsfield",
            "meta_description": "Compare both.",
            "secondary_keywords": null
        }))
        .unwrap();
        assert!(meta.secondary_keywords.is_empty());

        assert_eq!(text_list(&json!("ai photos, creator tools")), vec!["ai photos", "creator tools"]);
        assert_eq!(flag(&json!("No")), Some(false));
        assert_eq!(flag(&json!("partial")), None);
    }
}
