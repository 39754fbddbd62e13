//! Page pattern library
//!
//! Patterns are static configuration loaded from TOML, either the embedded
//! default or a file on disk. Each pattern declares the variables it needs
//! and the placeholder formulas for its H1 and URL.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Variables;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z][A-Za-z0-9_]*\}").unwrap());

/// Pattern library errors
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern library: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate pattern id: {0}")]
    Duplicate(String),
}

/// A pattern-specific page section the copywriter fills in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub id: String,
    pub name: String,
    /// Sections without a prompt are produced by other agents
    #[serde(default)]
    pub generation_prompt: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub visual_style: Option<String>,
}

/// A named page archetype
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub variables: Vec<String>,
    pub h1_formula: String,
    pub url_formula: String,
    #[serde(default)]
    pub eyebrow: String,
    #[serde(default = "default_primary_cta")]
    pub primary_cta: String,
    #[serde(default = "default_secondary_cta")]
    pub secondary_cta: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub show_comparison_table: bool,
    #[serde(default)]
    pub sections: Vec<SectionTemplate>,
}

fn default_primary_cta() -> String {
    "Get Started Free".to_string()
}

fn default_secondary_cta() -> String {
    "See How It Works".to_string()
}

fn default_priority() -> String {
    "MEDIUM".to_string()
}

impl Pattern {
    /// H1 with every placeholder replaced by the raw variable value
    pub fn render_h1(&self, variables: &Variables) -> String {
        render_placeholders(&self.h1_formula, variables)
    }

    pub fn render_eyebrow(&self, variables: &Variables) -> String {
        render_placeholders(&self.eyebrow, variables)
    }

    /// URL path with slugified variable values
    pub fn render_url(&self, variables: &Variables) -> String {
        let slugged: Variables = variables
            .iter()
            .map(|(k, v)| (k.clone(), slugify(v)))
            .collect();
        render_placeholders(&self.url_formula, &slugged)
    }

    /// Declared variables the caller did not supply
    pub fn missing_variables<'a>(&'a self, variables: &Variables) -> Vec<&'a str> {
        self.variables
            .iter()
            .filter(|name| !variables.get(*name).is_some_and(|v| !v.trim().is_empty()))
            .map(String::as_str)
            .collect()
    }

    /// Sections the copywriter must generate itself
    pub fn generated_sections(&self) -> impl Iterator<Item = &SectionTemplate> {
        self.sections
            .iter()
            .filter(|s| !matches!(s.id.as_str(), "hero" | "faq" | "final_cta"))
            .filter(|s| s.generation_prompt.is_some())
    }
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    patterns: Vec<Pattern>,
}

/// All known patterns, in file order
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
}

impl PatternLibrary {
    /// Load the pattern library shipped with the crate
    pub fn load_embedded() -> Result<Self, PatternError> {
        Self::from_toml_str(include_str!("../data/patterns.toml"))
    }

    /// Load a pattern library from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PatternError> {
        let file: PatternFile = toml::from_str(content)?;
        let mut library = Self::default();
        for pattern in file.patterns {
            library.register(pattern)?;
        }
        Ok(library)
    }

    pub fn register(&mut self, pattern: Pattern) -> Result<(), PatternError> {
        if self.get(&pattern.id).is_some() {
            return Err(PatternError::Duplicate(pattern.id));
        }
        self.patterns.push(pattern);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id.trim())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Replace `{name}` placeholders in several casings with variable values.
///
/// For `use_case` this covers `{use_case}`, `{Use_case}`, `{Use_Case}` and
/// `{USE_CASE}`. Unknown placeholders are left in place.
pub fn render_placeholders(template: &str, variables: &Variables) -> String {
    let mut rendered = template.to_string();
    for (name, value) in variables {
        for placeholder in placeholder_forms(name) {
            if rendered.contains(&placeholder) {
                rendered = rendered.replace(&placeholder, value);
            }
        }
    }
    rendered
}

/// Placeholders still present after rendering
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn placeholder_forms(name: &str) -> [String; 4] {
    let title = name
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("_");
    [
        format!("{{{}}}", name),
        format!("{{{}}}", capitalize(name)),
        format!("{{{}}}", title),
        format!("{{{}}}", name.to_uppercase()),
    ]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// URL-safe form of a variable value: lowercase, spaces and underscores to dashes
pub fn slugify(value: &str) -> String {
    value.trim().to_lowercase().replace([' ', '_'], "-")
}
