//! PSEO Agents
//!
//! The agents that turn one pattern and its variables into a landing page:
//! - **Strategist**: plans the blueprint and the task graph
//! - **Competitor Research**: knowledge base, cache, then LLM research
//! - **Audience Insight** and **Statistics**: cached LLM research
//! - **Copywriting**: hero, problem, solution and pattern sections
//! - **FAQ Generator**, **SEO Optimization**, **Comparison Table**: supplementary copy
//! - **Schema Markup**: Schema.org records, no LLM
//! - **Quality Control**: fixed six-check rubric and approval verdict
//!
//! Every LLM-backed agent degrades to a documented fallback when the model
//! output is unusable; only wiring defects and missing context are errors.

pub mod backend;
pub mod traits;
pub mod json;
pub mod coerce;
pub mod cache;
pub mod hooks;
pub mod strategist;
pub mod competitor;
pub mod audience;
pub mod statistics;
pub mod copywriting;
pub mod faq;
pub mod seo;
pub mod comparison;
pub mod schema;
pub mod quality;

#[cfg(test)]
mod test_support;

pub use backend::*;
pub use traits::*;
pub use json::*;
pub use cache::*;
pub use hooks::*;
pub use strategist::*;
pub use competitor::*;
pub use audience::*;
pub use statistics::*;
pub use copywriting::*;
pub use faq::*;
pub use seo::*;
pub use comparison::*;
pub use schema::*;
pub use quality::*;
