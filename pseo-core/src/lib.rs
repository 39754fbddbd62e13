//! PSEO Core - Message, blueprint and page types for landing page generation
//!
//! This crate provides the foundational data model shared by every agent:
//! - Inter-agent messages and responses with typed task payloads
//! - Blueprints and the planned task graph produced by the strategist
//! - The assembled page record with its public and full views
//! - The static pattern library and placeholder rendering

pub mod messages;
pub mod blueprint;
pub mod page;
pub mod review;
pub mod patterns;

pub use messages::*;
pub use blueprint::*;
pub use page::*;
pub use review::*;
pub use patterns::*;

use std::collections::BTreeMap;

/// PSEO variables for one page (`competitor`, `audience`, `platform`, ...).
///
/// Ordered so that hashing and serialization are stable across runs.
pub type Variables = BTreeMap<String, String>;

/// Brand name injected into titles, schema and fallback copy
pub const BRAND_NAME: &str = "Sozee";

/// Brand home page
pub const BRAND_URL: &str = "https://sozee.ai";

/// Audience used when a page has none
pub const DEFAULT_AUDIENCE: &str = "creators";

/// Platform used when a page has none
pub const DEFAULT_PLATFORM: &str = "social media";
