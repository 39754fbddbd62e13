//! Opening hooks for page copy and the strategies that pick them

use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;

/// Used when no hooks are configured
pub const DEFAULT_HOOK: &str = "Transform your content creation";

#[derive(Debug, Error)]
pub enum HookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid hook list: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookList {
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl HookList {
    /// Load the hook list shipped with the crate
    pub fn load_embedded() -> Result<Self, HookError> {
        Ok(toml::from_str(include_str!("../data/hooks.toml"))?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, HookError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Strategy for choosing the hook of a page
pub trait HookSelector: Send + Sync {
    fn select(&self) -> String;
}

pub type SharedHookSelector = Arc<dyn HookSelector>;

/// Uniformly random choice from a hook list
pub struct RandomHook {
    hooks: Vec<String>,
}

impl RandomHook {
    pub fn new(list: HookList) -> Self {
        Self { hooks: list.hooks }
    }
}

impl HookSelector for RandomHook {
    fn select(&self) -> String {
        self.hooks
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOOK.to_string())
    }
}

/// Always the same hook
pub struct FixedHook(pub String);

impl HookSelector for FixedHook {
    fn select(&self) -> String {
        self.0.clone()
    }
}
