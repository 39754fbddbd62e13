//! Agent registry
//!
//! Planned tasks name their agent by display name ("Copywriting_Agent").
//! The registry normalizes that name and resolves it to the one running
//! instance of the matching agent kind.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use pseo_agents::{
    Agent, AgentConfig, AgentKind, AudienceInsightAgent, ComparisonTableAgent,
    CompetitorResearchAgent, CopywritingAgent, FaqGeneratorAgent, QualityControlAgent,
    SchemaMarkupAgent, SeoOptimizationAgent, SharedBackend, SharedHookSelector, StatisticsAgent,
    StrategistAgent,
};
use pseo_core::PatternLibrary;
use pseo_kb::KnowledgeBase;

pub type SharedAgent = Arc<dyn Agent>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown agent '{name}' (normalized to '{key}')")]
    UnknownAgent { name: String, key: String },

    #[error("No instance registered for {0}")]
    Unregistered(AgentKind),
}

/// Lower-case a display name and strip a trailing `_agent`
pub fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix("_agent") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// One instance per agent kind
#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentKind, SharedAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every agent of the pipeline, sharing one backend and one knowledge base
    pub fn standard(
        backend: SharedBackend,
        kb: Arc<KnowledgeBase>,
        library: Arc<PatternLibrary>,
        hooks: SharedHookSelector,
        llm_timeout: Duration,
    ) -> Self {
        let config = |id: &str| AgentConfig::default().with_id(id).with_timeout(llm_timeout);

        let mut registry = Self::new();
        registry.register(Arc::new(StrategistAgent::new(library.clone())));
        registry.register(Arc::new(CompetitorResearchAgent::new(
            config("competitor-1"),
            backend.clone(),
            kb.clone(),
        )));
        registry.register(Arc::new(AudienceInsightAgent::new(
            config("audience-1"),
            backend.clone(),
        )));
        registry.register(Arc::new(StatisticsAgent::new(
            config("statistics-1"),
            backend.clone(),
        )));
        registry.register(Arc::new(CopywritingAgent::new(
            config("copywriter-1"),
            backend.clone(),
            library,
            hooks,
        )));
        registry.register(Arc::new(FaqGeneratorAgent::new(
            config("faq-1"),
            backend.clone(),
        )));
        registry.register(Arc::new(SeoOptimizationAgent::new(
            config("seo-1"),
            backend.clone(),
        )));
        registry.register(Arc::new(ComparisonTableAgent::new(
            config("comparison-1"),
            backend,
            kb,
        )));
        registry.register(Arc::new(SchemaMarkupAgent::new()));
        registry.register(Arc::new(QualityControlAgent::new()));
        registry
    }

    /// Register an agent under its kind, replacing any previous instance
    pub fn register(&mut self, agent: SharedAgent) {
        debug!("Registered {}", agent.name());
        self.agents.insert(agent.kind(), agent);
    }

    /// Resolve a display name or registry key to its agent
    pub fn resolve(&self, name: &str) -> Result<SharedAgent, RegistryError> {
        let key = normalize(name);
        let kind = AgentKind::from_key(&key).ok_or_else(|| RegistryError::UnknownAgent {
            name: name.to_string(),
            key: key.clone(),
        })?;
        self.agents
            .get(&kind)
            .cloned()
            .ok_or(RegistryError::Unregistered(kind))
    }

    pub fn kinds(&self) -> Vec<AgentKind> {
        self.agents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pseo_agents::{FixedHook, GenerationOptions, LlmBackend, LlmError};

    struct NoBackend;

    #[async_trait]
    impl LlmBackend for NoBackend {
        async fn generate(&self, _: &str, _: &GenerationOptions) -> Result<String, LlmError> {
            Err(LlmError::Api("offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "none"
        }
    }

    fn standard() -> AgentRegistry {
        AgentRegistry::standard(
            Arc::new(NoBackend),
            Arc::new(KnowledgeBase::in_memory()),
            Arc::new(PatternLibrary::load_embedded().unwrap()),
            Arc::new(FixedHook("Hook".to_string())),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Copywriting_Agent"), "copywriting");
        assert_eq!(normalize("PSEO_Strategist_Agent"), "pseo_strategist");
        assert_eq!(normalize(" FAQ_Generator_Agent "), "faq_generator");
        assert_eq!(normalize("schema_markup"), "schema_markup");
    }

    #[test]
    fn test_every_display_name_resolves() {
        let registry = standard();
        assert_eq!(registry.len(), AgentKind::ALL.len());

        for kind in AgentKind::ALL {
            let agent = registry.resolve(kind.name()).unwrap();
            assert_eq!(agent.kind(), kind);
            assert_eq!(registry.resolve(kind.key()).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_unknown_and_unregistered() {
        let registry = standard();
        assert!(matches!(
            registry.resolve("Translator_Agent"),
            Err(RegistryError::UnknownAgent { key, .. }) if key == "translator"
        ));

        let empty = AgentRegistry::new();
        assert!(matches!(
            empty.resolve("Statistics_Agent"),
            Err(RegistryError::Unregistered(AgentKind::Statistics))
        ));
    }
}
