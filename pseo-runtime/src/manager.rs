//! Message manager
//!
//! Routes messages to agents through the registry, assigns task ids and
//! keeps an append-only log of every message and response of the process.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use pseo_agents::AgentError;
use pseo_core::{AgentTask, Message, Priority, Response, TaskContext, TaskPayload};

use crate::{AgentRegistry, RegistryError, SharedAgent};

/// Sender name used for orchestrator-originated messages
pub const ORCHESTRATOR: &str = "Orchestrator";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Wiring(#[from] RegistryError),

    #[error("{agent} failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },
}

/// One entry of the message log
#[derive(Debug, Clone)]
pub enum LogEntry {
    Sent(Message),
    Received(Response),
}

/// Result of a concurrent group: successes and failures keyed by agent name
#[derive(Debug, Default)]
pub struct GroupOutcome {
    pub responses: BTreeMap<String, Response>,
    pub failures: BTreeMap<String, String>,
}

pub struct AgentManager {
    registry: AgentRegistry,
    counter: AtomicU64,
    log: Mutex<Vec<LogEntry>>,
}

impl AgentManager {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            counter: AtomicU64::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// `task_{n}_{unix seconds}`, unique within the process
    pub fn next_task_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("task_{}_{}", n, Utc::now().timestamp())
    }

    /// Build a message for `to` and deliver it
    pub async fn send_message(
        &self,
        from: &str,
        to: &str,
        task: TaskPayload,
        context: TaskContext,
        priority: Priority,
    ) -> Result<Response, DispatchError> {
        let agent = self.registry.resolve(to)?;
        self.dispatch(agent, from, to, task, context, priority).await
    }

    async fn dispatch(
        &self,
        agent: SharedAgent,
        from: &str,
        to: &str,
        task: TaskPayload,
        context: TaskContext,
        priority: Priority,
    ) -> Result<Response, DispatchError> {
        let message = Message::new(from, to, &self.next_task_id(), priority, task, context);
        debug!("{} -> {} [{}] {}", from, to, message.task_id, message.task.action());
        self.log.lock().push(LogEntry::Sent(message.clone()));

        let response = agent
            .execute(&message)
            .await
            .map_err(|source| DispatchError::Agent {
                agent: to.to_string(),
                source,
            })?;

        debug!(
            "{} <- {} [{}] {:?} ({:.2}s)",
            from, to, response.task_id, response.status, response.execution_time
        );
        self.log.lock().push(LogEntry::Received(response.clone()));
        Ok(response)
    }

    /// Run tasks concurrently against one shared context.
    ///
    /// Every agent is resolved before anything is sent, so a wiring error
    /// dispatches nothing. After that, one task's failure never affects
    /// the others.
    pub async fn execute_group(
        &self,
        tasks: &[AgentTask],
        context: &TaskContext,
    ) -> Result<GroupOutcome, RegistryError> {
        let resolved = tasks
            .iter()
            .map(|task| self.registry.resolve(&task.agent).map(|agent| (agent, task)))
            .collect::<Result<Vec<_>, RegistryError>>()?;

        let futures = resolved.into_iter().map(|(agent, task)| async move {
            let result = self
                .dispatch(
                    agent,
                    ORCHESTRATOR,
                    &task.agent,
                    task.task.clone(),
                    context.clone(),
                    task.priority,
                )
                .await;
            (task.agent.clone(), result)
        });

        let mut outcome = GroupOutcome::default();
        for (agent, result) in join_all(futures).await {
            match result {
                Ok(response) => {
                    outcome.responses.insert(agent, response);
                }
                Err(e) => {
                    warn!("{} failed: {}", agent, e);
                    outcome.failures.insert(agent, e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    /// Snapshot of the message log
    pub fn message_log(&self) -> Vec<LogEntry> {
        self.log.lock().clone()
    }

    /// Messages sent plus responses received so far
    pub fn messages_exchanged(&self) -> usize {
        self.log.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use pseo_agents::{Agent, AgentKind};
    use pseo_core::ResponseData;
    use serde_json::json;

    struct Scripted {
        kind: AgentKind,
        fail: bool,
    }

    #[async_trait]
    impl Agent for Scripted {
        fn kind(&self) -> AgentKind {
            self.kind
        }

        async fn execute(&self, message: &Message) -> Result<Response, AgentError> {
            if self.fail {
                return Err(AgentError::missing(self.kind, "everything"));
            }
            Ok(Response::builder(message, ResponseData::Research(json!({"ok": true}))).build())
        }
    }

    fn manager() -> AgentManager {
        let mut registry = AgentRegistry::new();
        for (kind, fail) in [
            (AgentKind::CompetitorResearch, false),
            (AgentKind::Statistics, true),
            (AgentKind::AudienceInsight, false),
        ] {
            registry.register(Arc::new(Scripted { kind, fail }));
        }
        AgentManager::new(registry)
    }

    fn task(kind: AgentKind) -> AgentTask {
        AgentTask::new(
            kind.name(),
            TaskPayload::ResearchAudience {
                audience: "Fitness Models".to_string(),
                required_data: Vec::new(),
            },
            Priority::High,
        )
        .parallel()
    }

    #[test]
    fn test_task_ids_are_unique() {
        let manager = manager();
        let first = manager.next_task_id();
        let second = manager.next_task_id();

        assert!(first.starts_with("task_1_"));
        assert!(second.starts_with("task_2_"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_group_failure_is_isolated() {
        let manager = manager();
        let tasks = vec![
            task(AgentKind::CompetitorResearch),
            task(AgentKind::Statistics),
            task(AgentKind::AudienceInsight),
        ];

        let outcome = manager
            .execute_group(&tasks, &TaskContext::new())
            .await
            .unwrap();

        assert_eq!(outcome.responses.len(), 2);
        assert!(outcome.responses.contains_key("Competitor_Research_Agent"));
        assert!(outcome.responses.contains_key("Audience_Insight_Agent"));
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures["Statistics_Agent"].contains("missing required context"));

        // three sent, two answered
        assert_eq!(manager.messages_exchanged(), 5);
    }

    #[tokio::test]
    async fn test_wiring_error_sends_nothing() {
        let manager = manager();
        let tasks = vec![task(AgentKind::CompetitorResearch), task(AgentKind::Copywriting)];

        let result = manager.execute_group(&tasks, &TaskContext::new()).await;

        assert!(matches!(result, Err(RegistryError::Unregistered(AgentKind::Copywriting))));
        assert!(manager.message_log().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_logs_both_directions() {
        let manager = manager();
        let response = manager
            .send_message(
                ORCHESTRATOR,
                "Audience_Insight_Agent",
                task(AgentKind::AudienceInsight).task,
                TaskContext::new(),
                Priority::Medium,
            )
            .await
            .unwrap();

        let log = manager.message_log();
        assert_eq!(log.len(), 2);
        let LogEntry::Sent(sent) = &log[0] else {
            panic!("expected the message first");
        };
        assert_eq!(sent.task_id, response.task_id);
        assert!(matches!(log[1], LogEntry::Received(_)));
    }
}
