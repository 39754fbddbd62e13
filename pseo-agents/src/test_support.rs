//! Shared helpers for agent unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pseo_core::{Message, Priority, TaskContext, TaskPayload, Variables};

use crate::{AgentKind, GenerationOptions, LlmBackend, LlmError, SharedBackend};

/// Backend returning a fixed reply, or failing when the reply is `None`
pub struct MockBackend {
    reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| LlmError::Api("mock failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

pub fn shared(backend: &Arc<MockBackend>) -> SharedBackend {
    backend.clone()
}

pub fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn message(to: AgentKind, task: TaskPayload, context: TaskContext) -> Message {
    Message::new(
        "orchestrator",
        to.name(),
        "task_1_1700000000",
        Priority::Medium,
        task,
        context,
    )
}
