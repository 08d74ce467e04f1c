use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::handler::HandlerError;

/// Durable storage for step results, keyed by invocation and step id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, invocation_key: &str, step_id: &str) -> Option<Value>;
    async fn put(&self, invocation_key: &str, step_id: &str, value: Value);
}

/// Process-local checkpoint store for tests and embedded runs.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    entries: DashMap<(String, String), Value>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, invocation_key: &str, step_id: &str) -> Option<Value> {
        self.entries
            .get(&(invocation_key.to_string(), step_id.to_string()))
            .map(|v| v.clone())
    }

    async fn put(&self, invocation_key: &str, step_id: &str, value: Value) {
        self.entries
            .insert((invocation_key.to_string(), step_id.to_string()), value);
    }
}

/// Durable step primitives handed to each handler invocation.
///
/// The invocation key is stable across retries of the same delivery, so a
/// checkpointed step never runs twice even when the whole handler does.
#[derive(Clone)]
pub struct StepContext {
    invocation_key: String,
    attempt: u32,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl StepContext {
    pub fn new(invocation_key: String, attempt: u32, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            invocation_key,
            attempt,
            checkpoints,
        }
    }

    /// Current (1-based) attempt of the enclosing handler invocation.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Run a durable step. The closure executes at most once per invocation
    /// key; re-executions return the checkpointed result.
    ///
    /// Failed steps are not checkpointed, so the runtime's retry of the
    /// whole handler re-runs exactly the steps that have not completed.
    pub async fn run<T, F, Fut>(&self, step_id: &str, f: F) -> Result<T, HandlerError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, HandlerError>>,
    {
        if let Some(saved) = self.checkpoints.get(&self.invocation_key, step_id).await {
            debug!(
                invocation = %self.invocation_key,
                step = step_id,
                "step already checkpointed, skipping execution"
            );
            return serde_json::from_value(saved).map_err(|e| {
                HandlerError::Fatal(format!("corrupt checkpoint for step '{step_id}': {e}"))
            });
        }

        let result = f().await?;
        let value = serde_json::to_value(&result).map_err(|e| {
            HandlerError::Fatal(format!("unserializable result for step '{step_id}': {e}"))
        })?;
        self.checkpoints
            .put(&self.invocation_key, step_id, value)
            .await;
        Ok(result)
    }

    /// Durable delay. Checkpointed like a step, so a retried handler does
    /// not sleep twice.
    pub async fn sleep(&self, step_id: &str, duration: Duration) {
        if self
            .checkpoints
            .get(&self.invocation_key, step_id)
            .await
            .is_some()
        {
            return;
        }
        tokio::time::sleep(duration).await;
        self.checkpoints
            .put(&self.invocation_key, step_id, Value::Bool(true))
            .await;
    }
}
