//! Task executors with canned behaviour for scheduler tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use updater::tasks::{TaskExecutor, TaskOutcome};

pub enum Behaviour {
    Succeed,
    ReportFailure,
    ReturnError,
    Panic,
    /// Waits until released through the attached `Notify`.
    Block(Arc<Notify>),
    Sleep(Duration),
}

pub struct StubTask {
    name: &'static str,
    behaviour: Behaviour,
    runs: Arc<AtomicUsize>,
}

impl StubTask {
    pub fn new(name: &'static str, behaviour: Behaviour) -> Self {
        Self {
            name,
            behaviour,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding(name: &'static str) -> Self {
        Self::new(name, Behaviour::Succeed)
    }

    /// Shared counter of how often `run` was entered.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }

    pub fn into_executor(self) -> Arc<dyn TaskExecutor> {
        Arc::new(self)
    }
}

#[async_trait]
impl TaskExecutor for StubTask {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self) -> Result<TaskOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed => Ok(TaskOutcome::new(true, json!({ "stub": self.name }))),
            Behaviour::ReportFailure => Ok(TaskOutcome::new(
                false,
                json!({ "error": "stub reported failure" }),
            )),
            Behaviour::ReturnError => Err(anyhow!("stub task {} exploded", self.name)),
            Behaviour::Panic => panic!("stub task {} panicked", self.name),
            Behaviour::Block(release) => {
                release.notified().await;
                Ok(TaskOutcome::new(true, json!({ "stub": self.name })))
            }
            Behaviour::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(TaskOutcome::new(true, json!({ "stub": self.name })))
            }
        }
    }
}

/// Polls `condition` every 20ms until it holds or `limit` passes.
pub async fn wait_until<F, Fut>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}
