//! Scripted executor for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::interpreter::{Context, Outcome};

use super::{CommandExecutor, Invocation};

#[derive(Debug, Clone)]
enum Reply {
    Outcome(Outcome),
    Echo,
    Panic(String),
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            reply: Reply::Echo,
            delay: Duration::ZERO,
        }
    }
}

/// One completed call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Registry key that matched.
    pub key: String,
    pub command_line: String,
    pub args: Vec<String>,
    pub context: Context,
    pub started: Instant,
    pub finished: Instant,
}

/// Deterministic [`CommandExecutor`].
///
/// Each registry key can be scripted with an outcome and a delay. Unscripted
/// keys succeed immediately with their rendered command line as output.
/// Every call that runs to completion is recorded with its start and finish
/// instants, so tests can assert ordering and overlap.
#[derive(Debug, Default)]
pub struct StubExecutor {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `key` with `outcome`.
    pub fn respond(mut self, key: impl Into<String>, outcome: Outcome) -> Self {
        self.scripts.entry(key.into()).or_default().reply = Reply::Outcome(outcome);
        self
    }

    /// Sleep for `delay` before answering `key`.
    pub fn delay(mut self, key: impl Into<String>, delay: Duration) -> Self {
        self.scripts.entry(key.into()).or_default().delay = delay;
        self
    }

    /// Panic when `key` runs.
    pub fn panic_on(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.entry(key.into()).or_default().reply = Reply::Panic(message.into());
        self
    }

    /// Completed calls, in completion order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Keys of completed calls, in completion order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|call| call.key.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    /// The first completed call for `key`.
    pub fn call(&self, key: &str) -> Option<RecordedCall> {
        self.lock().iter().find(|call| call.key == key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CommandExecutor for StubExecutor {
    async fn invoke(&self, invocation: &Invocation, ctx: &Context) -> Outcome {
        let script = self
            .scripts
            .get(&invocation.key)
            .cloned()
            .unwrap_or_default();
        let started = Instant::now();

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        let outcome = match script.reply {
            Reply::Outcome(outcome) => outcome,
            Reply::Echo => Outcome::success(invocation.command_line.clone()),
            Reply::Panic(message) => panic!("{message}"),
        };

        self.lock().push(RecordedCall {
            key: invocation.key.clone(),
            command_line: invocation.command_line.clone(),
            args: invocation.args.clone(),
            context: ctx.clone(),
            started,
            finished: Instant::now(),
        });
        outcome
    }
}
