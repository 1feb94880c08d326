//! Executors carry out registered commands.
//!
//! The interpreter resolves a command against the registry, renders the
//! template into a command line, and hands the resulting [`Invocation`] to a
//! [`CommandExecutor`]. What "running" means is up to the executor:
//!
//! - [`ShellExecutor`] runs the command line with `sh -c`.
//! - [`StubExecutor`] answers from a script and records every call, for tests.

mod shell;
mod stub;
pub mod template;

use async_trait::async_trait;

use crate::ast::Command;
use crate::interpreter::{Context, Outcome};

pub use shell::ShellExecutor;
pub use stub::{RecordedCall, StubExecutor};

/// A resolved, rendered command ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The command as parsed.
    pub command: Command,
    /// Registry key that matched (full key or bare action).
    pub key: String,
    /// Template from the registry.
    pub template: String,
    /// Template with placeholders substituted.
    pub command_line: String,
    /// Positional arguments as written in the stanza.
    pub args: Vec<String>,
}

/// Runs invocations.
///
/// Implementations never panic and never return errors: every problem is a
/// [`Outcome::Failure`]. Timeouts and cancellation are applied by the
/// interpreter around this call.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn invoke(&self, invocation: &Invocation, ctx: &Context) -> Outcome;
}
