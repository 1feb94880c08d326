//! Stanza evaluation.
//!
//! The interpreter walks the AST and produces an [`Outcome`] for every node.
//! Nothing here returns `Result` or panics: an unknown command is simulated,
//! a failing command is a [`Outcome::Failure`], and the operators decide what
//! runs next from the outcomes they see.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::AbortOnDropHandle;

use crate::ast::{BinaryOp, Command, Node, SecurityMode};
use crate::executor::{CommandExecutor, Invocation, template};
use crate::parser::parse_source;
use crate::registry::CommandRegistry;
use crate::security::{AuditEntry, AuditSink, Authorizer, DenyAll, TracingAudit};

use super::context::Context;
use super::result::Outcome;

/// Default per-command time limit.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Evaluation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Limit for each executor call. `None` waits forever.
    pub command_timeout: Option<Duration>,
    /// Stop `→` and `>` chains at the first failed left side, returning that
    /// failure. Off by default: the right side runs and sees the failure.
    pub abort_on_failure: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            abort_on_failure: false,
        }
    }
}

impl InterpreterConfig {
    /// Default limits with abort-on-failure chaining.
    pub fn strict() -> Self {
        Self {
            abort_on_failure: true,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }
}

type Eval<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

/// Evaluates stanza ASTs.
///
/// Cheap to clone; all state is shared. The registry is read-only once the
/// interpreter is built.
#[derive(Clone)]
pub struct Interpreter {
    registry: Arc<CommandRegistry>,
    executor: Arc<dyn CommandExecutor>,
    authorizer: Arc<dyn Authorizer>,
    audit: Arc<dyn AuditSink>,
    config: InterpreterConfig,
}

impl Interpreter {
    /// Create an interpreter with the default policy: locked nodes are
    /// refused and warned nodes are logged.
    pub fn new(
        registry: impl Into<Arc<CommandRegistry>>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            registry: registry.into(),
            executor,
            authorizer: Arc::new(DenyAll),
            audit: Arc::new(TracingAudit),
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Parse and run `source` in a fresh context.
    pub async fn execute_source(&self, source: &str) -> Outcome {
        let node = parse_source(source);
        self.execute_opt(node.as_ref(), &Context::new()).await
    }

    /// Run a possibly-absent AST. `None` is a no-op.
    pub async fn execute_opt(&self, node: Option<&Node>, ctx: &Context) -> Outcome {
        match node {
            Some(node) => self.execute(node, ctx).await,
            None => Outcome::Empty,
        }
    }

    /// Evaluate `node` in `ctx`.
    pub fn execute<'a>(&'a self, node: &'a Node, ctx: &'a Context) -> Eval<'a> {
        Box::pin(async move {
            match node {
                Node::Command(command) => self.run_command(command, ctx).await,
                Node::Operation { op, left, right } => {
                    self.run_operation(*op, left, right, ctx).await
                }
                Node::Secured { mode, inner } => self.run_secured(*mode, inner, ctx).await,
                Node::Scheduled { schedule, inner } => {
                    tracing::info!(schedule = %schedule, stanza = %inner, "scheduled, not run");
                    Outcome::Scheduled {
                        schedule: schedule.clone(),
                        node: (**inner).clone(),
                    }
                }
                Node::Group { inner } => self.execute(inner, ctx).await,
                Node::Block { statements } => {
                    let mut last = Outcome::Empty;
                    for statement in statements {
                        last = self.execute(statement, ctx).await;
                    }
                    last
                }
            }
        })
    }

    async fn run_operation(
        &self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        ctx: &Context,
    ) -> Outcome {
        match op {
            BinaryOp::Then => {
                let first = self.execute(left, ctx).await;
                if self.config.abort_on_failure && first.is_failure() {
                    tracing::debug!(stanza = %left, "chain aborted");
                    return first;
                }
                self.execute(right, &ctx.with_previous(first)).await
            }
            BinaryOp::Pipe => {
                let first = self.execute(left, ctx).await;
                if self.config.abort_on_failure && first.is_failure() {
                    tracing::debug!(stanza = %left, "pipe aborted");
                    return first;
                }
                self.execute(right, &ctx.with_input(first)).await
            }
            BinaryOp::And => {
                let (l, r) = tokio::join!(self.execute(left, ctx), self.execute(right, ctx));
                Outcome::parallel(l, r)
            }
            BinaryOp::Or => {
                let first = self.execute(left, ctx).await;
                if first.is_success() {
                    first
                } else {
                    tracing::debug!(stanza = %left, "falling back");
                    self.execute(right, ctx).await
                }
            }
            BinaryOp::If => {
                let condition = self.execute(left, ctx).await;
                if condition.is_failure() {
                    tracing::debug!(stanza = %right, "condition failed, skipping");
                    Outcome::skipped(condition)
                } else {
                    self.execute(right, ctx).await
                }
            }
        }
    }

    async fn run_secured(&self, mode: SecurityMode, inner: &Node, ctx: &Context) -> Outcome {
        let ctx = ctx.with_security(mode);
        match mode {
            SecurityMode::Lock => match self.authorizer.authorize(inner, &ctx) {
                Ok(()) => self.execute(inner, &ctx).await,
                Err(reason) => {
                    tracing::warn!(stanza = %inner, reason = %reason, "lock refused");
                    Outcome::failure(reason)
                }
            },
            SecurityMode::Shield => {
                let this = self.clone();
                let inner = inner.clone();
                // Dropping the evaluation aborts the shielded task with it.
                let task = AbortOnDropHandle::new(tokio::spawn(async move {
                    this.execute(&inner, &ctx).await
                }));
                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => {
                        tracing::warn!(error = %e, "shielded stanza panicked");
                        Outcome::failure(format!("shielded stanza panicked: {}", panic_message(e)))
                    }
                    Err(e) => Outcome::failure(format!("shielded stanza aborted: {e}")),
                }
            }
            SecurityMode::Warn => {
                let stanza = inner.to_string();
                self.audit.record(AuditEntry::before(stanza.clone()));
                let outcome = self.execute(inner, &ctx).await;
                self.audit.record(AuditEntry::after(stanza, outcome.clone()));
                outcome
            }
        }
    }

    async fn run_command(&self, command: &Command, ctx: &Context) -> Outcome {
        let name = command.display_name();
        let Some(hit) = self.registry.resolve(command) else {
            tracing::debug!(command = %name, "not registered, simulating");
            return Outcome::Simulated {
                command: name,
                args: command.args.clone(),
                context: ctx.clone(),
            };
        };

        if ctx.is_cancelled() {
            return Outcome::failure(format!("{name}: cancelled"));
        }

        let invocation = Invocation {
            command: command.clone(),
            key: hit.key.to_string(),
            template: hit.template.to_string(),
            command_line: template::render(hit.template, &command.args, ctx),
            args: command.args.clone(),
        };
        tracing::info!(command = %name, key = %invocation.key, "invoking");

        let limited = async {
            let call = self.executor.invoke(&invocation, ctx);
            match self.config.command_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(command = %name, ?limit, "timed out");
                        Outcome::failure(format!("{name}: timed out after {limit:?}"))
                    }
                },
                None => call.await,
            }
        };

        tokio::select! {
            outcome = limited => outcome,
            () = ctx.cancellation().cancelled() => {
                tracing::debug!(command = %name, "cancelled");
                Outcome::failure(format!("{name}: cancelled"))
            }
        }
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StubExecutor;

    fn interpreter(registry: CommandRegistry) -> (Interpreter, Arc<StubExecutor>) {
        let stub = Arc::new(StubExecutor::new());
        (Interpreter::new(registry, stub.clone()), stub)
    }

    #[tokio::test]
    async fn no_ast_is_empty() {
        let (interp, stub) = interpreter(CommandRegistry::new());
        assert_eq!(interp.execute_opt(None, &Context::new()).await, Outcome::Empty);
        assert_eq!(interp.execute_source("").await, Outcome::Empty);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn unregistered_command_is_simulated() {
        let (interp, stub) = interpreter(CommandRegistry::new());
        let out = interp.execute_source("d0t.analyze deep").await;
        assert!(out.is_simulated());
        assert!(out.is_success());
        assert_eq!(out.to_json()["command"], "d0t.analyze");
        assert_eq!(out.to_json()["args"][0], "deep");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn registered_command_renders_template() {
        let registry = CommandRegistry::new().with("d0t.crawl", "curl -s {0}");
        let (interp, stub) = interpreter(registry);
        let out = interp.execute_source("d0t.crawl https://x.io").await;
        assert_eq!(out, Outcome::success("curl -s https://x.io"));
        assert_eq!(stub.keys(), vec!["d0t.crawl"]);
    }

    #[tokio::test]
    async fn empty_block_is_empty() {
        let (interp, _) = interpreter(CommandRegistry::new());
        assert_eq!(interp.execute_source("{ }").await, Outcome::Empty);
    }

    #[test]
    fn strict_config_aborts() {
        let config = InterpreterConfig::strict();
        assert!(config.abort_on_failure);
        assert_eq!(config.command_timeout, Some(DEFAULT_COMMAND_TIMEOUT));
    }
}
