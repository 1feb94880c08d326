//! The Kernel: wires a registry, an executor and the security policy into an
//! [`Interpreter`] and runs stanza source through it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Kernel                        │
//! │  ┌────────────────┐  ┌────────────────┐              │
//! │  │ CommandRegistry│  │ ShellExecutor  │              │
//! │  │  (JSON file)   │  │  (sh -c)       │              │
//! │  └────────────────┘  └────────────────┘              │
//! │  ┌────────────────┐  ┌────────────────┐              │
//! │  │ Authorizer (🔒)│  │ AuditSink (⚠️) │              │
//! │  └────────────────┘  └────────────────┘              │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use crate::ast::Node;
use crate::executor::{CommandExecutor, ShellExecutor};
use crate::interpreter::{Context, Interpreter, InterpreterConfig, Outcome};
use crate::lexer::{Token, tokenize};
use crate::parser::{ParseError, parse_with_diagnostics};
use crate::registry::CommandRegistry;
use crate::security::{
    AllowAll, AllowList, AuditSink, Authorizer, DenyAll, NdjsonAudit, TracingAudit,
};

/// Configuration for kernel initialization.
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    /// Registry JSON file. `None` starts with an empty registry.
    pub registry_path: Option<PathBuf>,
    /// Evaluation policy.
    pub interpreter: InterpreterConfig,
    /// Command keys allowed under `🔒`.
    pub unlocked: Vec<String>,
    /// Allow every `🔒` node.
    pub unlock_all: bool,
    /// Append `⚠️` audit entries to this file instead of the log.
    pub audit_log: Option<PathBuf>,
}

impl KernelConfig {
    pub fn with_registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    pub fn with_interpreter(mut self, config: InterpreterConfig) -> Self {
        self.interpreter = config;
        self
    }

    pub fn unlock(mut self, key: impl Into<String>) -> Self {
        self.unlocked.push(key.into());
        self
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    fn authorizer(&self) -> Arc<dyn Authorizer> {
        if self.unlock_all {
            Arc::new(AllowAll)
        } else if self.unlocked.is_empty() {
            Arc::new(DenyAll)
        } else {
            Arc::new(AllowList::new(self.unlocked.iter().cloned()))
        }
    }
}

/// Parse output: the AST (if any) and what the parser had to ignore.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub tokens: Vec<Token>,
    pub ast: Option<Node>,
    pub diagnostics: Vec<ParseError>,
}

/// Executes stanza source.
#[derive(Clone)]
pub struct Kernel {
    interpreter: Interpreter,
}

impl Kernel {
    /// Build a kernel that runs commands through the shell.
    pub fn new(config: KernelConfig) -> Result<Self> {
        Self::with_executor(config, Arc::new(ShellExecutor::new()))
    }

    /// Build a kernel around a custom executor.
    pub fn with_executor(
        config: KernelConfig,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let registry = match &config.registry_path {
            Some(path) => CommandRegistry::load(path)
                .with_context(|| format!("loading registry {}", path.display()))?,
            None => CommandRegistry::new(),
        };

        let audit: Arc<dyn AuditSink> = match &config.audit_log {
            Some(path) => Arc::new(
                NdjsonAudit::open(path)
                    .with_context(|| format!("opening audit log {}", path.display()))?,
            ),
            None => Arc::new(TracingAudit),
        };

        let interpreter = Interpreter::new(registry, executor)
            .with_config(config.interpreter.clone())
            .with_authorizer(config.authorizer())
            .with_audit(audit);

        tracing::debug!(
            commands = interpreter.registry().len(),
            unlocked = config.unlocked.len(),
            "kernel ready"
        );
        Ok(Self { interpreter })
    }

    /// Wrap an already configured interpreter.
    pub fn from_interpreter(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn registry(&self) -> &CommandRegistry {
        self.interpreter.registry()
    }

    /// Tokenize and parse without running anything.
    pub fn compile(&self, source: &str) -> Compiled {
        let (ast, diagnostics) = parse_with_diagnostics(source);
        Compiled {
            tokens: tokenize(source),
            ast,
            diagnostics,
        }
    }

    /// Parse and run `source`.
    pub async fn execute(&self, source: &str) -> Outcome {
        self.execute_with_cancellation(source, CancellationToken::new())
            .await
    }

    /// Parse and run `source`; cancelling `cancel` stops commands in flight.
    pub async fn execute_with_cancellation(
        &self,
        source: &str,
        cancel: CancellationToken,
    ) -> Outcome {
        let compiled = self.compile(source);
        for diagnostic in &compiled.diagnostics {
            tracing::debug!(%diagnostic, "parse diagnostic");
        }
        let ctx = Context::with_cancellation(cancel);
        self.interpreter.execute_opt(compiled.ast.as_ref(), &ctx).await
    }

    /// Run an already parsed AST.
    pub async fn execute_node(&self, node: &Node) -> Outcome {
        self.interpreter.execute(node, &Context::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StubExecutor;

    #[test]
    fn compile_reports_leftovers() {
        let kernel = Kernel::new(KernelConfig::default()).expect("kernel");
        let compiled = kernel.compile("a →");
        assert_eq!(compiled.tokens.len(), 2);
        assert!(compiled.ast.is_some());
        assert_eq!(compiled.diagnostics.len(), 1);
    }

    #[test]
    fn missing_registry_file_is_an_error() {
        let config = KernelConfig::default().with_registry("/definitely/not/here.json");
        assert!(Kernel::new(config).is_err());
    }

    #[tokio::test]
    async fn unlock_list_reaches_interpreter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = dir.path().join("commands.json");
        std::fs::write(&registry, r#"{"ops.deploy": "deploy"}"#).expect("write registry");

        let stub = Arc::new(StubExecutor::new());
        let locked =
            Kernel::with_executor(KernelConfig::default().with_registry(&registry), stub.clone())
                .expect("kernel");
        assert!(locked.execute("🔒 ops.deploy").await.is_failure());
        assert_eq!(stub.call_count(), 0);

        let unlocked = Kernel::with_executor(
            KernelConfig::default().with_registry(&registry).unlock("ops.deploy"),
            stub.clone(),
        )
        .expect("kernel");
        assert_eq!(unlocked.execute("🔒 ops.deploy").await, Outcome::success("deploy"));
    }
}
