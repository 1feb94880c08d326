//! One-shot subcommands: `stanza parse` and `stanza run`.
//!
//! Both return the text to print and whether an AST was produced; the binary
//! exits 0 exactly when it was. A command that runs and fails still exits 0,
//! its failure is in the printed outcome.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use stanza_kernel::{Context, Kernel, KernelConfig};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Flags shared by `run` and `repl`. Each overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOptions {
    /// Registry JSON file (`{"name": "template"}`)
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Per-command timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Stop `→` and `>` chains at the first failure
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Allow a command key under 🔒 (repeatable)
    #[arg(long = "unlock", value_name = "KEY")]
    pub unlock: Vec<String>,

    /// Allow every 🔒 node
    #[arg(long, conflicts_with = "unlock")]
    pub unlock_all: bool,

    /// Append ⚠️ audit entries to this NDJSON file
    #[arg(long, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,
}

impl RunOptions {
    /// Merge flags over `config`.
    pub fn kernel_config(&self, config: &Config) -> KernelConfig {
        let mut kernel = config.kernel_config();
        if let Some(path) = &self.registry {
            kernel.registry_path = Some(path.clone());
        }
        if let Some(secs) = self.timeout {
            kernel.interpreter.command_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if self.abort_on_failure {
            kernel.interpreter.abort_on_failure = true;
        }
        kernel.unlocked.extend(self.unlock.iter().cloned());
        kernel.unlock_all = self.unlock_all;
        if let Some(path) = &self.audit_log {
            kernel.audit_log = Some(path.clone());
        }
        kernel
    }
}

/// `stanza parse`: tokens (optional), the AST, and ignored input.
pub fn parse_report(source: &str, json: bool, show_tokens: bool) -> Result<(String, bool)> {
    let compiled = Kernel::new(KernelConfig::default())?.compile(source);
    let mut out = String::new();

    if show_tokens {
        let tokens: Vec<String> = compiled.tokens.iter().map(ToString::to_string).collect();
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }

    match (&compiled.ast, json) {
        (Some(ast), true) => out.push_str(&serde_json::to_string_pretty(ast)?),
        (None, true) => out.push_str("null"),
        (Some(ast), false) => out.push_str(&format!("{ast:#?}")),
        (None, false) => out.push_str("(no stanza)"),
    }
    out.push('\n');

    for diagnostic in &compiled.diagnostics {
        out.push_str(&format!("warning: {diagnostic}\n"));
    }

    Ok((out, compiled.ast.is_some()))
}

/// `stanza run`: execute and render the outcome as JSON. Commands still
/// running when `cancel` fires end as cancelled failures.
pub async fn run_report(
    source: &str,
    config: KernelConfig,
    cancel: CancellationToken,
) -> Result<(String, bool)> {
    let kernel = Kernel::new(config)?;
    let compiled = kernel.compile(source);
    for diagnostic in &compiled.diagnostics {
        tracing::warn!(%diagnostic, "input ignored");
    }
    let ctx = Context::with_cancellation(cancel);
    let outcome = kernel
        .interpreter()
        .execute_opt(compiled.ast.as_ref(), &ctx)
        .await;
    let text = serde_json::to_string_pretty(&outcome)?;
    Ok((text, compiled.ast.is_some()))
}

/// A token cancelled on the first Ctrl-C. Must be called inside a runtime.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, cancelling");
                watcher.cancel();
            }
            Err(e) => tracing::debug!(error = %e, "no Ctrl-C handler"),
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let config = Config {
            timeout_secs: Some(10),
            unlocked: vec!["a".into()],
            ..Config::default()
        };
        let opts = RunOptions {
            timeout: Some(0),
            unlock: vec!["b".into()],
            abort_on_failure: true,
            ..RunOptions::default()
        };
        let kernel = opts.kernel_config(&config);
        assert_eq!(kernel.interpreter.command_timeout, None);
        assert!(kernel.interpreter.abort_on_failure);
        assert_eq!(kernel.unlocked, vec!["a", "b"]);
    }

    #[test]
    fn parse_report_success() {
        let (out, ok) = parse_report("a → b", true, false).expect("report");
        assert!(ok);
        assert!(out.contains(r#""type": "operation""#));
    }

    fn registry_file(json: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp registry");
        std::fs::write(file.path(), json).expect("write registry");
        file
    }

    #[tokio::test]
    async fn run_report_uses_registry_flag() {
        let registry = registry_file(r#"{"d0t.crawl": "echo crawled"}"#);
        let opts = RunOptions {
            registry: Some(registry.path().to_path_buf()),
            ..RunOptions::default()
        };
        let (out, ok) = run_report(
            "d0t.crawl → d0t.analyze",
            opts.kernel_config(&Config::default()),
            CancellationToken::new(),
        )
        .await
        .expect("report");
        assert!(ok);
        assert!(out.contains(r#""simulated": true"#), "{out}");
        assert!(out.contains(r#""output": "crawled\n""#), "{out}");
    }

    #[tokio::test]
    async fn run_report_honours_cancellation() {
        let registry = registry_file(r#"{"slow": "sleep 5"}"#);
        let config = KernelConfig::default().with_registry(registry.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (out, ok) = run_report("slow", config, cancel).await.expect("report");
        assert!(ok);
        assert!(out.contains("slow: cancelled"), "{out}");
    }

    #[tokio::test]
    async fn run_report_missing_registry_is_an_error() {
        let config = KernelConfig::default().with_registry("/definitely/not/here.json");
        assert!(run_report("a", config, CancellationToken::new()).await.is_err());
    }

    #[test]
    fn parse_report_nothing() {
        let (out, ok) = parse_report("→", false, true).expect("report");
        assert!(!ok);
        assert!(out.starts_with("OP(then)"));
        assert!(out.contains("warning:"));
    }
}
