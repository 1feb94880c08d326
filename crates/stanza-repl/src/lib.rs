//! stanza REPL and command-line front end.
//!
//! The REPL reads one stanza per line, runs it through a [`Kernel`] and
//! prints the outcome. Meta-commands start with `/`:
//!
//! - `/help`, `/quit`
//! - `/ast`, `/tokens`: toggle showing the parse instead of running
//! - `/registry`: list registered commands
//! - `/result`: JSON of the last outcome

pub mod cli;
pub mod config;
pub mod paths;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::runtime::Runtime;

use stanza_kernel::{Kernel, KernelConfig, Outcome};

/// REPL state.
pub struct Repl {
    kernel: Kernel,
    runtime: Runtime,
    show_ast: bool,
    show_tokens: bool,
    last: Option<Outcome>,
    done: bool,
}

impl Repl {
    /// Create a REPL around a kernel built from `config`.
    pub fn new(config: KernelConfig) -> Result<Self> {
        Self::with_kernel(Kernel::new(config)?)
    }

    pub fn with_kernel(kernel: Kernel) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self {
            kernel,
            runtime,
            show_ast: false,
            show_tokens: false,
            last: None,
            done: false,
        })
    }

    /// True once `/quit` has been entered.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Process a single line of input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        if trimmed.starts_with('/') {
            return self.handle_meta_command(trimmed);
        }
        if trimmed.is_empty() {
            return Ok(None);
        }

        let compiled = self.kernel.compile(trimmed);
        let mut output = String::new();

        for diagnostic in &compiled.diagnostics {
            output.push_str(&format!("warning: {diagnostic}\n"));
        }

        if self.show_tokens || self.show_ast {
            if self.show_tokens {
                let tokens: Vec<String> = compiled.tokens.iter().map(ToString::to_string).collect();
                output.push_str(&tokens.join(" "));
                output.push('\n');
            }
            if self.show_ast {
                match &compiled.ast {
                    Some(ast) => output.push_str(&format!("{ast:#?}\n")),
                    None => output.push_str("(no stanza)\n"),
                }
            }
            return Ok(Some(output.trim_end().to_string()));
        }

        let Some(ast) = compiled.ast else {
            output.push_str("(no stanza)");
            return Ok(Some(output));
        };

        let outcome = self.runtime.block_on(self.kernel.execute_node(&ast));
        output.push_str(&format_outcome(&outcome));
        self.last = Some(outcome);
        Ok(Some(output))
    }

    /// Handle a meta-command (starts with /).
    fn handle_meta_command(&mut self, cmd: &str) -> Result<Option<String>> {
        let command = cmd.split_whitespace().next().unwrap_or("");

        match command {
            "/quit" | "/q" | "/exit" => {
                self.done = true;
                Ok(None)
            }
            "/help" | "/h" | "/?" => Ok(Some(HELP_TEXT.to_string())),
            "/ast" => {
                self.show_ast = !self.show_ast;
                Ok(Some(format!("AST mode: {}", on_off(self.show_ast))))
            }
            "/tokens" => {
                self.show_tokens = !self.show_tokens;
                Ok(Some(format!("Token mode: {}", on_off(self.show_tokens))))
            }
            "/registry" | "/commands" => {
                let registry = self.kernel.registry();
                if registry.is_empty() {
                    return Ok(Some("(no commands registered)".to_string()));
                }
                let lines: Vec<String> = registry
                    .keys()
                    .map(|key| format!("  {key} = {}", registry.get(key).unwrap_or_default()))
                    .collect();
                Ok(Some(format!("Commands:\n{}", lines.join("\n"))))
            }
            "/result" => match &self.last {
                Some(outcome) => Ok(Some(serde_json::to_string_pretty(outcome)?)),
                None => Ok(Some("(no result yet)".to_string())),
            },
            _ => Ok(Some(format!(
                "Unknown command: {command}\nType /help for available commands."
            ))),
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

/// Human-readable rendering of an outcome.
pub fn format_outcome(outcome: &Outcome) -> String {
    let mut out = String::new();
    write_outcome(&mut out, outcome, 0);
    out.trim_end().to_string()
}

fn write_outcome(out: &mut String, outcome: &Outcome, depth: usize) {
    let indent = "  ".repeat(depth);
    match outcome {
        Outcome::Success { output } => {
            let text = output.trim_end();
            if text.contains('\n') {
                out.push_str(&format!("{indent}✓\n{text}\n"));
            } else if text.is_empty() {
                out.push_str(&format!("{indent}✓\n"));
            } else {
                out.push_str(&format!("{indent}✓ {text}\n"));
            }
        }
        Outcome::Failure { error } => out.push_str(&format!("{indent}✗ {error}\n")),
        Outcome::Simulated { command, args, .. } => {
            let mut line = format!("{indent}~ simulated {command}");
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }
            out.push_str(&line);
            out.push('\n');
        }
        Outcome::Skipped { condition } => {
            out.push_str(&format!("{indent}↷ skipped, condition:\n"));
            write_outcome(out, condition, depth + 1);
        }
        Outcome::Scheduled { schedule, node } => {
            out.push_str(&format!("{indent}⏲ @{schedule} {node}\n"));
        }
        Outcome::Parallel { left, right } => {
            out.push_str(&format!("{indent}+ parallel\n"));
            write_outcome(out, left, depth + 1);
            write_outcome(out, right, depth + 1);
        }
        Outcome::Empty => out.push_str(&format!("{indent}(nothing to run)\n")),
    }
}

const HELP_TEXT: &str = r#"stanza REPL

Commands:
  /help, /h, /?       Show this help
  /quit, /q, /exit    Exit the REPL
  /ast                Toggle AST display (parse only)
  /tokens             Toggle token display (parse only)
  /registry           List registered commands
  /result             Show the last outcome as JSON

Operators:
  a → b   a -> b      Run a, then b (b sees a's result)
  a + b               Run a and b concurrently
  a | b               Run b only if a did not succeed
  a ? b               Run b unless a failed
  a > b               Pipe a's output into b
  🔒 a                Require authorization
  🛡️ a                Run isolated
  ⚠️ a                Audit before and after
  @daily a            Declare a schedule (not run)
  ( a )  { a b }      Group, block

Examples:
  d0t.crawl https://example.com → d0t.analyze
  fetch.a + fetch.b | notify "both failed"
"#;

/// Run the REPL.
pub fn run(config: KernelConfig) -> Result<()> {
    println!("{} v{}", "stanza".bold(), env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut rl = DefaultEditor::new().context("Failed to create editor")?;

    let history_path = paths::history_file();
    if rl.load_history(&history_path).is_err() {
        tracing::debug!(path = %history_path.display(), "no history loaded");
    }

    let mut repl = Repl::new(config)?;

    while !repl.is_done() {
        match rl.readline("stanza> ") {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::debug!(error = %e, "history entry not added");
                }
                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{output}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("{} {e:#}", "Error:".red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("{} {err}", "Error:".red());
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if let Err(e) = rl.save_history(&history_path) {
        tracing::warn!(path = %history_path.display(), error = %e, "failed to save history");
    }

    Ok(())
}
