//! Integration tests for the stanza REPL.
//!
//! These tests run lines through the REPL and check what it prints.

use std::sync::Arc;

use stanza_kernel::{CommandRegistry, Interpreter, Kernel, Outcome, ShellExecutor, StubExecutor};
use stanza_repl::Repl;

fn stub_repl(stub: StubExecutor) -> Repl {
    let registry = ["a", "b", "d0t.crawl"]
        .into_iter()
        .fold(CommandRegistry::new(), |reg, key| reg.with(key, format!("run {key}")));
    let kernel = Kernel::from_interpreter(Interpreter::new(registry, Arc::new(stub)));
    Repl::with_kernel(kernel).expect("Failed to create REPL")
}

/// Helper to run multiple lines through a REPL and collect outputs.
fn run_script(repl: &mut Repl, script: &str) -> Vec<String> {
    let mut outputs = Vec::new();

    for line in script.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match repl.process_line(line) {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => {}
            Err(e) => outputs.push(format!("ERROR: {e}")),
        }
    }

    outputs
}

fn outputs_contain(outputs: &[String], expected: &[&str]) -> bool {
    let joined = outputs.join("\n");
    expected.iter().all(|e| joined.contains(e))
}

// ============================================================================
// Running stanzas
// ============================================================================

#[test]
fn registered_command_prints_output() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "a");
    assert_eq!(outputs, vec!["✓ run a"]);
}

#[test]
fn unregistered_command_is_simulated() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "d0t.analyze deep");
    assert_eq!(outputs, vec!["~ simulated d0t.analyze deep"]);
}

#[test]
fn fallback_shows_second_branch() {
    let mut repl = stub_repl(StubExecutor::new().respond("a", Outcome::failure("down")));
    let outputs = run_script(&mut repl, "a | b");
    assert_eq!(outputs, vec!["✓ run b"]);
}

#[test]
fn parallel_shows_both_branches() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "a + b");
    assert_eq!(outputs, vec!["+ parallel\n  ✓ run a\n  ✓ run b"]);
}

#[test]
fn skipped_shows_condition() {
    let mut repl = stub_repl(StubExecutor::new().respond("a", Outcome::failure("down")));
    let outputs = run_script(&mut repl, "a ? b");
    assert!(outputs_contain(&outputs, &["↷ skipped", "✗ down"]));
}

#[test]
fn schedule_is_echoed() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "@hourly a → b");
    assert_eq!(outputs, vec!["⏲ @hourly a → b"]);
}

#[test]
fn locked_command_is_refused() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "🔒 a");
    assert!(outputs[0].starts_with("✗ locked"), "{outputs:?}");
}

#[test]
fn dangling_operator_warns_and_runs_prefix() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "a →");
    assert!(outputs_contain(&outputs, &["warning: ignored 1 trailing token(s)", "✓ run a"]));
}

#[test]
fn garbage_reports_no_stanza() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, ")");
    assert!(outputs_contain(&outputs, &["warning:", "(no stanza)"]));
}

#[test]
fn shell_commands_run_for_real() {
    let registry = CommandRegistry::new().with("d0t.crawl", "echo crawled");
    let interpreter = Interpreter::new(registry, Arc::new(ShellExecutor::new()));
    let kernel = Kernel::from_interpreter(interpreter);
    let mut repl = Repl::with_kernel(kernel).expect("Failed to create REPL");

    let outputs = run_script(&mut repl, "d0t.crawl → d0t.analyze\n/result");
    assert_eq!(outputs[0], "~ simulated d0t.analyze");
    assert!(outputs[1].contains(r#""output": "crawled\n""#), "{}", outputs[1]);
}

// ============================================================================
// Meta-commands
// ============================================================================

#[test]
fn help_lists_operators() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "/help");
    assert!(outputs_contain(&outputs, &["/quit", "Operators", "a + b"]));
}

#[test]
fn ast_mode_parses_without_running() {
    let stub = Arc::new(StubExecutor::new());
    let registry = CommandRegistry::new().with("a", "run a");
    let kernel = Kernel::from_interpreter(Interpreter::new(registry, stub.clone()));
    let mut repl = Repl::with_kernel(kernel).expect("Failed to create REPL");

    let outputs = run_script(&mut repl, "/ast\na → b\n/ast");
    assert_eq!(outputs[0], "AST mode: ON");
    assert!(outputs[1].contains("Operation"));
    assert_eq!(outputs[2], "AST mode: OFF");
    assert_eq!(stub.call_count(), 0);
}

#[test]
fn token_mode_prints_tokens() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "/tokens\na -> 'b c'");
    assert_eq!(outputs[1], "WORD(a) OP(then) QUOTED(b c)");
}

#[test]
fn registry_lists_templates() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "/registry");
    assert!(outputs_contain(&outputs, &["a = run a", "d0t.crawl = run d0t.crawl"]));
}

#[test]
fn result_before_and_after() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "/result\na\n/result");
    assert_eq!(outputs[0], "(no result yet)");
    assert!(outputs[2].contains(r#""success": true"#));
}

#[test]
fn quit_ends_session() {
    let mut repl = stub_repl(StubExecutor::new());
    assert!(!repl.is_done());
    let outputs = run_script(&mut repl, "/quit");
    assert!(outputs.is_empty());
    assert!(repl.is_done());
}

#[test]
fn unknown_meta_command() {
    let mut repl = stub_repl(StubExecutor::new());
    let outputs = run_script(&mut repl, "/bogus");
    assert!(outputs_contain(&outputs, &["Unknown command: /bogus"]));
}
