//! The structured result of evaluating any stanza node.
//!
//! Every evaluation produces an `Outcome`; nothing is thrown. Callers branch
//! on the variant, or on the flags in its JSON form:
//!
//! ```json
//! {"success": true, "output": "crawled\n"}
//! {"success": true, "simulated": true, "command": "d0t.analyze", "args": [], "context": {}}
//! {"skipped": true, "condition": {"success": false, "error": "exit status 1"}}
//! {"scheduled": true, "schedule": "daily", "command": "crawl → post"}
//! {"parallel": true, "left": {...}, "right": {...}}
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::ast::Node;

use super::context::Context;

/// The result of evaluating a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Outcome {
    /// A registered command ran and exited cleanly.
    Success { output: String },
    /// A command failed, timed out, was cancelled, or was refused.
    Failure { error: String },
    /// The command has no registry entry; nothing ran.
    Simulated {
        command: String,
        args: Vec<String>,
        context: Context,
    },
    /// `a ? b` where `a` failed; `b` never ran.
    Skipped { condition: Box<Outcome> },
    /// `@schedule x`, handed back for an external scheduler.
    Scheduled { schedule: String, node: Node },
    /// `a + b`
    Parallel {
        left: Box<Outcome>,
        right: Box<Outcome>,
    },
    /// Nothing to run (no AST, or an empty block).
    #[default]
    Empty,
}

impl Outcome {
    /// Create a successful result with output.
    pub fn success(output: impl Into<String>) -> Self {
        Outcome::Success {
            output: output.into(),
        }
    }

    /// Create a failed result with an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Outcome::Failure {
            error: error.into(),
        }
    }

    pub fn parallel(left: Outcome, right: Outcome) -> Self {
        Outcome::Parallel {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn skipped(condition: Outcome) -> Self {
        Outcome::Skipped {
            condition: Box::new(condition),
        }
    }

    /// The `success` flag of the JSON form, when the outcome carries one.
    ///
    /// Skipped, scheduled, parallel and empty outcomes have no flag; their
    /// branches carry their own.
    pub fn success_flag(&self) -> Option<bool> {
        match self {
            Outcome::Success { .. } | Outcome::Simulated { .. } => Some(true),
            Outcome::Failure { .. } => Some(false),
            Outcome::Skipped { .. }
            | Outcome::Scheduled { .. }
            | Outcome::Parallel { .. }
            | Outcome::Empty => None,
        }
    }

    /// `success` is true. `|` returns its left side only when this holds.
    pub fn is_success(&self) -> bool {
        self.success_flag() == Some(true)
    }

    /// `success` is explicitly false. `?` skips its right side only when
    /// this holds.
    pub fn is_failure(&self) -> bool {
        self.success_flag() == Some(false)
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Outcome::Simulated { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, Outcome::Scheduled { .. })
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Outcome::Parallel { .. })
    }

    /// Error message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Failure { error } => Some(error),
            _ => None,
        }
    }

    /// Output text produced by real commands in this outcome.
    ///
    /// Parallel branches are concatenated left then right. Outcomes with no
    /// command output yield an empty string.
    pub fn output_text(&self) -> String {
        match self {
            Outcome::Success { output } => output.clone(),
            Outcome::Parallel { left, right } => {
                let mut text = left.output_text();
                text.push_str(&right.output_text());
                text
            }
            _ => String::new(),
        }
    }

    /// Flag-shaped JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Outcome::Success { output } => json!({ "success": true, "output": output }),
            Outcome::Failure { error } => json!({ "success": false, "error": error }),
            Outcome::Simulated {
                command,
                args,
                context,
            } => json!({
                "success": true,
                "simulated": true,
                "command": command,
                "args": args,
                "context": context.to_json(),
            }),
            Outcome::Skipped { condition } => {
                json!({ "skipped": true, "condition": condition.to_json() })
            }
            Outcome::Scheduled { schedule, node } => {
                let mut map = Map::new();
                map.insert("scheduled".into(), Value::Bool(true));
                map.insert("schedule".into(), Value::String(schedule.clone()));
                map.insert("command".into(), Value::String(node.to_string()));
                map.insert(
                    "ast".into(),
                    serde_json::to_value(node).unwrap_or(Value::Null),
                );
                Value::Object(map)
            }
            Outcome::Parallel { left, right } => json!({
                "parallel": true,
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            Outcome::Empty => json!({ "empty": true }),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SecurityMode;

    #[test]
    fn success_json_shape() {
        let out = Outcome::success("crawled\n");
        assert!(out.is_success());
        assert!(!out.is_failure());
        assert_eq!(out.to_json(), json!({"success": true, "output": "crawled\n"}));
    }

    #[test]
    fn failure_json_shape() {
        let out = Outcome::failure("boom");
        assert!(out.is_failure());
        assert!(!out.is_success());
        assert_eq!(out.error(), Some("boom"));
        assert_eq!(out.to_json(), json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn simulated_carries_context() {
        let ctx = Context::new()
            .with_input(Outcome::success("in"))
            .with_security(SecurityMode::Warn);
        let out = Outcome::Simulated {
            command: "d0t.analyze".into(),
            args: vec!["x".into()],
            context: ctx,
        };
        let json = out.to_json();
        assert_eq!(json["simulated"], json!(true));
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["command"], json!("d0t.analyze"));
        assert_eq!(json["context"]["input"]["output"], json!("in"));
        assert_eq!(json["context"]["security"], json!("warn"));
    }

    #[test]
    fn parallel_has_no_flag_of_its_own() {
        let both = Outcome::parallel(Outcome::success("a"), Outcome::success("b"));
        assert_eq!(both.success_flag(), None);
        assert!(!both.is_success());
        assert_eq!(both.output_text(), "ab");

        let one = Outcome::parallel(Outcome::success("a"), Outcome::failure("x"));
        assert!(!one.is_failure());
        let json = one.to_json();
        assert_eq!(json["parallel"], json!(true));
        assert!(json.get("success").is_none());
        assert_eq!(json["right"]["success"], json!(false));
    }

    #[test]
    fn flag_matches_json() {
        let outcomes = [
            Outcome::success("a"),
            Outcome::failure("b"),
            Outcome::skipped(Outcome::failure("c")),
            Outcome::parallel(Outcome::success("a"), Outcome::success("b")),
            Outcome::Scheduled {
                schedule: "daily".into(),
                node: Node::command("crawl", vec![]),
            },
            Outcome::Empty,
        ];
        for out in outcomes {
            assert_eq!(out.success_flag(), out.to_json()["success"].as_bool(), "{out:?}");
        }
    }

    #[test]
    fn skipped_is_neither() {
        let out = Outcome::skipped(Outcome::failure("no"));
        assert!(!out.is_success());
        assert!(!out.is_failure());
        assert_eq!(out.to_json()["condition"]["error"], json!("no"));
    }

    #[test]
    fn scheduled_json_names_command() {
        let out = Outcome::Scheduled {
            schedule: "daily".into(),
            node: Node::command("crawl", vec![]),
        };
        let json = out.to_json();
        assert_eq!(json["scheduled"], json!(true));
        assert_eq!(json["schedule"], json!("daily"));
        assert_eq!(json["command"], json!("crawl"));
        assert_eq!(json["ast"]["type"], json!("command"));
    }

    #[test]
    fn serialize_matches_to_json() {
        let out = Outcome::parallel(Outcome::success("a"), Outcome::Empty);
        let text = serde_json::to_string(&out).expect("serializes");
        let back: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(back, out.to_json());
    }
}
