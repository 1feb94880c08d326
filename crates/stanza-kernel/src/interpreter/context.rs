//! Execution context threaded through evaluation.
//!
//! A context is never mutated in place. Each operator derives a fresh copy
//! for its child: `→` sets the previous result, `>` sets the piped input, and
//! a security mark sets the active mode. Concurrent `+` branches therefore
//! share nothing mutable.
//!
//! Every context also carries a cancellation token. Derived contexts share
//! their parent's token, so cancelling the root stops the whole stanza.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::ast::SecurityMode;

use super::result::Outcome;

/// Per-step evaluation context.
#[derive(Debug, Clone)]
pub struct Context {
    previous: Option<Arc<Outcome>>,
    input: Option<Arc<Outcome>>,
    security: Option<SecurityMode>,
    cancel: CancellationToken,
}

impl Context {
    /// Create an empty root context with its own cancellation token.
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create an empty root context cancelled by `cancel`.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            previous: None,
            input: None,
            security: None,
            cancel,
        }
    }

    /// Result of the left side of the nearest enclosing `→`.
    pub fn previous_result(&self) -> Option<&Outcome> {
        self.previous.as_deref()
    }

    /// Result piped in by the nearest enclosing `>`.
    pub fn input(&self) -> Option<&Outcome> {
        self.input.as_deref()
    }

    /// Innermost active security mode.
    pub fn security(&self) -> Option<SecurityMode> {
        self.security
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Derive a context whose previous result is `outcome`.
    pub fn with_previous(&self, outcome: Outcome) -> Self {
        Self {
            previous: Some(Arc::new(outcome)),
            ..self.clone()
        }
    }

    /// Derive a context whose piped input is `outcome`.
    pub fn with_input(&self, outcome: Outcome) -> Self {
        Self {
            input: Some(Arc::new(outcome)),
            ..self.clone()
        }
    }

    /// Derive a context running under `mode`.
    pub fn with_security(&self, mode: SecurityMode) -> Self {
        Self {
            security: Some(mode),
            ..self.clone()
        }
    }

    /// JSON form used inside simulated outcomes. Unset fields are omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(previous) = &self.previous {
            map.insert("previous_result".into(), previous.to_json());
        }
        if let Some(input) = &self.input {
            map.insert("input".into(), input.to_json());
        }
        if let Some(mode) = self.security {
            map.insert("security".into(), Value::String(mode.to_string()));
        }
        Value::Object(map)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Contexts compare by their data; the cancellation token is identity, not
/// data, and is ignored.
impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.previous == other.previous
            && self.input == other.input
            && self.security == other.security
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_leaves_parent_untouched() {
        let root = Context::new();
        let child = root.with_previous(Outcome::success("a"));
        assert!(root.previous_result().is_none());
        assert_eq!(child.previous_result(), Some(&Outcome::success("a")));
    }

    #[test]
    fn derived_fields_accumulate() {
        let ctx = Context::new()
            .with_input(Outcome::success("in"))
            .with_security(SecurityMode::Shield)
            .with_previous(Outcome::failure("prev"));
        assert_eq!(ctx.input(), Some(&Outcome::success("in")));
        assert_eq!(ctx.security(), Some(SecurityMode::Shield));
        assert_eq!(ctx.previous_result(), Some(&Outcome::failure("prev")));
    }

    #[test]
    fn cancellation_is_shared_with_children() {
        let root = Context::new();
        let child = root.with_security(SecurityMode::Lock);
        root.cancellation().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn json_omits_unset_fields() {
        assert_eq!(Context::new().to_json(), serde_json::json!({}));
        let json = Context::new().with_security(SecurityMode::Lock).to_json();
        assert_eq!(json, serde_json::json!({"security": "lock"}));
    }
}
