//! Abstract Syntax Tree types for stanza.
//!
//! A stanza parses into a single [`Node`]. Leaves are [`Command`]s naming an
//! external operation; everything else is an operator tree, a security or
//! schedule annotation, or grouping.

use std::fmt;

use serde::Serialize;

/// Namespace given to commands written without a dot (`crawl` rather than
/// `web.crawl`).
pub const ROOT_NAMESPACE: &str = "root";

/// Every operator the lexer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// `→` or `->`
    Then,
    /// `+`
    And,
    /// `|`
    Or,
    /// `?`
    If,
    /// `@`
    At,
    /// `>`
    Pipe,
    /// `🔒`
    Lock,
    /// `🛡️`
    Shield,
    /// `⚠️`
    Warn,
}

/// Type tag shared by operators with the same evaluation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    Sequential,
    Parallel,
    Fallback,
    Conditional,
    Schedule,
    Pipe,
    Security,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Then,
        Operator::And,
        Operator::Or,
        Operator::If,
        Operator::At,
        Operator::Pipe,
        Operator::Lock,
        Operator::Shield,
        Operator::Warn,
    ];

    /// Fixed operator name.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Then => "then",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::If => "if",
            Operator::At => "at",
            Operator::Pipe => "pipe",
            Operator::Lock => "lock",
            Operator::Shield => "shield",
            Operator::Warn => "warn",
        }
    }

    /// Canonical symbol, as printed back by `Display`.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Then => "→",
            Operator::And => "+",
            Operator::Or => "|",
            Operator::If => "?",
            Operator::At => "@",
            Operator::Pipe => ">",
            Operator::Lock => "🔒",
            Operator::Shield => "🛡️",
            Operator::Warn => "⚠️",
        }
    }

    pub fn kind(self) -> OperatorKind {
        match self {
            Operator::Then => OperatorKind::Sequential,
            Operator::And => OperatorKind::Parallel,
            Operator::Or => OperatorKind::Fallback,
            Operator::If => OperatorKind::Conditional,
            Operator::At => OperatorKind::Schedule,
            Operator::Pipe => OperatorKind::Pipe,
            Operator::Lock | Operator::Shield | Operator::Warn => OperatorKind::Security,
        }
    }

    /// The binary form of this operator, if it joins two expressions.
    pub fn as_binary(self) -> Option<BinaryOp> {
        match self {
            Operator::Then => Some(BinaryOp::Then),
            Operator::And => Some(BinaryOp::And),
            Operator::Or => Some(BinaryOp::Or),
            Operator::If => Some(BinaryOp::If),
            Operator::Pipe => Some(BinaryOp::Pipe),
            Operator::At | Operator::Lock | Operator::Shield | Operator::Warn => None,
        }
    }

    /// The security mode this operator introduces, if it is a security mark.
    pub fn as_security(self) -> Option<SecurityMode> {
        match self {
            Operator::Lock => Some(SecurityMode::Lock),
            Operator::Shield => Some(SecurityMode::Shield),
            Operator::Warn => Some(SecurityMode::Warn),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operators that join a left and a right expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Then,
    And,
    Or,
    If,
    Pipe,
}

impl BinaryOp {
    pub fn operator(self) -> Operator {
        match self {
            BinaryOp::Then => Operator::Then,
            BinaryOp::And => Operator::And,
            BinaryOp::Or => Operator::Or,
            BinaryOp::If => Operator::If,
            BinaryOp::Pipe => Operator::Pipe,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.operator().fmt(f)
    }
}

/// Security annotation carried by a [`Node::Secured`] and by the context
/// handed to everything beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Authorization gate.
    Lock,
    /// Sandboxed execution.
    Shield,
    /// Audited execution.
    Warn,
}

impl SecurityMode {
    pub fn operator(self) -> Operator {
        match self {
            SecurityMode::Lock => Operator::Lock,
            SecurityMode::Shield => Operator::Shield,
            SecurityMode::Warn => Operator::Warn,
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator().name())
    }
}

/// A leaf invocation: `namespace.action arg1 arg2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub namespace: String,
    pub action: String,
    pub args: Vec<String>,
}

impl Command {
    /// Build a command from the word naming it.
    ///
    /// Exactly one dot splits into namespace and action. Anything else keeps
    /// the whole word as the action under [`ROOT_NAMESPACE`].
    pub fn from_word(word: &str, args: Vec<String>) -> Self {
        let segments: Vec<&str> = word.split('.').collect();
        match segments.as_slice() {
            [namespace, action] => Self {
                namespace: (*namespace).to_string(),
                action: (*action).to_string(),
                args,
            },
            _ => Self {
                namespace: ROOT_NAMESPACE.to_string(),
                action: word.to_string(),
                args,
            },
        }
    }

    /// Full registry key, `namespace.action`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.action)
    }

    /// Name as written in a stanza (root namespace elided).
    pub fn display_name(&self) -> String {
        if self.namespace == ROOT_NAMESPACE {
            self.action.clone()
        } else {
            self.key()
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_word(&self.display_name()))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

/// A parsed stanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// External command invocation.
    Command(Command),
    /// Binary operator application. The grammar is right-recursive, so
    /// `a → b + c` is `a → (b + c)`.
    Operation {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `🔒 x`, `🛡️ x`, `⚠️ x`
    Secured { mode: SecurityMode, inner: Box<Node> },
    /// `@schedule x`: a declaration, never run directly.
    Scheduled { schedule: String, inner: Box<Node> },
    /// `( x )`
    Group { inner: Box<Node> },
    /// `{ x y z }`: run in order, last result wins.
    Block { statements: Vec<Node> },
}

impl Node {
    pub fn command(word: &str, args: Vec<String>) -> Self {
        Node::Command(Command::from_word(word, args))
    }

    pub fn operation(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Operation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn secured(mode: SecurityMode, inner: Node) -> Self {
        Node::Secured {
            mode,
            inner: Box::new(inner),
        }
    }

    pub fn scheduled(schedule: impl Into<String>, inner: Node) -> Self {
        Node::Scheduled {
            schedule: schedule.into(),
            inner: Box::new(inner),
        }
    }

    pub fn group(inner: Node) -> Self {
        Node::Group {
            inner: Box::new(inner),
        }
    }

    /// Every command leaf beneath this node, in textual order.
    pub fn commands(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        self.collect_commands(&mut out);
        out
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<&'a Command>) {
        match self {
            Node::Command(cmd) => out.push(cmd),
            Node::Operation { left, right, .. } => {
                left.collect_commands(out);
                right.collect_commands(out);
            }
            Node::Secured { inner, .. } | Node::Scheduled { inner, .. } | Node::Group { inner } => {
                inner.collect_commands(out)
            }
            Node::Block { statements } => {
                for stmt in statements {
                    stmt.collect_commands(out);
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Command(cmd) => cmd.fmt(f),
            Node::Operation { op, left, right } => write!(f, "{left} {op} {right}"),
            Node::Secured { mode, inner } => write!(f, "{} {inner}", mode.operator()),
            Node::Scheduled { schedule, inner } => write!(f, "@{schedule} {inner}"),
            Node::Group { inner } => write!(f, "({inner})"),
            Node::Block { statements } => {
                f.write_str("{")?;
                for stmt in statements {
                    write!(f, " {stmt}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

/// Quote a word if printing it bare would lex differently.
fn quote_word(word: &str) -> String {
    let needs_quotes = word.is_empty()
        || word.contains("->")
        || word.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '"' | '\'' | '(' | ')' | '{' | '}' | '+' | '|' | '?' | '@' | '>' | '→'
                        | '🔒' | '🛡' | '⚠'
                )
        });
    if !needs_quotes {
        word.to_string()
    } else if word.contains('"') {
        format!("'{word}'")
    } else {
        format!("\"{word}\"")
    }
}
