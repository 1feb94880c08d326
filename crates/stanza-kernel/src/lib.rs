//! stanza-kernel: the core of stanza, a small command-composition language.
//!
//! A stanza strings externally registered commands together with a handful of
//! operators:
//!
//! ```text
//! d0t.crawl https://x.io → d0t.analyze      sequence
//! fetch.a + fetch.b                         concurrently
//! primary | backup                          fallback
//! health.check ? deploy                     conditional
//! list > summarize                          pipe
//! 🔒 ops.deploy   🛡️ untrusted   ⚠️ post    security marks
//! @daily report                             schedule declaration
//! ```
//!
//! This crate provides:
//!
//! - **Lexer**: tokenizes stanza source using logos
//! - **Parser**: builds the AST from tokens using chumsky
//! - **AST**: nodes and the closed operator set
//! - **Registry**: command name → invocation template
//! - **Executor**: how registered commands actually run
//! - **Security**: lock authorization and warn auditing
//! - **Interpreter**: evaluates an AST to an [`Outcome`]
//! - **Kernel**: wires the above together from a [`KernelConfig`]

pub mod ast;
pub mod executor;
pub mod interpreter;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod security;

pub use ast::{BinaryOp, Command, Node, Operator, OperatorKind, ROOT_NAMESPACE, SecurityMode};
pub use executor::{CommandExecutor, Invocation, ShellExecutor, StubExecutor};
pub use interpreter::{Context, Interpreter, InterpreterConfig, Outcome};
pub use kernel::{Compiled, Kernel, KernelConfig};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ParseError, parse, parse_source, parse_with_diagnostics};
pub use registry::{CommandRegistry, RegistryError};
