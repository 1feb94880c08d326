//! Interpreter for stanza ASTs.
//!
//! - [`Outcome`]: what every node evaluates to
//! - [`Context`]: immutable per-step data (previous result, piped input,
//!   security mode, cancellation)
//! - [`Interpreter`]: the evaluator itself

mod context;
mod eval;
mod result;

pub use context::Context;
pub use eval::{DEFAULT_COMMAND_TIMEOUT, Interpreter, InterpreterConfig};
pub use result::Outcome;
