//! Enforcement behind the security marks.
//!
//! - `🔒` asks an [`Authorizer`] before anything inside it runs.
//! - `⚠️` writes [`AuditEntry`] records to an [`AuditSink`] before and after.
//! - `🛡️` needs no policy object: the interpreter isolates the inner task
//!   and executors see the mode in the context.

mod audit;
mod authorizer;

pub use audit::{AuditEntry, AuditPhase, AuditSink, MemoryAudit, NdjsonAudit, TracingAudit};
pub use authorizer::{AllowAll, AllowList, Authorizer, DenyAll};
