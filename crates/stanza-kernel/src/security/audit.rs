//! Audit trail for `⚠️` nodes.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interpreter::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPhase {
    Before,
    After,
}

/// One audit record. `outcome` is set on `After` entries only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub phase: AuditPhase,
    /// Canonical text of the warned node.
    pub stanza: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl AuditEntry {
    pub fn before(stanza: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            phase: AuditPhase::Before,
            stanza: stanza.into(),
            outcome: None,
        }
    }

    pub fn after(stanza: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now(),
            phase: AuditPhase::After,
            stanza: stanza.into(),
            outcome: Some(outcome),
        }
    }
}

/// Receives audit records. Recording must not fail the stanza, so sinks
/// swallow their own errors.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Logs entries at warn level. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, entry: AuditEntry) {
        match &entry.outcome {
            None => tracing::warn!(phase = "before", stanza = %entry.stanza, "audited stanza starting"),
            Some(outcome) => tracing::warn!(
                phase = "after",
                stanza = %entry.stanza,
                success = outcome.is_success(),
                "audited stanza finished"
            ),
        }
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, entry: AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

/// Append-only JSON-lines audit file.
///
/// Each entry is one line, flushed as soon as it is written.
#[derive(Debug)]
pub struct NdjsonAudit {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl NdjsonAudit {
    /// Open or create the log for appending.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_writer(&mut *writer, entry).map_err(std::io::Error::other)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl AuditSink for NdjsonAudit {
    fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.append(&entry) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to write audit entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_keeps_order() {
        let sink = MemoryAudit::new();
        sink.record(AuditEntry::before("post hi"));
        sink.record(AuditEntry::after("post hi", Outcome::success("ok")));
        let phases: Vec<_> = sink.entries().iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![AuditPhase::Before, AuditPhase::After]);
    }

    #[test]
    fn before_entry_has_no_outcome_field() {
        let json = serde_json::to_value(AuditEntry::before("x")).expect("serializes");
        assert_eq!(json["phase"], "before");
        assert!(json.get("outcome").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn ndjson_appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.ndjson");
        let sink = NdjsonAudit::open(&path).expect("open");
        sink.record(AuditEntry::before("post hi"));
        sink.record(AuditEntry::after("post hi", Outcome::failure("down")));

        let text = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["phase"], "after");
        assert_eq!(lines[1]["outcome"]["error"], "down");
    }
}
