//! Audit trail of effective changes.
//!
//! Every insert, update, delete and obsolete-marking performed by the
//! reconciler is reported as an [`AuditEvent`] to the [`AuditSink`] passed
//! into the call. Unchanged records produce no event. Sinks never influence
//! control flow: a sink that cannot write drops the event.

use std::io::Write;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

// ── Events ──────────────────────────────────────────────────────────────

/// Kind of effective change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Inserted,
    Updated,
    Deleted,
    MarkedObsolete,
}

/// One effective change, e.g. `Inserted feature 'g1' for organism 'Pf'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    /// What was changed, e.g. `property 'note' = 'A'`.
    pub subject: String,
    /// Owning context, e.g. `feature 'g1'`. Empty when there is none.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub context: String,
}

impl AuditEvent {
    pub fn new(action: AuditAction, subject: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            action,
            subject: subject.into(),
            context: context.into(),
        }
    }
}

impl std::fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.action {
            AuditAction::Inserted => write!(f, "Inserted {}", self.subject)?,
            AuditAction::Updated => write!(f, "Updated {}", self.subject)?,
            AuditAction::Deleted => write!(f, "Deleted {}", self.subject)?,
            AuditAction::MarkedObsolete => write!(f, "Marked {} as obsolete", self.subject)?,
        }
        if !self.context.is_empty() {
            write!(f, " for {}", self.context)?;
        }
        Ok(())
    }
}

// ── AuditSink trait ─────────────────────────────────────────────────────

/// A write-only destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Report `event` to `sink` and mirror it into the debug log.
pub(crate) fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    tracing::debug!(action = ?event.action, "{event}");
    sink.record(&event);
}

// ── SilentSink ──────────────────────────────────────────────────────────

/// Discards every event (verbosity disabled).
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl AuditSink for SilentSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ── LineSink ────────────────────────────────────────────────────────────

/// Writes one text line per event.
#[derive(Debug)]
pub struct LineSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LineSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> AuditSink for LineSink<W> {
    fn record(&self, event: &AuditEvent) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(out, "{event}");
    }
}

// ── JsonSink ────────────────────────────────────────────────────────────

/// Emits events as newline-delimited JSON.
#[derive(Debug)]
pub struct JsonSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> AuditSink for JsonSink<W> {
    fn record(&self, event: &AuditEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = writeln!(out, "{json}");
        }
    }
}

// ── VecSink ─────────────────────────────────────────────────────────────

/// Collects events in memory for testing.
#[derive(Debug, Default)]
pub struct VecSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All collected events rendered as text lines.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of collected events with the given action.
    pub fn count(&self, action: AuditAction) -> usize {
        self.events().iter().filter(|e| e.action == action).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl AuditSink for VecSink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_follow_action_wording() {
        let inserted = AuditEvent::new(AuditAction::Inserted, "feature 'g1'", "organism 'Pf'");
        assert_eq!(inserted.to_string(), "Inserted feature 'g1' for organism 'Pf'");

        let obsolete = AuditEvent::new(AuditAction::MarkedObsolete, "feature 'g1'", "");
        assert_eq!(obsolete.to_string(), "Marked feature 'g1' as obsolete");
    }

    #[test]
    fn line_sink_writes_one_line_per_event() {
        let sink = LineSink::new(Vec::new());
        sink.record(&AuditEvent::new(AuditAction::Deleted, "synonym 'x'", "feature 'g1'"));
        sink.record(&AuditEvent::new(AuditAction::Updated, "featureloc", "feature 'g1'"));
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "Deleted synonym 'x' for feature 'g1'\nUpdated featureloc for feature 'g1'\n"
        );
    }

    #[test]
    fn json_sink_emits_ndjson() {
        let sink = JsonSink::new(Vec::new());
        sink.record(&AuditEvent::new(AuditAction::MarkedObsolete, "feature 'g1'", ""));
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: AuditEvent = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed.action, AuditAction::MarkedObsolete);
        assert!(text.contains("\"marked_obsolete\""));
        assert!(!text.contains("context"));
    }

    #[test]
    fn vec_sink_counts_by_action() {
        let sink = VecSink::new();
        emit(&sink, AuditEvent::new(AuditAction::Inserted, "a", ""));
        emit(&sink, AuditEvent::new(AuditAction::Inserted, "b", ""));
        emit(&sink, AuditEvent::new(AuditAction::Deleted, "c", ""));
        assert_eq!(sink.count(AuditAction::Inserted), 2);
        assert_eq!(sink.len(), 3);
        sink.clear();
        assert!(sink.is_empty());
    }
}
