//! Core types for the timeline engine (JSON contracts + internal models).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what the ingestion layer sends)
// ---------------------------------------------------------------------------

/// One pre-parsed log line tuple from the external ingestion stage.
/// Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundLine {
  /// Source-format timestamp text, `YYYY-MM-DD HH:MM:SS.mmm`. May be a
  /// sentinel/zero value when the source line carried no usable timestamp.
  pub timestamp: String,
  /// Single-letter severity code: I, W, E, C or N.
  pub level: String,
  /// Originating component name; may be a generic placeholder.
  pub component: String,
  pub message: String,
}

// ---------------------------------------------------------------------------
// Severity enum (normalized)
// ---------------------------------------------------------------------------

/// Ordered severity: `Info < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
  Info,
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  /// Map an ingestion severity code to the normalized enum.
  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim().to_ascii_uppercase().as_str() {
      "C" => Some(Self::Critical),
      "E" => Some(Self::High),
      "W" => Some(Self::Medium),
      "I" | "N" => Some(Self::Info),
      _ => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Critical => "CRITICAL",
      Self::High => "HIGH",
      Self::Medium => "MEDIUM",
      Self::Low => "LOW",
      Self::Info => "INFO",
    }
  }
}

// ---------------------------------------------------------------------------
// Internal timeline types
// ---------------------------------------------------------------------------

/// One deduplicated timeline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
  pub timestamp: NaiveDateTime,
  pub severity: Severity,
  pub source: String,
  pub message: String,
  /// Number of raw lines folded into this event; always >= 1.
  pub repeat_count: u64,
  /// Timestamp of the most recent folded occurrence; always >= `timestamp`.
  pub last_seen: NaiveDateTime,
}

impl Event {
  /// Display form of the message: repeat annotation is appended only when
  /// more than one raw line was folded in.
  pub fn display_message(&self) -> String {
    if self.repeat_count > 1 {
      format!(
        "{} (x{}, last: {})",
        self.message,
        self.repeat_count,
        self.last_seen.format(TIMESTAMP_FORMAT)
      )
    } else {
      self.message.clone()
    }
  }
}

/// Source timestamp format used throughout (`YYYY-MM-DD HH:MM:SS.mmm`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// The sorted, deduplicated event sequence for one station/run.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
  pub events: Vec<Event>,
  /// Raw lines that could not be parsed into an event (never fatal).
  pub dropped_lines: u64,
}

impl Timeline {
  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }
}

// ---------------------------------------------------------------------------
// Gap detection
// ---------------------------------------------------------------------------

/// A silent interval between two adjacent timeline events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRecord {
  pub from_timestamp: String,
  pub to_timestamp: String,
  pub duration_seconds: i64,
  pub from_source: String,
  pub to_source: String,
}

// ---------------------------------------------------------------------------
// Causal chains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepKind {
  Cause,
  Effect,
  Root,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainStep {
  pub kind: StepKind,
  pub text: String,
}

impl ChainStep {
  pub fn new(kind: StepKind, text: impl Into<String>) -> Self {
    Self {
      kind,
      text: text.into(),
    }
  }
}

/// A rule-derived CAUSE/EFFECT/ROOT narrative. Steps are ordered CAUSE(s)
/// first, then EFFECT(s), then exactly one ROOT.
#[derive(Debug, Clone, Serialize)]
pub struct CausalChain {
  pub name: String,
  pub severity: Severity,
  pub steps: Vec<ChainStep>,
  /// Present only when a temporal precondition was positively confirmed
  /// against the timeline. Never set for empty/unmatched timelines.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temporal_note: Option<String>,
}

// ---------------------------------------------------------------------------
// Fleet correlation
// ---------------------------------------------------------------------------

/// A cross-station event cluster sharing a time window.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedIncident {
  pub incident_id: String,
  pub timestamp: String,
  pub source: String,
  pub message_snippet: String,
  /// Distinct stations involved, sorted for determinism.
  pub entity_ids: Vec<String>,
  pub count: usize,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EventOutput {
  pub timestamp: String,
  pub severity: Severity,
  pub source: String,
  pub message: String,
}

impl From<&Event> for EventOutput {
  fn from(e: &Event) -> Self {
    Self {
      timestamp: e.timestamp.format(TIMESTAMP_FORMAT).to_string(),
      severity: e.severity,
      source: e.source.clone(),
      message: e.display_message(),
    }
  }
}

/// Per-station analysis results handed to downstream report generators.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
  pub station_id: String,
  pub timeline: Vec<EventOutput>,
  /// Sorted by duration descending; the longest gap is first.
  pub gaps: Vec<GapRecord>,
  pub causal_chains: Vec<CausalChain>,
  pub dropped_lines: u64,
  pub skipped_rules: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
  pub stations: Vec<StationReport>,
  pub correlated_incidents: Vec<CorrelatedIncident>,
}

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }
}
