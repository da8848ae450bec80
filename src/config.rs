//! Engine configuration with sane defaults.

use crate::types::Severity;

/// Tunable thresholds for timeline analysis and fleet correlation.
#[derive(Debug, Clone)]
pub struct Config {
  /// Silence between adjacent events (seconds) before a gap is reported.
  /// Strictly greater-than: a delta of exactly this many seconds is not a gap.
  pub gap_threshold_secs: i64,
  /// Forward window (seconds) for cross-station correlation.
  pub correlation_window_secs: i64,
  /// Minimum severity for an event to seed a correlated incident.
  pub min_correlation_severity: Severity,
  /// Max characters of the seed message kept in a correlated incident.
  pub snippet_max_chars: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      gap_threshold_secs: 300,
      correlation_window_secs: 300,
      min_correlation_severity: Severity::High,
      snippet_max_chars: 80,
    }
  }
}
