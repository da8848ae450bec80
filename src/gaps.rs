//! Silent-gap detection over a built timeline.

use crate::types::{GapRecord, Timeline, TIMESTAMP_FORMAT};

const SECONDS_PER_DAY: i64 = 86_400;

/// Scan adjacent event pairs for silent intervals longer than
/// `threshold_secs` (strictly greater-than). A negative delta — a day/hour
/// rollover in sources that carry time-of-day only — gets one day added once.
///
/// Returns records sorted by duration descending, so the longest gap is first.
/// Empty or single-event timelines yield no gaps.
pub fn detect_gaps(timeline: &Timeline, threshold_secs: i64) -> Vec<GapRecord> {
  let mut gaps: Vec<GapRecord> = Vec::new();

  for pair in timeline.events.windows(2) {
    let mut delta = (pair[1].timestamp - pair[0].timestamp).num_seconds();
    if delta < 0 {
      delta += SECONDS_PER_DAY;
    }
    if delta > threshold_secs {
      gaps.push(GapRecord {
        from_timestamp: pair[0].timestamp.format(TIMESTAMP_FORMAT).to_string(),
        to_timestamp: pair[1].timestamp.format(TIMESTAMP_FORMAT).to_string(),
        duration_seconds: delta,
        from_source: pair[0].source.clone(),
        to_source: pair[1].source.clone(),
      });
    }
  }

  // Stable sort: equal durations keep chronological order.
  gaps.sort_by(|a, b| b.duration_seconds.cmp(&a.duration_seconds));
  gaps
}

/// The single longest silent interval, if any.
pub fn longest_gap(gaps: &[GapRecord]) -> Option<&GapRecord> {
  gaps.first()
}
