//! Timeline builder: timestamp recovery, component repair, stable sort, and
//! two-pass deduplication.
//!
//! Pass 1 collapses consecutive runs of the same `(severity, source,
//! normalized message)` key — the common case of a component logging the same
//! warning every second. Pass 2 re-keys the whole sequence so that bursts of
//! the same condition separated by unrelated lines still merge; the first
//! occurrence keeps its timestamp, counts sum, and `last_seen` is the maximum
//! across every folded occurrence.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::EngineError;
use crate::normalize;
use crate::types::{Event, InboundLine, Severity, Timeline};

/// One surviving line after timestamp recovery and component repair.
struct ParsedLine {
  timestamp: NaiveDateTime,
  severity: Severity,
  source: String,
  message: String,
}

/// Build a sorted, deduplicated timeline from pre-parsed line tuples.
///
/// A single malformed line never aborts the build; it is dropped and counted.
/// Empty input produces an empty timeline.
pub fn build_timeline(lines: &[InboundLine]) -> Timeline {
  let mut parsed: Vec<ParsedLine> = Vec::with_capacity(lines.len());
  let mut dropped: u64 = 0;

  for line in lines {
    match parse_line(line) {
      Ok(p) => parsed.push(p),
      Err(e) => {
        dropped += 1;
        debug!(component = %line.component, error = %e, "dropped uncorrectable line");
      }
    }
  }

  // Stable sort keeps original discovery order on timestamp ties.
  parsed.sort_by_key(|p| p.timestamp);

  let events = collapse_global(collapse_consecutive(parsed));

  Timeline {
    events,
    dropped_lines: dropped,
  }
}

fn parse_line(line: &InboundLine) -> Result<ParsedLine, EngineError> {
  let severity = Severity::from_code(&line.level)
    .ok_or_else(|| EngineError::malformed(format!("unknown severity code {:?}", line.level)))?;

  // Sentinel or unparsable timestamps get one recovery attempt against an
  // ISO-like date-time embedded in the message body.
  let raw_ts = line.timestamp.as_str();
  let recovered = if normalize::is_sentinel_timestamp(raw_ts) {
    None
  } else {
    normalize::parse_timestamp(raw_ts).map(|ts| (ts, line.message.clone()))
  };
  let (timestamp, message) = match recovered.or_else(|| normalize::recover_timestamp(&line.message))
  {
    Some(pair) => pair,
    None => {
      return Err(EngineError::malformed(format!(
        "no usable timestamp in {:?}",
        line.timestamp
      )))
    }
  };

  let (source, message) = normalize::repair_component(&line.component, &message);
  if source.is_empty() {
    return Err(EngineError::malformed("no recoverable component name"));
  }

  Ok(ParsedLine {
    timestamp,
    severity,
    source,
    message,
  })
}

/// Working entry carrying its dedup key through both passes.
struct Keyed {
  event: Event,
  normalized: String,
}

fn key_of(p: &ParsedLine) -> String {
  normalize::normalize_message(&p.message)
}

/// Pass 1: merge adjacent entries sharing the same key.
fn collapse_consecutive(parsed: Vec<ParsedLine>) -> Vec<Keyed> {
  let mut out: Vec<Keyed> = Vec::new();

  for p in parsed {
    let normalized = key_of(&p);
    if let Some(last) = out.last_mut() {
      if last.event.severity == p.severity
        && last.event.source == p.source
        && last.normalized == normalized
      {
        last.event.repeat_count += 1;
        if p.timestamp > last.event.last_seen {
          last.event.last_seen = p.timestamp;
        }
        continue;
      }
    }
    out.push(Keyed {
      event: Event {
        timestamp: p.timestamp,
        severity: p.severity,
        source: p.source,
        message: p.message,
        repeat_count: 1,
        last_seen: p.timestamp,
      },
      normalized,
    });
  }

  out
}

/// Pass 2: merge every entry sharing a key across the whole sequence, in
/// order of first occurrence.
fn collapse_global(keyed: Vec<Keyed>) -> Vec<Event> {
  let mut events: Vec<Event> = Vec::with_capacity(keyed.len());
  let mut index: HashMap<(Severity, String, String), usize> = HashMap::new();

  for k in keyed {
    let map_key = (k.event.severity, k.event.source.clone(), k.normalized);
    match index.get(&map_key) {
      Some(&i) => {
        let first = &mut events[i];
        first.repeat_count += k.event.repeat_count;
        if k.event.last_seen > first.last_seen {
          first.last_seen = k.event.last_seen;
        }
      }
      None => {
        index.insert(map_key, events.len());
        events.push(k.event);
      }
    }
  }

  events
}
