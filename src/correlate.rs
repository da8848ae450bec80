//! Cross-entity (fleet) correlation: find significant events that co-occur
//! within a time window across two or more stations.

use std::collections::{BTreeSet, HashSet};

use chrono::{Duration, NaiveDateTime};

use crate::config::Config;
use crate::types::{CorrelatedIncident, Event, Timeline, TIMESTAMP_FORMAT};

/// One station's completed timeline, tagged with its entity id.
pub struct EntityTimeline<'a> {
  pub entity_id: &'a str,
  pub timeline: &'a Timeline,
}

struct MergedEvent<'a> {
  entity_id: &'a str,
  event: &'a Event,
}

struct Emitted {
  source: String,
  entities: BTreeSet<String>,
  window_end: NaiveDateTime,
}

/// Sliding-window scan over the merged fleet sequence.
///
/// Every event with severity >= `min_correlation_severity` seeds a forward
/// scan bounded by `correlation_window_secs`; a window touching two or more
/// distinct entities becomes an incident. Exact-key repeats are suppressed,
/// as are incidents whose entity set is a subset of an incident already
/// emitted for the same source while that incident's window still covers the
/// seed — so one fleet-wide outage reports once, not once per member.
pub fn correlate(fleet: &[EntityTimeline<'_>], config: &Config) -> Vec<CorrelatedIncident> {
  let mut merged: Vec<MergedEvent<'_>> = fleet
    .iter()
    .flat_map(|et| {
      et.timeline.events.iter().map(move |event| MergedEvent {
        entity_id: et.entity_id,
        event,
      })
    })
    .collect();
  // Stable: ties keep per-entity discovery order.
  merged.sort_by_key(|m| m.event.timestamp);

  let window = Duration::seconds(config.correlation_window_secs);
  let mut seen_keys: HashSet<String> = HashSet::new();
  let mut emitted: Vec<Emitted> = Vec::new();
  let mut incidents: Vec<CorrelatedIncident> = Vec::new();

  for (i, seed) in merged.iter().enumerate() {
    if seed.event.severity < config.min_correlation_severity {
      continue;
    }

    let limit = seed.event.timestamp + window;
    let mut entities: BTreeSet<String> = BTreeSet::new();
    for m in &merged[i..] {
      if m.event.timestamp > limit {
        break;
      }
      entities.insert(m.entity_id.to_string());
    }
    if entities.len() < 2 {
      continue;
    }

    let covered = emitted.iter().any(|prev| {
      prev.source == seed.event.source
        && seed.event.timestamp <= prev.window_end
        && entities.is_subset(&prev.entities)
    });
    if covered {
      continue;
    }

    let minute = seed.event.timestamp.format("%Y-%m-%d %H:%M").to_string();
    let sorted: Vec<String> = entities.iter().cloned().collect();
    let key = format!("{}|{}|{}", minute, seed.event.source, sorted.join(","));
    if !seen_keys.insert(key.clone()) {
      continue;
    }

    incidents.push(CorrelatedIncident {
      incident_id: incident_id(&key),
      timestamp: seed.event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
      source: seed.event.source.clone(),
      message_snippet: snippet(&seed.event.message, config.snippet_max_chars),
      count: sorted.len(),
      entity_ids: sorted,
    });
    emitted.push(Emitted {
      source: seed.event.source.clone(),
      entities,
      window_end: limit,
    });
  }

  incidents
}

/// Stable incident id: hash of the dedup key.
fn incident_id(key: &str) -> String {
  let hex = blake3::hash(key.as_bytes()).to_hex();
  format!("cor-{}", &hex[..16])
}

fn snippet(message: &str, max_chars: usize) -> String {
  if message.chars().count() <= max_chars {
    message.to_string()
  } else {
    message.chars().take(max_chars).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Severity;

  fn event(ts: &str, severity: Severity, source: &str, message: &str) -> Event {
    let timestamp = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap();
    Event {
      timestamp,
      severity,
      source: source.into(),
      message: message.into(),
      repeat_count: 1,
      last_seen: timestamp,
    }
  }

  fn timeline(events: Vec<Event>) -> Timeline {
    Timeline {
      events,
      dropped_lines: 0,
    }
  }

  fn fleet_of<'a>(stations: &'a [(&'a str, Timeline)]) -> Vec<EntityTimeline<'a>> {
    stations
      .iter()
      .map(|(id, t)| EntityTimeline {
        entity_id: *id,
        timeline: t,
      })
      .collect()
  }

  #[test]
  fn three_stations_within_window_one_incident() {
    let stations = [
      (
        "A",
        timeline(vec![event(
          "2026-02-18 09:00:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
      (
        "B",
        timeline(vec![event(
          "2026-02-18 09:02:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
      (
        "C",
        timeline(vec![event(
          "2026-02-18 09:04:30",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
    ];
    let incidents = correlate(&fleet_of(&stations), &Config::default());
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].entity_ids, vec!["A", "B", "C"]);
    assert_eq!(incidents[0].count, 3);
    assert!(incidents[0].incident_id.starts_with("cor-"));
  }

  #[test]
  fn station_outside_window_not_merged() {
    let stations = [
      (
        "A",
        timeline(vec![event(
          "2026-02-18 09:00:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
      (
        "B",
        timeline(vec![event(
          "2026-02-18 09:02:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
      (
        "C",
        timeline(vec![event(
          "2026-02-18 09:10:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
    ];
    let incidents = correlate(&fleet_of(&stations), &Config::default());
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].entity_ids, vec!["A", "B"]);
  }

  #[test]
  fn low_severity_events_do_not_seed() {
    let stations = [
      (
        "A",
        timeline(vec![event(
          "2026-02-18 09:00:00",
          Severity::Medium,
          "Cloud",
          "MQTT slow",
        )]),
      ),
      (
        "B",
        timeline(vec![event(
          "2026-02-18 09:01:00",
          Severity::Medium,
          "Cloud",
          "MQTT slow",
        )]),
      ),
    ];
    let incidents = correlate(&fleet_of(&stations), &Config::default());
    assert!(incidents.is_empty());
  }

  #[test]
  fn low_severity_neighbors_still_join_a_window() {
    // The seed must be significant; collected neighbors may be any severity.
    let stations = [
      (
        "A",
        timeline(vec![event(
          "2026-02-18 09:00:00",
          Severity::High,
          "Net",
          "PPP down",
        )]),
      ),
      (
        "B",
        timeline(vec![event(
          "2026-02-18 09:01:00",
          Severity::Info,
          "Net",
          "PPP renegotiating",
        )]),
      ),
    ];
    let incidents = correlate(&fleet_of(&stations), &Config::default());
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].entity_ids, vec!["A", "B"]);
  }

  #[test]
  fn single_station_never_correlates() {
    let stations = [(
      "A",
      timeline(vec![
        event("2026-02-18 09:00:00", Severity::Critical, "Cloud", "MQTT broker unreachable"),
        event("2026-02-18 09:01:00", Severity::Critical, "Cloud", "backend timeout"),
      ]),
    )];
    let incidents = correlate(&fleet_of(&stations), &Config::default());
    assert!(incidents.is_empty());
  }

  #[test]
  fn deterministic_incident_ids() {
    let stations = [
      (
        "A",
        timeline(vec![event(
          "2026-02-18 09:00:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
      (
        "B",
        timeline(vec![event(
          "2026-02-18 09:02:00",
          Severity::Critical,
          "Cloud",
          "MQTT broker unreachable",
        )]),
      ),
    ];
    let a = correlate(&fleet_of(&stations), &Config::default());
    let b = correlate(&fleet_of(&stations), &Config::default());
    assert_eq!(a[0].incident_id, b[0].incident_id);
  }
}
