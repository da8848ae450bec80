//! Integration tests for the timeline engine.

use timeline_engine::{analyze_fleet, Config, InboundLine, StationInput};

fn line(ts: &str, level: &str, component: &str, message: &str) -> InboundLine {
  InboundLine {
    timestamp: ts.into(),
    level: level.into(),
    component: component.into(),
    message: message.into(),
  }
}

fn station(id: &str, lines: Vec<InboundLine>, counters: &[(&str, &str)]) -> StationInput {
  StationInput {
    station_id: id.into(),
    lines,
    counters: counters
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect(),
  }
}

fn degraded_station(id: &str) -> StationInput {
  station(
    id,
    vec![
      line("2026-02-18 08:59:00.000", "I", "Sys", "boot complete"),
      line("2026-02-18 09:00:00.000", "E", "Net", "PPP session terminated by peer"),
      line("2026-02-18 09:00:05.000", "E", "Cloud", "MQTT publish failed (attempt 101)"),
      line("2026-02-18 09:00:06.000", "E", "Cloud", "MQTT publish failed (attempt 102)"),
      line("2026-02-18 09:00:07.000", "E", "Cloud", "MQTT publish failed (attempt 103)"),
      line("2026-02-18 09:20:00.000", "W", "Meter", "reading delayed"),
      line("2026-02-18 09:20:01.000", "E", "Cloud", "MQTT publish failed (attempt 104)"),
    ],
    &[("ppp_status", "down"), ("mqtt_fail_count", "5")],
  )
}

#[test]
fn full_pipeline_single_station() {
  let report = analyze_fleet(&Config::default(), &[degraded_station("EVSE-01")]).unwrap();
  assert_eq!(report.stations.len(), 1);
  let s = &report.stations[0];

  // Sort invariant.
  for pair in s.timeline.windows(2) {
    assert!(pair[0].timestamp <= pair[1].timestamp);
  }

  // The four MQTT failures fold into one event across the unrelated line,
  // with the repeat annotation on the displayed message.
  let mqtt: Vec<_> = s
    .timeline
    .iter()
    .filter(|e| e.message.contains("MQTT publish failed"))
    .collect();
  assert_eq!(mqtt.len(), 1);
  assert!(mqtt[0].message.contains("(x4, last: 2026-02-18 09:20:01.000)"));

  // The ~20 min silence is reported as the longest gap.
  assert!(!s.gaps.is_empty());
  assert_eq!(s.gaps[0].duration_seconds, 1195);
  assert!(s.gaps.windows(2).all(|p| p[0].duration_seconds >= p[1].duration_seconds));

  // Causal inference: Network→Cloud Cascade with a confirmed precedence.
  let chain = s
    .causal_chains
    .iter()
    .find(|c| c.name == "Network→Cloud Cascade")
    .expect("cascade chain should fire");
  assert!(chain.steps.iter().any(|st| st.text.contains("5 failures")));
  assert!(chain.temporal_note.is_some());

  assert_eq!(s.dropped_lines, 0);
  assert_eq!(s.skipped_rules, 0);
}

#[test]
fn deterministic_output_across_runs() {
  let inputs = [degraded_station("EVSE-01"), degraded_station("EVSE-02")];
  let r1 = analyze_fleet(&Config::default(), &inputs).unwrap();
  let r2 = analyze_fleet(&Config::default(), &inputs).unwrap();
  let j1 = serde_json::to_string(&r1).unwrap();
  let j2 = serde_json::to_string(&r2).unwrap();
  assert_eq!(j1, j2, "same inputs must produce byte-identical output");
}

#[test]
fn sentinel_timestamp_recovered() {
  let report = analyze_fleet(
    &Config::default(),
    &[station(
      "EVSE-01",
      vec![line(
        "0000-00-00 00:00:00.000",
        "E",
        "Boot",
        "2026-02-18 10:00:00 something happened",
      )],
      &[],
    )],
  )
  .unwrap();
  let s = &report.stations[0];
  assert_eq!(s.timeline.len(), 1);
  assert_eq!(s.timeline[0].timestamp, "2026-02-18 10:00:00.000");
  assert_eq!(s.timeline[0].message, "something happened");
}

#[test]
fn malformed_lines_counted_not_fatal() {
  let report = analyze_fleet(
    &Config::default(),
    &[station(
      "EVSE-01",
      vec![
        line("garbage", "E", "Net", "no embedded time"),
        line("2026-02-18 10:00:00.000", "E", "Net", "kept"),
      ],
      &[],
    )],
  )
  .unwrap();
  let s = &report.stations[0];
  assert_eq!(s.timeline.len(), 1);
  assert_eq!(s.dropped_lines, 1);
}

#[test]
fn vacuous_precedence_on_empty_timeline() {
  // Counters satisfied but no log lines at all: the chain still fires,
  // without a temporal confirmation.
  let report = analyze_fleet(
    &Config::default(),
    &[station(
      "EVSE-01",
      vec![],
      &[("ppp_status", "down"), ("mqtt_fail_count", "3")],
    )],
  )
  .unwrap();
  let s = &report.stations[0];
  let chain = s
    .causal_chains
    .iter()
    .find(|c| c.name == "Network→Cloud Cascade")
    .expect("trigger alone fires the chain");
  assert!(chain.temporal_note.is_none());
}

#[test]
fn ppp_up_never_produces_cascade() {
  let report = analyze_fleet(
    &Config::default(),
    &[station(
      "EVSE-01",
      vec![],
      &[("ppp_status", "up"), ("mqtt_fail_count", "5")],
    )],
  )
  .unwrap();
  assert!(report.stations[0]
    .causal_chains
    .iter()
    .all(|c| c.name != "Network→Cloud Cascade"));
}

#[test]
fn fleet_correlation_across_three_stations() {
  let mk = |id: &str, ts: &str| {
    station(
      id,
      vec![line(ts, "C", "Cloud", "MQTT broker unreachable")],
      &[],
    )
  };
  let report = analyze_fleet(
    &Config::default(),
    &[
      mk("A", "2026-02-18 09:00:00.000"),
      mk("B", "2026-02-18 09:02:00.000"),
      mk("C", "2026-02-18 09:04:30.000"),
    ],
  )
  .unwrap();
  assert_eq!(report.correlated_incidents.len(), 1);
  let inc = &report.correlated_incidents[0];
  assert_eq!(inc.entity_ids, vec!["A", "B", "C"]);
  assert_eq!(inc.count, 3);
  assert_eq!(inc.source, "Cloud");
  assert!(inc.message_snippet.contains("MQTT broker unreachable"));
}

#[test]
fn fleet_correlation_respects_window_edge() {
  let mk = |id: &str, ts: &str| {
    station(
      id,
      vec![line(ts, "C", "Cloud", "MQTT broker unreachable")],
      &[],
    )
  };
  let report = analyze_fleet(
    &Config::default(),
    &[
      mk("A", "2026-02-18 09:00:00.000"),
      mk("B", "2026-02-18 09:02:00.000"),
      mk("C", "2026-02-18 09:10:00.000"),
    ],
  )
  .unwrap();
  // C is outside A's window; it must not be merged into A's incident.
  assert!(report
    .correlated_incidents
    .iter()
    .all(|i| !i.entity_ids.contains(&"C".to_string()) || i.entity_ids != vec!["A", "B", "C"]));
  let ab = report
    .correlated_incidents
    .iter()
    .find(|i| i.entity_ids == vec!["A", "B"])
    .expect("A and B correlate");
  assert_eq!(ab.count, 2);
}
