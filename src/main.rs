//! Binary entrypoint: read JSON lines from stdin, write one report JSON to stdout.
//!
//! Each input line is a tagged record:
//! - `{"type":"line","station":"EVSE-01","timestamp":"...","level":"E","component":"OCPP","message":"..."}`
//! - `{"type":"metric","station":"EVSE-01","key":"mqtt_fail_count","value":"5"}`
//!
//! On EOF the collected stations are analyzed (fleet mode when two or more
//! appear) and the FleetReport is written as a single JSON document. Invalid
//! input lines produce an ErrorOutput line and are otherwise skipped.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use serde::Deserialize;
use timeline_engine::types::ErrorOutput;
use timeline_engine::{analyze_fleet, Config, InboundLine, StationInput};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputRecord {
  Line {
    station: String,
    timestamp: String,
    level: String,
    component: String,
    message: String,
  },
  Metric {
    station: String,
    key: String,
    value: String,
  },
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  // BTreeMap keeps station output order deterministic.
  let mut stations: BTreeMap<String, StationInput> = BTreeMap::new();

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "timeline-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let record: InputRecord = match serde_json::from_str(trimmed) {
      Ok(r) => r,
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
        continue;
      }
    };

    match record {
      InputRecord::Line {
        station,
        timestamp,
        level,
        component,
        message,
      } => {
        stations
          .entry(station.clone())
          .or_insert_with(|| StationInput {
            station_id: station,
            lines: Vec::new(),
            counters: Default::default(),
          })
          .lines
          .push(InboundLine {
            timestamp,
            level,
            component,
            message,
          });
      }
      InputRecord::Metric { station, key, value } => {
        stations
          .entry(station.clone())
          .or_insert_with(|| StationInput {
            station_id: station,
            lines: Vec::new(),
            counters: Default::default(),
          })
          .counters
          .insert(key, value);
      }
    }
  }

  let inputs: Vec<StationInput> = stations.into_values().collect();
  match analyze_fleet(&Config::default(), &inputs) {
    Ok(report) => {
      let _ = serde_json::to_writer(&mut out, &report);
      let _ = writeln!(out);
    }
    Err(e) => {
      let err = ErrorOutput::new(e.to_string());
      let _ = serde_json::to_writer(&mut out, &err);
      let _ = writeln!(out);
    }
  }

  let _ = out.flush();
}
