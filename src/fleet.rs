//! Per-station pipeline and parallel fleet runner.
//!
//! Each station runs its full pipeline (build timeline → detect gaps →
//! evaluate causal rules) as an isolated unit with no shared mutable state.
//! The cross-entity correlator is the fan-in barrier: it reads only completed
//! timelines.

use rayon::prelude::*;
use serde::Deserialize;

use crate::config::Config;
use crate::correlate::{self, EntityTimeline};
use crate::error::EngineError;
use crate::gaps;
use crate::metrics::MetricStore;
use crate::rules::RuleEngine;
use crate::timeline;
use crate::types::{
  CausalChain, EventOutput, FleetReport, GapRecord, InboundLine, StationReport, Timeline,
};

/// Everything one station contributes to an analysis run.
#[derive(Debug, Clone, Deserialize)]
pub struct StationInput {
  pub station_id: String,
  pub lines: Vec<InboundLine>,
  /// Detector-layer counters, key -> value.
  #[serde(default)]
  pub counters: std::collections::HashMap<String, String>,
}

/// Completed per-station analysis, kept until the fleet fan-in.
pub struct StationAnalysis {
  pub station_id: String,
  pub timeline: Timeline,
  pub gaps: Vec<GapRecord>,
  pub chains: Vec<CausalChain>,
  pub skipped_rules: u64,
}

/// Run the strict sequential pipeline for one station. Timeline construction
/// is a hard barrier before causal inference.
pub fn analyze_station(
  engine: &RuleEngine,
  config: &Config,
  input: &StationInput,
) -> StationAnalysis {
  let timeline = timeline::build_timeline(&input.lines);
  let gaps = gaps::detect_gaps(&timeline, config.gap_threshold_secs);

  let metrics: MetricStore = input
    .counters
    .iter()
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect();
  let eval = engine.evaluate(&metrics, &timeline);

  StationAnalysis {
    station_id: input.station_id.clone(),
    timeline,
    gaps,
    chains: eval.chains,
    skipped_rules: eval.skipped_rules,
  }
}

/// Analyze a set of stations and, when two or more are present, correlate
/// their timelines across the fleet.
pub fn analyze_fleet(config: &Config, stations: &[StationInput]) -> Result<FleetReport, EngineError> {
  let engine = RuleEngine::new()?;

  // Stations are independent; fan out, then fan in for correlation.
  let analyses: Vec<StationAnalysis> = stations
    .par_iter()
    .map(|input| analyze_station(&engine, config, input))
    .collect();

  let correlated_incidents = if analyses.len() >= 2 {
    let fleet: Vec<EntityTimeline<'_>> = analyses
      .iter()
      .map(|a| EntityTimeline {
        entity_id: &a.station_id,
        timeline: &a.timeline,
      })
      .collect();
    correlate::correlate(&fleet, config)
  } else {
    Vec::new()
  };

  let stations = analyses
    .iter()
    .map(|a| StationReport {
      station_id: a.station_id.clone(),
      timeline: a.timeline.events.iter().map(EventOutput::from).collect(),
      gaps: a.gaps.clone(),
      causal_chains: a.chains.clone(),
      dropped_lines: a.timeline.dropped_lines,
      skipped_rules: a.skipped_rules,
    })
    .collect();

  Ok(FleetReport {
    stations,
    correlated_incidents,
  })
}
