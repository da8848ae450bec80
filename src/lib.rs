//! Timeline & Causal-Inference Engine — deterministic, rule-based.
//!
//! Ingests pre-parsed diagnostic line tuples from EV-charging-station
//! subsystems, builds one chronologically ordered, deduplicated timeline per
//! station, detects silent gaps, infers CAUSE/EFFECT/ROOT causal chains from
//! detector counters with temporal-precedence validation, and correlates
//! significant events across stations in fleet mode.
//!
//! No DB, no network; pure computation + in-memory state.

pub mod config;
pub mod correlate;
pub mod error;
pub mod fleet;
pub mod gaps;
pub mod metrics;
pub mod normalize;
pub mod rules;
pub mod timeline;
pub mod types;

pub use config::Config;
pub use error::EngineError;
pub use fleet::{analyze_fleet, analyze_station, StationInput};
pub use metrics::MetricStore;
pub use rules::RuleEngine;
pub use types::{CausalChain, CorrelatedIncident, Event, FleetReport, GapRecord, InboundLine, Severity, Timeline};
