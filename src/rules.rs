//! Rule-based causal-chain inference with temporal-precedence validation.
//!
//! One declarative table of diagnostic rules, evaluated uniformly by a single
//! engine loop against an immutable snapshot of detector counters and the
//! built timeline. Temporal preconditions are descriptive annotations, not
//! gates: a satisfied trigger always emits its chain, and a confirmed
//! precedence only adds a note to the narrative.

use regex::Regex;
use tracing::warn;

use crate::error::EngineError;
use crate::metrics::MetricStore;
use crate::types::{CausalChain, ChainStep, Severity, StepKind, Timeline};

/// One diagnostic rule: a trigger over detector counters, optional temporal
/// preconditions `(cause_pattern, effect_pattern)` checked against the
/// timeline, and a step template interpolating counters.
pub struct Rule {
  pub name: &'static str,
  pub severity: Severity,
  pub trigger: fn(&MetricStore) -> Result<bool, EngineError>,
  pub preconditions: &'static [(&'static str, &'static str)],
  pub steps: fn(&MetricStore) -> Result<Vec<ChainStep>, EngineError>,
}

/// Outcome of one temporal-precedence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
  /// Timeline empty or either pattern unmatched: never blocks, never confirms.
  Vacuous,
  /// First occurrence of the cause pattern is no later than the effect's.
  Confirmed { gap_minutes: i64 },
  Contradicted,
}

/// Index of the first event (chronological order) whose message matches.
fn first_match(timeline: &Timeline, pattern: &Regex) -> Option<usize> {
  timeline
    .events
    .iter()
    .position(|e| pattern.is_match(&e.message))
}

/// Check "first occurrence of A is no later than first occurrence of B".
pub fn check_precedence(timeline: &Timeline, cause: &Regex, effect: &Regex) -> Precedence {
  let (Some(ia), Some(ib)) = (first_match(timeline, cause), first_match(timeline, effect))
  else {
    return Precedence::Vacuous;
  };
  if ia <= ib {
    let gap = (timeline.events[ib].timestamp - timeline.events[ia].timestamp).num_seconds() / 60;
    Precedence::Confirmed {
      gap_minutes: gap.max(0),
    }
  } else {
    Precedence::Contradicted
  }
}

/// Result of evaluating the full rule table once.
#[derive(Debug, Default)]
pub struct Evaluation {
  pub chains: Vec<CausalChain>,
  /// Rules whose trigger or template failed; skipped, never fatal.
  pub skipped_rules: u64,
}

/// The rule engine with its patterns compiled once.
pub struct RuleEngine {
  rules: Vec<CompiledRule>,
}

struct CompiledRule {
  def: &'static Rule,
  patterns: Vec<(Regex, Regex)>,
}

impl RuleEngine {
  pub fn new() -> Result<Self, EngineError> {
    let rules = RULES
      .iter()
      .map(|def| {
        let patterns = def
          .preconditions
          .iter()
          .map(|(a, b)| Ok((Regex::new(a)?, Regex::new(b)?)))
          .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(CompiledRule { def, patterns })
      })
      .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(Self { rules })
  }

  /// Evaluate every rule against the counter snapshot and timeline. Each rule
  /// fires at most once; a failing rule is skipped and counted.
  pub fn evaluate(&self, metrics: &MetricStore, timeline: &Timeline) -> Evaluation {
    let mut eval = Evaluation::default();

    for rule in &self.rules {
      let fired = match (rule.def.trigger)(metrics) {
        Ok(f) => f,
        Err(e) => {
          let err = EngineError::rule(rule.def.name, e.to_string());
          warn!(error = %err, "trigger failed, rule skipped");
          eval.skipped_rules += 1;
          continue;
        }
      };
      if !fired {
        continue;
      }

      let steps = match (rule.def.steps)(metrics) {
        Ok(s) => s,
        Err(e) => {
          let err = EngineError::rule(rule.def.name, e.to_string());
          warn!(error = %err, "template failed, rule skipped");
          eval.skipped_rules += 1;
          continue;
        }
      };

      eval.chains.push(CausalChain {
        name: rule.def.name.to_string(),
        severity: rule.def.severity,
        steps,
        temporal_note: temporal_note(timeline, &rule.patterns),
      });
    }

    eval
  }
}

/// A confirmation note is attached only when at least one precondition is
/// positively confirmed and none is contradicted.
fn temporal_note(timeline: &Timeline, patterns: &[(Regex, Regex)]) -> Option<String> {
  let mut confirmed_gap: Option<i64> = None;
  for (cause, effect) in patterns {
    match check_precedence(timeline, cause, effect) {
      Precedence::Confirmed { gap_minutes } => {
        confirmed_gap.get_or_insert(gap_minutes);
      }
      Precedence::Contradicted => return None,
      Precedence::Vacuous => {}
    }
  }
  confirmed_gap
    .map(|gap| format!("temporal order confirmed: cause observed {} min before effect", gap))
}

fn step(kind: StepKind, text: impl Into<String>) -> ChainStep {
  ChainStep::new(kind, text)
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

fn trigger_network_cloud(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get("ppp_status") == "down" && m.get_int("mqtt_fail_count")? > 0)
}

fn steps_network_cloud(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let fails = m.get_int("mqtt_fail_count")?;
  Ok(vec![
    step(StepKind::Cause, "PPP link to the carrier went down (ppp_status=down)"),
    step(
      StepKind::Effect,
      format!("Cloud connectivity degraded: MQTT publish attempts logged {} failures", fails),
    ),
    step(StepKind::Root, "Loss of WAN connectivity cascaded into cloud-backend failures"),
  ])
}

fn trigger_ocpp_flapping(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get_int("ocpp_disconnect_count")? > 5 && m.get_int("stuck_tx_count")? > 0)
}

fn steps_ocpp_flapping(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let drops = m.get_int("ocpp_disconnect_count")?;
  let stuck = m.get_int("stuck_tx_count")?;
  Ok(vec![
    step(StepKind::Cause, format!("OCPP WebSocket dropped {} times", drops)),
    step(
      StepKind::Effect,
      format!("{} charging transactions stuck awaiting central-system confirmation", stuck),
    ),
    step(StepKind::Root, "Unstable OCPP link left transactions without server acknowledgement"),
  ])
}

fn trigger_overtemp(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get_int("overtemp_count")? > 0 && m.get_int("derate_count")? > 0)
}

fn steps_overtemp(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let warns = m.get_int("overtemp_count")?;
  let derates = m.get_int("derate_count")?;
  Ok(vec![
    step(StepKind::Cause, format!("Power stage reported {} over-temperature warnings", warns)),
    step(StepKind::Effect, format!("Output current was derated {} times to shed heat", derates)),
    step(StepKind::Root, "Thermal stress in the power electronics forced derating"),
  ])
}

fn trigger_brownout(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get_int("undervoltage_count")? > 0 && m.get_int("reboot_count")? >= 2)
}

fn steps_brownout(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let sags = m.get_int("undervoltage_count")?;
  let reboots = m.get_int("reboot_count")?;
  Ok(vec![
    step(StepKind::Cause, format!("{} undervoltage events on the supply input", sags)),
    step(StepKind::Effect, format!("Controller rebooted {} times", reboots)),
    step(StepKind::Root, "Unstable mains supply is power-cycling the controller"),
  ])
}

fn trigger_meter_loss(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get_int("meter_timeout_count")? > 3)
}

fn steps_meter_loss(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let timeouts = m.get_int("meter_timeout_count")?;
  Ok(vec![
    step(
      StepKind::Cause,
      format!("Legal meter stopped answering ({} consecutive timeouts)", timeouts),
    ),
    step(StepKind::Effect, "Signed meter values are missing for the affected period"),
    step(StepKind::Root, "Metering bus link failure opened a billing data gap"),
  ])
}

fn trigger_cert_expired(m: &MetricStore) -> Result<bool, EngineError> {
  Ok(m.get_int("cert_expired")? == 1 && m.get_int("tls_fail_count")? > 0)
}

fn steps_cert_expired(m: &MetricStore) -> Result<Vec<ChainStep>, EngineError> {
  let fails = m.get_int("tls_fail_count")?;
  Ok(vec![
    step(StepKind::Cause, "Client certificate validity period has ended"),
    step(StepKind::Effect, format!("{} TLS handshakes were rejected by the backend", fails)),
    step(StepKind::Root, "Expired credential material is blocking secure backend sessions"),
  ])
}

static RULES: &[Rule] = &[
  Rule {
    name: "Network→Cloud Cascade",
    severity: Severity::High,
    trigger: trigger_network_cloud,
    preconditions: &[(
      r"(?i)ppp.*(down|disconnect|terminat)",
      r"(?i)mqtt.*(fail|refus|unreachable|timeout)",
    )],
    steps: steps_network_cloud,
  },
  Rule {
    name: "OCPP Flapping→Stuck Transactions",
    severity: Severity::High,
    trigger: trigger_ocpp_flapping,
    preconditions: &[(
      r"(?i)websocket.*(clos|disconnect|fail)",
      r"(?i)transaction.*(stuck|timeout|pending)",
    )],
    steps: steps_ocpp_flapping,
  },
  Rule {
    name: "Overtemperature→Power Derating",
    severity: Severity::Medium,
    trigger: trigger_overtemp,
    preconditions: &[(
      r"(?i)over.?temp|temperature.*(high|warn|exceed)",
      r"(?i)derat",
    )],
    steps: steps_overtemp,
  },
  Rule {
    name: "Supply Brownout→Reboot Loop",
    severity: Severity::Critical,
    trigger: trigger_brownout,
    preconditions: &[(
      r"(?i)under.?voltage|brown.?out",
      r"(?i)watchdog|reboot|reset",
    )],
    steps: steps_brownout,
  },
  Rule {
    name: "Meter Link Loss→Billing Gap",
    severity: Severity::High,
    trigger: trigger_meter_loss,
    preconditions: &[],
    steps: steps_meter_loss,
  },
  Rule {
    name: "Expired Certificate→TLS Failures",
    severity: Severity::High,
    trigger: trigger_cert_expired,
    preconditions: &[(
      r"(?i)certificat.*expir",
      r"(?i)tls.*(handshake|alert|fail)",
    )],
    steps: steps_cert_expired,
  },
];
