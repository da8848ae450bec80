//! Structured error types for the timeline engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("malformed line: {0}")]
  MalformedLine(String),

  #[error("metric '{key}': {reason}")]
  Metric { key: String, reason: String },

  #[error("rule '{rule}': {reason}")]
  RuleEvaluation { rule: String, reason: String },

  #[error("pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn malformed(msg: impl Into<String>) -> Self {
    Self::MalformedLine(msg.into())
  }

  pub fn metric(key: &str, reason: impl Into<String>) -> Self {
    Self::Metric {
      key: key.to_string(),
      reason: reason.into(),
    }
  }

  pub fn rule(rule: &str, reason: impl Into<String>) -> Self {
    Self::RuleEvaluation {
      rule: rule.to_string(),
      reason: reason.into(),
    }
  }
}
