//! In-memory counter store fed by the external detector layer.
//!
//! The causal-rule engine only ever reads from this store; ownership of the
//! values belongs to the detectors that produced them.

use std::collections::HashMap;

use crate::error::EngineError;

/// Flat key -> value store. Values arrive as strings; numeric reads parse on
/// demand. Absent keys read as empty string / zero.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
  values: HashMap<String, String>,
}

impl MetricStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.values.insert(key.into(), value.into());
  }

  /// String value, or "" when absent.
  pub fn get(&self, key: &str) -> &str {
    self.values.get(key).map(String::as_str).unwrap_or("")
  }

  /// Integer value, or 0 when absent. A present but non-numeric value is a
  /// rule-evaluation failure, not a silent zero.
  pub fn get_int(&self, key: &str) -> Result<i64, EngineError> {
    match self.values.get(key) {
      None => Ok(0),
      Some(v) => v
        .trim()
        .parse::<i64>()
        .map_err(|_| EngineError::metric(key, format!("non-numeric value {:?}", v))),
    }
  }
}

impl FromIterator<(String, String)> for MetricStore {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self {
      values: iter.into_iter().collect(),
    }
  }
}
