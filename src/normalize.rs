//! Message normalization and timestamp parsing/recovery.
//!
//! `normalize_message` produces the key used for dedup comparison only; the
//! displayed message is never rewritten by it. Volatile fragments (long digit
//! runs, hex literals, base64/JWT-shaped tokens) are replaced with placeholders
//! so that repeated occurrences of the same condition compare equal.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

fn token_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  // JWT-shaped (header.payload[.sig]) or long base64-ish runs.
  RE.get_or_init(|| {
    Regex::new(r"\beyJ[A-Za-z0-9_-]{8,}(?:\.[A-Za-z0-9_-]{4,}){1,2}\b|\b[A-Za-z0-9+/_-]{24,}={0,2}\b")
      .unwrap()
  })
}

fn hex_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\b0[xX][0-9a-fA-F]+\b|\b[0-9a-fA-F]{8,}\b").unwrap())
}

fn digits_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\d{3,}").unwrap())
}

fn whitespace_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn embedded_ts_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?").unwrap()
  })
}

fn bracket_tag_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^\[([A-Za-z0-9_.:-]+)\]\s*").unwrap())
}

fn level_prefix_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"(?i)^(?:CRITICAL|ERROR|WARNING|WARN|NOTICE|INFO|DEBUG)\s*[:\-]\s*").unwrap()
  })
}

/// Reduce a message to its dedup key form.
pub fn normalize_message(message: &str) -> String {
  // Long alphanumeric runs without any digit are usually identifiers, not
  // encoded tokens; leave those alone.
  let s = token_re().replace_all(message, |caps: &regex::Captures| {
    let m = &caps[0];
    if m.starts_with("eyJ") || m.chars().any(|c| c.is_ascii_digit()) {
      "<TOKEN>".to_string()
    } else {
      m.to_string()
    }
  });
  let s = hex_re().replace_all(&s, "<HEX>");
  let s = digits_re().replace_all(&s, "<NUM>");
  let s = whitespace_re().replace_all(&s, " ");
  s.trim().to_string()
}

/// Parse a source-format timestamp (`YYYY-MM-DD HH:MM:SS[.fff]`, space or
/// `T` separated).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
  let t = text.trim();
  NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%.f"))
    .ok()
}

/// A sentinel/zero timestamp carries no information and must be recovered
/// from the message body instead.
pub fn is_sentinel_timestamp(text: &str) -> bool {
  let t = text.trim();
  t.is_empty() || t.starts_with("0000-00-00") || t.starts_with("0000-") || t == "-"
}

/// Scan a message for an embedded ISO-like date-time. On success returns the
/// parsed time and the message with the matched substring removed.
pub fn recover_timestamp(message: &str) -> Option<(NaiveDateTime, String)> {
  let m = embedded_ts_re().find(message)?;
  let ts = parse_timestamp(m.as_str())?;
  let mut cleaned = String::with_capacity(message.len());
  cleaned.push_str(&message[..m.start()]);
  cleaned.push_str(&message[m.end()..]);
  let cleaned = whitespace_re().replace_all(cleaned.trim(), " ").to_string();
  Some((ts, cleaned))
}

/// Generic placeholder component names that carry no information.
pub fn is_placeholder_component(component: &str) -> bool {
  let c = component.trim();
  c.is_empty()
    || c == "-"
    || c == "?"
    || c.eq_ignore_ascii_case("unknown")
    || c.eq_ignore_ascii_case("generic")
}

/// Recover a real component name from a leading `[tag]` when the supplied
/// component is a placeholder, and strip redundant level/component prefixes
/// from the message. Returns `(component, message)`.
pub fn repair_component(component: &str, message: &str) -> (String, String) {
  let mut component = component.trim().to_string();
  let mut message = message.trim().to_string();

  if is_placeholder_component(&component) {
    if let Some(caps) = bracket_tag_re().captures(&message) {
      component = caps[1].to_string();
      message = message[caps.get(0).unwrap().end()..].trim_start().to_string();
    }
  }

  // Strip a leading level tag ("ERROR: ...") left over from the raw line.
  if let Some(m) = level_prefix_re().find(&message) {
    message = message[m.end()..].to_string();
  }

  // Strip a now-redundant "[component]" or "component:" echo of the name.
  if !is_placeholder_component(&component) {
    let bracketed = format!("[{}]", component);
    if let Some(rest) = message.strip_prefix(&bracketed) {
      message = rest.trim_start().to_string();
    } else {
      let prefixed = format!("{}:", component);
      if let Some(head) = message.get(..prefixed.len()) {
        if head.eq_ignore_ascii_case(&prefixed) {
          message = message[prefixed.len()..].trim_start().to_string();
        }
      }
    }
  }

  (component, message)
}
