#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One caller-supplied value. Form posts deliver everything as text, JSON
/// callers send numbers and booleans directly; the accessors below make the
/// two indistinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

/// An open, partially-populated field map from an untrusted caller. No field
/// is guaranteed present; an absent numeric field is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRequest(pub BTreeMap<String, RawValue>);

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number(&mut self, field: &str, value: f64) -> &mut Self {
        self.0.insert(field.to_string(), RawValue::Number(value));
        self
    }

    pub fn set_flag(&mut self, field: &str, value: bool) -> &mut Self {
        self.0.insert(field.to_string(), RawValue::Flag(value));
        self
    }

    pub fn set_text(&mut self, field: &str, value: &str) -> &mut Self {
        self.0
            .insert(field.to_string(), RawValue::Text(value.to_string()));
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Lenient numeric read. Numbers pass through when finite; text parses a
    /// leading float prefix the way the original front end did. Booleans and
    /// unparseable text read as absent, never as an error.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            RawValue::Number(v) if v.is_finite() => Some(*v),
            RawValue::Number(_) => None,
            RawValue::Text(s) => parse_float_prefix(s),
            RawValue::Flag(_) => None,
        }
    }

    /// Numeric read that treats zero and negatives as absent. Most length
    /// fields use this: a falsy value takes the generation default.
    pub fn positive_number(&self, field: &str) -> Option<f64> {
        self.number(field).filter(|v| *v > 0.0)
    }

    /// Integer read for enumerated codes (head profile selection).
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.0.get(field)? {
            RawValue::Number(v) if v.is_finite() => Some(v.trunc() as i64),
            RawValue::Number(_) => None,
            RawValue::Text(s) => parse_float_prefix(s).map(|v| v.trunc() as i64),
            RawValue::Flag(_) => None,
        }
    }

    /// Boolean gate read with the original's truthiness: `true`, `"true"`,
    /// `1`, `"1"` are set, everything else (including absence) is unset.
    pub fn flag(&self, field: &str) -> bool {
        match self.0.get(field) {
            Some(RawValue::Flag(b)) => *b,
            Some(RawValue::Number(v)) => *v == 1.0,
            Some(RawValue::Text(s)) => {
                let t = s.trim();
                t == "true" || t == "1"
            }
            None => false,
        }
    }

    /// Symbolic code read (tolerance class). Empty text reads as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.0.get(field)? {
            RawValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }
}

/// Longest-leading-float parse: `"12.5mm"` reads as 12.5, `"abc"` as absent.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let bytes = t.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'+' | b'-' if i == 0 => end = i + 1,
            b'0'..=b'9' => {
                seen_digit = true;
                end = i + 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    t[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
