//! Best-effort coercion of raw input toward a field's declared type.
//!
//! Coercion works on a copy and never fails: anything it cannot convert is
//! passed through (trimmed, if configured) for the type check to judge.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use tracing::warn;

use super::options::CoercionOptions;
use crate::model::{DataType, Value};

/// Integer magnitudes at or above this are read as epoch milliseconds when
/// both epoch modes are enabled.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Coercion settings with the number pattern compiled
#[derive(Debug, Clone)]
pub struct Coercer {
    options: CoercionOptions,
    number_pattern: Option<Regex>,
}

impl Coercer {
    /// Compiles the options. An invalid number pattern disables numeric
    /// coercion.
    pub fn new(options: &CoercionOptions) -> Self {
        let number_pattern = if options.enabled {
            match Regex::new(&options.number_pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(
                        pattern = %options.number_pattern,
                        error = %e,
                        "invalid coercion number pattern, numeric coercion disabled"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            options: options.clone(),
            number_pattern,
        }
    }

    pub fn options(&self) -> &CoercionOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Returns a coerced copy of `value` for a field of `data_type`.
    pub fn coerce(&self, data_type: DataType, value: &Value) -> Value {
        if !self.options.enabled {
            return value.clone();
        }
        match value {
            Value::List(items) => {
                Value::List(items.iter().map(|v| self.coerce_scalar(data_type, v)).collect())
            }
            other => self.coerce_scalar(data_type, other),
        }
    }

    fn coerce_scalar(&self, data_type: DataType, value: &Value) -> Value {
        let Value::String(raw) = value else {
            return value.clone();
        };
        let text = if self.options.trim_strings {
            raw.trim()
        } else {
            raw.as_str()
        };

        let coerced = match data_type {
            DataType::String => None,
            DataType::Number => self.to_number(text),
            DataType::Boolean => self.to_boolean(text),
            DataType::Date => self.to_epoch_date(text),
        };
        coerced.unwrap_or_else(|| Value::String(text.to_string()))
    }

    fn to_number(&self, text: &str) -> Option<Value> {
        let pattern = self.number_pattern.as_ref()?;
        if !pattern.is_match(text) {
            return None;
        }
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
    }

    fn to_boolean(&self, text: &str) -> Option<Value> {
        let matches_any = |tokens: &[String]| tokens.iter().any(|t| t.eq_ignore_ascii_case(text));

        if text.eq_ignore_ascii_case("true") || matches_any(&self.options.extra_true_values) {
            return Some(Value::Boolean(true));
        }
        if text.eq_ignore_ascii_case("false") || matches_any(&self.options.extra_false_values) {
            return Some(Value::Boolean(false));
        }
        if self.options.numeric_booleans {
            match text {
                "1" => return Some(Value::Boolean(true)),
                "0" => return Some(Value::Boolean(false)),
                _ => {}
            }
        }
        None
    }

    fn to_epoch_date(&self, text: &str) -> Option<Value> {
        let seconds = self.options.epoch_seconds;
        let millis = self.options.epoch_millis;
        if !seconds && !millis {
            return None;
        }
        let n: i64 = text.parse().ok()?;
        let as_millis = match (seconds, millis) {
            (true, true) => n.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD as u64,
            (false, true) => true,
            _ => false,
        };
        epoch_to_date(n, as_millis).map(Value::Date)
    }
}

impl Default for Coercer {
    fn default() -> Self {
        Self::new(&CoercionOptions::default())
    }
}

fn epoch_to_date(n: i64, millis: bool) -> Option<NaiveDate> {
    let dt = if millis {
        DateTime::from_timestamp_millis(n)?
    } else {
        DateTime::from_timestamp(n, 0)?
    };
    Some(dt.date_naive())
}
