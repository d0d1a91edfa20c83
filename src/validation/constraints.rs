//! Atomic constraint evaluation
//!
//! Evaluates one constraint against a value that already passed the type
//! check. A kind applied to a data type it does not cover is a no-op.
//! Elements of multi-valued fields are checked one by one and their errors
//! carry the element index.
//!
//! `minValue`/`maxValue` are overloaded by the wire protocol: on a
//! multi-valued field they bound the item count, on a single NUMBER they bound
//! the value. The branch is taken on (data type, multiplicity) before the
//! bound is applied.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde_json::Value as Json;
use tracing::{trace, warn};

use super::custom::{CustomConstraintRegistry, FieldContext};
use super::errors::ValidationError;
use crate::model::{
    format_number, parse_date, Bound, ConstraintDescriptor, ConstraintKind, DataType, FieldSpec,
    Value,
};

/// Relative tolerance for step checks on floating point values
const STEP_EPSILON: f64 = 1e-9;

/// Evaluates `constraint` against `value` and returns its violations.
pub fn evaluate(
    spec: &FieldSpec,
    constraint: &ConstraintDescriptor,
    value: &Value,
    customs: &CustomConstraintRegistry,
) -> Vec<ValidationError> {
    let ctx = Check {
        spec,
        constraint,
        value,
    };

    match &constraint.kind {
        ConstraintKind::Pattern { regex, flags } => ctx.pattern(regex, flags.as_deref()),
        ConstraintKind::MinLength(n) => {
            ctx.length(|len| len >= *n, || format!("Minimum {} characters", n))
        }
        ConstraintKind::MaxLength(n) => {
            ctx.length(|len| len <= *n, || format!("Maximum {} characters", n))
        }
        ConstraintKind::MinValue(n) => ctx.value_bound(*n, true),
        ConstraintKind::MaxValue(n) => ctx.value_bound(*n, false),
        ConstraintKind::MinDate(iso) => ctx.date_bound(iso, true),
        ConstraintKind::MaxDate(iso) => ctx.date_bound(iso, false),
        ConstraintKind::Range { min, max, step } => ctx.range(min.as_ref(), max.as_ref(), *step),
        ConstraintKind::Custom { params } => ctx.custom(params, customs),
        ConstraintKind::Ignored { kind, .. } => {
            trace!(constraint = %constraint.name, kind = %kind, "skipping unknown constraint kind");
            Vec::new()
        }
        ConstraintKind::Malformed { kind, reason, .. } => {
            warn!(constraint = %constraint.name, kind = %kind, reason = %reason, "malformed constraint");
            vec![ctx.malformed(format!("Malformed constraint parameters: {}", reason))]
        }
    }
}

/// Compiles a pattern for a full-string match with the given flags.
pub fn compile_pattern(regex: &str, flags: Option<&str>) -> Result<Regex, regex::Error> {
    let mut builder = RegexBuilder::new(&format!("^(?:{})$", regex));
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => &mut builder,
        };
    }
    builder.build()
}

/// One constraint applied to one value
struct Check<'a> {
    spec: &'a FieldSpec,
    constraint: &'a ConstraintDescriptor,
    value: &'a Value,
}

impl<'a> Check<'a> {
    /// Elements to check, with their index on multi-valued fields
    fn elements(&self) -> Vec<(Option<usize>, &'a Value)> {
        match (self.spec.expect_multiple_values, self.value) {
            (true, Value::List(items)) => items.iter().enumerate().map(|(i, v)| (Some(i), v)).collect(),
            _ => vec![(None, self.value)],
        }
    }

    /// Violation with the default message unless the constraint overrides it
    fn violation(&self, default: String, value: &Value, index: Option<usize>) -> ValidationError {
        let message = self.constraint.error_message.clone().unwrap_or(default);
        ValidationError::constraint(&self.constraint.name, message, value.clone()).at(index)
    }

    /// Error for unusable parameters; never replaced by the override
    fn malformed(&self, message: String) -> ValidationError {
        ValidationError::constraint(&self.constraint.name, message, self.value.clone())
    }

    fn is(&self, data_type: DataType) -> bool {
        self.spec.data_type == data_type
    }

    fn pattern(&self, regex: &str, flags: Option<&str>) -> Vec<ValidationError> {
        if !self.is(DataType::String) {
            return Vec::new();
        }
        let compiled = match compile_pattern(regex, flags) {
            Ok(re) => re,
            Err(e) => {
                warn!(constraint = %self.constraint.name, pattern = %regex, "invalid regex pattern");
                return vec![self.malformed(format!("Invalid regex pattern: {}", e))];
            }
        };
        self.elements()
            .into_iter()
            .filter_map(|(i, v)| {
                let s = v.as_str()?;
                (!compiled.is_match(s)).then(|| self.violation("Invalid format".into(), v, i))
            })
            .collect()
    }

    fn length(&self, ok: impl Fn(usize) -> bool, message: impl Fn() -> String) -> Vec<ValidationError> {
        if !self.is(DataType::String) {
            return Vec::new();
        }
        self.elements()
            .into_iter()
            .filter_map(|(i, v)| {
                let len = v.as_str()?.chars().count();
                (!ok(len)).then(|| self.violation(message(), v, i))
            })
            .collect()
    }

    fn value_bound(&self, bound: f64, is_min: bool) -> Vec<ValidationError> {
        match (self.spec.data_type, self.spec.expect_multiple_values) {
            (_, true) => {
                let Some(count) = self.value.as_list().map(<[Value]>::len) else {
                    return Vec::new();
                };
                let count = count as f64;
                let (ok, unit) = if is_min {
                    (count >= bound, "Minimum")
                } else {
                    (count <= bound, "Maximum")
                };
                if ok {
                    Vec::new()
                } else {
                    let message = format!("{} {} items", unit, format_number(bound));
                    vec![self.violation(message, self.value, None)]
                }
            }
            (DataType::Number, false) => {
                let Some(n) = self.value.as_f64() else {
                    return Vec::new();
                };
                let (ok, unit) = if is_min {
                    (n >= bound, "Minimum")
                } else {
                    (n <= bound, "Maximum")
                };
                if ok {
                    Vec::new()
                } else {
                    let message = format!("{} value is {}", unit, format_number(bound));
                    vec![self.violation(message, self.value, None)]
                }
            }
            _ => Vec::new(),
        }
    }

    fn date_bound(&self, iso: &str, is_min: bool) -> Vec<ValidationError> {
        if !self.is(DataType::Date) {
            return Vec::new();
        }
        let Some(bound) = parse_date(iso) else {
            return vec![self.malformed(format!("Invalid date bound '{}'", iso))];
        };
        self.elements()
            .into_iter()
            .filter_map(|(i, v)| {
                let date = v.as_date()?;
                let ok = if is_min { date >= bound } else { date <= bound };
                (!ok).then(|| {
                    let message = if is_min {
                        format!("Date must be after {}", iso)
                    } else {
                        format!("Date must be before {}", iso)
                    };
                    self.violation(message, v, i)
                })
            })
            .collect()
    }

    fn range(&self, min: Option<&Bound>, max: Option<&Bound>, step: Option<f64>) -> Vec<ValidationError> {
        match self.spec.data_type {
            DataType::Number => self.numeric_range(min, max, step),
            DataType::Date => self.date_range(min, max),
            _ => Vec::new(),
        }
    }

    fn numeric_range(&self, min: Option<&Bound>, max: Option<&Bound>, step: Option<f64>) -> Vec<ValidationError> {
        let (min, max) = match (numeric_bound(min), numeric_bound(max)) {
            (Ok(min), Ok(max)) => (min, max),
            (Err(bad), _) | (_, Err(bad)) => {
                return vec![self.malformed(format!("Invalid range bound '{}'", bad))];
            }
        };

        self.elements()
            .into_iter()
            .filter_map(|(i, v)| {
                let n = v.as_f64()?;
                let message = if min.is_some_and(|m| n < m) {
                    format!("Must be ≥ {}", format_number(min.unwrap_or_default()))
                } else if max.is_some_and(|m| n > m) {
                    format!("Must be ≤ {}", format_number(max.unwrap_or_default()))
                } else if step.is_some_and(|s| !on_step(n, min.unwrap_or(0.0), s)) {
                    format!("Must be a multiple of {}", format_number(step.unwrap_or_default()))
                } else {
                    return None;
                };
                Some(self.violation(message, v, i))
            })
            .collect()
    }

    fn date_range(&self, min: Option<&Bound>, max: Option<&Bound>) -> Vec<ValidationError> {
        let (min_date, max_date) = match (date_bound(min), date_bound(max)) {
            (Ok(min), Ok(max)) => (min, max),
            (Err(bad), _) | (_, Err(bad)) => {
                return vec![self.malformed(format!("Invalid range bound '{}'", bad))];
            }
        };

        self.elements()
            .into_iter()
            .filter_map(|(i, v)| {
                let date = v.as_date()?;
                let message = match (min_date, max_date) {
                    (Some(m), _) if date < m => format!("Must be ≥ {}", m.format("%Y-%m-%d")),
                    (_, Some(m)) if date > m => format!("Must be ≤ {}", m.format("%Y-%m-%d")),
                    _ => return None,
                };
                Some(self.violation(message, v, i))
            })
            .collect()
    }

    fn custom(&self, params: &Json, customs: &CustomConstraintRegistry) -> Vec<ValidationError> {
        let Some(handler) = customs.get(&self.constraint.name) else {
            trace!(constraint = %self.constraint.name, "no custom handler registered");
            return Vec::new();
        };

        let mut errors = Vec::new();
        for (i, v) in self.elements() {
            let ctx = FieldContext::new(self.spec, i);
            let messages = handler.check(params, v, &ctx);
            if messages.is_empty() {
                continue;
            }
            match &self.constraint.error_message {
                Some(message) => errors.push(self.violation(message.clone(), v, i)),
                None => errors.extend(
                    messages
                        .into_iter()
                        .map(|m| ValidationError::constraint(&self.constraint.name, m, v.clone()).at(i)),
                ),
            }
        }
        errors
    }
}

/// Reads a range bound for a NUMBER field; numeric strings are accepted.
fn numeric_bound(bound: Option<&Bound>) -> Result<Option<f64>, String> {
    match bound {
        None => Ok(None),
        Some(Bound::Number(n)) => Ok(Some(*n)),
        Some(Bound::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| s.clone()),
    }
}

/// Reads a range bound for a DATE field.
fn date_bound(bound: Option<&Bound>) -> Result<Option<NaiveDate>, String> {
    match bound {
        None => Ok(None),
        Some(Bound::Text(s)) => parse_date(s).map(Some).ok_or_else(|| s.clone()),
        Some(Bound::Number(n)) => Err(format_number(*n)),
    }
}

/// Whether `n` sits on the grid `anchor + k * step`.
fn on_step(n: f64, anchor: f64, step: f64) -> bool {
    let steps = (n - anchor) / step;
    (steps - steps.round()).abs() <= STEP_EPSILON * steps.abs().max(1.0)
}
