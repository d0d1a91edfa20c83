//! Constraint descriptors.
//!
//! On the wire a constraint is `{name, type, params, errorMessage?, description?}`
//! where `params` is a kind-specific JSON subtree. In memory the kind and its
//! params are folded into one closed [`ConstraintKind`] so evaluation handles
//! every kind exhaustively. Parsing never fails: unknown kinds become
//! [`ConstraintKind::Ignored`] and unreadable params become
//! [`ConstraintKind::Malformed`], which evaluation reports as a single error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

/// Wire names of the known constraint kinds
pub const PATTERN: &str = "pattern";
pub const MIN_LENGTH: &str = "minLength";
pub const MAX_LENGTH: &str = "maxLength";
pub const MIN_VALUE: &str = "minValue";
pub const MAX_VALUE: &str = "maxValue";
pub const MIN_DATE: &str = "minDate";
pub const MAX_DATE: &str = "maxDate";
pub const RANGE: &str = "range";
pub const CUSTOM: &str = "custom";

/// A range bound; numeric for NUMBER fields, a date string for DATE fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Number(f64),
    Text(String),
}

impl Bound {
    fn to_json(&self) -> Json {
        match self {
            Bound::Number(n) => json!(n),
            Bound::Text(s) => json!(s),
        }
    }
}

/// The closed set of constraint kinds with their parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Regular expression the whole string must match
    Pattern {
        regex: String,
        flags: Option<String>,
    },
    /// Minimum character count
    MinLength(usize),
    /// Maximum character count
    MaxLength(usize),
    /// Minimum numeric value, or minimum item count on multi-valued fields
    MinValue(f64),
    /// Maximum numeric value, or maximum item count on multi-valued fields
    MaxValue(f64),
    /// Earliest allowed date (inclusive), kept as written
    MinDate(String),
    /// Latest allowed date (inclusive), kept as written
    MaxDate(String),
    /// Inclusive bounds with optional step
    Range {
        min: Option<Bound>,
        max: Option<Bound>,
        step: Option<f64>,
    },
    /// Delegated to a handler registered under the constraint name
    Custom { params: Json },
    /// Unknown kind, evaluated as a no-op
    Ignored { kind: String, params: Json },
    /// Known kind whose params could not be read
    Malformed {
        kind: String,
        params: Json,
        reason: String,
    },
}

impl ConstraintKind {
    /// Builds a kind from its wire name and params. Wire names are matched
    /// case-insensitively.
    pub fn from_wire(kind: &str, params: &Json) -> Self {
        let known = [
            PATTERN, MIN_LENGTH, MAX_LENGTH, MIN_VALUE, MAX_VALUE, MIN_DATE, MAX_DATE, RANGE,
            CUSTOM,
        ]
        .into_iter()
        .find(|k| k.eq_ignore_ascii_case(kind));

        let Some(wire) = known else {
            return ConstraintKind::Ignored {
                kind: kind.to_string(),
                params: params.clone(),
            };
        };

        let parsed = match wire {
            PATTERN => parse_pattern(params),
            MIN_LENGTH => parse_count(params).map(ConstraintKind::MinLength),
            MAX_LENGTH => parse_count(params).map(ConstraintKind::MaxLength),
            MIN_VALUE => parse_number(params).map(ConstraintKind::MinValue),
            MAX_VALUE => parse_number(params).map(ConstraintKind::MaxValue),
            MIN_DATE => parse_date_param(params).map(ConstraintKind::MinDate),
            MAX_DATE => parse_date_param(params).map(ConstraintKind::MaxDate),
            RANGE => parse_range(params),
            _ => Ok(ConstraintKind::Custom {
                params: params.clone(),
            }),
        };

        parsed.unwrap_or_else(|reason| ConstraintKind::Malformed {
            kind: wire.to_string(),
            params: params.clone(),
            reason,
        })
    }

    /// Returns the wire name of this kind
    pub fn wire_name(&self) -> &str {
        match self {
            ConstraintKind::Pattern { .. } => PATTERN,
            ConstraintKind::MinLength(_) => MIN_LENGTH,
            ConstraintKind::MaxLength(_) => MAX_LENGTH,
            ConstraintKind::MinValue(_) => MIN_VALUE,
            ConstraintKind::MaxValue(_) => MAX_VALUE,
            ConstraintKind::MinDate(_) => MIN_DATE,
            ConstraintKind::MaxDate(_) => MAX_DATE,
            ConstraintKind::Range { .. } => RANGE,
            ConstraintKind::Custom { .. } => CUSTOM,
            ConstraintKind::Ignored { kind, .. } => kind,
            ConstraintKind::Malformed { kind, .. } => kind,
        }
    }

    /// Returns the params in wire form
    pub fn to_params(&self) -> Json {
        match self {
            ConstraintKind::Pattern { regex, flags } => {
                let mut obj = Map::new();
                obj.insert("regex".into(), json!(regex));
                if let Some(flags) = flags {
                    obj.insert("flags".into(), json!(flags));
                }
                Json::Object(obj)
            }
            ConstraintKind::MinLength(n) | ConstraintKind::MaxLength(n) => json!({ "value": n }),
            ConstraintKind::MinValue(n) | ConstraintKind::MaxValue(n) => json!({ "value": n }),
            ConstraintKind::MinDate(s) | ConstraintKind::MaxDate(s) => json!({ "iso": s }),
            ConstraintKind::Range { min, max, step } => {
                let mut obj = Map::new();
                if let Some(min) = min {
                    obj.insert("min".into(), min.to_json());
                }
                if let Some(max) = max {
                    obj.insert("max".into(), max.to_json());
                }
                if let Some(step) = step {
                    obj.insert("step".into(), json!(step));
                }
                Json::Object(obj)
            }
            ConstraintKind::Custom { params }
            | ConstraintKind::Ignored { params, .. }
            | ConstraintKind::Malformed { params, .. } => params.clone(),
        }
    }
}

/// Looks up the first present key of an object, or takes a bare scalar.
fn scalar_param<'a>(params: &'a Json, keys: &[&str]) -> Option<&'a Json> {
    match params {
        Json::Object(obj) => keys.iter().find_map(|k| obj.get(*k)),
        Json::Null | Json::Array(_) => None,
        scalar => Some(scalar),
    }
}

fn parse_pattern(params: &Json) -> Result<ConstraintKind, String> {
    let regex = scalar_param(params, &["regex", "pattern", "value"])
        .and_then(Json::as_str)
        .ok_or_else(|| "expected a 'regex' string".to_string())?;
    let flags = params
        .get("flags")
        .and_then(Json::as_str)
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    Ok(ConstraintKind::Pattern {
        regex: regex.to_string(),
        flags,
    })
}

fn parse_count(params: &Json) -> Result<usize, String> {
    let n = scalar_param(params, &["value"])
        .and_then(Json::as_f64)
        .ok_or_else(|| "expected a numeric 'value'".to_string())?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("expected a non-negative integer, got {}", n));
    }
    Ok(n as usize)
}

fn parse_number(params: &Json) -> Result<f64, String> {
    scalar_param(params, &["value"])
        .and_then(Json::as_f64)
        .filter(|n| n.is_finite())
        .ok_or_else(|| "expected a numeric 'value'".to_string())
}

fn parse_date_param(params: &Json) -> Result<String, String> {
    scalar_param(params, &["iso", "value", "date"])
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| "expected an 'iso' date string".to_string())
}

fn parse_bound(params: &Json, key: &str) -> Result<Option<Bound>, String> {
    match params.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => n
            .as_f64()
            .map(|n| Some(Bound::Number(n)))
            .ok_or_else(|| format!("'{}' is not a finite number", key)),
        Some(Json::String(s)) => Ok(Some(Bound::Text(s.clone()))),
        Some(other) => Err(format!("'{}' must be a number or a date string, got {}", key, other)),
    }
}

fn parse_range(params: &Json) -> Result<ConstraintKind, String> {
    if !params.is_object() {
        return Err("expected an object with 'min' and/or 'max'".into());
    }
    let min = parse_bound(params, "min")?;
    let max = parse_bound(params, "max")?;
    let step = match params.get("step") {
        None | Some(Json::Null) => None,
        Some(step) => match step.as_f64() {
            Some(s) if s > 0.0 && s.is_finite() => Some(s),
            _ => return Err(format!("'step' must be a positive number, got {}", step)),
        },
    };
    Ok(ConstraintKind::Range { min, max, step })
}

/// Wire representation of a constraint
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConstraint {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// A single named, typed validation rule of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConstraint", into = "RawConstraint")]
pub struct ConstraintDescriptor {
    /// Stable name, unique within the field; errors are attributed to it
    pub name: String,
    /// Kind and parameters
    pub kind: ConstraintKind,
    /// Replaces the default violation message
    pub error_message: Option<String>,
    /// Free-form documentation
    pub description: Option<String>,
}

impl From<RawConstraint> for ConstraintDescriptor {
    fn from(raw: RawConstraint) -> Self {
        Self {
            kind: ConstraintKind::from_wire(&raw.kind, &raw.params),
            name: raw.name,
            error_message: raw.error_message,
            description: raw.description,
        }
    }
}

impl From<ConstraintDescriptor> for RawConstraint {
    fn from(c: ConstraintDescriptor) -> Self {
        Self {
            kind: c.kind.wire_name().to_string(),
            params: c.kind.to_params(),
            name: c.name,
            error_message: c.error_message,
            description: c.description,
        }
    }
}

impl ConstraintDescriptor {
    /// Create a constraint of the given kind
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            error_message: None,
            description: None,
        }
    }

    /// Create a pattern constraint
    pub fn pattern(name: impl Into<String>, regex: impl Into<String>) -> Self {
        Self::new(
            name,
            ConstraintKind::Pattern {
                regex: regex.into(),
                flags: None,
            },
        )
    }

    /// Create a minimum length constraint
    pub fn min_length(name: impl Into<String>, n: usize) -> Self {
        Self::new(name, ConstraintKind::MinLength(n))
    }

    /// Create a maximum length constraint
    pub fn max_length(name: impl Into<String>, n: usize) -> Self {
        Self::new(name, ConstraintKind::MaxLength(n))
    }

    /// Create a minimum value constraint
    pub fn min_value(name: impl Into<String>, n: f64) -> Self {
        Self::new(name, ConstraintKind::MinValue(n))
    }

    /// Create a maximum value constraint
    pub fn max_value(name: impl Into<String>, n: f64) -> Self {
        Self::new(name, ConstraintKind::MaxValue(n))
    }

    /// Create a minimum date constraint
    pub fn min_date(name: impl Into<String>, iso: impl Into<String>) -> Self {
        Self::new(name, ConstraintKind::MinDate(iso.into()))
    }

    /// Create a maximum date constraint
    pub fn max_date(name: impl Into<String>, iso: impl Into<String>) -> Self {
        Self::new(name, ConstraintKind::MaxDate(iso.into()))
    }

    /// Create a numeric range constraint
    pub fn range(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(
            name,
            ConstraintKind::Range {
                min: min.map(Bound::Number),
                max: max.map(Bound::Number),
                step: None,
            },
        )
    }

    /// Create a custom constraint
    pub fn custom(name: impl Into<String>, params: Json) -> Self {
        Self::new(name, ConstraintKind::Custom { params })
    }

    /// Set the error message override
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Json) -> ConstraintDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_known_kinds() {
        let c = parse(json!({"name": "len", "type": "minLength", "params": {"value": 3}}));
        assert_eq!(c.kind, ConstraintKind::MinLength(3));

        let c = parse(json!({"name": "re", "type": "pattern", "params": {"regex": "^a+$", "flags": "i"}}));
        assert_eq!(
            c.kind,
            ConstraintKind::Pattern {
                regex: "^a+$".into(),
                flags: Some("i".into())
            }
        );

        let c = parse(json!({"name": "after", "type": "minDate", "params": {"iso": "2024-01-01T00:00:00Z"}}));
        assert_eq!(c.kind, ConstraintKind::MinDate("2024-01-01T00:00:00Z".into()));
    }

    #[test]
    fn test_parse_kind_case_insensitive() {
        let c = parse(json!({"name": "v", "type": "MAXVALUE", "params": {"value": 10}}));
        assert_eq!(c.kind, ConstraintKind::MaxValue(10.0));
    }

    #[test]
    fn test_parse_bare_scalar_params() {
        let c = parse(json!({"name": "v", "type": "maxLength", "params": 12}));
        assert_eq!(c.kind, ConstraintKind::MaxLength(12));
    }

    #[test]
    fn test_parse_range_with_step() {
        let c = parse(json!({"name": "r", "type": "range", "params": {"min": 0, "max": 10, "step": 2}}));
        assert_eq!(
            c.kind,
            ConstraintKind::Range {
                min: Some(Bound::Number(0.0)),
                max: Some(Bound::Number(10.0)),
                step: Some(2.0)
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let c = parse(json!({"name": "x", "type": "checksum", "params": {"algo": "luhn"}}));
        assert!(matches!(c.kind, ConstraintKind::Ignored { ref kind, .. } if kind == "checksum"));
    }

    #[test]
    fn test_bad_params_are_malformed() {
        let c = parse(json!({"name": "len", "type": "minLength", "params": {"value": "three"}}));
        assert!(matches!(c.kind, ConstraintKind::Malformed { ref kind, .. } if kind == MIN_LENGTH));

        let c = parse(json!({"name": "r", "type": "range", "params": {"min": 0, "step": -1}}));
        assert!(matches!(c.kind, ConstraintKind::Malformed { .. }));
    }

    #[test]
    fn test_serialize_keeps_wire_shape() {
        let c = ConstraintDescriptor::min_length("len", 5).with_error_message("Too short");
        let wire = serde_json::to_value(&c).unwrap();
        assert_eq!(
            wire,
            json!({"name": "len", "type": "minLength", "params": {"value": 5}, "errorMessage": "Too short"})
        );
    }

    #[test]
    fn test_ignored_kind_survives_serialization() {
        let original = json!({"name": "x", "type": "checksum", "params": {"algo": "luhn"}});
        let c = parse(original.clone());
        assert_eq!(serde_json::to_value(&c).unwrap(), original);
    }
}
