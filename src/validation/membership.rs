//! Domain membership
//!
//! A CLOSED domain rejects values that are not loosely equal to any member.
//! Remote domains are never fetched here: the validator asks an injected
//! `DomainSnapshotSource` for whatever is already known, and skips the check
//! when nothing is.

use std::borrow::Cow;

use super::errors::ValidationError;
use crate::model::{parse_date, DomainSource, FieldSpec, Value, ValueAlias, ValuesEndpoint};

/// Synchronous view of remote domains that are already resolved
pub trait DomainSnapshotSource: Send + Sync {
    /// Returns the complete domain of `endpoint`, or `None` when it is not
    /// known in full.
    fn snapshot(&self, endpoint: &ValuesEndpoint) -> Option<Vec<ValueAlias>>;
}

/// Returns the domain to check against, if one is available.
pub fn resolve_domain<'a>(
    endpoint: &'a ValuesEndpoint,
    source: Option<&dyn DomainSnapshotSource>,
) -> Option<Cow<'a, [ValueAlias]>> {
    match endpoint.source() {
        DomainSource::Inline(items) => Some(Cow::Borrowed(items)),
        DomainSource::Remote(_) => source
            .and_then(|s| s.snapshot(endpoint))
            .map(Cow::Owned),
        DomainSource::Unresolvable => None,
    }
}

/// Membership errors for `value` against `domain`. Only CLOSED endpoints
/// produce errors; elements of multi-valued fields are checked and indexed
/// individually.
pub fn check_membership(
    spec: &FieldSpec,
    endpoint: &ValuesEndpoint,
    domain: &[ValueAlias],
    value: &Value,
) -> Vec<ValidationError> {
    if !endpoint.is_closed() {
        return Vec::new();
    }

    let contains = |v: &Value| domain.iter().any(|alias| loose_equals(&alias.value, v));

    match (spec.expect_multiple_values, value) {
        (true, Value::List(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !contains(item))
            .map(|(i, item)| ValidationError::membership(item.clone()).at(Some(i)))
            .collect(),
        _ if contains(value) => Vec::new(),
        _ => vec![ValidationError::membership(value.clone())],
    }
}

/// Compares values across the representations a domain may use.
///
/// Same variants compare by equality; a number matches a numeric string with
/// the same parsed value, a boolean matches `"true"`/`"false"` in any case,
/// and a date matches a string parsing to the same date. Symmetric.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_equals(l, r))
        }
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().is_ok_and(|parsed| parsed == *n)
        }
        (Value::Boolean(b), Value::String(s)) | (Value::String(s), Value::Boolean(b)) => {
            s.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        (Value::Date(d), Value::String(s)) | (Value::String(s), Value::Date(d)) => {
            parse_date(s).is_some_and(|parsed| parsed == *d)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DomainMode;
    use chrono::NaiveDate;

    struct FixedSource(Vec<ValueAlias>);

    impl DomainSnapshotSource for FixedSource {
        fn snapshot(&self, _: &ValuesEndpoint) -> Option<Vec<ValueAlias>> {
            Some(self.0.clone())
        }
    }

    // ==================== Loose Equality Tests ====================

    #[test]
    fn test_loose_equals_numbers() {
        assert!(loose_equals(&Value::from(42), &Value::from("42")));
        assert!(loose_equals(&Value::from("42.0"), &Value::from(42)));
        assert!(!loose_equals(&Value::from(42), &Value::from("43")));
        assert!(!loose_equals(&Value::from(42), &Value::from("forty-two")));
    }

    #[test]
    fn test_loose_equals_booleans() {
        assert!(loose_equals(&Value::from(true), &Value::from("TRUE")));
        assert!(loose_equals(&Value::from("false"), &Value::from(false)));
        assert!(!loose_equals(&Value::from(true), &Value::from("1")));
    }

    #[test]
    fn test_loose_equals_dates() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(loose_equals(&d, &Value::from("2024-05-01")));
        assert!(loose_equals(&Value::from("2024-05-01T08:00:00Z"), &d));
        assert!(!loose_equals(&d, &Value::from("2024-05-02")));
    }

    #[test]
    fn test_loose_equals_strings_are_exact() {
        assert!(loose_equals(&Value::from("ON"), &Value::from("ON")));
        assert!(!loose_equals(&Value::from("ON"), &Value::from("on")));
    }

    // ==================== Membership Tests ====================

    #[test]
    fn test_closed_inline_membership() {
        let endpoint = ValuesEndpoint::inline_values(["ON", "OFF"]);
        let spec = FieldSpec::string("Switch").with_endpoint(endpoint.clone());
        let domain = resolve_domain(&endpoint, None).unwrap();

        assert!(check_membership(&spec, &endpoint, &domain, &Value::from("ON")).is_empty());
        let errors = check_membership(&spec, &endpoint, &domain, &Value::from("MAYBE"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, None);
    }

    #[test]
    fn test_suggestions_never_error() {
        let endpoint = ValuesEndpoint::inline_values(["ON", "OFF"]).with_mode(DomainMode::Suggestions);
        let spec = FieldSpec::string("Switch");
        let domain = resolve_domain(&endpoint, None).unwrap();
        assert!(check_membership(&spec, &endpoint, &domain, &Value::from("MAYBE")).is_empty());
    }

    #[test]
    fn test_multi_valued_membership_indexed() {
        let endpoint = ValuesEndpoint::inline_values(["A", "B"]);
        let spec = FieldSpec::string("Tags").multiple();
        let domain = resolve_domain(&endpoint, None).unwrap();
        let errors = check_membership(&spec, &endpoint, &domain, &Value::from(vec!["A", "X", "B", "Y"]));
        let indices: Vec<_> = errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_remote_domain_needs_snapshot() {
        let endpoint = ValuesEndpoint::remote("/api/countries");
        assert!(resolve_domain(&endpoint, None).is_none());

        let source = FixedSource(vec![ValueAlias::new("FR", "France")]);
        let domain = resolve_domain(&endpoint, Some(&source)).unwrap();
        assert_eq!(domain.len(), 1);
    }
}
