//! Custom constraint handlers
//!
//! A `custom` constraint delegates to a handler registered under the
//! constraint's name. A handler returns the violation messages for one value;
//! an empty list means the value passed. A custom constraint with no
//! registered handler is a no-op.

use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{DataType, FieldSpec, Value};

/// What a handler knows about the field being validated
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub display_name: &'a str,
    pub data_type: DataType,
    pub multiple: bool,
    /// Element index on multi-valued fields
    pub index: Option<usize>,
}

impl<'a> FieldContext<'a> {
    pub fn new(spec: &'a FieldSpec, index: Option<usize>) -> Self {
        Self {
            display_name: &spec.display_name,
            data_type: spec.data_type,
            multiple: spec.expect_multiple_values,
            index,
        }
    }
}

/// Validation logic for one custom constraint
pub trait CustomConstraintHandler: Send + Sync {
    fn check(&self, params: &Json, value: &Value, ctx: &FieldContext<'_>) -> Vec<String>;
}

impl<F> CustomConstraintHandler for F
where
    F: Fn(&Json, &Value, &FieldContext<'_>) -> Vec<String> + Send + Sync,
{
    fn check(&self, params: &Json, value: &Value, ctx: &FieldContext<'_>) -> Vec<String> {
        self(params, value, ctx)
    }
}

/// Handlers keyed by constraint name
#[derive(Clone, Default)]
pub struct CustomConstraintRegistry {
    handlers: HashMap<String, Arc<dyn CustomConstraintHandler>>,
}

impl CustomConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous one under `name`.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: CustomConstraintHandler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn with<H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: CustomConstraintHandler + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn CustomConstraintHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CustomConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("CustomConstraintRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn even(_: &Json, value: &Value, _: &FieldContext<'_>) -> Vec<String> {
        match value.as_f64() {
            Some(n) if n % 2.0 == 0.0 => vec![],
            _ => vec!["Must be even".to_string()],
        }
    }

    #[test]
    fn test_closure_handlers() {
        let registry = CustomConstraintRegistry::new()
            .with("even", even)
            .with("prefix", |params: &Json, value: &Value, _: &FieldContext<'_>| {
                let prefix = params["prefix"].as_str().unwrap_or_default();
                if value.to_display_string().starts_with(prefix) {
                    vec![]
                } else {
                    vec![format!("Must start with {}", prefix)]
                }
            });

        let spec = FieldSpec::number("n");
        let ctx = FieldContext::new(&spec, None);
        let handler = registry.get("even").unwrap();
        assert!(handler.check(&Json::Null, &Value::from(4), &ctx).is_empty());
        assert_eq!(handler.check(&Json::Null, &Value::from(3), &ctx), vec!["Must be even"]);

        let prefix = registry.get("prefix").unwrap();
        assert_eq!(
            prefix.check(&json!({"prefix": "SKU"}), &Value::from("ABC"), &ctx),
            vec!["Must start with SKU"]
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CustomConstraintRegistry::new();
        registry.register("x", |_: &Json, _: &Value, _: &FieldContext<'_>| vec!["first".to_string()]);
        registry.register("x", |_: &Json, _: &Value, _: &FieldContext<'_>| vec!["second".to_string()]);
        assert_eq!(registry.len(), 1);

        let spec = FieldSpec::string("s");
        let ctx = FieldContext::new(&spec, Some(2));
        assert_eq!(ctx.index, Some(2));
        assert_eq!(
            registry.get("x").unwrap().check(&Json::Null, &Value::Null, &ctx),
            vec!["second"]
        );
        assert!(!registry.contains("y"));
    }
}
