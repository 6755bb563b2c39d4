//! Recursive value checking.
//!
//! [`check`] walks a value and its schema together. At every node it
//! resolves the options in effect, applies the required, coercion and type
//! rules, then descends into object fields or array elements, or evaluates
//! scalar rules. The first failure at any depth ends the walk.
//!
//! The value is normalized in place: absent fields with defaults are filled
//! in and string input is converted to declared numbers and booleans.
//!
//! # Examples
//!
//! ```
//! use param_schema_core::*;
//! use serde_json::{Map, json};
//!
//! let schema = Schema::from_json(&json!({
//!     "limit": {"type": "number", "default": 20},
//!     "sort": {"type": "string", "value": "asc|desc"}
//! }))
//! .unwrap();
//!
//! let mut query = json!({"sort": "asc"});
//! assert!(check(&mut query, &schema, &Map::new()).is_ok());
//! assert_eq!(query, json!({"sort": "asc", "limit": 20}));
//!
//! let mut bad = json!({"sort": "up"});
//! let err = check(&mut bad, &schema, &Map::new()).unwrap_err();
//! assert_eq!(err.code, ErrorCode::BadValue);
//! ```

use serde_json::{Map, Value};

use crate::coerce::coerce;
use crate::error::{Failure, fail};
use crate::rules::{call_validator, check_scalar};
use crate::{
    CheckError, CheckOptions, ErrorCode, ErrorInfo, Key, Kind, Schema, SchemaValue, ValidatorContext,
    deep_clone,
};

/// Checks `value` against `schema`, merging `options` over the defaults.
///
/// # Errors
///
/// Returns the first failure encountered. `value` keeps any normalization
/// applied before the failure.
pub fn check(value: &mut Value, schema: &Schema, options: &Map<String, Value>) -> Result<(), CheckError> {
    check_with(value, schema, &CheckOptions::default().merged(options))
}

/// Checks `value` against `schema` with fully resolved options.
///
/// # Errors
///
/// Returns the first failure encountered.
pub fn check_with(value: &mut Value, schema: &Schema, options: &CheckOptions) -> Result<(), CheckError> {
    if schema.is_opaque() {
        return Err(CheckError::new(ErrorCode::BadSchema, "schema object is required"));
    }

    evaluate(value, schema, Scope::root(schema, options.clone()))
}

/// Loads `schema` from JSON and checks `value` against it.
///
/// # Errors
///
/// Returns a `badSchema` error when `schema` is not an object, otherwise the
/// first check failure.
///
/// # Examples
///
/// ```
/// use param_schema_core::{ErrorCode, check_json};
/// use serde_json::{Map, json};
///
/// let mut value = json!("42");
/// check_json(&mut value, &json!({"type": "number"}), &Map::new()).unwrap();
/// assert_eq!(value, json!(42));
///
/// let err = check_json(&mut value, &json!([]), &Map::new()).unwrap_err();
/// assert_eq!(err.code, ErrorCode::BadSchema);
/// ```
pub fn check_json(value: &mut Value, schema: &Value, options: &Map<String, Value>) -> Result<(), CheckError> {
    let schema = Schema::from_json(schema)?;
    check(value, &schema, options)
}

/// Traversal state for one node: resolved options plus the path from the
/// root to the node.
///
/// The walk holds the caller's root value rather than the node itself, so
/// validators can be handed the whole, partly normalized tree.
pub(crate) struct Scope<'a> {
    pub(crate) options: CheckOptions,
    root_schema: &'a Schema,
    path: Vec<Key>,
}

impl<'a> Scope<'a> {
    pub(crate) fn root(root_schema: &'a Schema, options: CheckOptions) -> Self {
        Self {
            options,
            root_schema,
            path: Vec::new(),
        }
    }

    /// Scope for a child node, starting from a copy of this node's options.
    pub(crate) fn child(&self, key: Key) -> Scope<'a> {
        let mut path = self.path.clone();
        path.push(key);
        Scope {
            options: self.options.clone(),
            root_schema: self.root_schema,
            path,
        }
    }

    pub(crate) fn key(&self) -> Option<&Key> {
        self.path.last()
    }

    /// Name of the node for messages.
    pub(crate) fn label(&self) -> String {
        self.key().map_or_else(|| "value".to_string(), Key::to_string)
    }

    /// Context handed to validators. `root` is the top-level value being
    /// checked.
    pub(crate) fn validator_context<'s>(&'s self, root: &'s Value) -> ValidatorContext<'s> {
        ValidatorContext {
            root,
            root_schema: self.root_schema,
            key: self.key(),
            options: &self.options,
        }
    }

    /// The node this scope refers to inside `root`.
    pub(crate) fn node<'v>(&self, root: &'v Value) -> Result<&'v Value, CheckError> {
        self.path
            .iter()
            .try_fold(root, |node, key| match key {
                Key::Field(name) => node.get(name.as_str()),
                Key::Index(index) => node.get(*index),
            })
            .ok_or_else(|| self.lost())
    }

    fn node_mut<'v>(&self, root: &'v mut Value) -> Result<&'v mut Value, CheckError> {
        self.path
            .iter()
            .try_fold(root, |node, key| match key {
                Key::Field(name) => node.get_mut(name.as_str()),
                Key::Index(index) => node.get_mut(*index),
            })
            .ok_or_else(|| self.lost())
    }

    fn lost(&self) -> CheckError {
        CheckError::new(
            ErrorCode::BadSchema,
            format!("{} disappeared from the value during the check", self.label()),
        )
    }

    pub(crate) fn fail(
        &self,
        code: ErrorCode,
        failure: impl Into<Failure>,
        value: Option<&Value>,
        schema: &Schema,
    ) -> CheckError {
        let info = ErrorInfo {
            key: self.key().cloned(),
            value: value.cloned(),
            schema: Some(schema.to_json()),
            options: self.options.clone(),
        };
        fail(code, failure, info)
    }
}

/// Checks the node at `scope`'s path inside `root`.
fn evaluate(root: &mut Value, schema: &Schema, mut scope: Scope<'_>) -> Result<(), CheckError> {
    if schema.is_opaque() {
        return Ok(());
    }
    tracing::trace!(key = ?scope.key(), "checking node");

    if let Some(strict) = &schema.strict {
        scope.options.apply("strict", strict);
    }

    let value = scope.node_mut(root)?;

    if schema.required && !scope.options.ignore_required && value.is_null() {
        return Err(scope.fail(ErrorCode::MissingParam, scope.label(), Some(&*value), schema));
    }

    let type_name = schema.type_name.as_deref().filter(|t| !t.is_empty());

    if !scope.options.do_not_coerce {
        let coerced = match (&*value, type_name) {
            (Value::String(raw), Some(t)) => coerce(raw, t),
            _ => None,
        };
        if let Some(coerced) = coerced {
            tracing::debug!(key = ?scope.key(), to = %coerced, "coerced string input");
            *value = coerced;
        }
    }

    let kind = Kind::of(value);
    if let Some(t) = type_name {
        if !kind.is_member_of(t) {
            return Err(scope.fail(
                ErrorCode::BadType,
                format!("{} should be {t}, got {kind}", scope.label()),
                Some(&*value),
                schema,
            ));
        }
    }

    match kind {
        Kind::Object => check_object(root, schema, &scope)?,
        Kind::Array => check_array(root, schema, &scope)?,
        _ => check_scalar(scope.node(root)?, root, schema, &scope)?,
    }

    if let Some(validator) = &schema.validate {
        call_validator(validator, scope.node(root)?, root, schema, &scope)?;
    }

    Ok(())
}

fn check_object(root: &mut Value, schema: &Schema, scope: &Scope<'_>) -> Result<(), CheckError> {
    let fields = schema.field_schemas();
    let Value::Object(map) = scope.node_mut(root)? else {
        return Ok(());
    };

    if scope.options.strict {
        if let Some((key, extra)) = map.iter().find(|(key, _)| find_field(fields, key).is_none()) {
            let child = scope.child(Key::Field(key.clone()));
            return Err(child.fail(ErrorCode::BadParam, key.as_str(), Some(extra), schema));
        }
    }

    if !scope.options.ignore_defaults {
        for (name, field_schema) in fields {
            let Some(default) = &field_schema.default else {
                continue;
            };
            if map.contains_key(name) {
                continue;
            }
            let copy = deep_clone(default).map_err(|err| {
                scope.child(Key::Field(name.clone())).fail(
                    ErrorCode::BadSchema,
                    format!("default for {name} cannot be copied: {err}"),
                    None,
                    field_schema,
                )
            })?;
            map.insert(name.clone(), copy);
        }
    }

    if !scope.options.ignore_required {
        for (name, field_schema) in fields {
            let current = map.get(name);
            if field_schema.required && current.is_none_or(Value::is_null) {
                let child = scope.child(Key::Field(name.clone()));
                return Err(child.fail(ErrorCode::MissingParam, name.as_str(), current, field_schema));
            }
        }
    }

    let declared: Vec<(String, &Schema)> = map
        .keys()
        .filter_map(|key| find_field(fields, key).map(|field_schema| (key.clone(), field_schema)))
        .collect();
    for (key, field_schema) in declared {
        evaluate(root, field_schema, scope.child(Key::Field(key)))?;
    }

    Ok(())
}

fn find_field<'s>(fields: &'s [(String, Schema)], name: &str) -> Option<&'s Schema> {
    fields
        .iter()
        .find(|(field, _)| field == name)
        .map(|(_, schema)| schema)
}

fn check_array(root: &mut Value, schema: &Schema, scope: &Scope<'_>) -> Result<(), CheckError> {
    let Some(SchemaValue::Node(element)) = &schema.value else {
        return Ok(());
    };

    let len = scope.node(root)?.as_array().map_or(0, Vec::len);
    for index in 0..len {
        evaluate(root, element, scope.child(Key::Index(index)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::Rejection;

    fn run(value: &mut Value, schema: Value, options: Value) -> Result<(), CheckError> {
        check_json(value, &schema, options.as_object().unwrap())
    }

    #[test]
    fn test_opaque_field_schemas_accept_anything() {
        let mut value = json!({"a": [1, 2], "b": "x"});
        assert!(run(&mut value, json!({"a": 5, "b": null}), json!({"strict": true})).is_ok());
    }

    #[test]
    fn test_schema_local_strict_overrides_inherited_option() {
        let schema = json!({
            "loose": {"type": "object", "strict": false, "value": {"a": {}}},
            "tight": {"strict": true, "a": {}}
        });

        let mut ok = json!({"loose": {"a": 1, "extra": 2}});
        assert!(run(&mut ok, schema.clone(), json!({"strict": true})).is_ok());

        let mut bad = json!({"tight": {"a": 1, "extra": 2}});
        let err = run(&mut bad, schema, json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadParam);
        assert_eq!(err.key(), Some(&Key::from("extra")));
    }

    #[test]
    fn test_malformed_strict_override_is_ignored() {
        let mut value = json!({"a": 1, "b": 2});
        let err = run(&mut value, json!({"strict": "no", "a": {}}), json!({"strict": true})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadParam);
    }

    #[test]
    fn test_strict_check_runs_before_defaults() {
        let mut value = json!({"x": 1});
        let err = run(&mut value, json!({"a": {"default": 1}}), json!({"strict": true})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadParam);
        assert_eq!(value, json!({"x": 1}));
    }

    #[test]
    fn test_defaults_satisfy_required_fields() {
        let mut value = json!({});
        let schema = json!({"a": {"type": "number", "required": true, "default": 3}});
        assert!(run(&mut value, schema, json!({})).is_ok());
        assert_eq!(value, json!({"a": 3}));
    }

    #[test]
    fn test_ignore_flags() {
        let schema = json!({"a": {"required": true}, "b": {"default": 1}});

        let mut value = json!({});
        assert!(run(&mut value, schema.clone(), json!({"ignoreRequired": true, "ignoreDefaults": true})).is_ok());
        assert_eq!(value, json!({}));

        let mut value = json!({});
        let err = run(&mut value, schema, json!({"ignoreDefaults": true})).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingParam);
    }

    #[test]
    fn test_required_null_is_missing() {
        let mut value = json!({"a": null});
        let err = run(&mut value, json!({"a": {"required": true}}), json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingParam);
        assert_eq!(err.message, "Missing Required Parameter: a");
        assert_eq!(err.info.value, Some(Value::Null));
    }

    #[test]
    fn test_required_root() {
        let mut value = Value::Null;
        let err = run(&mut value, json!({"required": true}), json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingParam);
        assert_eq!(err.key(), None);
    }

    #[test]
    fn test_do_not_coerce_keeps_strings() {
        let mut value = json!("42");
        let err = run(&mut value, json!({"type": "number"}), json!({"doNotCoerce": true})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadType);
        assert_eq!(value, json!("42"));
    }

    #[test]
    fn test_empty_type_is_unconstrained() {
        let mut value = json!(1);
        assert!(run(&mut value, json!({"type": ""}), json!({})).is_ok());
    }

    #[test]
    fn test_nested_failure_reports_innermost_key() {
        let mut value = json!({"user": {"tags": ["a", 7]}});
        let schema = json!({
            "user": {"type": "object", "value": {
                "tags": {"type": "array", "value": {"type": "string"}}
            }}
        });
        let err = run(&mut value, schema, json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadType);
        assert_eq!(err.key(), Some(&Key::Index(1)));
        assert_eq!(err.info.value, Some(json!(7)));
        assert_eq!(err.message, "Invalid Type: 1 should be string, got number");
    }

    #[test]
    fn test_array_stops_at_first_failing_element() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let schema = Schema::typed("array").elements(Schema::new().validate(move |value, _| {
            log.lock().unwrap().push(value.clone());
            match value.as_i64() {
                Some(n) if n > 0 => Ok(()),
                _ => Err(Rejection::from("must be positive")),
            }
        }));

        let mut value = json!([1, -1, 2]);
        let err = check(&mut value, &schema, &Map::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadValue);
        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!(-1)]);
    }

    #[test]
    fn test_validate_runs_after_descent_on_containers() {
        let schema = Schema::typed("object")
            .field("n", Schema::typed("number"))
            .validate(|value, _| match value["n"].as_i64() {
                Some(7) => Ok(()),
                _ => Err(Rejection::from("n must be 7")),
            });

        let mut value = json!({"n": "7"});
        assert!(check(&mut value, &schema, &Map::new()).is_ok());
        assert_eq!(value, json!({"n": 7}));
    }

    #[test]
    fn test_validators_see_the_normalized_root_and_key() {
        let schema = Schema::new()
            .field("min", Schema::typed("number"))
            .field(
                "max",
                Schema::typed("number").rule(|value, ctx| {
                    assert_eq!(ctx.key, Some(&Key::from("max")));
                    assert_eq!(ctx.options.extra["tenant"], "acme");
                    match (value.as_f64(), ctx.root["min"].as_f64()) {
                        (Some(max), Some(min)) if max >= min => Ok(()),
                        _ => Err(Rejection::from("max must not be below min")),
                    }
                }),
            );

        let options = json!({"tenant": "acme"});
        let mut ok = json!({"min": "2", "max": "5"});
        assert!(check(&mut ok, &schema, options.as_object().unwrap()).is_ok());
        assert_eq!(ok, json!({"min": 2, "max": 5}));

        let mut bad = json!({"min": "9", "max": "5"});
        let err = check(&mut bad, &schema, options.as_object().unwrap()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadValue);
    }

    #[test]
    fn test_validators_see_defaulted_siblings() {
        let schema = Schema::new()
            .field("a", Schema::new().with_default(json!(5)))
            .field(
                "b",
                Schema::new().validate(|_, ctx| match ctx.root["a"].as_i64() {
                    Some(5) => Ok(()),
                    _ => Err(Rejection::from("a must be 5")),
                }),
            );

        let mut value = json!({"b": 1});
        assert!(check(&mut value, &schema, &Map::new()).is_ok());
        assert_eq!(value, json!({"b": 1, "a": 5}));
    }

    #[test]
    fn test_root_validator_sees_the_whole_value() {
        let schema = Schema::typed("object")
            .field("n", Schema::typed("number"))
            .validate(|value, ctx| {
                assert_eq!(ctx.key, None);
                assert_eq!(ctx.root, value);
                Ok(())
            });

        let mut value = json!({"n": "3"});
        assert!(check(&mut value, &schema, &Map::new()).is_ok());
    }

    #[test]
    fn test_default_that_cannot_be_copied_is_a_schema_error() {
        let mut nested = json!(0);
        for _ in 0..200 {
            nested = json!([nested]);
        }
        let schema = Schema::new().field("a", Schema::new().with_default(nested));

        let mut value = json!({});
        let err = check(&mut value, &schema, &Map::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadSchema);
        assert_eq!(err.key(), Some(&Key::from("a")));
        assert!(err.message.starts_with("Invalid Schema: default for a cannot be copied"));
        assert_eq!(err.info.value, None);
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_error_info_carries_active_options_but_no_root() {
        let mut value = json!({"a": "x"});
        let err = run(&mut value, json!({"a": {"type": "number"}}), json!({"strict": true, "trace": "t1"}))
            .unwrap_err();
        assert!(err.info.options.strict);
        assert_eq!(err.info.options.extra["trace"], "t1");
        assert_eq!(err.info.schema, Some(json!({"type": "number"})));

        let rendered = serde_json::to_value(&err).unwrap();
        assert!(rendered["info"].get("rootValue").is_none());
        assert!(rendered["info"]["options"].get("rootSchema").is_none());
    }

    #[test]
    fn test_object_field_default_survives_value_mutation() {
        let schema = Schema::new().field("tags", Schema::typed("array").with_default(json!([])));

        let mut first = json!({});
        check(&mut first, &schema, &Map::new()).unwrap();
        first["tags"].as_array_mut().unwrap().push(json!("x"));

        let mut second = json!({});
        check(&mut second, &schema, &Map::new()).unwrap();
        assert_eq!(second, json!({"tags": []}));
        assert_eq!(schema.find_field("tags").unwrap().default, Some(json!([])));
    }
}
