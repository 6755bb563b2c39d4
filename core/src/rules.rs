//! Scalar rules and validator calls.
//!
//! A scalar is checked against its schema's `value`: a `|`-separated enum of
//! allowed strings, an exact number or boolean, or a validator. Validators
//! never unwind out of the engine; a panic inside one is reported as a
//! broken schema.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::validate::Scope;
use crate::{CheckError, ErrorCode, Kind, Rejection, Schema, SchemaValue, Validator, is_truthy};

/// Checks a string, number, boolean or null against `schema.value`.
/// `root` is the top-level value `value` belongs to.
pub(crate) fn check_scalar(
    value: &Value,
    root: &Value,
    schema: &Schema,
    scope: &Scope<'_>,
) -> Result<(), CheckError> {
    let Some(rule) = &schema.value else {
        return Ok(());
    };

    match rule {
        SchemaValue::Validator(validator) => call_validator(validator, value, root, schema, scope),
        SchemaValue::Enum(members) => {
            if value.as_str().is_some_and(|s| members.split('|').any(|m| m == s)) {
                return Ok(());
            }
            Err(scope.fail(
                ErrorCode::BadValue,
                format!("{} must be one of {members}", scope.label()),
                Some(value),
                schema,
            ))
        }
        SchemaValue::Literal(literal) => {
            if literal_matches(value, literal) {
                return Ok(());
            }
            Err(scope.fail(
                ErrorCode::BadValue,
                format!("{} must equal {literal}", scope.label()),
                Some(value),
                schema,
            ))
        }
        SchemaValue::Node(_) | SchemaValue::Other(_) => Err(scope.fail(
            ErrorCode::BadType,
            format!(
                "schema.value of type {} cannot check {} {}",
                rule.kind(),
                Kind::of(value),
                scope.label()
            ),
            Some(value),
            schema,
        )),
    }
}

fn literal_matches(value: &Value, literal: &Value) -> bool {
    match (value, literal) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == literal,
    }
}

/// Runs a validator against `value`.
///
/// Falsy rejections count as success. With `untrusted` set the validator is
/// not run at all and the node fails.
pub(crate) fn call_validator(
    validator: &Validator,
    value: &Value,
    root: &Value,
    schema: &Schema,
    scope: &Scope<'_>,
) -> Result<(), CheckError> {
    if scope.options.untrusted {
        return Err(scope.fail(
            ErrorCode::BadSchema,
            "validator functions are disabled for untrusted schemas",
            Some(value),
            schema,
        ));
    }

    let ctx = scope.validator_context(root);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| validator.call(value, &ctx)))
        .unwrap_or_else(|payload| Err(Rejection::Fault(panic_message(&*payload))));

    match outcome {
        Ok(()) => Ok(()),
        Err(Rejection::Invalid(verdict)) if !is_truthy(&verdict) => Ok(()),
        Err(Rejection::Invalid(verdict)) => {
            let message = match verdict {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Err(scope.fail(ErrorCode::BadValue, message, Some(value), schema))
        }
        Err(Rejection::Error(err)) => Err(scope.fail(ErrorCode::BadValue, err, Some(value), schema)),
        Err(Rejection::Fault(message)) => Err(scope.fail(
            ErrorCode::BadSchema,
            format!("Validator threw exception: {message}"),
            Some(value),
            schema,
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
