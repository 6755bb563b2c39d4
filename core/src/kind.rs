//! Value classification.
//!
//! Every decision the engine makes about a value goes through [`Kind`]: type
//! checks compare kind names against a schema's pipe-delimited type enum,
//! dispatch picks the object/array/scalar path by kind, and the option merge
//! only lets an override through when its kind matches the value it replaces.

use std::fmt;

use serde_json::Value;

/// Semantic tag of a value.
///
/// `Function` and `Error` never come out of [`Kind::of`]; they tag validator
/// closures and error values on the schema side.
///
/// # Examples
///
/// ```
/// use param_schema_core::Kind;
/// use serde_json::json;
///
/// assert_eq!(Kind::of(&json!({"a": 1})), Kind::Object);
/// assert_eq!(Kind::of(&json!(1.5)), Kind::Number);
/// assert_eq!(Kind::of_field(None), Kind::Undefined);
/// assert!(Kind::Number.is_member_of("string|number"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Function,
    Null,
    Undefined,
    Error,
}

impl Kind {
    /// Classifies a present value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::String(_) => Kind::String,
            Value::Number(_) => Kind::Number,
            Value::Bool(_) => Kind::Boolean,
            Value::Null => Kind::Null,
        }
    }

    /// Classifies a value that may be absent (a missing object field).
    pub fn of_field(value: Option<&Value>) -> Self {
        value.map_or(Kind::Undefined, Kind::of)
    }

    /// Lowercase tag name, as written in a schema's `type`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Function => "function",
            Kind::Null => "null",
            Kind::Undefined => "undefined",
            Kind::Error => "error",
        }
    }

    /// Returns true when this kind is one of the `|`-separated names in
    /// `type_enum`. Unknown names never match.
    pub fn is_member_of(self, type_enum: &str) -> bool {
        type_enum.split('|').any(|name| name.trim() == self.name())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Truthiness of a value.
///
/// `null`, `false`, zero and the empty string are falsy. Every other value,
/// containers included, is truthy.
///
/// # Examples
///
/// ```
/// use param_schema_core::is_truthy;
/// use serde_json::json;
///
/// assert!(is_truthy(&json!("false")));
/// assert!(is_truthy(&json!([])));
/// assert!(!is_truthy(&json!("")));
/// assert!(!is_truthy(&json!(0)));
/// ```
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reads a string parameter as a boolean.
///
/// False when empty or when it spells out a falsy literal (`"0"`,
/// `"false"`, `"null"`, `"undefined"`, `"NaN"`), ignoring case and
/// surrounding whitespace, so that string-only transports can carry
/// booleans.
///
/// ```
/// use param_schema_core::flag_is_set;
///
/// assert!(flag_is_set("yes"));
/// assert!(!flag_is_set(" FALSE "));
/// ```
pub fn flag_is_set(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "null" | "undefined" | "nan"
    )
}

/// Deep copy through a serialize/deserialize round trip.
///
/// Fails when the value cannot survive the trip, for instance when it nests
/// deeper than the JSON reader's recursion limit.
pub fn deep_clone(value: &Value) -> Result<Value, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    serde_json::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_kind_of_covers_every_json_shape() {
        assert_eq!(Kind::of(&json!({})), Kind::Object);
        assert_eq!(Kind::of(&json!([])), Kind::Array);
        assert_eq!(Kind::of(&json!("x")), Kind::String);
        assert_eq!(Kind::of(&json!(3)), Kind::Number);
        assert_eq!(Kind::of(&json!(false)), Kind::Boolean);
        assert_eq!(Kind::of(&Value::Null), Kind::Null);
        assert_eq!(Kind::of_field(Some(&json!(1))), Kind::Number);
        assert_eq!(Kind::of_field(None), Kind::Undefined);
    }

    #[test]
    fn test_membership_trims_and_rejects_unknown_names() {
        assert!(Kind::Null.is_member_of("number | null"));
        assert!(!Kind::Number.is_member_of("integer"));
        assert!(!Kind::String.is_member_of(""));
    }

    #[test]
    fn test_truthiness_only_rejects_empty_strings() {
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!("null")));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0.0)));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_flag_strings() {
        assert!(flag_is_set("1"));
        assert!(flag_is_set("on"));
        assert!(!flag_is_set(""));
        assert!(!flag_is_set("FALSE"));
        assert!(!flag_is_set(" 0 "));
        assert!(!flag_is_set("NaN"));
    }

    #[test]
    fn test_deep_clone_is_structural() {
        let original = json!({"a": [1, {"b": null}]});
        let copy = deep_clone(&original).unwrap();
        assert_eq!(copy, original);
    }

    #[test]
    fn test_deep_clone_fails_past_recursion_limit() {
        let mut nested = json!(0);
        for _ in 0..200 {
            nested = json!([nested]);
        }
        assert!(deep_clone(&nested).is_err());
    }
}
