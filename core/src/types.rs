//! Schema type definitions.
//!
//! A [`Schema`] describes the expected shape of a value at one position. It
//! can be built in code with the builder methods, or loaded from JSON with
//! [`Schema::from_json`]. Object fields may be declared inline (every
//! non-reserved key is a field) or under `value` next to `type: "object"`;
//! both styles check identically.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{CheckError, CheckOptions, ErrorCode, Key, Kind, is_truthy};

/// Keys with meaning on a schema node. Every other key of a JSON schema
/// object declares a field.
pub const RESERVED_KEYS: [&str; 6] = ["type", "required", "default", "value", "strict", "validate"];

/// Why a validator rejected a value.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// The value is not acceptable. Reported as `badValue` with this value
    /// as the message, unless the value is falsy, which counts as success.
    Invalid(Value),
    /// A fully formed error, reported as-is.
    Error(CheckError),
    /// The validator itself broke. Reported as `badSchema`.
    Fault(String),
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Rejection::Invalid(Value::String(message.to_string()))
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Rejection::Invalid(Value::String(message))
    }
}

impl From<CheckError> for Rejection {
    fn from(err: CheckError) -> Self {
        Rejection::Error(err)
    }
}

/// What a validator can see besides the value it checks.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorContext<'a> {
    /// The top-level value being checked. Defaults and coercions applied
    /// earlier in the walk are already visible.
    pub root: &'a Value,
    /// The top-level schema.
    pub root_schema: &'a Schema,
    /// Traversal key of the node being checked, `None` at the root.
    pub key: Option<&'a Key>,
    /// Options in effect at the node.
    pub options: &'a CheckOptions,
}

type ValidatorFn = dyn Fn(&Value, &ValidatorContext<'_>) -> Result<(), Rejection> + Send + Sync;

/// A user-supplied acceptance check.
///
/// # Examples
///
/// ```
/// use param_schema_core::{Rejection, Validator};
/// use serde_json::Value;
///
/// let even = Validator::new(|value: &Value, _ctx| match value.as_i64() {
///     Some(n) if n % 2 == 0 => Ok(()),
///     _ => Err(Rejection::from("must be even")),
/// });
/// # let _ = even;
/// ```
#[derive(Clone)]
pub struct Validator(Arc<ValidatorFn>);

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ValidatorContext<'_>) -> Result<(), Rejection> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, value: &Value, ctx: &ValidatorContext<'_>) -> Result<(), Rejection> {
        (self.0)(value, ctx)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// The `value` slot of a schema node. Its meaning depends on the kind of
/// the value being checked.
#[derive(Debug, Clone)]
pub enum SchemaValue {
    /// Field map (objects) or element schema (arrays).
    Node(Box<Schema>),
    /// `|`-separated set of allowed strings.
    Enum(String),
    /// Exact number or boolean.
    Literal(Value),
    /// Custom check, equivalent to [`Schema::validate`].
    Validator(Validator),
    /// Any other JSON shape. Rejected when a scalar is checked against it.
    Other(Value),
}

impl SchemaValue {
    /// Kind of the rule itself, used when reporting authoring errors.
    pub fn kind(&self) -> Kind {
        match self {
            SchemaValue::Node(_) => Kind::Object,
            SchemaValue::Enum(_) => Kind::String,
            SchemaValue::Validator(_) => Kind::Function,
            SchemaValue::Literal(value) | SchemaValue::Other(value) => Kind::of(value),
        }
    }

    fn from_json(json: &Value, object_type: bool) -> Self {
        match json {
            Value::Object(map) if object_type => SchemaValue::Node(Box::new(Schema::field_map(map))),
            Value::Object(map) => SchemaValue::Node(Box::new(Schema::from_map(map))),
            Value::String(s) => SchemaValue::Enum(s.clone()),
            Value::Number(_) | Value::Bool(_) => SchemaValue::Literal(json.clone()),
            other => SchemaValue::Other(other.clone()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            SchemaValue::Node(node) => node.to_json(),
            SchemaValue::Enum(s) => Value::String(s.clone()),
            SchemaValue::Literal(value) | SchemaValue::Other(value) => value.clone(),
            SchemaValue::Validator(_) => validator_placeholder(),
        }
    }
}

/// Declarative description of the value expected at one position.
///
/// The engine never mutates a schema. Defaults are deep-cloned before they
/// are inserted into the checked value.
///
/// # Examples
///
/// ```
/// use param_schema_core::Schema;
/// use serde_json::json;
///
/// let built = Schema::typed("object")
///     .field("page", Schema::typed("number").with_default(json!(1)))
///     .field("q", Schema::typed("string").required());
///
/// let loaded = Schema::from_json(&json!({
///     "type": "object",
///     "page": {"type": "number", "default": 1},
///     "q": {"type": "string", "required": true}
/// }))
/// .unwrap();
///
/// assert_eq!(built.to_json(), loaded.to_json());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// `|`-separated allowed kinds, e.g. `"number|null"`.
    pub type_name: Option<String>,
    /// Absent or null values are rejected.
    pub required: bool,
    /// Inserted when the field is absent from its parent object.
    pub default: Option<Value>,
    /// Field map, element schema, enum, literal or validator.
    pub value: Option<SchemaValue>,
    /// Subtree override for strict mode. Kept raw: a non-boolean is ignored.
    pub strict: Option<Value>,
    /// Final node-level check.
    pub validate: Option<Validator>,
    /// Inline field schemas, in declaration order.
    pub fields: Vec<(String, Schema)>,
    opaque: Option<Value>,
}

impl Schema {
    /// An empty schema that accepts anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema restricted to the given `|`-separated kinds.
    pub fn typed(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            ..Self::default()
        }
    }

    /// Loads a schema from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns a `badSchema` error when `json` is not an object.
    ///
    /// `required` is read with [`is_truthy`], so any non-empty string,
    /// `"no"` included, marks the node as required.
    ///
    /// # Examples
    ///
    /// ```
    /// use param_schema_core::{ErrorCode, Schema};
    /// use serde_json::json;
    ///
    /// let err = Schema::from_json(&json!("number")).unwrap_err();
    /// assert_eq!(err.code, ErrorCode::BadSchema);
    /// assert_eq!(err.message, "Invalid Schema: schema object is required");
    /// ```
    pub fn from_json(json: &Value) -> Result<Self, CheckError> {
        json.as_object()
            .map(Self::from_map)
            .ok_or_else(|| CheckError::new(ErrorCode::BadSchema, "schema object is required"))
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let type_name = map.get("type").and_then(Value::as_str).map(String::from);
        let object_type = type_name.as_deref() == Some("object");

        Self {
            value: map.get("value").map(|v| SchemaValue::from_json(v, object_type)),
            type_name,
            required: map.get("required").is_some_and(is_truthy),
            default: map.get("default").cloned(),
            strict: map.get("strict").cloned(),
            validate: None,
            fields: map
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, node)| (key.clone(), Self::node(node)))
                .collect(),
            opaque: None,
        }
    }

    /// A node of a field map or element position. Non-object JSON is kept
    /// as an opaque node that accepts anything.
    fn node(json: &Value) -> Self {
        match json {
            Value::Object(map) => Self::from_map(map),
            other => Self {
                opaque: Some(other.clone()),
                ..Self::default()
            },
        }
    }

    fn field_map(map: &Map<String, Value>) -> Self {
        Self {
            fields: map
                .iter()
                .map(|(key, node)| (key.clone(), Self::node(node)))
                .collect(),
            ..Self::default()
        }
    }

    /// Renders the schema back to JSON. Validators render as
    /// `"[validator]"`.
    pub fn to_json(&self) -> Value {
        if let Some(opaque) = &self.opaque {
            return opaque.clone();
        }

        let mut map = Map::new();
        if let Some(type_name) = &self.type_name {
            map.insert("type".into(), Value::String(type_name.clone()));
        }
        if self.required {
            map.insert("required".into(), Value::Bool(true));
        }
        if let Some(default) = &self.default {
            map.insert("default".into(), default.clone());
        }
        if let Some(value) = &self.value {
            map.insert("value".into(), value.to_json());
        }
        if let Some(strict) = &self.strict {
            map.insert("strict".into(), strict.clone());
        }
        if self.validate.is_some() {
            map.insert("validate".into(), validator_placeholder());
        }
        for (name, field) in &self.fields {
            map.insert(name.clone(), field.to_json());
        }
        Value::Object(map)
    }

    /// True for nodes loaded from non-object JSON; they accept anything.
    pub fn is_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    /// Looks up an inline field schema by name.
    pub fn find_field(&self, name: &str) -> Option<&Schema> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    /// Field schemas that apply when this node checks an object: the map
    /// under `value` when `type` is exactly `"object"`, the inline fields
    /// otherwise.
    pub fn field_schemas(&self) -> &[(String, Schema)] {
        match (&self.type_name, &self.value) {
            (Some(t), Some(SchemaValue::Node(map))) if t == "object" => &map.fields,
            _ => &self.fields,
        }
    }

    /// Marks the node as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default inserted for an absent field.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Overrides strict mode for this subtree.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(Value::Bool(strict));
        self
    }

    /// Declares an inline field, replacing any earlier field of that name.
    pub fn field(mut self, name: &str, schema: Schema) -> Self {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((name.to_string(), schema)),
        }
        self
    }

    /// Declares the field map under `value` and sets `type` to `"object"`.
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (String, Schema)>,
    {
        self.type_name = Some("object".to_string());
        self.value = Some(SchemaValue::Node(Box::new(Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        })));
        self
    }

    /// Sets the schema every array element is checked against.
    pub fn elements(mut self, element: Schema) -> Self {
        self.value = Some(SchemaValue::Node(Box::new(element)));
        self
    }

    /// Restricts a string to one of the `|`-separated members.
    pub fn one_of(mut self, members: &str) -> Self {
        self.value = Some(SchemaValue::Enum(members.to_string()));
        self
    }

    /// Requires an exact number or boolean.
    pub fn literal(mut self, literal: Value) -> Self {
        self.value = Some(SchemaValue::Literal(literal));
        self
    }

    /// Attaches a validator as the scalar rule.
    pub fn rule<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &ValidatorContext<'_>) -> Result<(), Rejection> + Send + Sync + 'static,
    {
        self.value = Some(SchemaValue::Validator(Validator::new(f)));
        self
    }

    /// Attaches the final node-level validator.
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &ValidatorContext<'_>) -> Result<(), Rejection> + Send + Sync + 'static,
    {
        self.validate = Some(Validator::new(f));
        self
    }
}

fn validator_placeholder() -> Value {
    Value::String("[validator]".to_string())
}
