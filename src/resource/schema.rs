//! Field schema for resource arguments and attributes
//!
//! A resource declares its fields as a [`SchemaMap`]. Configuration is a
//! plain JSON object; [`validate_config`] walks it against the schema and
//! reports every problem it finds in one [`Error::Validation`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::{Result, Violations};
use crate::resourceids::ResourceId;

/// Fields keyed by name, iterated in name order
pub type SchemaMap = BTreeMap<&'static str, Schema>;

/// Checks one value; returns the problems found, empty when valid
pub type ValidateFunc = Arc<dyn Fn(&Value, &str) -> Vec<String> + Send + Sync>;

/// Rewrites a string into the form the API stores it in
pub type StateFunc = fn(&str) -> String;

#[derive(Clone, Debug)]
pub enum SchemaType {
    String,
    Int,
    Float,
    Bool,
    List(Box<SchemaType>),
    /// Nested object with its own fields
    Block(SchemaMap),
}

impl SchemaType {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Int => "int",
            SchemaType::Float => "float",
            SchemaType::Bool => "bool",
            SchemaType::List(_) => "list",
            SchemaType::Block(_) => "block",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Int => value.is_i64() || value.is_u64(),
            SchemaType::Float => value.is_number(),
            SchemaType::Bool => value.is_boolean(),
            SchemaType::List(_) => value.is_array(),
            SchemaType::Block(_) => value.is_object(),
        }
    }
}

#[derive(Clone)]
pub struct Schema {
    pub ty: SchemaType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value replaces the remote object
    pub force_new: bool,
    /// Never echoed back by the API nor printed
    pub sensitive: bool,
    pub default: Option<Value>,
    pub max_items: Option<usize>,
    pub validate: Option<ValidateFunc>,
    pub state_func: Option<StateFunc>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("ty", &self.ty)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field("max_items", &self.max_items)
            .field("validate", &self.validate.is_some())
            .field("state_func", &self.state_func.is_some())
            .finish()
    }
}

impl Schema {
    fn new(ty: SchemaType) -> Self {
        Self {
            ty,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            max_items: None,
            validate: None,
            state_func: None,
        }
    }

    pub fn required(ty: SchemaType) -> Self {
        Self {
            required: true,
            ..Self::new(ty)
        }
    }

    pub fn optional(ty: SchemaType) -> Self {
        Self {
            optional: true,
            ..Self::new(ty)
        }
    }

    /// Set by the remote API only
    pub fn computed(ty: SchemaType) -> Self {
        Self {
            computed: true,
            ..Self::new(ty)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Optional and computed: the API fills it in when omitted
    pub fn or_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn validate(mut self, func: ValidateFunc) -> Self {
        self.validate = Some(func);
        self
    }

    /// Store the value as `func` rewrites it, so spellings that map to the same form compare equal
    pub fn state_func(mut self, func: StateFunc) -> Self {
        self.state_func = Some(func);
        self
    }

    /// True when the field can be written by configuration
    pub fn is_argument(&self) -> bool {
        self.required || self.optional
    }
}

fn as_str<'a>(value: &'a Value, key: &str, problems: &mut Vec<String>) -> Option<&'a str> {
    match value.as_str() {
        Some(s) => Some(s),
        None => {
            problems.push(format!("expected type of {} to be string", key));
            None
        },
    }
}

pub fn string_is_not_white_space() -> ValidateFunc {
    Arc::new(|value, key| {
        let mut problems = Vec::new();
        if let Some(s) = as_str(value, key, &mut problems) {
            if s.trim().is_empty() {
                problems.push(format!("{:?} must not be empty or consist only of whitespace", key));
            }
        }
        problems
    })
}

pub fn string_in_slice(valid: &'static [&'static str]) -> ValidateFunc {
    Arc::new(move |value, key| {
        let mut problems = Vec::new();
        if let Some(s) = as_str(value, key, &mut problems) {
            if !valid.contains(&s) {
                problems.push(format!(
                    "expected {} to be one of [{}], got {}",
                    key,
                    valid.join(" "),
                    s
                ));
            }
        }
        problems
    })
}

pub fn int_between(min: i64, max: i64) -> ValidateFunc {
    Arc::new(move |value, key| match value.as_i64() {
        Some(v) if v < min || v > max => vec![format!(
            "expected {} to be in the range ({} - {}), got {}",
            key, min, max, v
        )],
        Some(_) => Vec::new(),
        None => vec![format!("expected type of {} to be integer", key)],
    })
}

pub fn float_between(min: f64, max: f64) -> ValidateFunc {
    Arc::new(move |value, key| match value.as_f64() {
        Some(v) if v < min || v > max => vec![format!(
            "expected {} to be in the range ({} - {}), got {}",
            key, min, max, v
        )],
        Some(_) => Vec::new(),
        None => vec![format!("expected type of {} to be float", key)],
    })
}

pub fn is_rfc3339_time() -> ValidateFunc {
    Arc::new(|value, key| {
        let mut problems = Vec::new();
        if let Some(s) = as_str(value, key, &mut problems) {
            if let Err(e) = chrono::DateTime::parse_from_rfc3339(s) {
                problems.push(format!("{:?} isn't a valid RFC3339 date: {:?}: {}", key, s, e));
            }
        }
        problems
    })
}

/// Accept only IDs that parse as `I` in canonical casing
pub fn resource_id<I: ResourceId>() -> ValidateFunc {
    Arc::new(|value, key| {
        let mut problems = Vec::new();
        if let Some(s) = as_str(value, key, &mut problems) {
            if let Err(e) = I::parse(s) {
                problems.push(format!("{}: {}", key, e));
            }
        }
        problems
    })
}

/// Azure region names: `West Europe` and `westeurope` are the same region
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Check a configuration object, collecting every problem
pub fn validate_config(schema: &SchemaMap, config: &Map<String, Value>) -> Result<()> {
    let mut violations = Violations::new();
    check(schema, config, "", &mut violations);
    violations.into_result()
}

pub(crate) fn check(schema: &SchemaMap, config: &Map<String, Value>, prefix: &str, violations: &mut Violations) {
    for key in config.keys() {
        match schema.get(key.as_str()) {
            None => violations.push(format!("{}{}: unsupported argument", prefix, key)),
            Some(field) if !field.is_argument() => {
                violations.push(format!("{}{}: computed attribute cannot be set", prefix, key))
            },
            Some(_) => {},
        }
    }

    for (name, field) in schema {
        let path = format!("{}{}", prefix, name);
        match config.get(*name).filter(|v| !v.is_null()) {
            None if field.required => violations.push(format!("{:?}: required field is not set", path)),
            None => {},
            Some(value) if field.is_argument() => check_value(field, &field.ty, value, &path, violations),
            Some(_) => {},
        }
    }
}

fn check_value(field: &Schema, ty: &SchemaType, value: &Value, path: &str, violations: &mut Violations) {
    if !ty.accepts(value) {
        violations.push(format!("{}: expected {}", path, ty.name()));
        return;
    }

    match (ty, value) {
        (SchemaType::List(elem), Value::Array(items)) => {
            if let Some(max) = field.max_items {
                if items.len() > max {
                    violations.push(format!("{}: attribute supports {} item maximum, config has {} declared", path, max, items.len()));
                }
            }
            for (i, item) in items.iter().enumerate() {
                check_value(field, elem, item, &format!("{}.{}", path, i), violations);
            }
        },
        (SchemaType::Block(fields), Value::Object(obj)) => {
            check(fields, obj, &format!("{}.", path), violations);
        },
        _ => {
            if let Some(validate) = &field.validate {
                for problem in validate(value, path) {
                    violations.push(problem);
                }
            }
        },
    }
}

/// Fill in declared defaults for absent fields, including inside blocks
pub fn apply_defaults(schema: &SchemaMap, config: &mut Map<String, Value>) {
    for (name, field) in schema {
        let absent = config.get(*name).map_or(true, Value::is_null);
        if absent {
            if let Some(default) = &field.default {
                config.insert(name.to_string(), default.clone());
            }
            continue;
        }

        match (&field.ty, config.get_mut(*name)) {
            (SchemaType::Block(fields), Some(Value::Object(obj))) => apply_defaults(fields, obj),
            (SchemaType::List(elem), Some(Value::Array(items))) => {
                if let SchemaType::Block(fields) = elem.as_ref() {
                    for item in items.iter_mut() {
                        if let Value::Object(obj) = item {
                            apply_defaults(fields, obj);
                        }
                    }
                }
            },
            _ => {},
        }
    }
}

/// Rewrite top level string values through their field's state function
pub fn normalize_values(schema: &SchemaMap, values: &mut Map<String, Value>) {
    for (name, field) in schema {
        let Some(state) = field.state_func else {
            continue;
        };
        if let Some(Value::String(value)) = values.get_mut(*name) {
            *value = state(value);
        }
    }
}

/// Machine readable description of a schema
pub fn describe(schema: &SchemaMap) -> Value {
    let mut out = Map::new();
    for (name, field) in schema {
        let mut entry = json!({
            "type": describe_type(&field.ty),
            "required": field.required,
            "optional": field.optional,
            "computed": field.computed,
            "force_new": field.force_new,
            "sensitive": field.sensitive,
        });
        if let Some(default) = &field.default {
            entry["default"] = default.clone();
        }
        if let Some(max) = field.max_items {
            entry["max_items"] = json!(max);
        }
        out.insert(name.to_string(), entry);
    }
    Value::Object(out)
}

fn describe_type(ty: &SchemaType) -> Value {
    match ty {
        SchemaType::List(elem) => json!({ "list": describe_type(elem) }),
        SchemaType::Block(fields) => json!({ "block": describe(fields) }),
        other => json!(other.name()),
    }
}
