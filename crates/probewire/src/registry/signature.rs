//! Command and event schemas and the argument validator.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::errors::{ArgumentError, RegistrationError};

/// Type a command parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// A JSON boolean.
    Boolean,
    /// A JSON object or array.
    Object,
    /// A JSON array.
    Array,
    /// Any non-null JSON value.
    Any,
}

impl TypeTag {
    /// Parses a protocol type name such as `"string"` or `"integer"`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownTypeTag`] for names the validator
    /// does not know.
    pub fn parse(tag: &str) -> Result<Self, RegistrationError> {
        match tag {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "any" => Ok(Self::Any),
            _ => Err(RegistrationError::unknown_type_tag(tag)),
        }
    }

    /// Returns the protocol type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }

    /// Whether `value` satisfies this tag.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object() || value.is_array(),
            Self::Array => value.is_array(),
            Self::Any => !value.is_null(),
        }
    }
}

impl FromStr for TypeTag {
    type Err = RegistrationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::parse(tag)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared command parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    name: String,
    type_tag: TypeTag,
    optional: bool,
}

impl ParamSpec {
    /// Declares a parameter that must always be supplied.
    #[must_use]
    pub fn required(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            optional: false,
        }
    }

    /// Declares a parameter that may be left out.
    #[must_use]
    pub fn optional(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            optional: true,
        }
    }

    /// Parameter name as it appears in the `params` object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Whether the parameter may be omitted.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Outcome of validating positional arguments against a signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The arguments fit; carries the parameter object to send, or `None`
    /// when no parameter ended up set.
    Valid(Option<Map<String, Value>>),
    /// The arguments do not fit and must not be sent.
    Invalid(ArgumentError),
}

/// Registered shape of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSignature {
    method: String,
    domain: String,
    name: String,
    params: Vec<ParamSpec>,
    reply_fields: Vec<String>,
}

impl CommandSignature {
    pub(crate) fn new(
        domain: &str,
        name: &str,
        params: Vec<ParamSpec>,
        reply_fields: Vec<String>,
    ) -> Self {
        Self {
            method: format!("{domain}.{name}"),
            domain: domain.to_owned(),
            name: name.to_owned(),
            params,
            reply_fields,
        }
    }

    /// Fully qualified `Domain.name` method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Domain the command belongs to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Command name within its domain.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, in positional order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Names read off the result object, in callback order.
    #[must_use]
    pub fn reply_fields(&self) -> &[String] {
        &self.reply_fields
    }

    /// Checks positional arguments against the declared parameters.
    ///
    /// Arguments are matched to parameters by position. A `null` argument in
    /// an optional slot counts as omitted. Trailing `null`s past the last
    /// parameter are ignored; any other surplus argument is rejected.
    #[must_use]
    pub fn validate(&self, args: &[Value]) -> Validation {
        let mut params = Map::new();
        let mut remaining = args.iter();

        for spec in &self.params {
            match remaining.next() {
                None if spec.optional => {}
                None => {
                    return Validation::Invalid(ArgumentError::MissingArgument {
                        method: self.method.clone(),
                        parameter: spec.name.clone(),
                    });
                }
                Some(Value::Null) if spec.optional => {}
                Some(value) if spec.type_tag.accepts(value) => {
                    params.insert(spec.name.clone(), value.clone());
                }
                Some(value) => {
                    return Validation::Invalid(ArgumentError::WrongType {
                        method: self.method.clone(),
                        parameter: spec.name.clone(),
                        expected: spec.type_tag,
                        actual: json_type_name(value),
                    });
                }
            }
        }

        let arity = self.params.len();
        if let Some(offset) = remaining.position(|value| !value.is_null()) {
            return Validation::Invalid(ArgumentError::UnexpectedArgument {
                method: self.method.clone(),
                position: arity + offset,
                arity,
            });
        }

        if params.is_empty() {
            Validation::Valid(None)
        } else {
            Validation::Valid(Some(params))
        }
    }
}

/// Registered positional order of an event's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSchema {
    method: String,
    domain: String,
    name: String,
    param_order: Vec<String>,
}

impl EventSchema {
    pub(crate) fn new(domain: &str, name: &str, param_order: Vec<String>) -> Self {
        Self {
            method: format!("{domain}.{name}"),
            domain: domain.to_owned(),
            name: name.to_owned(),
            param_order,
        }
    }

    /// Fully qualified `Domain.name` event.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Domain the event belongs to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Event name within its domain.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names in the order handlers receive them.
    #[must_use]
    pub fn param_order(&self) -> &[String] {
        &self.param_order
    }

    /// Reads each named parameter off `params` in registered order.
    ///
    /// Missing parameters, or a missing `params` object, yield `None` slots
    /// so the argument count always matches the schema.
    #[must_use]
    pub fn positional_args(&self, params: Option<&Map<String, Value>>) -> Vec<Option<Value>> {
        self.param_order
            .iter()
            .map(|name| params.and_then(|bag| bag.get(name)).cloned())
            .collect()
    }
}
