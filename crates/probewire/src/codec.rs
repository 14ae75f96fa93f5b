//! Wire envelopes exchanged with the backend.
//!
//! Requests carry `method`, optional `params` and `id`. Responses carry the
//! `id` they answer plus `result` and/or `error`. Events carry `method` and
//! optional `params` and never an `id`, which is how the two inbound shapes
//! are told apart.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::DispatchError;

/// Identifier correlating a request with its response.
///
/// Identifiers start at 1 and increase by one per call for the lifetime of a
/// connection. They are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code: {code})")]
pub struct BackendError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An inbound message as handed over by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Serialised JSON text, parsed on dispatch.
    Raw(String),
    /// Already parsed JSON.
    Parsed(Value),
}

impl From<String> for InboundMessage {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<&str> for InboundMessage {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_owned())
    }
}

impl From<Value> for InboundMessage {
    fn from(value: Value) -> Self {
        Self::Parsed(value)
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(text) => formatter.write_str(text),
            Self::Parsed(value) => write!(formatter, "{value}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Map<String, Value>>,
    id: CallId,
}

/// Serialises a request envelope.
///
/// `params` is left out of the envelope entirely when `None`.
pub(crate) fn encode_request(
    method: &str,
    params: Option<&Map<String, Value>>,
    id: CallId,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RequestEnvelope { method, params, id })
}

impl BackendError {
    /// Reads an error object of any shape.
    ///
    /// A missing or non-integer `code` becomes 0 and a missing `message`
    /// becomes empty. A non-object error keeps its text as the message and
    /// the value itself as `data`. `null` means no error.
    pub(crate) fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(mut object) => {
                let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = match object.remove("message") {
                    Some(Value::String(text)) => text,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let data = object.remove("data").filter(|data| !data.is_null());
                Some(Self {
                    code,
                    message,
                    data,
                })
            }
            Value::String(text) => Some(Self {
                code: 0,
                message: text.clone(),
                data: Some(Value::String(text)),
            }),
            other => Some(Self {
                code: 0,
                message: other.to_string(),
                data: Some(other),
            }),
        }
    }
}

fn deserialize_backend_error<'de, D>(deserializer: D) -> Result<Option<BackendError>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(BackendError::from_value)
}

/// A response to an earlier request.
///
/// Only `id` is strict: once it names a pending call, that call must be
/// settled whatever the rest of the message looks like.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub(crate) id: CallId,
    #[serde(default)]
    pub(crate) result: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_backend_error")]
    pub(crate) error: Option<BackendError>,
}

/// A backend-initiated event.
#[derive(Debug, Deserialize)]
pub(crate) struct EventMessage {
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) params: Option<Map<String, Value>>,
}

/// Classification of an inbound message.
#[derive(Debug)]
pub(crate) enum Inbound {
    Response(ResponseMessage),
    Event(EventMessage),
}

/// Parses and classifies an inbound message by the presence of `id`.
pub(crate) fn decode(message: InboundMessage) -> Result<Inbound, DispatchError> {
    let value = match message {
        InboundMessage::Raw(text) => {
            serde_json::from_str::<Value>(&text).map_err(DispatchError::from_json_error)?
        }
        InboundMessage::Parsed(value) => value,
    };

    let Value::Object(object) = value else {
        return Err(DispatchError::malformed("message is not a JSON object"));
    };

    if object.contains_key("id") {
        serde_json::from_value(Value::Object(object))
            .map(Inbound::Response)
            .map_err(DispatchError::from_json_error)
    } else {
        serde_json::from_value(Value::Object(object))
            .map(Inbound::Event)
            .map_err(DispatchError::from_json_error)
    }
}

/// Splits `Domain.name` into its two non-empty halves.
pub(crate) fn split_method(method: &str) -> Option<(&str, &str)> {
    method
        .split_once('.')
        .filter(|(domain, name)| !domain.is_empty() && !name.is_empty())
}
