//! Error types surfaced by the engine.
//!
//! None of these escape [`crate::Connection::dispatch`] or a command stub:
//! dispatch failures are logged and reported through
//! [`crate::DispatchOutcome::Rejected`], argument failures are logged and the
//! call is never transmitted. Only registration, which the host drives at
//! startup, returns errors directly.

use thiserror::Error;

use crate::registry::TypeTag;

/// Reasons a positional command call was rejected before transmission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required parameter had no corresponding argument.
    #[error("invalid number of arguments for method '{method}' call: missing '{parameter}'")]
    MissingArgument {
        /// Fully qualified method name.
        method: String,
        /// Name of the missing parameter.
        parameter: String,
    },

    /// An argument did not match its parameter's type tag.
    #[error(
        "invalid type of argument '{parameter}' for method '{method}' call: \
         it must be '{expected}' but it is '{actual}'"
    )]
    WrongType {
        /// Fully qualified method name.
        method: String,
        /// Name of the offending parameter.
        parameter: String,
        /// Type tag declared by the signature.
        expected: TypeTag,
        /// JSON type of the supplied value.
        actual: &'static str,
    },

    /// More arguments were supplied than the signature declares.
    #[error(
        "unexpected argument at position {position} for method '{method}' call: \
         the signature declares {arity} parameter(s)"
    )]
    UnexpectedArgument {
        /// Fully qualified method name.
        method: String,
        /// Zero-based position of the first surplus argument.
        position: usize,
        /// Number of declared parameters.
        arity: usize,
    },
}

/// Reasons an inbound message was dropped at the dispatch boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message could not be parsed or did not have the expected shape.
    #[error("malformed message: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
        /// Underlying parse error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The method name is not of the form `Domain.name`.
    #[error("invalid method name '{method}'")]
    InvalidMethodName {
        /// Method name as received.
        method: String,
    },

    /// No handler is registered for the message's domain.
    #[error("the message is for non-existing domain '{domain}'")]
    UnknownDomain {
        /// Domain named by the message.
        domain: String,
    },

    /// The domain handler has no method for the message.
    #[error("attempted to dispatch an unimplemented method '{method}'")]
    UnimplementedMethod {
        /// Fully qualified method name.
        method: String,
    },

    /// The event was never registered, so its parameter order is unknown.
    #[error("attempted to dispatch an unspecified method '{method}'")]
    UnspecifiedEvent {
        /// Fully qualified method name.
        method: String,
    },
}

impl DispatchError {
    /// Creates a malformed message error from a serde error.
    pub(crate) fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed message error with a custom message.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid method name error.
    pub(crate) fn invalid_method_name(method: impl Into<String>) -> Self {
        Self::InvalidMethodName {
            method: method.into(),
        }
    }

    /// Creates an unknown domain error.
    pub(crate) fn unknown_domain(domain: impl Into<String>) -> Self {
        Self::UnknownDomain {
            domain: domain.into(),
        }
    }

    /// Creates an unimplemented method error.
    pub(crate) fn unimplemented_method(method: impl Into<String>) -> Self {
        Self::UnimplementedMethod {
            method: method.into(),
        }
    }

    /// Creates an unspecified event error.
    pub(crate) fn unspecified_event(method: impl Into<String>) -> Self {
        Self::UnspecifiedEvent {
            method: method.into(),
        }
    }
}

/// An outgoing envelope could not be serialised.
#[derive(Debug, Error)]
#[error("failed to encode request for method '{method}': {source}")]
pub struct SendError {
    /// Fully qualified method name.
    pub method: String,
    /// Underlying serialisation error.
    #[source]
    pub source: serde_json::Error,
}

/// Errors raised while registering the protocol description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The name is not of the form `Domain.name`.
    #[error("invalid method name '{method}': expected 'Domain.name'")]
    InvalidMethodName {
        /// Name as supplied.
        method: String,
    },

    /// A parameter declared a type the validator does not understand.
    #[error("unknown type tag '{tag}'")]
    UnknownTypeTag {
        /// Tag as supplied.
        tag: String,
    },
}

impl RegistrationError {
    /// Creates an invalid method name error.
    pub(crate) fn invalid_method_name(method: impl Into<String>) -> Self {
        Self::InvalidMethodName {
            method: method.into(),
        }
    }

    /// Creates an unknown type tag error.
    pub(crate) fn unknown_type_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTypeTag { tag: tag.into() }
    }
}
