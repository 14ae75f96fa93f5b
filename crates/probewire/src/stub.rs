//! Callable command stubs exposed per domain.

use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::error;

use crate::codec::CallId;
use crate::connection::Connection;
use crate::correlator::{ReplyMode, ResponseCallback};
use crate::registry::{CommandSignature, EnumTable, Validation};

/// Tracing target for rejected stub calls.
const STUB_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::stub");

/// A domain's namespace of commands and enum tables.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    connection: Connection,
    domain: String,
}

impl AgentHandle {
    pub(crate) fn new(connection: Connection, domain: &str) -> Self {
        Self {
            connection,
            domain: domain.to_owned(),
        }
    }

    /// Domain this agent serves.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the stub for a registered command.
    #[must_use]
    pub fn command(&self, name: &str) -> Option<CommandStub> {
        self.connection
            .with_agent(&self.domain, |agent| agent.command(name))
            .flatten()
            .map(|signature| CommandStub {
                connection: self.connection.clone(),
                signature,
            })
    }

    /// Names of the registered commands, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.connection
            .with_agent(&self.domain, |agent| agent.command_names())
            .unwrap_or_default()
    }

    /// Returns a registered enum table.
    #[must_use]
    pub fn enum_table(&self, name: &str) -> Option<Rc<EnumTable>> {
        self.connection
            .with_agent(&self.domain, |agent| agent.enum_table(name))
            .flatten()
    }

    /// Names of the registered enum tables, sorted.
    #[must_use]
    pub fn enum_names(&self) -> Vec<String> {
        self.connection
            .with_agent(&self.domain, |agent| agent.enum_names())
            .unwrap_or_default()
    }
}

/// A callable handle for one registered command.
#[derive(Debug, Clone)]
pub struct CommandStub {
    connection: Connection,
    signature: Rc<CommandSignature>,
}

impl CommandStub {
    /// The command's registered signature.
    #[must_use]
    pub fn signature(&self) -> &CommandSignature {
        &self.signature
    }

    /// Sends the command with positional arguments.
    ///
    /// Arguments are validated against the signature first. On mismatch the
    /// problem is logged, nothing is sent and `None` is returned. The
    /// callback receives one slot per registered reply field.
    pub fn call(&self, args: &[Value], callback: Option<ResponseCallback>) -> Option<CallId> {
        match self.signature.validate(args) {
            Validation::Valid(params) => self.connection.send_command(
                self.signature.method(),
                params.as_ref(),
                callback,
                ReplyMode::Fields,
            ),
            Validation::Invalid(error) => {
                error!(target: STUB_TARGET, method = self.signature.method(), %error, "command not sent");
                None
            }
        }
    }

    /// Sends the command with a pre-built parameter object.
    ///
    /// The object is sent as is, without validation. The callback receives
    /// the raw result object.
    pub fn invoke(
        &self,
        params: Option<Map<String, Value>>,
        callback: Option<ResponseCallback>,
    ) -> Option<CallId> {
        self.connection.send_command(
            self.signature.method(),
            params.as_ref(),
            callback,
            ReplyMode::Raw,
        )
    }
}
