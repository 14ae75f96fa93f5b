//! Call correlation and event dispatch core for JSON backend protocols.
//!
//! The crate sits between an application and a backend that speaks a
//! `Domain.method` JSON protocol over a single ordered channel. It validates
//! outgoing command arguments against a registered protocol description,
//! assigns each call a unique identifier, matches responses back to the
//! callback that issued them, and routes backend-initiated events to the
//! handler registered for their domain.
//!
//! The engine never touches the channel itself. Hosts pass a [`Transport`]
//! that receives serialised envelopes and feed inbound traffic through
//! [`Connection::dispatch`]. Everything runs on the host's thread: the
//! [`Connection`] handle is cheap to clone, so callbacks and handlers can
//! issue further commands while a message is being processed.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use probewire::{Connection, ConnectionOptions, ParamSpec, TypeTag};
//! use serde_json::json;
//!
//! let sent = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&sent);
//! let connection = Connection::new(
//!     move |message: String| sink.borrow_mut().push(message),
//!     ConnectionOptions::default(),
//! );
//! connection
//!     .register_command(
//!         "Page.reload",
//!         vec![ParamSpec::optional("ignoreCache", TypeTag::Boolean)],
//!         Vec::new(),
//!     )
//!     .expect("valid method name");
//!
//! let page = connection.agent("Page").expect("agent is created on registration");
//! let reload = page.command("reload").expect("command is registered");
//! let id = reload.call(&[json!(true)], None);
//!
//! assert!(id.is_some());
//! assert_eq!(connection.outstanding_count(), 1);
//! assert_eq!(sent.borrow().len(), 1);
//! ```

mod codec;
mod connection;
mod correlator;
mod dispatcher;
mod errors;
mod idle;
mod queue;
mod registry;
mod stub;

pub use codec::{BackendError, CallId, InboundMessage};
pub use connection::{Connection, ConnectionOptions, DispatchOutcome, Transport};
pub use correlator::{Reply, ReplyPayload, ResponseCallback};
pub use dispatcher::{DomainDispatcher, EventArgs, HandlerMethod};
pub use errors::{ArgumentError, DispatchError, RegistrationError, SendError};
pub use idle::IdleCallback;
pub use queue::InboundQueue;
pub use registry::{
    CommandDescription, CommandSignature, DescriptionError, DomainDescription, EnumTable,
    EventDescription, EventSchema, ParamSpec, ParameterDescription, ProtocolDescription,
    TypeDescription, TypeTag, Validation,
};
pub use stub::{AgentHandle, CommandStub};

#[cfg(test)]
mod tests;
