//! The connection handle tying the engine's components together.
//!
//! A [`Connection`] owns the registry, the dispatcher table and the
//! correlator behind `RefCell`s and hands out cheap clones of itself. No
//! borrow is held while user code runs, so response callbacks, event handlers
//! and idle waiters may send commands or queue further waiters, and a
//! transport may feed a response straight back into [`Connection::dispatch`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use probewire_config::{Config, default_suppressed_error_code};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::codec::{self, CallId, EventMessage, Inbound, InboundMessage, ResponseMessage};
use crate::correlator::{Correlator, PendingCall, Reply, ReplyMode, ReplyPayload, ResponseCallback};
use crate::dispatcher::{DISPATCH_TARGET, DispatcherRegistry, DomainDispatcher, EventArgs};
use crate::errors::{DispatchError, RegistrationError, SendError};
use crate::idle::run_waiters;
use crate::registry::{
    Agent, DescriptionError, EnumTable, ParamSpec, ProtocolDescription, Registry,
};
use crate::stub::AgentHandle;

/// Tracing target for connection lifecycle events.
pub(crate) const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");
/// Tracing target for raw protocol message dumps.
const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocol");
/// Tracing target for timing statistics.
const TIMING_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::timing");

/// Outbound half of the channel.
///
/// Called once per outgoing envelope, in send order. Implementations must
/// not reorder messages. Any `Fn(String)` closure is a transport.
pub trait Transport {
    /// Hands a serialised envelope to the channel.
    fn send_message(&self, message: String);
}

impl<F> Transport for F
where
    F: Fn(String),
{
    fn send_message(&self, message: String) {
        self(message);
    }
}

/// Diagnostic switches and error reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Log every envelope sent and received.
    pub dump_protocol_messages: bool,
    /// Log round-trip and handler timings.
    pub dump_time_stats: bool,
    /// Backend error code delivered to callbacks without being logged as an
    /// error.
    pub suppressed_error_code: i64,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            dump_protocol_messages: false,
            dump_time_stats: false,
            suppressed_error_code: default_suppressed_error_code(),
        }
    }
}

impl From<&Config> for ConnectionOptions {
    fn from(config: &Config) -> Self {
        Self {
            dump_protocol_messages: config.dump_protocol_messages(),
            dump_time_stats: config.dump_time_stats(),
            suppressed_error_code: config.suppressed_error_code(),
        }
    }
}

/// What [`Connection::dispatch`] did with a message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A pending call was answered and its callback fired.
    Responded {
        /// Identifier of the answered call.
        id: CallId,
    },
    /// A response named a call that is not pending; nothing fired.
    Orphaned {
        /// Identifier carried by the response.
        id: CallId,
    },
    /// An event reached its domain's handler.
    EventDelivered {
        /// Fully qualified event name.
        method: String,
    },
    /// The message was dropped.
    Rejected(DispatchError),
}

impl DispatchOutcome {
    /// Whether the message was dropped.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

struct Inner {
    transport: Box<dyn Transport>,
    options: ConnectionOptions,
    registry: RefCell<Registry>,
    dispatchers: RefCell<DispatcherRegistry>,
    correlator: RefCell<Correlator>,
}

/// Handle to one backend connection.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct Connection {
    inner: Rc<Inner>,
}

impl Connection {
    /// Creates a connection that sends through `transport`.
    #[must_use]
    pub fn new(transport: impl Transport + 'static, options: ConnectionOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                transport: Box::new(transport),
                options,
                registry: RefCell::new(Registry::default()),
                dispatchers: RefCell::new(DispatcherRegistry::default()),
                correlator: RefCell::new(Correlator::new()),
            }),
        }
    }

    /// Options the connection was created with.
    #[must_use]
    pub fn options(&self) -> ConnectionOptions {
        self.inner.options
    }

    /// Registers a command and exposes it on its domain's agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidMethodName`] when `method` is not
    /// of the form `Domain.name`.
    pub fn register_command(
        &self,
        method: &str,
        params: Vec<ParamSpec>,
        reply_fields: Vec<String>,
    ) -> Result<(), RegistrationError> {
        self.inner
            .registry
            .borrow_mut()
            .register_command(method, params, reply_fields)
    }

    /// Registers an enum table under `Domain.Type`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidMethodName`] when `type_name` is
    /// not qualified by a domain.
    pub fn register_enum(&self, type_name: &str, table: EnumTable) -> Result<(), RegistrationError> {
        self.inner.registry.borrow_mut().register_enum(type_name, table)
    }

    /// Registers an event's positional parameter order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidMethodName`] when `method` is not
    /// of the form `Domain.name`.
    pub fn register_event(
        &self,
        method: &str,
        param_order: Vec<String>,
    ) -> Result<(), RegistrationError> {
        self.inner
            .registry
            .borrow_mut()
            .register_event(method, param_order)
    }

    /// Registers every entry of a protocol description.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptionError::Register`] for the first entry that could
    /// not be registered. Entries before it stay registered.
    pub fn load_protocol(&self, description: &ProtocolDescription) -> Result<(), DescriptionError> {
        description.apply(&mut self.inner.registry.borrow_mut())
    }

    /// Binds the handler for `domain`'s events, replacing any earlier one.
    pub fn register_domain_dispatcher(&self, domain: &str, dispatcher: DomainDispatcher) {
        self.inner.dispatchers.borrow_mut().register(domain, dispatcher);
    }

    /// Whether a handler is bound for `domain`.
    #[must_use]
    pub fn has_domain_dispatcher(&self, domain: &str) -> bool {
        self.inner.dispatchers.borrow().contains(domain)
    }

    /// Returns the agent for `domain`, if anything was registered for it.
    #[must_use]
    pub fn agent(&self, domain: &str) -> Option<AgentHandle> {
        let exists = self.inner.registry.borrow().agent(domain).is_some();
        exists.then(|| AgentHandle::new(self.clone(), domain))
    }

    /// Domains that have an agent, sorted.
    #[must_use]
    pub fn registered_domains(&self) -> Vec<String> {
        self.inner.registry.borrow().domains()
    }

    pub(crate) fn with_agent<R>(&self, domain: &str, read: impl FnOnce(&Agent) -> R) -> Option<R> {
        self.inner.registry.borrow().agent(domain).map(read)
    }

    /// Allocates an id, serialises the envelope and hands it to the transport.
    pub(crate) fn send_command(
        &self,
        method: &str,
        params: Option<&Map<String, Value>>,
        callback: Option<ResponseCallback>,
        reply_mode: ReplyMode,
    ) -> Option<CallId> {
        let sent_at = self.inner.options.dump_time_stats.then(Instant::now);
        let id = self
            .inner
            .correlator
            .borrow_mut()
            .wrap(callback, method, reply_mode, sent_at);

        let message = match codec::encode_request(method, params, id) {
            Ok(message) => message,
            Err(source) => {
                let error = SendError {
                    method: method.to_owned(),
                    source,
                };
                error!(target: CONNECTION_TARGET, call_id = id.get(), %error, "request not sent");
                let waiters = self.inner.correlator.borrow_mut().withdraw(id);
                run_waiters(waiters);
                return None;
            }
        };

        if self.inner.options.dump_protocol_messages {
            info!(target: PROTOCOL_TARGET, direction = "outbound", payload = %message, "protocol message");
        }
        self.inner.transport.send_message(message);
        Some(id)
    }

    /// Processes one inbound message.
    ///
    /// Responses fire their pending callback; events reach the handler bound
    /// to their domain. Anything that cannot be processed is logged and
    /// reported as [`DispatchOutcome::Rejected`].
    pub fn dispatch(&self, message: impl Into<InboundMessage>) -> DispatchOutcome {
        let message = message.into();
        if self.inner.options.dump_protocol_messages {
            info!(target: PROTOCOL_TARGET, direction = "inbound", payload = %message, "protocol message");
        }

        let outcome = match codec::decode(message) {
            Ok(Inbound::Response(response)) => self.dispatch_response(response),
            Ok(Inbound::Event(event)) => self.dispatch_event(event),
            Err(error) => DispatchOutcome::Rejected(error),
        };

        if let DispatchOutcome::Rejected(error) = &outcome {
            error!(target: DISPATCH_TARGET, %error, "inbound message dropped");
        }
        outcome
    }

    fn dispatch_response(&self, response: ResponseMessage) -> DispatchOutcome {
        let pending = self.inner.correlator.borrow_mut().take(response.id);
        let Some(PendingCall {
            id,
            method,
            callback,
            reply_mode,
            sent_at,
        }) = pending
        else {
            debug!(
                target: DISPATCH_TARGET,
                call_id = response.id.get(),
                "response has no pending call"
            );
            return DispatchOutcome::Orphaned { id: response.id };
        };

        if let Some(backend_error) = &response.error {
            if backend_error.code == self.inner.options.suppressed_error_code {
                debug!(
                    target: DISPATCH_TARGET,
                    call_id = id.get(),
                    method = %method,
                    code = backend_error.code,
                    "suppressed backend error"
                );
            } else {
                error!(
                    target: DISPATCH_TARGET,
                    call_id = id.get(),
                    method = %method,
                    code = backend_error.code,
                    error_message = %backend_error.message,
                    "backend reported an error"
                );
            }
        }

        let payload = match reply_mode {
            ReplyMode::Raw => ReplyPayload::Raw(response.result),
            ReplyMode::Fields => ReplyPayload::Fields(self.reply_fields(&method, response.result.as_ref())),
        };

        let callback_started = sent_at.map(|_| Instant::now());
        callback(Reply {
            error: response.error,
            payload,
        });
        if let (Some(sent_at), Some(callback_started)) = (sent_at, callback_started) {
            info!(
                target: TIMING_TARGET,
                call_id = id.get(),
                method = %method,
                processing = ?callback_started.duration_since(sent_at),
                callback = ?callback_started.elapsed(),
                "response timing"
            );
        }

        let waiters = self.inner.correlator.borrow_mut().settle();
        run_waiters(waiters);
        DispatchOutcome::Responded { id }
    }

    fn reply_fields(&self, method: &str, result: Option<&Value>) -> Vec<Option<Value>> {
        let signature = self.inner.registry.borrow().command(method);
        signature.map_or_else(Vec::new, |signature| {
            signature
                .reply_fields()
                .iter()
                .map(|name| result.and_then(|object| object.get(name)).cloned())
                .collect()
        })
    }

    fn dispatch_event(&self, event: EventMessage) -> DispatchOutcome {
        let Some((domain, name)) = codec::split_method(&event.method) else {
            return DispatchOutcome::Rejected(DispatchError::invalid_method_name(&event.method));
        };

        let lookup = self.inner.dispatchers.borrow().lookup(domain, name);
        let handler = match lookup {
            Ok(handler) => handler,
            Err(error) => return DispatchOutcome::Rejected(error),
        };

        let schema = self.inner.registry.borrow().event(&event.method);
        let Some(schema) = schema else {
            return DispatchOutcome::Rejected(DispatchError::unspecified_event(&event.method));
        };

        let args = EventArgs::new(
            event.method.clone(),
            schema.positional_args(event.params.as_ref()),
        );
        let started = self.inner.options.dump_time_stats.then(Instant::now);
        handler(&args);
        if let Some(started) = started {
            info!(
                target: TIMING_TARGET,
                method = %event.method,
                elapsed = ?started.elapsed(),
                "event timing"
            );
        }

        DispatchOutcome::EventDelivered {
            method: event.method,
        }
    }

    /// Runs `callback` once every call sent so far has been answered.
    ///
    /// With nothing outstanding the callback, and any waiter queued before
    /// it, runs before this returns. Otherwise it runs when the outstanding
    /// count next reaches zero, even if that count includes calls sent after
    /// this one was queued.
    pub fn on_idle(&self, callback: impl FnOnce() + 'static) {
        let waiters = {
            let mut correlator = self.inner.correlator.borrow_mut();
            correlator.queue_idle(Box::new(callback));
            correlator.drain_if_idle()
        };
        run_waiters(waiters);
    }

    /// Runs queued idle waiters if nothing is outstanding.
    ///
    /// This is the callback-free form of [`Connection::on_idle`]. Waiters stay
    /// queued while calls are pending.
    pub fn drain_idle(&self) {
        let waiters = self.inner.correlator.borrow_mut().drain_if_idle();
        run_waiters(waiters);
    }

    /// Abandons every pending call without firing its callback.
    ///
    /// Idle waiters run afterwards since no answer can arrive any more.
    /// Identifiers keep counting up from where they were.
    pub fn disconnect(&self) {
        let (abandoned, waiters) = self.inner.correlator.borrow_mut().abandon_all();
        if abandoned > 0 {
            warn!(target: CONNECTION_TARGET, abandoned, "abandoned pending calls on disconnect");
        } else {
            debug!(target: CONNECTION_TARGET, "disconnected with no pending calls");
        }
        run_waiters(waiters);
    }

    /// Number of calls sent and not yet answered.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.inner.correlator.borrow().outstanding()
    }

    /// Identifiers of pending calls, in ascending order.
    #[must_use]
    pub fn pending_call_ids(&self) -> Vec<CallId> {
        self.inner.correlator.borrow().pending_ids()
    }

    /// Number of idle waiters still queued.
    #[must_use]
    pub fn idle_waiter_count(&self) -> usize {
        self.inner.correlator.borrow().idle_waiters()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Connection")
            .field("options", &self.inner.options)
            .field("domains", &self.registered_domains())
            .field("outstanding", &self.outstanding_count())
            .finish_non_exhaustive()
    }
}
