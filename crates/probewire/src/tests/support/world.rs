//! BDD test world: a connection, its recorder, and everything callbacks saw.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Value, json};

use super::{RecordingTransport, connection_with_protocol};
use crate::{
    CallId, Connection, ConnectionOptions, DispatchOutcome, DomainDispatcher, EventArgs, Reply,
};

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub transport: RecordingTransport,
    pub connection: Connection,
    /// `(label, reply)` for every callback that fired.
    pub replies: Rc<RefCell<Vec<(String, Reply)>>>,
    /// `(handler label, args)` for every delivered event.
    pub events: Rc<RefCell<Vec<(String, EventArgs)>>>,
    pub idle_runs: Rc<Cell<usize>>,
    pub last_call: Option<Option<CallId>>,
    pub last_outcome: Option<DispatchOutcome>,
}

impl TestWorld {
    /// Builds a world with the shared test protocol registered.
    pub fn new() -> Self {
        let transport = RecordingTransport::default();
        let connection = connection_with_protocol(&transport, ConnectionOptions::default());
        Self {
            transport,
            connection,
            replies: Rc::new(RefCell::new(Vec::new())),
            events: Rc::new(RefCell::new(Vec::new())),
            idle_runs: Rc::new(Cell::new(0)),
            last_call: None,
            last_outcome: None,
        }
    }

    /// Calls `Math.add` with `args`, labelling the callback.
    pub fn call_add(&mut self, label: &str, args: &[Value]) {
        let sink = Rc::clone(&self.replies);
        let label = label.to_owned();
        let stub = self
            .connection
            .agent("Math")
            .and_then(|agent| agent.command("add"))
            .expect("Math.add is registered");
        self.last_call = Some(stub.call(
            args,
            Some(Box::new(move |reply| sink.borrow_mut().push((label, reply)))),
        ));
    }

    /// Answers the call sent as envelope `index` with `sum`.
    pub fn answer(&mut self, index: usize, sum: i64) {
        let id = self.transport.id(index);
        self.last_outcome = Some(
            self.connection
                .dispatch(json!({"id": id, "result": {"sum": sum}})),
        );
    }

    /// Binds a recording handler for `Network` events.
    pub fn bind_network_handler(&self, label: &str) {
        let sink = Rc::clone(&self.events);
        let label = label.to_owned();
        self.connection.register_domain_dispatcher(
            "Network",
            DomainDispatcher::new().with_method("dataReceived", move |args: &EventArgs| {
                sink.borrow_mut().push((label.clone(), args.clone()));
            }),
        );
    }

    /// Queues an idle waiter that counts its runs.
    pub fn queue_idle(&self) {
        let runs = Rc::clone(&self.idle_runs);
        self.connection.on_idle(move || runs.set(runs.get() + 1));
    }

    /// Labels of the callbacks that fired, in firing order.
    pub fn reply_labels(&self) -> Vec<String> {
        self.replies
            .borrow()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }
}
