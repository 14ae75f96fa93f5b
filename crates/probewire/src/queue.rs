//! Batching of inbound messages for deferred delivery.
//!
//! Hosts that must not re-enter the engine from inside their receive path
//! queue messages here and flush the batch on their next turn.

use std::collections::VecDeque;
use std::mem;

use crate::codec::InboundMessage;
use crate::connection::{Connection, DispatchOutcome};

/// FIFO buffer of inbound messages awaiting dispatch.
#[derive(Debug, Default)]
pub struct InboundQueue {
    messages: VecDeque<InboundMessage>,
}

impl InboundQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message.
    ///
    /// Returns `true` when the message starts a new batch, meaning the host
    /// should schedule a [`flush`](Self::flush).
    pub fn enqueue(&mut self, message: impl Into<InboundMessage>) -> bool {
        let starts_batch = self.messages.is_empty();
        self.messages.push_back(message.into());
        starts_batch
    }

    /// Dispatches every queued message in arrival order.
    ///
    /// The batch is detached before dispatching, so messages queued by
    /// handlers during the flush start a new batch.
    pub fn flush(&mut self, connection: &Connection) -> Vec<DispatchOutcome> {
        mem::take(&mut self.messages)
            .into_iter()
            .map(|message| connection.dispatch(message))
            .collect()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{ConnectionOptions, DomainDispatcher, EventArgs};

    #[rstest]
    fn only_the_first_message_schedules_a_flush() {
        let mut queue = InboundQueue::new();
        assert!(queue.enqueue(r#"{"id":1}"#));
        assert!(!queue.enqueue(r#"{"id":2}"#));
        assert_eq!(queue.len(), 2);
    }

    #[rstest]
    fn flush_dispatches_in_order_and_starts_a_new_batch() {
        let connection = Connection::new(|_message: String| {}, ConnectionOptions::default());
        connection
            .register_event("Page.frameNavigated", vec![String::from("frameId")])
            .expect("register event");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        connection.register_domain_dispatcher(
            "Page",
            DomainDispatcher::new().with_method("frameNavigated", move |args: &EventArgs| {
                sink.borrow_mut().push(args.get(0).cloned());
            }),
        );

        let mut queue = InboundQueue::new();
        queue.enqueue(json!({"method": "Page.frameNavigated", "params": {"frameId": "a"}}));
        queue.enqueue(json!({"method": "Page.frameNavigated", "params": {"frameId": "b"}}));
        queue.enqueue("not json");

        let outcomes = queue.flush(&connection);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[2].is_rejected());
        assert_eq!(*seen.borrow(), vec![Some(json!("a")), Some(json!("b"))]);
        assert!(queue.is_empty());
        assert!(queue.enqueue(r#"{"id":9}"#));
    }
}
