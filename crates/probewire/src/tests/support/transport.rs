//! Transport that records every envelope it is handed.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::Transport;

/// Clonable recorder; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Rc<RefCell<Vec<String>>>,
}

impl RecordingTransport {
    /// Number of envelopes sent so far.
    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    /// Raw envelope at `index`.
    pub fn raw(&self, index: usize) -> String {
        self.sent.borrow()[index].clone()
    }

    /// Parsed envelope at `index`.
    pub fn envelope(&self, index: usize) -> Value {
        serde_json::from_str(&self.raw(index)).expect("envelopes are valid JSON")
    }

    /// Identifier carried by the envelope at `index`.
    pub fn id(&self, index: usize) -> u64 {
        self.envelope(index)["id"].as_u64().expect("envelope id")
    }
}

impl Transport for RecordingTransport {
    fn send_message(&self, message: String) {
        self.sent.borrow_mut().push(message);
    }
}
