//! Pending-call bookkeeping.
//!
//! The correlator hands out call identifiers, keeps exactly one
//! [`PendingCall`] per identifier, and counts calls that are still waiting
//! for an answer. It also owns the idle barrier, which is released whenever
//! that count transitions to zero.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde_json::Value;

use crate::codec::{BackendError, CallId};
use crate::idle::{IdleBarrier, IdleCallback};

/// Callback invoked exactly once with the answer to a call.
pub type ResponseCallback = Box<dyn FnOnce(Reply)>;

/// Answer delivered to a [`ResponseCallback`].
///
/// The error always comes first, mirroring the error-first convention of the
/// wire protocol; the payload is present even when the call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Error reported by the backend, if any.
    pub error: Option<BackendError>,
    /// Values returned by the backend.
    pub payload: ReplyPayload,
}

impl Reply {
    /// Returns the reply field at `index`, if the call was made through the
    /// positional form and the backend supplied that field.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Value> {
        match &self.payload {
            ReplyPayload::Fields(fields) => fields.get(index).and_then(Option::as_ref),
            ReplyPayload::Raw(_) => None,
        }
    }

    /// Whether the backend reported an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Shape of the values handed to a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// One slot per registered reply field, in registration order. A field
    /// the backend left out is `None`, so the arity never changes.
    Fields(Vec<Option<Value>>),
    /// The result object exactly as received.
    Raw(Option<Value>),
}

/// How a response's result is handed to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyMode {
    /// Read registered reply fields off the result, in order.
    Fields,
    /// Pass the result object through untouched.
    Raw,
}

/// Record kept for every call awaiting its response.
pub(crate) struct PendingCall {
    pub(crate) id: CallId,
    pub(crate) method: String,
    pub(crate) callback: ResponseCallback,
    pub(crate) reply_mode: ReplyMode,
    pub(crate) sent_at: Option<Instant>,
}

/// Allocates identifiers and tracks outstanding calls.
pub(crate) struct Correlator {
    next_id: u64,
    pending: HashMap<CallId, PendingCall>,
    outstanding: usize,
    idle: IdleBarrier,
}

impl Correlator {
    /// Creates a correlator whose first identifier is 1.
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
            outstanding: 0,
            idle: IdleBarrier::default(),
        }
    }

    /// Registers a call about to be sent and returns its identifier.
    ///
    /// A missing callback is replaced by a no-op so every pending call has
    /// something to fire. The outstanding count grows by one.
    pub(crate) fn wrap(
        &mut self,
        callback: Option<ResponseCallback>,
        method: &str,
        reply_mode: ReplyMode,
        sent_at: Option<Instant>,
    ) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id += 1;
        let callback = callback.unwrap_or_else(|| Box::new(|_| {}));
        self.pending.insert(
            id,
            PendingCall {
                id,
                method: method.to_owned(),
                callback,
                reply_mode,
                sent_at,
            },
        );
        self.outstanding += 1;
        id
    }

    /// Removes the pending record for `id` without settling it.
    ///
    /// Returns `None` for identifiers that were never issued or have already
    /// been answered.
    pub(crate) fn take(&mut self, id: CallId) -> Option<PendingCall> {
        self.pending.remove(&id)
    }

    /// Marks one taken call as answered.
    ///
    /// Returns the idle waiters to run when this brought the outstanding
    /// count to zero.
    pub(crate) fn settle(&mut self) -> VecDeque<IdleCallback> {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.drain_if_idle()
    }

    /// Withdraws a call that never reached the wire.
    pub(crate) fn withdraw(&mut self, id: CallId) -> VecDeque<IdleCallback> {
        if self.pending.remove(&id).is_some() {
            return self.settle();
        }
        VecDeque::new()
    }

    /// Queues an idle waiter.
    pub(crate) fn queue_idle(&mut self, callback: IdleCallback) {
        self.idle.push(callback);
    }

    /// Takes every idle waiter if no call is outstanding.
    pub(crate) fn drain_if_idle(&mut self) -> VecDeque<IdleCallback> {
        if self.outstanding == 0 {
            self.idle.take_all()
        } else {
            VecDeque::new()
        }
    }

    /// Drops every pending call without firing it.
    ///
    /// Returns the number of abandoned calls and the idle waiters released by
    /// the outstanding count returning to zero. The identifier counter keeps
    /// running so abandoned identifiers are never reissued.
    pub(crate) fn abandon_all(&mut self) -> (usize, VecDeque<IdleCallback>) {
        let abandoned = self.pending.len();
        self.pending.clear();
        self.outstanding = 0;
        (abandoned, self.idle.take_all())
    }

    /// Number of calls sent and not yet answered.
    pub(crate) const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Identifiers of pending calls, in ascending order.
    pub(crate) fn pending_ids(&self) -> Vec<CallId> {
        let mut ids: Vec<CallId> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of queued idle waiters.
    pub(crate) fn idle_waiters(&self) -> usize {
        self.idle.len()
    }
}
