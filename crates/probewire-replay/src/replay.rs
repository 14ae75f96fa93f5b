//! Drives a transcript through a connection and records delivered events.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use probewire::{
    Connection, ConnectionOptions, DispatchOutcome, DomainDispatcher, EventArgs, InboundQueue,
    ProtocolDescription,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;

const REPLAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::replay");

/// One event as delivered to its domain handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RecordedEvent {
    pub(crate) method: String,
    pub(crate) arguments: Vec<Value>,
}

impl From<&EventArgs> for RecordedEvent {
    fn from(args: &EventArgs) -> Self {
        Self {
            method: args.method().to_owned(),
            arguments: args
                .values()
                .iter()
                .map(|slot| slot.clone().unwrap_or(Value::Null))
                .collect(),
        }
    }
}

/// Counts of what happened to the transcript's messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReplaySummary {
    pub(crate) delivered: usize,
    pub(crate) orphaned: usize,
    pub(crate) rejected: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::EventDelivered { .. } | DispatchOutcome::Responded { .. } => {
                self.delivered += 1;
            }
            DispatchOutcome::Orphaned { .. } => self.orphaned += 1,
            DispatchOutcome::Rejected(_) => self.rejected += 1,
        }
    }
}

/// Replays `transcript` against `description`, writing one JSON line per
/// delivered event to `output`.
pub(crate) fn replay<W: Write>(
    description: &ProtocolDescription,
    transcript: &str,
    options: ConnectionOptions,
    output: &mut W,
) -> Result<ReplaySummary, AppError> {
    let connection = Connection::new(
        |message: String| {
            debug!(target: REPLAY_TARGET, payload = %message, "outbound message discarded");
        },
        options,
    );
    connection.load_protocol(description)?;

    let recorded = Rc::new(RefCell::new(Vec::new()));
    for domain in &description.domains {
        if domain.events.is_empty() {
            continue;
        }
        let mut dispatcher = DomainDispatcher::new();
        for event in &domain.events {
            let sink = Rc::clone(&recorded);
            dispatcher.insert(event.name.clone(), move |args: &EventArgs| {
                sink.borrow_mut().push(RecordedEvent::from(args));
            });
        }
        connection.register_domain_dispatcher(&domain.domain, dispatcher);
    }

    let mut queue = InboundQueue::new();
    for line in transcript.lines().map(str::trim).filter(|line| !line.is_empty()) {
        queue.enqueue(line);
    }
    let mut summary = ReplaySummary::default();
    for outcome in queue.flush(&connection) {
        summary.record(&outcome);
    }

    for event in recorded.borrow().iter() {
        let line = serde_json::to_string(event).map_err(AppError::SerialiseEvent)?;
        writeln!(output, "{line}").map_err(AppError::WriteOutput)?;
    }

    info!(
        target: REPLAY_TARGET,
        delivered = summary.delivered,
        orphaned = summary.orphaned,
        rejected = summary.rejected,
        "transcript replayed"
    );
    Ok(summary)
}
