//! Events and invocation records.

use std::time::{Duration, Instant, SystemTime};

use sluice_world::SourceId;
use tracing::debug;

use crate::outcome::{InvocationOutcome, InvocationPhase};

/// An event handed to the dispatcher by a trigger adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  pub source: SourceId,
  pub payload: Vec<u8>,
  /// Correlation id supplied by the adapter. A UUID is generated when absent.
  pub correlation_id: Option<String>,
}

impl Event {
  pub fn new(source: SourceId, payload: impl Into<Vec<u8>>) -> Self {
    Self {
      source,
      payload: payload.into(),
      correlation_id: None,
    }
  }

  pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
    self.correlation_id = Some(id.into());
    self
  }
}

/// The record of one finished invocation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
  pub invocation_id: String,
  pub source: SourceId,
  pub component: String,
  pub started_at: SystemTime,
  pub elapsed: Duration,
  pub phase: InvocationPhase,
  pub outcome: InvocationOutcome,
}

/// An invocation still in flight. Moves through `Pending` and `Dispatched`
/// and ends as an [`InvocationRecord`].
pub(crate) struct Invocation {
  pub(crate) invocation_id: String,
  source: SourceId,
  component: String,
  started_at: SystemTime,
  start: Instant,
  phase: InvocationPhase,
}

impl Invocation {
  pub(crate) fn pending(invocation_id: String, source: SourceId, component: String) -> Self {
    Self {
      invocation_id,
      source,
      component,
      started_at: SystemTime::now(),
      start: Instant::now(),
      phase: InvocationPhase::Pending,
    }
  }

  pub(crate) fn dispatched(&mut self) {
    self.phase = InvocationPhase::Dispatched;
    debug!(phase = ?self.phase, "invocation_dispatched");
  }

  pub(crate) fn elapsed(&self) -> Duration {
    self.start.elapsed()
  }

  pub(crate) fn finish(self, outcome: InvocationOutcome) -> InvocationRecord {
    InvocationRecord {
      elapsed: self.start.elapsed(),
      invocation_id: self.invocation_id,
      source: self.source,
      component: self.component,
      started_at: self.started_at,
      phase: outcome.phase(),
      outcome,
    }
  }
}
