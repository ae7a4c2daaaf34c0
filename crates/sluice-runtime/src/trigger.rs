//! Trigger adapters: mapping dispatch results to what each kind of event
//! source expects back.

use sluice_world::{SourceId, TriggerKind};

use crate::error::DispatchError;
use crate::outcome::InvocationOutcome;
use crate::record::InvocationRecord;

/// The closed set of trigger kinds, as adapters see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
  Http,
  Message,
  Timer,
  Custom,
}

/// What a message source should do with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
  Ack,
  /// Reject the message. `requeue` asks the broker to redeliver it later.
  Nack { requeue: bool },
}

/// How a timer tick ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
  Completed,
  /// No instance was free; the tick was dropped.
  Skipped,
  Failed(String),
}

/// The source-appropriate answer to a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
  Http { status: u16, body: Vec<u8> },
  Message(Delivery),
  Timer(TickStatus),
  /// Custom sources get the outcome, or the dispatch error message.
  Custom(Result<InvocationOutcome, String>),
}

impl Trigger {
  pub fn for_source(source: &SourceId) -> Self {
    match source.kind() {
      TriggerKind::Http => Self::Http,
      TriggerKind::Message => Self::Message,
      TriggerKind::Timer => Self::Timer,
      TriggerKind::Custom => Self::Custom,
    }
  }

  pub fn signal(&self, result: &Result<InvocationRecord, DispatchError>) -> Signal {
    match self {
      Self::Http => http_signal(result),
      Self::Message => Signal::Message(match result {
        Ok(record) if record.outcome.is_success() => Delivery::Ack,
        Err(DispatchError::Overloaded { .. }) => Delivery::Nack { requeue: true },
        _ => Delivery::Nack { requeue: false },
      }),
      Self::Timer => Signal::Timer(match result {
        Ok(record) if record.outcome.is_success() => TickStatus::Completed,
        Ok(record) => TickStatus::Failed(record.outcome.to_string()),
        Err(DispatchError::Overloaded { .. }) => TickStatus::Skipped,
        Err(e) => TickStatus::Failed(e.to_string()),
      }),
      Self::Custom => Signal::Custom(match result {
        Ok(record) => Ok(record.outcome.clone()),
        Err(e) => Err(e.to_string()),
      }),
    }
  }
}

fn http_signal(result: &Result<InvocationRecord, DispatchError>) -> Signal {
  let (status, body) = match result {
    Ok(record) => match &record.outcome {
      InvocationOutcome::Succeeded(body) => (200, body.clone()),
      InvocationOutcome::AppError(detail) => (500, detail.clone().into_bytes()),
      InvocationOutcome::TimedOut { .. } => (504, b"handler timed out".to_vec()),
      _ => (500, b"internal error".to_vec()),
    },
    Err(DispatchError::NoBindingFound { .. }) => (404, b"not found".to_vec()),
    Err(DispatchError::Overloaded { .. }) => (503, b"overloaded".to_vec()),
    Err(_) => (500, b"internal error".to_vec()),
  };
  Signal::Http { status, body }
}
