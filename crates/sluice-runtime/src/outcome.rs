//! Translating raw guest call results into invocation outcomes.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use sluice_host::{CapabilityDenied, LimitBreach};
use sluice_pool::Disposition;
use wasmtime::Trap;

/// Where an invocation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPhase {
  Pending,
  Dispatched,
  Succeeded,
  AppError,
  Faulted,
  TimedOut,
  ResourceLimitExceeded,
  CapabilityDenied,
}

impl InvocationPhase {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::Pending | Self::Dispatched)
  }
}

/// The terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
  /// The guest returned `ok`.
  Succeeded(Vec<u8>),
  /// The guest returned `err`. Not retried.
  AppError(String),
  /// The guest trapped or the host failed to run it.
  Faulted(String),
  /// The wall-clock budget ran out.
  TimedOut { budget: Duration },
  /// The guest hit its memory ceiling.
  ResourceLimitExceeded(String),
  /// The guest used a capability its binding does not grant.
  CapabilityDenied(String),
}

impl InvocationOutcome {
  pub fn phase(&self) -> InvocationPhase {
    match self {
      Self::Succeeded(_) => InvocationPhase::Succeeded,
      Self::AppError(_) => InvocationPhase::AppError,
      Self::Faulted(_) => InvocationPhase::Faulted,
      Self::TimedOut { .. } => InvocationPhase::TimedOut,
      Self::ResourceLimitExceeded(_) => InvocationPhase::ResourceLimitExceeded,
      Self::CapabilityDenied(_) => InvocationPhase::CapabilityDenied,
    }
  }

  /// Only instances that finished cleanly may be reused.
  pub fn disposition(&self) -> Disposition {
    match self {
      Self::Succeeded(_) | Self::AppError(_) => Disposition::Reusable,
      _ => Disposition::Discard,
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Self::Succeeded(_))
  }
}

impl fmt::Display for InvocationOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Succeeded(bytes) => write!(f, "succeeded ({} bytes)", bytes.len()),
      Self::AppError(detail) => write!(f, "application error: {}", detail),
      Self::Faulted(reason) => write!(f, "faulted: {}", reason),
      Self::TimedOut { budget } => write!(f, "timed out after {}ms", budget.as_millis()),
      Self::ResourceLimitExceeded(detail) => write!(f, "resource limit exceeded: {}", detail),
      Self::CapabilityDenied(detail) => write!(f, "{}", detail),
    }
  }
}

/// How the guest call ended, before translation.
#[derive(Debug)]
pub enum CallResult {
  /// The handler returned.
  Returned(Result<Vec<u8>, String>),
  /// The call trapped or failed in the host.
  Failed(wasmtime::Error),
  /// The budget timer fired and the call was dropped.
  Expired,
  /// The invocation task panicked.
  Panicked(String),
}

/// Everything the translator looks at.
#[derive(Debug)]
pub struct CallReport {
  pub result: CallResult,
  pub elapsed: Duration,
  pub budget: Duration,
  pub denial: Option<CapabilityDenied>,
  pub breach: Option<LimitBreach>,
}

/// Turn a call report into an outcome.
///
/// An expired budget wins over everything; a call that returns exactly at
/// the budget has timed out. Then memory ceiling breaches, then capability
/// denials, then what the guest returned. Any other failure is a fault.
pub fn translate(report: CallReport) -> InvocationOutcome {
  let CallReport {
    result,
    elapsed,
    budget,
    denial,
    breach,
  } = report;

  if matches!(result, CallResult::Expired) || elapsed >= budget {
    return InvocationOutcome::TimedOut { budget };
  }

  let result = match result {
    CallResult::Panicked(message) => {
      return InvocationOutcome::Faulted(format!("invocation panicked: {}", message));
    }
    other => other,
  };

  if let Some(breach) = breach {
    return InvocationOutcome::ResourceLimitExceeded(breach.to_string());
  }

  if let Some(denial) = denial {
    return InvocationOutcome::CapabilityDenied(denial.to_string());
  }

  match result {
    CallResult::Returned(Ok(bytes)) => InvocationOutcome::Succeeded(bytes),
    CallResult::Returned(Err(detail)) => InvocationOutcome::AppError(detail),
    CallResult::Failed(error) => failure(error, budget),
    CallResult::Expired => InvocationOutcome::TimedOut { budget },
    CallResult::Panicked(message) => InvocationOutcome::Faulted(message),
  }
}

fn failure(error: wasmtime::Error, budget: Duration) -> InvocationOutcome {
  if let Some(denied) = error.downcast_ref::<CapabilityDenied>() {
    return InvocationOutcome::CapabilityDenied(denied.to_string());
  }
  if let Some(breach) = error.downcast_ref::<LimitBreach>() {
    return InvocationOutcome::ResourceLimitExceeded(breach.to_string());
  }
  match error.downcast_ref::<Trap>() {
    Some(Trap::Interrupt) => InvocationOutcome::TimedOut { budget },
    Some(Trap::OutOfFuel) => InvocationOutcome::ResourceLimitExceeded(Trap::OutOfFuel.to_string()),
    Some(trap) => InvocationOutcome::Faulted(format!("trap: {}", trap)),
    None => InvocationOutcome::Faulted(format!("{:#}", error)),
  }
}
