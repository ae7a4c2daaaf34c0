use std::time::Duration;

use sluice_host::LimitBreach;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
  /// No instance slot became free within the queue wait.
  #[error("overloaded: no instance slot free within {}ms", waited.as_millis())]
  Overloaded { waited: Duration },

  /// The component needs more memory than the ceiling allows just to start.
  #[error("resource limit exceeded during instantiation: {breach}")]
  ResourceLimitExceeded { breach: LimitBreach },

  /// Instantiation did not finish within the budget. The store was dropped.
  #[error("instantiation timed out after {}ms", budget.as_millis())]
  TimedOut { budget: Duration },

  /// Host imports could not be linked for the component.
  #[error("failed to link component '{digest}': {message}")]
  Link { digest: String, message: String },

  #[error("instantiation failed: {message}")]
  Instantiation { message: String },

  #[error("instance pool is closed")]
  Closed,
}

impl PoolError {
  pub fn instantiation(message: impl Into<String>) -> Self {
    Self::Instantiation {
      message: message.into(),
    }
  }
}
