use thiserror::Error;

/// Errors raised by the host layer itself, as opposed to guest outcomes.
#[derive(Debug, Error)]
pub enum HostError {
  /// The engine (the sandbox primitive) could not be created.
  #[error("failed to create engine: {message}")]
  Engine { message: String },

  /// Component instantiation failed (missing imports, limits, start trap).
  #[error("instantiation failed: {message}")]
  Instantiation { message: String },

  /// A capability grant could not be parsed.
  #[error("invalid grant '{grant}': {message}")]
  InvalidGrant { grant: String, message: String },

  #[error("wasmtime error: {0}")]
  Wasmtime(#[from] wasmtime::Error),
}

impl HostError {
  pub fn engine(message: impl Into<String>) -> Self {
    Self::Engine {
      message: message.into(),
    }
  }

  pub fn instantiation(message: impl Into<String>) -> Self {
    Self::Instantiation {
      message: message.into(),
    }
  }

  pub fn invalid_grant(grant: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidGrant {
      grant: grant.into(),
      message: message.into(),
    }
  }
}
