use thiserror::Error;

/// Errors raised while parsing world identifiers or building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
  /// A version string did not have the form `major.minor.patch[-pre]`.
  #[error("invalid world version '{input}': {message}")]
  InvalidVersion { input: String, message: String },

  /// An interface name did not have the form `ns:pkg/iface@version`.
  #[error("invalid interface name '{input}': {message}")]
  InvalidInterfaceName { input: String, message: String },

  /// A source identity did not have the form `kind:name`.
  #[error("invalid source identity '{input}': {message}")]
  InvalidSource { input: String, message: String },

  /// No contract is registered under the given world name.
  #[error("world not found: {0}")]
  NotFound(String),

  /// Two contracts were registered under the same world name.
  #[error("world '{0}' registered more than once")]
  DuplicateWorld(String),
}

impl WorldError {
  pub(crate) fn invalid_version(input: &str, message: impl Into<String>) -> Self {
    Self::InvalidVersion {
      input: input.to_string(),
      message: message.into(),
    }
  }

  pub(crate) fn invalid_interface(input: &str, message: impl Into<String>) -> Self {
    Self::InvalidInterfaceName {
      input: input.to_string(),
      message: message.into(),
    }
  }

  pub(crate) fn invalid_source(input: &str, message: impl Into<String>) -> Self {
    Self::InvalidSource {
      input: input.to_string(),
      message: message.into(),
    }
  }
}
