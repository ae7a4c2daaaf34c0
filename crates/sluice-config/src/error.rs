use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{}': {message}", path.display())]
  Read { path: PathBuf, message: String },

  #[error("failed to parse config: {message}")]
  Parse { message: String },

  #[error("invalid config at {field}: {message}")]
  Invalid { field: String, message: String },
}

impl ConfigError {
  pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Invalid {
      field: field.into(),
      message: message.into(),
    }
  }
}
