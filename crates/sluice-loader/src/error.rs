use std::path::PathBuf;

use thiserror::Error;

/// Why a component binary was rejected.
///
/// A load error rejects only the component it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
  /// The bytes are not a valid component.
  #[error("malformed component binary: {message}")]
  MalformedBinary { message: String },

  /// The component exports no versioned interface, so it declares no world.
  #[error("component does not declare a world (no versioned interface exported)")]
  UndeclaredWorld,

  /// The component exports interfaces of more than one registered world.
  #[error("component declares more than one world: {}", worlds.join(", "))]
  AmbiguousWorld { worlds: Vec<String> },

  /// The declared world is not registered.
  #[error("unknown world '{world}'")]
  UnknownWorld { world: String },

  /// The declared world exists but its version is not accepted.
  #[error("world '{declared}' is not compatible with '{supported}'")]
  IncompatibleWorld { declared: String, supported: String },

  /// A required function is absent or has the wrong signature.
  #[error("missing export '{function}': {message}")]
  MissingExport { function: String, message: String },

  /// The component imports something the host does not provide to its world.
  #[error("disallowed import '{import}': {message}")]
  DisallowedImport { import: String, message: String },

  /// The component file could not be read.
  #[error("failed to read component '{}': {message}", path.display())]
  Unreadable { path: PathBuf, message: String },
}

impl LoadError {
  pub fn malformed(message: impl Into<String>) -> Self {
    Self::MalformedBinary {
      message: message.into(),
    }
  }

  pub fn missing_export(function: impl Into<String>, message: impl Into<String>) -> Self {
    Self::MissingExport {
      function: function.into(),
      message: message.into(),
    }
  }

  pub fn disallowed_import(import: impl Into<String>, message: impl Into<String>) -> Self {
    Self::DisallowedImport {
      import: import.into(),
      message: message.into(),
    }
  }

  pub fn incompatible(declared: impl ToString, supported: impl ToString) -> Self {
    Self::IncompatibleWorld {
      declared: declared.to_string(),
      supported: supported.to_string(),
    }
  }
}
