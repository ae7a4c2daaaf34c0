use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A component binary to load at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
  /// Name bindings refer to, e.g. "orders-handler".
  pub id: String,
  /// Path to the component file. Relative paths are resolved against the
  /// directory of the config file.
  pub path: PathBuf,
}
