use serde::{Deserialize, Serialize};

/// How execution instances are provided to invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolingMode {
  /// A fresh instance per invocation, torn down afterwards.
  #[default]
  None,
  /// Keep idle instances per component for worlds that allow reuse.
  Warm,
}
