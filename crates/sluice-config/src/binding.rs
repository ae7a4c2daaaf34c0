use serde::{Deserialize, Serialize};
use sluice_world::{SourceId, WorldError};

/// Capabilities granted to a binding. Nothing is granted by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesDef {
  /// Allowed outbound hosts, `scheme://host[:port]` with `*` wildcards.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub outbound_hosts: Vec<String>,
  /// Topics the component may publish to. `*` and `prefix.*` are wildcards.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub topics: Vec<String>,
}

/// Maps an event source to a component handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDef {
  /// Source identity, `kind:name`, e.g. "queue:inbox".
  pub source: String,
  /// Id of a configured component.
  pub component: String,
  /// Exported handler name, e.g. "on_message".
  pub handler: String,
  #[serde(default)]
  pub capabilities: CapabilitiesDef,
  /// Serialise invocations from this source in arrival order.
  #[serde(default)]
  pub ordered: bool,
  /// Tick interval, required for timer sources.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub interval_ms: Option<u64>,
}

impl BindingDef {
  pub fn source_id(&self) -> Result<SourceId, WorldError> {
    self.source.parse()
  }
}
