//! World contracts.

use std::collections::BTreeMap;

use crate::names::InterfaceName;
use crate::signature::FunctionSignature;
use crate::source::TriggerKind;
use crate::version::WorldVersion;

/// Package that hosts every capability interface a guest may import.
pub const HOST_PACKAGE: &str = "sluice:host";

/// Interface that every built-in world exports its handlers from.
pub const HANDLER_INTERFACE: &str = "handler";

/// Host capability interfaces a component may import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostInterface {
  /// `sluice:host/log`: structured logging into the host's log stream.
  Log,
  /// `sluice:host/outbound`: publish to topics and make outbound requests,
  /// subject to the binding's grants.
  Outbound,
}

impl HostInterface {
  pub const ALL: [HostInterface; 2] = [Self::Log, Self::Outbound];

  pub fn interface(&self) -> &'static str {
    match self {
      Self::Log => "log",
      Self::Outbound => "outbound",
    }
  }

  /// Resolve an imported interface name to a host capability.
  pub fn from_import(name: &InterfaceName) -> Option<Self> {
    if name.package != HOST_PACKAGE {
      return None;
    }
    Self::ALL
      .into_iter()
      .find(|iface| iface.interface() == name.interface)
  }
}

/// A named, versioned set of exported functions a component must provide and
/// host capabilities it may import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldContract {
  /// World name, `namespace:package`.
  pub name: String,
  /// The current generation this host supports.
  pub version: WorldVersion,
  /// Interface that required functions are exported from.
  pub export_interface: String,
  /// Functions that must be exported, keyed by kebab-case name.
  pub required: BTreeMap<String, FunctionSignature>,
  /// Signature every bindable handler in this world must have.
  pub handler_signature: FunctionSignature,
  /// Capability interfaces the component may import.
  pub allowed_imports: Vec<HostInterface>,
  /// Whether a warm pool may reuse an instance across invocations, keeping
  /// the guest's own memory between events.
  pub allows_instance_reuse: bool,
}

impl WorldContract {
  /// Create a contract with no required functions, exporting from
  /// [`HANDLER_INTERFACE`] and allowed to import every host capability.
  pub fn new(name: impl Into<String>, version: WorldVersion) -> Self {
    Self {
      name: name.into(),
      version,
      export_interface: HANDLER_INTERFACE.to_string(),
      required: BTreeMap::new(),
      handler_signature: FunctionSignature::handler(),
      allowed_imports: HostInterface::ALL.to_vec(),
      allows_instance_reuse: false,
    }
  }

  pub fn require(mut self, function: impl Into<String>, signature: FunctionSignature) -> Self {
    self.required.insert(function.into(), signature);
    self
  }

  pub fn with_allowed_imports(mut self, imports: impl IntoIterator<Item = HostInterface>) -> Self {
    self.allowed_imports = imports.into_iter().collect();
    self
  }

  pub fn with_instance_reuse(mut self, allowed: bool) -> Self {
    self.allows_instance_reuse = allowed;
    self
  }

  /// The fully qualified export interface name at the current generation.
  pub fn export_interface_name(&self) -> InterfaceName {
    InterfaceName::new(&self.name, &self.export_interface, self.version.clone())
  }

  pub fn allows_import(&self, iface: HostInterface) -> bool {
    self.allowed_imports.contains(&iface)
  }

  /// The built-in contract for a trigger kind at the given generation.
  pub fn builtin(kind: TriggerKind, version: WorldVersion) -> Self {
    match kind {
      TriggerKind::Http => {
        Self::new("sluice:http", version).require("handle-request", FunctionSignature::handler())
      }
      TriggerKind::Message => Self::new("sluice:message", version)
        .require("on-message", FunctionSignature::handler())
        .with_instance_reuse(true),
      TriggerKind::Timer => Self::new("sluice:timer", version)
        .require("on-tick", FunctionSignature::handler())
        .with_instance_reuse(true),
      TriggerKind::Custom => Self::new("sluice:custom", version),
    }
  }
}
