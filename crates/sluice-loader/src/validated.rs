use std::fmt;

use sluice_world::{HostInterface, WorldContract, WorldVersion, kebab_name};
use wasmtime::component::Component;

use crate::error::LoadError;
use crate::introspect::ExportedFunction;

/// The world a component declares through its exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredWorld {
  pub name: String,
  pub version: WorldVersion,
}

impl fmt::Display for DeclaredWorld {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.name, self.version)
  }
}

/// A host capability interface a component imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostImport {
  /// The import name exactly as the component spells it.
  pub name: String,
  pub interface: HostInterface,
}

/// A resolved handler: the exported instance and function to call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
  pub interface: String,
  pub function: String,
}

impl fmt::Display for HandlerRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.interface, self.function)
  }
}

/// A component that compiled and satisfies its world contract.
///
/// Immutable; cloning shares the compiled component.
#[derive(Clone)]
pub struct ValidatedComponent {
  pub(crate) digest: String,
  pub(crate) world: DeclaredWorld,
  pub(crate) exports: Vec<ExportedFunction>,
  pub(crate) imports: Vec<HostImport>,
  pub(crate) allows_instance_reuse: bool,
  pub(crate) component: Component,
}

impl ValidatedComponent {
  pub fn digest(&self) -> &str {
    &self.digest
  }

  pub fn world(&self) -> &DeclaredWorld {
    &self.world
  }

  /// Exactly the functions the binary exports.
  pub fn exports(&self) -> &[ExportedFunction] {
    &self.exports
  }

  pub fn imports(&self) -> &[HostImport] {
    &self.imports
  }

  /// Whether the world contract lets a warm pool keep instances of this
  /// component across invocations.
  pub fn allows_instance_reuse(&self) -> bool {
    self.allows_instance_reuse
  }

  pub fn component(&self) -> &Component {
    &self.component
  }

  pub fn export(&self, interface: &str, function: &str) -> Option<&ExportedFunction> {
    self
      .exports
      .iter()
      .find(|export| export.interface == interface && export.name == function)
  }

  /// Resolve a handler name for a trigger whose world is `contract`.
  ///
  /// Names are matched in kebab case, so `on_message` finds `on-message`.
  pub fn resolve_handler(&self, contract: &WorldContract, name: &str) -> Result<HandlerRef, LoadError> {
    if self.world.name != contract.name {
      return Err(LoadError::incompatible(
        &self.world,
        format!("{}@{}", contract.name, contract.version),
      ));
    }

    let function = kebab_name(name);
    let interface = format!(
      "{}/{}@{}",
      self.world.name, contract.export_interface, self.world.version
    );
    let export = self.export(&interface, &function).ok_or_else(|| {
      LoadError::missing_export(&function, format!("not exported by '{}'", interface))
    })?;

    if export.signature != contract.handler_signature {
      return Err(LoadError::missing_export(
        &function,
        format!(
          "expected {}, found {}",
          contract.handler_signature, export.signature
        ),
      ));
    }

    Ok(HandlerRef {
      interface,
      function,
    })
  }
}

impl fmt::Debug for ValidatedComponent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ValidatedComponent")
      .field("digest", &self.digest)
      .field("world", &self.world)
      .field("exports", &self.exports)
      .field("imports", &self.imports)
      .field("allows_instance_reuse", &self.allows_instance_reuse)
      .finish_non_exhaustive()
  }
}
