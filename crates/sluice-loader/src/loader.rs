use std::path::Path;
use std::sync::Arc;

use sluice_world::{ContractRegistry, HostInterface, InterfaceName, WorldContract};
use tracing::{Span, info, instrument, warn};
use wasmtime::Engine;
use wasmtime::component::Component;

use crate::binary::ComponentBinary;
use crate::error::LoadError;
use crate::introspect;
use crate::validated::{DeclaredWorld, HostImport, ValidatedComponent};

/// Compiles component binaries and validates them against the registry.
///
/// Loading never instantiates or runs guest code.
#[derive(Clone)]
pub struct ComponentLoader {
  engine: Engine,
  registry: Arc<ContractRegistry>,
}

impl ComponentLoader {
  pub fn new(engine: Engine, registry: Arc<ContractRegistry>) -> Self {
    Self { engine, registry }
  }

  pub fn registry(&self) -> &ContractRegistry {
    &self.registry
  }

  /// Read a component file and load it.
  pub fn load_file(&self, path: &Path) -> Result<ValidatedComponent, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::Unreadable {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    self.load(ComponentBinary::new(bytes))
  }

  /// Compile and validate a component binary.
  #[instrument(name = "component_load", skip_all, fields(digest = %binary.digest(), world))]
  pub fn load(&self, binary: ComponentBinary) -> Result<ValidatedComponent, LoadError> {
    let result = self.load_inner(&binary);
    match &result {
      Ok(component) => {
        Span::current().record("world", tracing::field::display(component.world()));
        info!(
          exports = component.exports().len(),
          imports = component.imports().len(),
          "component_loaded"
        );
      }
      Err(e) => warn!(error = %e, "component_rejected"),
    }
    result
  }

  fn load_inner(&self, binary: &ComponentBinary) -> Result<ValidatedComponent, LoadError> {
    let component =
      Component::new(&self.engine, binary.bytes()).map_err(|e| LoadError::malformed(format!("{:#}", e)))?;

    let (world, contract) = self.declared_world(&component)?;
    let exports = introspect::exported_functions(&self.engine, &component);

    let interface = format!("{}/{}@{}", world.name, contract.export_interface, world.version);
    for (function, expected) in &contract.required {
      let export = exports
        .iter()
        .find(|e| e.interface == interface && &e.name == function)
        .ok_or_else(|| LoadError::missing_export(function, format!("not exported by '{}'", interface)))?;
      if &export.signature != expected {
        return Err(LoadError::missing_export(
          function,
          format!("expected {}, found {}", expected, export.signature),
        ));
      }
    }

    let imports = self.host_imports(&component, contract)?;

    Ok(ValidatedComponent {
      digest: binary.digest().to_string(),
      world,
      exports,
      imports,
      allows_instance_reuse: contract.allows_instance_reuse,
      component,
    })
  }

  /// The world is the package of the exported versioned interfaces that
  /// belong to a registered world.
  fn declared_world(&self, component: &Component) -> Result<(DeclaredWorld, &WorldContract), LoadError> {
    let mut declared: Vec<DeclaredWorld> = Vec::new();
    for name in introspect::exported_instances(&self.engine, component) {
      let Ok(parsed) = name.parse::<InterfaceName>() else {
        continue;
      };
      let world = DeclaredWorld {
        name: parsed.package,
        version: parsed.version,
      };
      if !declared.contains(&world) {
        declared.push(world);
      }
    }

    let mut registered: Vec<DeclaredWorld> = Vec::new();
    let mut unknown: Option<DeclaredWorld> = None;
    for world in declared {
      if self.registry.contains(&world.name) {
        registered.push(world);
      } else if unknown.is_none() {
        unknown = Some(world);
      }
    }

    let world = match (registered.len(), unknown) {
      (0, None) => return Err(LoadError::UndeclaredWorld),
      (0, Some(world)) => return Err(LoadError::UnknownWorld { world: world.name }),
      (1, _) => registered.remove(0),
      _ => {
        return Err(LoadError::AmbiguousWorld {
          worlds: registered.iter().map(ToString::to_string).collect(),
        });
      }
    };

    let contract = self
      .registry
      .lookup(&world.name)
      .map_err(|_| LoadError::UnknownWorld {
        world: world.name.clone(),
      })?;

    if !self.registry.rule().accepts(&contract.version, &world.version) {
      return Err(LoadError::incompatible(
        &world,
        format!("{}@{}", contract.name, contract.version),
      ));
    }

    Ok((world, contract))
  }

  fn host_imports(&self, component: &Component, contract: &WorldContract) -> Result<Vec<HostImport>, LoadError> {
    let mut host_imports = Vec::new();
    for (name, is_instance) in introspect::imports(&self.engine, component) {
      if !is_instance {
        return Err(LoadError::disallowed_import(&name, "only host interfaces may be imported"));
      }
      let parsed: InterfaceName = name
        .parse()
        .map_err(|_| LoadError::disallowed_import(&name, "host interfaces must be versioned"))?;
      let interface = HostInterface::from_import(&parsed)
        .ok_or_else(|| LoadError::disallowed_import(&name, "not provided by this host"))?;
      if !contract.allows_import(interface) {
        return Err(LoadError::disallowed_import(
          &name,
          format!("not allowed in world '{}'", contract.name),
        ));
      }
      if !self.registry.rule().accepts(&contract.version, &parsed.version) {
        return Err(LoadError::disallowed_import(
          &name,
          format!("host provides version {}", contract.version),
        ));
      }
      host_imports.push(HostImport { name, interface });
    }
    Ok(host_imports)
  }
}
