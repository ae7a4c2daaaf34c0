use std::fmt;
use std::str::FromStr;

use crate::error::WorldError;
use crate::version::WorldVersion;

/// A versioned interface name, `namespace:package/interface@version`.
///
/// Components declare their world through the package of the interfaces
/// they export, so `sluice:message/handler@0.2.0` declares world
/// `sluice:message` at generation `0.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName {
  /// `namespace:package`
  pub package: String,
  pub interface: String,
  pub version: WorldVersion,
}

impl InterfaceName {
  pub fn new(package: impl Into<String>, interface: impl Into<String>, version: WorldVersion) -> Self {
    Self {
      package: package.into(),
      interface: interface.into(),
      version,
    }
  }
}

impl FromStr for InterfaceName {
  type Err = WorldError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let (path, version) = input
      .split_once('@')
      .ok_or_else(|| WorldError::invalid_interface(input, "missing '@version'"))?;
    let (package, interface) = path
      .split_once('/')
      .ok_or_else(|| WorldError::invalid_interface(input, "missing '/interface'"))?;
    let (namespace, name) = package
      .split_once(':')
      .ok_or_else(|| WorldError::invalid_interface(input, "missing 'namespace:'"))?;

    if namespace.is_empty() || name.is_empty() || interface.is_empty() {
      return Err(WorldError::invalid_interface(input, "empty name segment"));
    }

    Ok(Self {
      package: package.to_string(),
      interface: interface.to_string(),
      version: version.parse()?,
    })
  }
}

impl fmt::Display for InterfaceName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}@{}", self.package, self.interface, self.version)
  }
}

/// Normalise a handler name to component-model kebab case.
pub fn kebab_name(name: &str) -> String {
  name.replace('_', "-")
}
