//! The interface contract registry.

use std::collections::HashMap;

use crate::contract::WorldContract;
use crate::error::WorldError;
use crate::source::TriggerKind;
use crate::version::{CompatibilityRule, WorldVersion};

/// Holds the world contracts a host supports.
///
/// Built once at startup and shared read-only afterwards; there is no
/// mutation API. Reloading contracts means building a new registry.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
  contracts: HashMap<String, WorldContract>,
  triggers: HashMap<TriggerKind, String>,
  rule: CompatibilityRule,
}

impl ContractRegistry {
  /// Build a registry from explicit contracts. Trigger kinds are not bound to
  /// any world; use [`ContractRegistry::bind_trigger`] while building.
  pub fn new(
    contracts: impl IntoIterator<Item = WorldContract>,
    rule: CompatibilityRule,
  ) -> Result<Self, WorldError> {
    let mut map = HashMap::new();
    for contract in contracts {
      if map.contains_key(&contract.name) {
        return Err(WorldError::DuplicateWorld(contract.name));
      }
      map.insert(contract.name.clone(), contract);
    }
    Ok(Self {
      contracts: map,
      triggers: HashMap::new(),
      rule,
    })
  }

  /// The built-in worlds, one per trigger kind, at generation `version`.
  pub fn builtin(version: WorldVersion, rule: CompatibilityRule) -> Self {
    let mut contracts = HashMap::new();
    let mut triggers = HashMap::new();
    for kind in TriggerKind::ALL {
      let contract = WorldContract::builtin(kind, version.clone());
      triggers.insert(kind, contract.name.clone());
      contracts.insert(contract.name.clone(), contract);
    }
    Self {
      contracts,
      triggers,
      rule,
    }
  }

  /// Route a trigger kind to a registered world.
  pub fn bind_trigger(mut self, kind: TriggerKind, world: &str) -> Result<Self, WorldError> {
    if !self.contracts.contains_key(world) {
      return Err(WorldError::NotFound(world.to_string()));
    }
    self.triggers.insert(kind, world.to_string());
    Ok(self)
  }

  pub fn lookup(&self, world_name: &str) -> Result<&WorldContract, WorldError> {
    self
      .contracts
      .get(world_name)
      .ok_or_else(|| WorldError::NotFound(world_name.to_string()))
  }

  /// The world a trigger kind requires of its components.
  pub fn contract_for(&self, kind: TriggerKind) -> Result<&WorldContract, WorldError> {
    let world = self
      .triggers
      .get(&kind)
      .ok_or_else(|| WorldError::NotFound(format!("<{} trigger>", kind)))?;
    self.lookup(world)
  }

  pub fn rule(&self) -> CompatibilityRule {
    self.rule
  }

  pub fn contains(&self, world_name: &str) -> bool {
    self.contracts.contains_key(world_name)
  }

  pub fn worlds(&self) -> impl Iterator<Item = &WorldContract> {
    self.contracts.values()
  }
}
