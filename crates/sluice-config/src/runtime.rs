use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sluice_world::{CompatibilityRule, TriggerKind, WorldVersion};

use crate::binding::BindingDef;
use crate::component::ComponentDef;
use crate::enums::PoolingMode;
use crate::error::ConfigError;

pub const DEFAULT_WORLD_VERSION: &str = "0.2.0";
pub const DEFAULT_MAX_CONCURRENT_INSTANCES: usize = 16;
pub const DEFAULT_INSTANCE_MEMORY_LIMIT: usize = 64 * 1024 * 1024;
pub const DEFAULT_INVOCATION_TIME_BUDGET_MS: u64 = 5_000;
pub const DEFAULT_QUEUE_WAIT_MS: u64 = 100;
pub const DEFAULT_WARM_INSTANCES_PER_COMPONENT: usize = 4;

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
  /// Generation of the built-in worlds this host supports.
  pub world_version: String,
  pub world_compatibility: CompatibilityRule,
  pub max_concurrent_instances: usize,
  /// Per-instance memory ceiling in bytes.
  pub instance_memory_limit: usize,
  pub invocation_time_budget_ms: u64,
  /// How long a dispatch may wait for a free instance slot.
  pub queue_wait_ms: u64,
  pub pooling_mode: PoolingMode,
  pub warm_instances_per_component: usize,
  pub components: Vec<ComponentDef>,
  pub bindings: Vec<BindingDef>,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      world_version: DEFAULT_WORLD_VERSION.to_string(),
      world_compatibility: CompatibilityRule::default(),
      max_concurrent_instances: DEFAULT_MAX_CONCURRENT_INSTANCES,
      instance_memory_limit: DEFAULT_INSTANCE_MEMORY_LIMIT,
      invocation_time_budget_ms: DEFAULT_INVOCATION_TIME_BUDGET_MS,
      queue_wait_ms: DEFAULT_QUEUE_WAIT_MS,
      pooling_mode: PoolingMode::default(),
      warm_instances_per_component: DEFAULT_WARM_INSTANCES_PER_COMPONENT,
      components: Vec::new(),
      bindings: Vec::new(),
    }
  }
}

impl RuntimeConfig {
  /// Parse and validate a JSON config.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
      message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a JSON config file. Relative component paths
  /// are resolved against the file's directory.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    let mut config = Self::from_json(&json)?;
    if let Some(base) = path.parent() {
      for component in &mut config.components {
        if component.path.is_relative() {
          component.path = base.join(&component.path);
        }
      }
    }
    Ok(config)
  }

  pub fn world_version(&self) -> Result<WorldVersion, ConfigError> {
    self
      .world_version
      .parse()
      .map_err(|e: sluice_world::WorldError| ConfigError::invalid("world_version", e.to_string()))
  }

  pub fn invocation_time_budget(&self) -> Duration {
    Duration::from_millis(self.invocation_time_budget_ms)
  }

  pub fn queue_wait(&self) -> Duration {
    Duration::from_millis(self.queue_wait_ms)
  }

  pub fn component(&self, id: &str) -> Option<&ComponentDef> {
    self.components.iter().find(|c| c.id == id)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.world_version()?;

    if self.max_concurrent_instances == 0 {
      return Err(ConfigError::invalid("max_concurrent_instances", "must be at least 1"));
    }
    if self.instance_memory_limit == 0 {
      return Err(ConfigError::invalid("instance_memory_limit", "must be greater than 0"));
    }
    if self.invocation_time_budget_ms == 0 {
      return Err(ConfigError::invalid("invocation_time_budget_ms", "must be greater than 0"));
    }
    if self.pooling_mode == PoolingMode::Warm && self.warm_instances_per_component == 0 {
      return Err(ConfigError::invalid(
        "warm_instances_per_component",
        "must be at least 1 when pooling_mode is warm",
      ));
    }

    let mut ids = HashSet::new();
    for (i, component) in self.components.iter().enumerate() {
      if component.id.is_empty() {
        return Err(ConfigError::invalid(format!("components[{}].id", i), "must not be empty"));
      }
      if !ids.insert(component.id.as_str()) {
        return Err(ConfigError::invalid(
          format!("components[{}].id", i),
          format!("duplicate component id '{}'", component.id),
        ));
      }
    }

    for (i, binding) in self.bindings.iter().enumerate() {
      let field = |name: &str| format!("bindings[{}].{}", i, name);

      let source = binding
        .source_id()
        .map_err(|e| ConfigError::invalid(field("source"), e.to_string()))?;
      if !ids.contains(binding.component.as_str()) {
        return Err(ConfigError::invalid(
          field("component"),
          format!("unknown component '{}'", binding.component),
        ));
      }
      if binding.handler.is_empty() {
        return Err(ConfigError::invalid(field("handler"), "must not be empty"));
      }

      match (source.kind(), binding.interval_ms) {
        (TriggerKind::Timer, None) | (TriggerKind::Timer, Some(0)) => {
          return Err(ConfigError::invalid(
            field("interval_ms"),
            "timer bindings need an interval greater than 0",
          ));
        }
        (TriggerKind::Timer, Some(_)) | (_, None) => {}
        (kind, Some(_)) => {
          return Err(ConfigError::invalid(
            field("interval_ms"),
            format!("only timer bindings take an interval, not {} bindings", kind),
          ));
        }
      }
    }

    Ok(())
  }
}
