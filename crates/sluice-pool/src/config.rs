use std::time::Duration;

use sluice_config::{PoolingMode, RuntimeConfig};

/// Limits and strategy of an [`InstancePool`](crate::InstancePool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  pub max_concurrent_instances: usize,
  /// Memory ceiling per instance, in bytes.
  pub instance_memory_limit: usize,
  pub queue_wait: Duration,
  /// Upper bound on instantiation, which runs guest start functions.
  pub instantiation_budget: Duration,
  pub mode: PoolingMode,
  pub warm_instances_per_component: usize,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self::from(&RuntimeConfig::default())
  }
}

impl From<&RuntimeConfig> for PoolConfig {
  fn from(config: &RuntimeConfig) -> Self {
    Self {
      max_concurrent_instances: config.max_concurrent_instances,
      instance_memory_limit: config.instance_memory_limit,
      queue_wait: config.queue_wait(),
      instantiation_budget: config.invocation_time_budget(),
      mode: config.pooling_mode,
      warm_instances_per_component: config.warm_instances_per_component,
    }
  }
}
