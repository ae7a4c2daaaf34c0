use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use sluice_config::PoolingMode;
use sluice_host::{Grants, HostState, InvocationScope, OutboundSink, create_store, link_host_interface};
use sluice_loader::ValidatedComponent;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use wasmtime::Engine;
use wasmtime::component::{InstancePre, Linker};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lease::{Lease, Slot};
use crate::stats::{Counters, PoolStats};

/// What to do with an instance after its invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
  /// The guest finished cleanly; a warm pool may keep the instance.
  Reusable,
  /// Tear the instance down.
  Discard,
}

/// Supplies isolated, resource-bounded instances to invocations.
///
/// A semaphore bounds the number of live leases. Linking is amortised by
/// caching one `InstancePre` per component digest.
pub struct InstancePool {
  engine: Engine,
  config: PoolConfig,
  outbound: Arc<dyn OutboundSink>,
  permits: Arc<Semaphore>,
  pre: Mutex<HashMap<String, InstancePre<HostState>>>,
  idle: Mutex<HashMap<String, Vec<Slot>>>,
  counters: Arc<Counters>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InstancePool {
  pub fn new(engine: Engine, config: PoolConfig, outbound: Arc<dyn OutboundSink>) -> Self {
    let permits = Arc::new(Semaphore::new(config.max_concurrent_instances));
    Self {
      engine,
      config,
      outbound,
      permits,
      pre: Mutex::new(HashMap::new()),
      idle: Mutex::new(HashMap::new()),
      counters: Arc::new(Counters::default()),
    }
  }

  pub fn config(&self) -> &PoolConfig {
    &self.config
  }

  /// Lease an instance of `component` for one invocation.
  ///
  /// Waits at most the configured queue wait for a free slot, then at most
  /// the instantiation budget for a fresh instance to start.
  #[instrument(
    name = "instance_acquire",
    skip_all,
    fields(
      invocation_id = %scope.invocation_id,
      component = %scope.component,
      digest = %component.digest(),
    )
  )]
  pub async fn acquire(
    &self,
    component: &ValidatedComponent,
    scope: InvocationScope,
    grants: Arc<Grants>,
  ) -> Result<Lease, PoolError> {
    let permit = match tokio::time::timeout(self.config.queue_wait, self.permits.clone().acquire_owned()).await {
      Ok(Ok(permit)) => permit,
      Ok(Err(_)) => return Err(PoolError::Closed),
      Err(_) => {
        Counters::bump(&self.counters.overloaded);
        warn!(waited_ms = self.config.queue_wait.as_millis() as u64, "pool_overloaded");
        return Err(PoolError::Overloaded {
          waited: self.config.queue_wait,
        });
      }
    };

    let reusable = self.config.mode == PoolingMode::Warm && component.allows_instance_reuse();

    if reusable && let Some(mut slot) = self.take_idle(component.digest()) {
      slot.store.data_mut().begin(scope, grants);
      Counters::bump(&self.counters.acquired);
      Counters::bump(&self.counters.reused);
      debug!("instance_reused");
      return Ok(Lease {
        slot: Some(slot),
        digest: component.digest().to_string(),
        reusable,
        reused: true,
        counters: self.counters.clone(),
        _permit: permit,
      });
    }

    let pre = self.instance_pre(component)?;
    let mut state = HostState::new(
      scope.component.clone(),
      self.config.instance_memory_limit,
      self.outbound.clone(),
    );
    state.begin(scope, grants);
    let mut store = create_store(&self.engine, state);

    let budget = self.config.instantiation_budget;
    let instance = match tokio::time::timeout(budget, pre.instantiate_async(&mut store)).await {
      Ok(Ok(instance)) => instance,
      Err(_) => {
        warn!(budget_ms = budget.as_millis() as u64, "instantiation_timed_out");
        return Err(PoolError::TimedOut { budget });
      }
      Ok(Err(e)) => {
        if let Some(breach) = store.data().limit_breach() {
          warn!(error = %breach, "instantiation_limit_exceeded");
          return Err(PoolError::ResourceLimitExceeded {
            breach: breach.clone(),
          });
        }
        warn!(error = %e, "instantiation_failed");
        return Err(PoolError::instantiation(format!("{:#}", e)));
      }
    };

    Counters::bump(&self.counters.acquired);
    Counters::bump(&self.counters.instantiated);
    debug!("instance_created");

    Ok(Lease {
      slot: Some(Slot { store, instance }),
      digest: component.digest().to_string(),
      reusable,
      reused: false,
      counters: self.counters.clone(),
      _permit: permit,
    })
  }

  /// Hand a lease back. Reusable instances of worlds that allow reuse are
  /// kept warm while there is room; everything else is torn down.
  pub fn release(&self, mut lease: Lease, disposition: Disposition) {
    if disposition == Disposition::Reusable && lease.reusable {
      let mut idle = lock(&self.idle);
      let slots = idle.entry(lease.digest.clone()).or_default();
      if slots.len() < self.config.warm_instances_per_component
        && let Some(slot) = lease.slot.take()
      {
        slots.push(slot);
        return;
      }
    }
    drop(lease);
  }

  pub fn stats(&self) -> PoolStats {
    let active = self.config.max_concurrent_instances - self.permits.available_permits();
    let idle = lock(&self.idle).values().map(Vec::len).sum::<usize>();
    self.counters.snapshot(active as u64, idle as u64)
  }

  fn take_idle(&self, digest: &str) -> Option<Slot> {
    lock(&self.idle).get_mut(digest).and_then(Vec::pop)
  }

  fn instance_pre(&self, component: &ValidatedComponent) -> Result<InstancePre<HostState>, PoolError> {
    let mut cache = lock(&self.pre);
    if let Some(pre) = cache.get(component.digest()) {
      return Ok(pre.clone());
    }

    let link_error = |message: String| PoolError::Link {
      digest: component.digest().to_string(),
      message,
    };

    let mut linker = Linker::<HostState>::new(&self.engine);
    for import in component.imports() {
      link_host_interface(&mut linker, &import.name, import.interface).map_err(|e| link_error(e.to_string()))?;
    }
    let pre = linker
      .instantiate_pre(component.component())
      .map_err(|e| link_error(format!("{:#}", e)))?;

    cache.insert(component.digest().to_string(), pre.clone());
    Ok(pre)
  }
}
