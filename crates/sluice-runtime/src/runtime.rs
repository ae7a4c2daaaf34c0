//! Runtime assembly: engine, registry, loader, pool and dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sluice_config::RuntimeConfig;
use sluice_host::{EPOCH_TICK, EngineConfig, EpochTicker, Grants, OutboundSink, create_engine};
use sluice_loader::{ComponentLoader, LoadError, ValidatedComponent};
use sluice_pool::{InstancePool, PoolConfig, PoolStats};
use sluice_world::{ContractRegistry, SourceId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::binding::{BindingSpec, BindingTableBuilder};
use crate::dispatcher::Dispatcher;
use crate::error::RuntimeError;
use crate::timer::TimerTrigger;

/// A component that loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedComponent {
  pub id: String,
  pub digest: String,
  pub world: String,
}

/// A component that was rejected, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedComponent {
  pub id: String,
  pub error: LoadError,
}

/// A binding that could not be registered, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedBinding {
  pub source: String,
  pub reason: String,
}

/// What happened at startup. Rejections affect only the component or
/// binding concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
  pub loaded: Vec<LoadedComponent>,
  pub rejected_components: Vec<RejectedComponent>,
  pub bound: Vec<SourceId>,
  pub rejected_bindings: Vec<RejectedBinding>,
}

impl StartupReport {
  pub fn is_clean(&self) -> bool {
    self.rejected_components.is_empty() && self.rejected_bindings.is_empty()
  }
}

/// A started trigger execution core.
pub struct Runtime {
  dispatcher: Arc<Dispatcher>,
  pool: Arc<InstancePool>,
  report: StartupReport,
  _ticker: EpochTicker,
}

impl Runtime {
  /// Build everything the configuration describes.
  ///
  /// Components and bindings that fail to load are recorded in the
  /// [`StartupReport`] and skipped. Only an invalid configuration or an
  /// engine that cannot be created stops startup.
  #[instrument(name = "runtime_start", skip_all)]
  pub fn start(config: &RuntimeConfig, outbound: Arc<dyn OutboundSink>) -> Result<Self, RuntimeError> {
    config.validate()?;

    let engine = create_engine(EngineConfig::default()).map_err(|source| RuntimeError::Engine { source })?;
    let ticker =
      EpochTicker::start(engine.clone(), EPOCH_TICK).map_err(|source| RuntimeError::Engine { source })?;

    let registry = Arc::new(ContractRegistry::builtin(
      config.world_version()?,
      config.world_compatibility,
    ));
    let loader = ComponentLoader::new(engine.clone(), registry.clone());

    let mut report = StartupReport::default();
    let mut components: HashMap<&str, ValidatedComponent> = HashMap::new();
    for def in &config.components {
      match loader.load_file(&def.path) {
        Ok(component) => {
          report.loaded.push(LoadedComponent {
            id: def.id.clone(),
            digest: component.digest().to_string(),
            world: component.world().to_string(),
          });
          components.insert(def.id.as_str(), component);
        }
        Err(error) => {
          warn!(component = %def.id, error = %error, "component_rejected");
          report.rejected_components.push(RejectedComponent {
            id: def.id.clone(),
            error,
          });
        }
      }
    }

    let mut builder = BindingTableBuilder::new(registry);
    for def in &config.bindings {
      let reject = |reason: String| {
        warn!(source = %def.source, reason = %reason, "binding_rejected");
        RejectedBinding {
          source: def.source.clone(),
          reason,
        }
      };

      let spec = match binding_spec(def, &components) {
        Ok(spec) => spec,
        Err(reason) => {
          report.rejected_bindings.push(reject(reason));
          continue;
        }
      };
      let source = spec.source.clone();
      match builder.register(spec) {
        Ok(()) => report.bound.push(source),
        Err(e) => report.rejected_bindings.push(reject(e.to_string())),
      }
    }

    let table = Arc::new(builder.build());
    let pool = Arc::new(InstancePool::new(engine, PoolConfig::from(config), outbound));
    let dispatcher = Arc::new(Dispatcher::new(table, pool.clone(), config.invocation_time_budget()));

    info!(
      components = report.loaded.len(),
      rejected_components = report.rejected_components.len(),
      bindings = report.bound.len(),
      rejected_bindings = report.rejected_bindings.len(),
      "runtime_started"
    );

    Ok(Self {
      dispatcher,
      pool,
      report,
      _ticker: ticker,
    })
  }

  pub fn dispatcher(&self) -> Arc<Dispatcher> {
    self.dispatcher.clone()
  }

  pub fn report(&self) -> &StartupReport {
    &self.report
  }

  pub fn pool_stats(&self) -> PoolStats {
    self.pool.stats()
  }

  /// Start a [`TimerTrigger`] for every bound timer source.
  pub fn spawn_timers(&self, cancel: CancellationToken) -> Vec<JoinHandle<u64>> {
    let timers: Vec<(SourceId, Duration)> = self
      .dispatcher
      .table()
      .timers()
      .map(|(source, interval)| (source.clone(), interval))
      .collect();
    timers
      .into_iter()
      .map(|(source, interval)| TimerTrigger::new(source, interval, self.dispatcher.clone()).spawn(cancel.clone()))
      .collect()
  }
}

fn binding_spec(
  def: &sluice_config::BindingDef,
  components: &HashMap<&str, ValidatedComponent>,
) -> Result<BindingSpec, String> {
  let source = def.source_id().map_err(|e| e.to_string())?;
  let component = components
    .get(def.component.as_str())
    .ok_or_else(|| format!("component '{}' was not loaded", def.component))?;
  let grants = Grants::parse(&def.capabilities.outbound_hosts, def.capabilities.topics.iter().cloned())
    .map_err(|e| e.to_string())?;

  Ok(BindingSpec {
    source,
    component_id: def.component.clone(),
    component: component.clone(),
    handler: def.handler.clone(),
    grants,
    ordered: def.ordered,
    interval: def.interval_ms.map(Duration::from_millis),
  })
}
