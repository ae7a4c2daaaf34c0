//! Trigger bindings: which handler serves which event source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sluice_host::Grants;
use sluice_loader::{HandlerRef, LoadError, ValidatedComponent};
use sluice_world::{ContractRegistry, SourceId, TriggerKind, WorldError};
use tracing::info;

use crate::error::DispatchError;

/// A binding as requested, before its handler is resolved.
#[derive(Debug, Clone)]
pub struct BindingSpec {
  pub source: SourceId,
  /// Configured id of the component.
  pub component_id: String,
  pub component: ValidatedComponent,
  /// Handler name as written in configuration, e.g. `on_message`.
  pub handler: String,
  pub grants: Grants,
  pub ordered: bool,
  /// Tick interval for timer sources.
  pub interval: Option<Duration>,
}

/// A resolved binding from a source identity to a component handler.
#[derive(Debug)]
pub struct TriggerBinding {
  pub source: SourceId,
  pub component_id: String,
  pub component: ValidatedComponent,
  pub handler: HandlerRef,
  pub grants: Arc<Grants>,
  pub ordered: bool,
  pub interval: Option<Duration>,
}

/// Collects bindings at startup. [`BindingTableBuilder::build`] freezes them.
pub struct BindingTableBuilder {
  registry: Arc<ContractRegistry>,
  bindings: HashMap<SourceId, Arc<TriggerBinding>>,
}

impl BindingTableBuilder {
  pub fn new(registry: Arc<ContractRegistry>) -> Self {
    Self {
      registry,
      bindings: HashMap::new(),
    }
  }

  /// Add a binding. The source must not be bound yet and the handler must
  /// resolve in the component against the world of the source's trigger kind.
  pub fn register(&mut self, spec: BindingSpec) -> Result<(), DispatchError> {
    if self.bindings.contains_key(&spec.source) {
      return Err(DispatchError::DuplicateBinding {
        source_id: spec.source,
      });
    }

    let invalid = |source: &SourceId, error: LoadError| DispatchError::InvalidBinding {
      source_id: source.clone(),
      error,
    };

    let contract = self
      .registry
      .contract_for(spec.source.kind())
      .map_err(|e| match e {
        WorldError::NotFound(world) => invalid(&spec.source, LoadError::UnknownWorld { world }),
        other => invalid(&spec.source, LoadError::malformed(other.to_string())),
      })?;
    let handler = spec
      .component
      .resolve_handler(contract, &spec.handler)
      .map_err(|e| invalid(&spec.source, e))?;

    info!(
      source = %spec.source,
      component = %spec.component_id,
      handler = %handler,
      ordered = spec.ordered,
      "binding_registered"
    );

    self.bindings.insert(
      spec.source.clone(),
      Arc::new(TriggerBinding {
        source: spec.source,
        component_id: spec.component_id,
        component: spec.component,
        handler,
        grants: Arc::new(spec.grants),
        ordered: spec.ordered,
        interval: spec.interval,
      }),
    );
    Ok(())
  }

  pub fn build(self) -> BindingTable {
    BindingTable {
      bindings: self.bindings,
    }
  }
}

/// The frozen binding table. Read-only after startup.
#[derive(Debug, Default)]
pub struct BindingTable {
  bindings: HashMap<SourceId, Arc<TriggerBinding>>,
}

impl BindingTable {
  /// Exact match on the parsed source identity.
  pub fn resolve(&self, source: &SourceId) -> Option<Arc<TriggerBinding>> {
    self.bindings.get(source).cloned()
  }

  pub fn len(&self) -> usize {
    self.bindings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.is_empty()
  }

  pub fn sources(&self) -> impl Iterator<Item = &SourceId> {
    self.bindings.keys()
  }

  /// Timer bindings with their intervals.
  pub fn timers(&self) -> impl Iterator<Item = (&SourceId, Duration)> {
    self.bindings.values().filter_map(|binding| match (binding.source.kind(), binding.interval) {
      (TriggerKind::Timer, Some(interval)) => Some((&binding.source, interval)),
      _ => None,
    })
  }

  pub(crate) fn ordered_sources(&self) -> impl Iterator<Item = &SourceId> {
    self.bindings.values().filter(|b| b.ordered).map(|b| &b.source)
  }
}
