use std::sync::Arc;

use sluice_world::SourceId;
use wasmtime::{Engine, Store};

use crate::capabilities::{CapabilityDenied, Grants};
use crate::limits::{LimitBreach, MemoryCeiling};
use crate::outbound::OutboundSink;

/// Identifies the invocation a store is currently serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationScope {
  pub invocation_id: String,
  pub source: SourceId,
  pub component: String,
}

/// Host state stored in the wasmtime Store.
///
/// Everything here except the memory ceiling's limit is event-scoped:
/// [`HostState::begin`] resets it before each invocation, so a reused
/// instance never sees the previous event's grants or records.
pub struct HostState {
  component: String,
  scope: Option<InvocationScope>,
  grants: Arc<Grants>,
  limits: MemoryCeiling,
  outbound: Arc<dyn OutboundSink>,
  denial: Option<CapabilityDenied>,
}

impl HostState {
  /// Create host state for a new instance of `component`. Until
  /// [`HostState::begin`] is called nothing is granted.
  pub fn new(component: impl Into<String>, memory_limit: usize, outbound: Arc<dyn OutboundSink>) -> Self {
    Self {
      component: component.into(),
      scope: None,
      grants: Arc::new(Grants::none()),
      limits: MemoryCeiling::new(memory_limit),
      outbound,
      denial: None,
    }
  }

  /// Start serving an invocation. The component id is taken from the scope;
  /// warm instances are shared by every component id with the same digest.
  pub fn begin(&mut self, scope: InvocationScope, grants: Arc<Grants>) {
    self.component.clone_from(&scope.component);
    self.scope = Some(scope);
    self.grants = grants;
    self.denial = None;
    self.limits.clear();
  }

  pub fn component(&self) -> &str {
    &self.component
  }

  pub fn scope(&self) -> Option<&InvocationScope> {
    self.scope.as_ref()
  }

  pub fn grants(&self) -> &Grants {
    &self.grants
  }

  pub fn outbound(&self) -> &Arc<dyn OutboundSink> {
    &self.outbound
  }

  /// The first capability the guest was refused during this invocation.
  pub fn denial(&self) -> Option<&CapabilityDenied> {
    self.denial.as_ref()
  }

  pub(crate) fn record_denial(&mut self, denial: CapabilityDenied) {
    if self.denial.is_none() {
      self.denial = Some(denial);
    }
  }

  pub fn limit_breach(&self) -> Option<&LimitBreach> {
    self.limits.breach()
  }

  pub fn memory_limit(&self) -> usize {
    self.limits.limit()
  }

  pub(crate) fn invocation_id(&self) -> &str {
    self.scope.as_ref().map(|s| s.invocation_id.as_str()).unwrap_or("-")
  }
}

/// Create a new Store with HostState for component execution.
///
/// The store enforces the state's memory ceiling and yields to the async
/// executor on every epoch tick, so a budget timer around the call can always
/// regain control from a guest that never returns.
pub fn create_store(engine: &Engine, state: HostState) -> Store<HostState> {
  let mut store = Store::new(engine, state);
  store.limiter(|state| &mut state.limits);
  store.set_epoch_deadline(1);
  store.epoch_deadline_async_yield_and_update(1);
  store
}
