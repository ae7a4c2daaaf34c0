use std::sync::Arc;

use sluice_host::HostState;
use sluice_loader::HandlerRef;
use tokio::sync::OwnedSemaphorePermit;
use wasmtime::Store;
use wasmtime::component::Instance;

use crate::stats::Counters;

/// Handler parameters: the event payload.
type HandlerParams = (Vec<u8>,);
/// Handler results: guest success value or application error.
type HandlerResults = (Result<Vec<u8>, String>,);

pub(crate) struct Slot {
  pub(crate) store: Store<HostState>,
  pub(crate) instance: Instance,
}

/// Exclusive use of one execution instance.
///
/// Dropping a lease without handing it back to
/// [`InstancePool::release`](crate::InstancePool::release) tears the instance
/// down and frees its slot.
pub struct Lease {
  pub(crate) slot: Option<Slot>,
  pub(crate) digest: String,
  pub(crate) reusable: bool,
  pub(crate) reused: bool,
  pub(crate) counters: Arc<Counters>,
  pub(crate) _permit: OwnedSemaphorePermit,
}

impl Lease {
  /// Marshal `payload` into the instance and call the handler.
  ///
  /// The outer error is a trap or host failure; the inner result is what the
  /// guest returned.
  pub async fn call(
    &mut self,
    handler: &HandlerRef,
    payload: Vec<u8>,
  ) -> wasmtime::Result<Result<Vec<u8>, String>> {
    let Slot { store, instance } = self
      .slot
      .as_mut()
      .ok_or_else(|| wasmtime::Error::msg("lease has no instance"))?;

    let interface = instance
      .get_export_index(&mut *store, None, &handler.interface)
      .ok_or_else(|| wasmtime::Error::msg(format!("instance does not export '{}'", handler.interface)))?;
    let function = instance
      .get_export_index(&mut *store, Some(&interface), &handler.function)
      .ok_or_else(|| wasmtime::Error::msg(format!("instance does not export '{}'", handler)))?;
    let func = instance.get_typed_func::<HandlerParams, HandlerResults>(&mut *store, &function)?;

    let (result,) = func.call_async(&mut *store, (payload,)).await?;
    func.post_return_async(&mut *store).await?;
    Ok(result)
  }

  pub fn host_state(&self) -> Option<&HostState> {
    self.slot.as_ref().map(|slot| slot.store.data())
  }

  /// Whether this lease is served by a warm instance that ran before.
  pub fn was_reused(&self) -> bool {
    self.reused
  }

  pub fn digest(&self) -> &str {
    &self.digest
  }
}

impl Drop for Lease {
  fn drop(&mut self) {
    if self.slot.take().is_some() {
      Counters::bump(&self.counters.discarded);
    }
  }
}
