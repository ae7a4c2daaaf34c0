//! Per-store memory ceiling.

use thiserror::Error;
use wasmtime::ResourceLimiter;

/// Upper bound on table elements per instance.
pub const MAX_TABLE_ELEMENTS: usize = 10_000;

/// Recorded when a guest tries to grow memory past its ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("memory limit exceeded: requested {requested} bytes, limit is {limit} bytes")]
pub struct LimitBreach {
  pub limit: usize,
  pub requested: usize,
}

/// A [`ResourceLimiter`] enforcing a memory ceiling on one store.
///
/// Growth past the ceiling fails with a [`LimitBreach`] error, which makes
/// instantiation fail or the growing instruction trap. The breach is also
/// kept on the limiter so it can be reported after the fact.
#[derive(Debug, Clone)]
pub struct MemoryCeiling {
  limit: usize,
  breach: Option<LimitBreach>,
}

impl MemoryCeiling {
  pub fn new(limit: usize) -> Self {
    Self {
      limit,
      breach: None,
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn breach(&self) -> Option<&LimitBreach> {
    self.breach.as_ref()
  }

  pub(crate) fn clear(&mut self) {
    self.breach = None;
  }
}

impl ResourceLimiter for MemoryCeiling {
  fn memory_growing(
    &mut self,
    _current: usize,
    desired: usize,
    _maximum: Option<usize>,
  ) -> wasmtime::Result<bool> {
    if desired > self.limit {
      let breach = LimitBreach {
        limit: self.limit,
        requested: desired,
      };
      self.breach = Some(breach.clone());
      return Err(wasmtime::Error::new(breach));
    }
    Ok(true)
  }

  fn table_growing(
    &mut self,
    _current: usize,
    desired: usize,
    _maximum: Option<usize>,
  ) -> wasmtime::Result<bool> {
    Ok(desired <= MAX_TABLE_ELEMENTS)
  }
}
