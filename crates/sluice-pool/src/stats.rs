use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
  /// Leases handed out.
  pub acquired: u64,
  /// Instances created.
  pub instantiated: u64,
  /// Leases served by a warm idle instance.
  pub reused: u64,
  /// Instances torn down after use.
  pub discarded: u64,
  /// Acquisitions that gave up waiting for a slot.
  pub overloaded: u64,
  /// Leases currently held.
  pub active: u64,
  /// Warm instances waiting for reuse.
  pub idle: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
  pub(crate) acquired: AtomicU64,
  pub(crate) instantiated: AtomicU64,
  pub(crate) reused: AtomicU64,
  pub(crate) discarded: AtomicU64,
  pub(crate) overloaded: AtomicU64,
}

impl Counters {
  pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self, active: u64, idle: u64) -> PoolStats {
    PoolStats {
      acquired: self.acquired.load(Ordering::Relaxed),
      instantiated: self.instantiated.load(Ordering::Relaxed),
      reused: self.reused.load(Ordering::Relaxed),
      discarded: self.discarded.load(Ordering::Relaxed),
      overloaded: self.overloaded.load(Ordering::Relaxed),
      active,
      idle,
    }
  }
}
