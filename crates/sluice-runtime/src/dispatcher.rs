//! Dispatching events into bound handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sluice_host::InvocationScope;
use sluice_pool::{InstancePool, PoolError, PoolStats};
use sluice_world::SourceId;
use tokio::sync::Mutex;
use tracing::{Span, error, info, instrument, warn};

use crate::binding::BindingTable;
use crate::error::DispatchError;
use crate::outcome::{CallReport, CallResult, InvocationOutcome, translate};
use crate::record::{Event, Invocation, InvocationRecord};

/// Routes events to their bound handlers.
///
/// Each invocation runs on its own tokio task under the time budget. Bindings
/// marked `ordered` go through a FIFO lane, so their handlers are called in
/// arrival order one at a time. Waiting for the lane is bounded by the queue
/// wait, like waiting for an instance slot.
pub struct Dispatcher {
  table: Arc<BindingTable>,
  pool: Arc<InstancePool>,
  budget: Duration,
  lanes: HashMap<SourceId, Arc<Mutex<()>>>,
}

impl Dispatcher {
  pub fn new(table: Arc<BindingTable>, pool: Arc<InstancePool>, budget: Duration) -> Self {
    let lanes = table
      .ordered_sources()
      .map(|source| (source.clone(), Arc::new(Mutex::new(()))))
      .collect();
    Self {
      table,
      pool,
      budget,
      lanes,
    }
  }

  pub fn table(&self) -> &BindingTable {
    &self.table
  }

  pub fn pool_stats(&self) -> PoolStats {
    self.pool.stats()
  }

  pub fn budget(&self) -> Duration {
    self.budget
  }

  /// Dispatch one event and wait for its outcome.
  ///
  /// Guest failures come back as the record's outcome. Errors are reserved
  /// for events that never reached a handler.
  #[instrument(
    name = "dispatch",
    skip_all,
    fields(source = %event.source, invocation_id, component)
  )]
  pub async fn dispatch(&self, event: Event) -> Result<InvocationRecord, DispatchError> {
    let Some(binding) = self.table.resolve(&event.source) else {
      warn!("no_binding_found");
      return Err(DispatchError::NoBindingFound {
        source_id: event.source,
      });
    };

    let invocation_id = event
      .correlation_id
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = Span::current();
    span.record("invocation_id", invocation_id.as_str());
    span.record("component", binding.component_id.as_str());

    let mut invocation = Invocation::pending(invocation_id, event.source.clone(), binding.component_id.clone());

    let queue_wait = self.pool.config().queue_wait;
    let _lane = match self.lanes.get(&event.source) {
      Some(lane) => match tokio::time::timeout(queue_wait, lane.clone().lock_owned()).await {
        Ok(guard) => Some(guard),
        Err(_) => {
          warn!(waited_ms = queue_wait.as_millis() as u64, "ordered_lane_overloaded");
          return Err(DispatchError::Overloaded {
            source_id: event.source,
            waited_ms: queue_wait.as_millis() as u64,
          });
        }
      },
      None => None,
    };

    let scope = InvocationScope {
      invocation_id: invocation.invocation_id.clone(),
      source: event.source.clone(),
      component: binding.component_id.clone(),
    };

    let lease = match self.pool.acquire(&binding.component, scope, binding.grants.clone()).await {
      Ok(lease) => lease,
      Err(PoolError::Overloaded { waited }) => {
        return Err(DispatchError::Overloaded {
          source_id: event.source,
          waited_ms: waited.as_millis() as u64,
        });
      }
      Err(PoolError::TimedOut { .. }) => {
        return Ok(self.finish(invocation, InvocationOutcome::TimedOut { budget: self.budget }));
      }
      Err(PoolError::ResourceLimitExceeded { breach }) => {
        return Ok(self.finish(
          invocation,
          InvocationOutcome::ResourceLimitExceeded(breach.to_string()),
        ));
      }
      Err(e) => {
        return Ok(self.finish(invocation, InvocationOutcome::Faulted(e.to_string())));
      }
    };

    invocation.dispatched();

    let handler = binding.handler.clone();
    let budget = self.budget;
    let payload = event.payload;
    let task = tokio::spawn(async move {
      let mut lease = lease;
      let started = Instant::now();
      let result = tokio::time::timeout(budget, lease.call(&handler, payload)).await;
      let elapsed = started.elapsed();
      (lease, result, elapsed)
    });

    let outcome = match task.await {
      Ok((lease, result, elapsed)) => {
        let (denial, breach) = lease
          .host_state()
          .map(|state| (state.denial().cloned(), state.limit_breach().cloned()))
          .unwrap_or_default();
        let result = match result {
          Ok(Ok(returned)) => CallResult::Returned(returned),
          Ok(Err(error)) => CallResult::Failed(error),
          Err(_) => CallResult::Expired,
        };
        let outcome = translate(CallReport {
          result,
          elapsed,
          budget,
          denial,
          breach,
        });
        self.pool.release(lease, outcome.disposition());
        outcome
      }
      Err(join_error) => translate(CallReport {
        result: CallResult::Panicked(join_error.to_string()),
        elapsed: invocation.elapsed(),
        budget,
        denial: None,
        breach: None,
      }),
    };

    Ok(self.finish(invocation, outcome))
  }

  fn finish(&self, invocation: Invocation, outcome: InvocationOutcome) -> InvocationRecord {
    let record = invocation.finish(outcome);
    let elapsed_ms = record.elapsed.as_millis() as u64;
    match &record.outcome {
      InvocationOutcome::Succeeded(bytes) => {
        info!(elapsed_ms, bytes = bytes.len(), "invocation_completed")
      }
      InvocationOutcome::AppError(detail) => {
        warn!(elapsed_ms, detail = %detail, "invocation_app_error")
      }
      outcome => error!(elapsed_ms, phase = ?record.phase, error = %outcome, "invocation_failed"),
    }
    record
  }
}
