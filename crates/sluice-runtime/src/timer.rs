//! The in-core timer trigger.

use std::sync::Arc;
use std::time::Duration;

use sluice_world::SourceId;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::record::Event;
use crate::trigger::{Signal, TickStatus, Trigger};

/// Fires a timer source on a fixed interval until cancelled.
///
/// Ticks are dispatched one at a time; ticks missed while a handler runs are
/// skipped rather than bunched up. The payload is
/// `{"source": "<source>", "tick": <n>}` with `n` counting from 1.
pub struct TimerTrigger {
  source: SourceId,
  interval: Duration,
  dispatcher: Arc<Dispatcher>,
}

impl TimerTrigger {
  pub fn new(source: SourceId, interval: Duration, dispatcher: Arc<Dispatcher>) -> Self {
    Self {
      source,
      interval,
      dispatcher,
    }
  }

  pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64> {
    tokio::spawn(self.run(cancel))
  }

  /// Run until `cancel` fires. Returns the number of ticks dispatched.
  #[instrument(name = "timer", skip_all, fields(source = %self.source, interval_ms = self.interval.as_millis() as u64))]
  pub async fn run(self, cancel: CancellationToken) -> u64 {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("timer_started");

    let mut ticks = 0u64;
    loop {
      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = interval.tick() => {}
      }

      ticks += 1;
      let payload = serde_json::json!({
        "source": self.source.to_string(),
        "tick": ticks,
      });
      let event = Event::new(self.source.clone(), payload.to_string().into_bytes());
      let result = self.dispatcher.dispatch(event).await;

      match Trigger::Timer.signal(&result) {
        Signal::Timer(TickStatus::Completed) => debug!(tick = ticks, "tick_completed"),
        Signal::Timer(TickStatus::Skipped) => warn!(tick = ticks, "tick_skipped"),
        Signal::Timer(TickStatus::Failed(reason)) => warn!(tick = ticks, reason = %reason, "tick_failed"),
        _ => {}
      }
    }

    info!(ticks, "timer_stopped");
    ticks
  }
}
