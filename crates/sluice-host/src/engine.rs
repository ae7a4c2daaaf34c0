use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use wasmtime::{Config, Engine};

use crate::error::HostError;

/// Interval at which the engine epoch advances. Stores yield to the executor
/// once per tick, so this bounds how late a budget can be enforced.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

/// Configuration for creating a wasmtime Engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Enable epoch-based interruption for timeouts.
  pub epoch_interruption: bool,
  /// Enable async support.
  pub async_support: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      epoch_interruption: true,
      async_support: true,
    }
  }
}

/// Create a wasmtime Engine with the given configuration.
///
/// The Engine should be created once and shared across all component executions
/// in a process, as it is expensive to create.
pub fn create_engine(config: EngineConfig) -> Result<Engine, HostError> {
  let mut wasm_config = Config::new();

  wasm_config.async_support(config.async_support);
  wasm_config.epoch_interruption(config.epoch_interruption);
  wasm_config.wasm_component_model(true);

  Engine::new(&wasm_config).map_err(|e| HostError::engine(e.to_string()))
}

/// Background thread advancing an engine's epoch every [`EPOCH_TICK`].
///
/// Stops and joins when dropped.
pub struct EpochTicker {
  stop: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl EpochTicker {
  pub fn start(engine: Engine, interval: Duration) -> Result<Self, HostError> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = std::thread::Builder::new()
      .name("sluice-epoch-ticker".to_string())
      .spawn(move || {
        while !stop_flag.load(Ordering::Acquire) {
          std::thread::sleep(interval);
          engine.increment_epoch();
        }
      })
      .map_err(|e| HostError::engine(format!("failed to spawn epoch ticker: {}", e)))?;

    Ok(Self {
      stop,
      handle: Some(handle),
    })
  }
}

impl Drop for EpochTicker {
  fn drop(&mut self) {
    self.stop.store(true, Ordering::Release);
    if let Some(handle) = self.handle.take() {
      let _ = handle.join();
    }
  }
}
