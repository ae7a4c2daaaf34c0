//! Runtime error types.

use sluice_config::ConfigError;
use sluice_host::HostError;
use sluice_loader::LoadError;
use sluice_world::SourceId;

/// Why an event could not be dispatched, or a binding registered.
///
/// Guest failures are not dispatch errors; they come back as an
/// [`InvocationOutcome`](crate::InvocationOutcome) inside the record.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  /// No binding exists for the event's source. The event is dropped.
  #[error("no binding for source '{source_id}'")]
  NoBindingFound { source_id: SourceId },

  /// The source is already bound.
  #[error("source '{source_id}' is already bound")]
  DuplicateBinding { source_id: SourceId },

  /// No instance slot became free within the queue wait.
  #[error("overloaded: no instance available for '{source_id}' within {waited_ms}ms")]
  Overloaded { source_id: SourceId, waited_ms: u64 },

  /// The binding's handler could not be resolved in its component.
  #[error("invalid binding for '{source_id}': {error}")]
  InvalidBinding {
    source_id: SourceId,
    #[source]
    error: LoadError,
  },
}

/// Errors that stop the runtime from starting.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),

  /// The sandbox engine could not be created.
  #[error("failed to start engine: {source}")]
  Engine {
    #[source]
    source: HostError,
  },
}
