//! Sluice Config
//!
//! Serializable runtime configuration: limits, pooling, the components to
//! load and the bindings from event sources to their handlers. Configuration
//! is read from JSON and validated before the runtime sees it.
//!
//! ```json
//! {
//!   "max_concurrent_instances": 8,
//!   "components": [{ "id": "echo", "path": "echo.wasm" }],
//!   "bindings": [
//!     { "source": "queue:inbox", "component": "echo", "handler": "on_message" }
//!   ]
//! }
//! ```

mod binding;
mod component;
mod enums;
mod error;
mod runtime;

pub use binding::{BindingDef, CapabilitiesDef};
pub use component::ComponentDef;
pub use enums::PoolingMode;
pub use error::ConfigError;
pub use runtime::{
  DEFAULT_INSTANCE_MEMORY_LIMIT, DEFAULT_INVOCATION_TIME_BUDGET_MS, DEFAULT_MAX_CONCURRENT_INSTANCES,
  DEFAULT_QUEUE_WAIT_MS, DEFAULT_WARM_INSTANCES_PER_COMPONENT, DEFAULT_WORLD_VERSION, RuntimeConfig,
};
