//! Execution context pool for sluice.
//!
//! Every invocation runs in its own wasmtime store, leased from an
//! [`InstancePool`]. The pool bounds how many instances are live at once,
//! enforces the per-instance memory ceiling, and in warm mode keeps idle
//! instances of components whose world allows reuse.

mod config;
mod error;
mod lease;
mod pool;
mod stats;

pub use config::PoolConfig;
pub use error::PoolError;
pub use lease::Lease;
pub use pool::{Disposition, InstancePool};
pub use sluice_config::PoolingMode;
pub use stats::PoolStats;
