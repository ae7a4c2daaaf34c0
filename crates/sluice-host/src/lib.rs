//! Shared wasmtime infrastructure for sluice.
//!
//! This crate owns the pieces every execution path needs: engine creation and
//! the epoch ticker, the per-store [`HostState`] with its memory ceiling, the
//! capability grants checked at the host import boundary, and the linker
//! definitions of the `sluice:host` interfaces.

mod capabilities;
mod engine;
mod error;
mod imports;
mod limits;
mod outbound;
mod state;

pub use capabilities::{AllowedHost, CapabilityDenied, Grants};
pub use engine::{EPOCH_TICK, EngineConfig, EpochTicker, create_engine};
pub use error::HostError;
pub use imports::{LogLevel, link_host_interface};
pub use limits::{LimitBreach, MAX_TABLE_ELEMENTS, MemoryCeiling};
pub use outbound::{HttpSink, INVOCATION_ID_HEADER, OutboundSink, Published, RecordingSink, Requested};
pub use state::{HostState, InvocationScope, create_store};
