//! Trigger execution core for sluice.
//!
//! Events arrive from trigger adapters with a [`SourceId`](sluice_world::SourceId).
//! The [`Dispatcher`] resolves the source in the [`BindingTable`], leases an
//! instance from the pool, calls the bound handler under the invocation time
//! budget, and translates whatever happened into an [`InvocationOutcome`].
//! [`Runtime::start`] assembles all of it from a
//! [`RuntimeConfig`](sluice_config::RuntimeConfig).

mod binding;
mod dispatcher;
mod error;
mod outcome;
mod record;
mod runtime;
mod timer;
mod trigger;

pub use binding::{BindingSpec, BindingTable, BindingTableBuilder, TriggerBinding};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, RuntimeError};
pub use outcome::{CallReport, CallResult, InvocationOutcome, InvocationPhase, translate};
pub use record::{Event, InvocationRecord};
pub use runtime::{LoadedComponent, RejectedBinding, RejectedComponent, Runtime, StartupReport};
pub use timer::TimerTrigger;
pub use trigger::{Delivery, Signal, TickStatus, Trigger};
