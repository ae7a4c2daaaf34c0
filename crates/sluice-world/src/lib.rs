//! World contracts for sluice.
//!
//! A world is a named, versioned interface contract: the functions a
//! component must export to be bound to a trigger, and the host capability
//! interfaces it may import. This crate holds the contract types and the
//! [`ContractRegistry`] the loader validates components against. It does not
//! depend on any engine; signatures are plain data.

mod contract;
mod error;
mod names;
mod registry;
mod signature;
mod source;
mod version;

pub use contract::{HANDLER_INTERFACE, HOST_PACKAGE, HostInterface, WorldContract};
pub use error::WorldError;
pub use names::{InterfaceName, kebab_name};
pub use registry::ContractRegistry;
pub use signature::{FunctionSignature, ValueShape};
pub use source::{SourceId, TriggerKind};
pub use version::{CompatibilityRule, WorldVersion};
