//! Component loading and validation for sluice.
//!
//! The [`ComponentLoader`] compiles a binary, reads the world it declares
//! through its exported interfaces, and checks it against the
//! [`ContractRegistry`](sluice_world::ContractRegistry): the world must be
//! registered and compatible, every required function must be exported with
//! the right signature, and only allowed host interfaces may be imported.

mod binary;
mod error;
mod introspect;
mod loader;
mod validated;

pub use binary::ComponentBinary;
pub use error::LoadError;
pub use introspect::ExportedFunction;
pub use loader::ComponentLoader;
pub use validated::{DeclaredWorld, HandlerRef, HostImport, ValidatedComponent};
