//! Host capability imports.
//!
//! Each capability interface is linked under the exact import name the
//! component asked for, so one linker serves every compatible version.

use std::sync::Arc;

use sluice_world::HostInterface;
use tracing::{debug, error, info, trace, warn};
use wasmtime::StoreContextMut;
use wasmtime::component::{ComponentType, Lift, Linker, Lower};

use crate::capabilities::CapabilityDenied;
use crate::error::HostError;
use crate::state::HostState;

/// Guest log level, `enum level { trace, debug, info, warn, error }`.
#[derive(ComponentType, Lift, Lower, Debug, Clone, Copy, PartialEq, Eq)]
#[component(enum)]
#[repr(u8)]
pub enum LogLevel {
  #[component(name = "trace")]
  Trace,
  #[component(name = "debug")]
  Debug,
  #[component(name = "info")]
  Info,
  #[component(name = "warn")]
  Warn,
  #[component(name = "error")]
  Error,
}

/// Define the functions of `iface` on `linker` under `import_name`.
pub fn link_host_interface(
  linker: &mut Linker<HostState>,
  import_name: &str,
  iface: HostInterface,
) -> Result<(), HostError> {
  let mut instance = linker.instance(import_name)?;
  match iface {
    HostInterface::Log => {
      instance.func_wrap("log", host_log)?;
    }
    HostInterface::Outbound => {
      instance.func_wrap("publish", host_publish)?;
      instance.func_wrap_async("request", host_request)?;
    }
  }
  Ok(())
}

fn host_log(
  store: StoreContextMut<'_, HostState>,
  (level, message): (LogLevel, String),
) -> wasmtime::Result<()> {
  let state = store.data();
  let invocation_id = state.invocation_id();
  let component = state.component();
  match level {
    LogLevel::Trace => trace!(invocation_id = %invocation_id, component = %component, "{}", message),
    LogLevel::Debug => debug!(invocation_id = %invocation_id, component = %component, "{}", message),
    LogLevel::Info => info!(invocation_id = %invocation_id, component = %component, "{}", message),
    LogLevel::Warn => warn!(invocation_id = %invocation_id, component = %component, "{}", message),
    LogLevel::Error => error!(invocation_id = %invocation_id, component = %component, "{}", message),
  }
  Ok(())
}

fn host_publish(
  mut store: StoreContextMut<'_, HostState>,
  (topic, payload): (String, Vec<u8>),
) -> wasmtime::Result<()> {
  let state = store.data_mut();
  if let Err(denied) = state.grants().check_topic(&topic) {
    return Err(deny(state, denied));
  }
  let Some(scope) = state.scope() else {
    return Err(deny(state, CapabilityDenied::topic(&topic)));
  };
  state.outbound().publish(scope, &topic, &payload);
  Ok(())
}

/// The request is awaited on the store's fiber, so epoch yields and the
/// invocation budget still apply while it is in flight.
fn host_request(
  mut store: StoreContextMut<'_, HostState>,
  (target, body): (String, Vec<u8>),
) -> Box<dyn Future<Output = wasmtime::Result<(Result<Vec<u8>, String>,)>> + Send + '_> {
  Box::new(async move {
    let state = store.data_mut();
    let url = match state.grants().check_target(&target) {
      Ok(url) => url,
      Err(denied) => return Err(deny(state, denied)),
    };
    let Some(scope) = state.scope().cloned() else {
      return Err(deny(state, CapabilityDenied::target(&target)));
    };
    let outbound = Arc::clone(state.outbound());
    Ok((outbound.request(&scope, &url, body).await,))
  })
}

/// Record the denial on the store and turn it into a trap.
fn deny(state: &mut HostState, denied: CapabilityDenied) -> wasmtime::Error {
  warn!(
    invocation_id = %state.invocation_id(),
    component = %state.component(),
    capability = %denied.capability,
    "capability_denied"
  );
  state.record_denial(denied.clone());
  wasmtime::Error::new(denied)
}
