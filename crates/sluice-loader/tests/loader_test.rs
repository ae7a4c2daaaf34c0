//! Integration tests for ComponentLoader using the text components in
//! test-components/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sluice_host::{EngineConfig, create_engine};
use sluice_loader::{ComponentBinary, ComponentLoader, LoadError};
use sluice_world::{
  CompatibilityRule, ContractRegistry, FunctionSignature, HostInterface, TriggerKind, WorldContract,
  WorldVersion,
};

const TEST_COMPONENTS: &str = "../../test-components";

fn fixture_path(name: &str) -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR")).join(TEST_COMPONENTS).join(name)
}

fn fixture(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).expect("failed to read test component")
}

fn loader_with(rule: CompatibilityRule) -> ComponentLoader {
  let engine = create_engine(EngineConfig::default()).expect("failed to create engine");
  let registry = ContractRegistry::builtin(WorldVersion::new(0, 2, 0), rule);
  ComponentLoader::new(engine, Arc::new(registry))
}

fn loader() -> ComponentLoader {
  loader_with(CompatibilityRule::Semver)
}

fn load(loader: &ComponentLoader, wat: &str) -> Result<sluice_loader::ValidatedComponent, LoadError> {
  loader.load(ComponentBinary::new(wat.as_bytes().to_vec()))
}

#[test]
fn test_load_echo_exposes_exactly_its_exports() {
  let loader = loader();
  let component = load(&loader, &fixture("echo.wat")).expect("echo should load");

  assert_eq!(component.world().name, "sluice:message");
  assert_eq!(component.world().version, WorldVersion::new(0, 2, 0));
  assert!(component.digest().starts_with("sha256:"));
  assert!(component.imports().is_empty());
  assert!(component.allows_instance_reuse());

  let exports = component.exports();
  assert_eq!(exports.len(), 1);
  assert_eq!(exports[0].interface, "sluice:message/handler@0.2.0");
  assert_eq!(exports[0].name, "on-message");
  assert_eq!(exports[0].signature, FunctionSignature::handler());
}

#[test]
fn test_load_file() {
  let loader = loader();
  let component = loader
    .load_file(&fixture_path("counter.wat"))
    .expect("counter should load");
  assert_eq!(component.world().name, "sluice:message");

  let missing = loader.load_file(&fixture_path("does-not-exist.wasm"));
  assert!(matches!(missing, Err(LoadError::Unreadable { .. })));
}

#[test]
fn test_digest_matches_bytes() {
  let loader = loader();
  let wat = fixture("echo.wat");
  let binary = ComponentBinary::new(wat.as_bytes().to_vec());
  let digest = binary.digest().to_string();
  let component = loader.load(binary).unwrap();
  assert_eq!(component.digest(), digest);
}

#[test]
fn test_malformed_binary() {
  let loader = loader();

  let garbage = loader.load(ComponentBinary::new(b"\0asm not really".to_vec()));
  assert!(matches!(garbage, Err(LoadError::MalformedBinary { .. })));

  let core_module = load(&loader, "(module)");
  assert!(matches!(core_module, Err(LoadError::MalformedBinary { .. })));
}

#[test]
fn test_unknown_world_is_not_malformed() {
  let loader = loader();
  let wat = fixture("echo.wat").replace("sluice:message/handler", "acme:jobs/handler");

  match load(&loader, &wat) {
    Err(LoadError::UnknownWorld { world }) => assert_eq!(world, "acme:jobs"),
    other => panic!("expected UnknownWorld, got {:?}", other),
  }
}

#[test]
fn test_incompatible_world_versions() {
  let loader = loader();

  for version in ["0.3.0", "1.0.0", "0.2.1", "0.2.0-rc.1"] {
    let wat = fixture("echo.wat").replace("@0.2.0", &format!("@{}", version));
    match load(&loader, &wat) {
      Err(LoadError::IncompatibleWorld { declared, supported }) => {
        assert_eq!(declared, format!("sluice:message@{}", version));
        assert_eq!(supported, "sluice:message@0.2.0");
      }
      other => panic!("expected IncompatibleWorld for {}, got {:?}", version, other),
    }
  }
}

#[test]
fn test_older_minor_is_compatible() {
  let wat = fixture("echo.wat").replace("@0.2.0", "@0.1.3");

  let component = load(&loader(), &wat).expect("older minor should load");
  assert_eq!(component.world().version, WorldVersion::new(0, 1, 3));

  let exact = load(&loader_with(CompatibilityRule::Exact), &wat);
  assert!(matches!(exact, Err(LoadError::IncompatibleWorld { .. })));
}

#[test]
fn test_missing_required_export() {
  let loader = loader();
  let wat = fixture("echo.wat").replace("(export \"on-message\" (func $on-message))", "(export \"on-other\" (func $on-message))");

  match load(&loader, &wat) {
    Err(LoadError::MissingExport { function, .. }) => assert_eq!(function, "on-message"),
    other => panic!("expected MissingExport, got {:?}", other),
  }
}

#[test]
fn test_required_export_with_wrong_world_handler() {
  // An http world component must export handle-request, not on-message.
  let loader = loader();
  let wat = fixture("echo.wat").replace("sluice:message/handler", "sluice:http/handler");

  match load(&loader, &wat) {
    Err(LoadError::MissingExport { function, .. }) => assert_eq!(function, "handle-request"),
    other => panic!("expected MissingExport, got {:?}", other),
  }
}

#[test]
fn test_undeclared_world() {
  let loader = loader();
  let wat = fixture("echo.wat").replace("\"sluice:message/handler@0.2.0\"", "\"handler\"");
  assert!(matches!(load(&loader, &wat), Err(LoadError::UndeclaredWorld)));
}

#[test]
fn test_allowed_host_import() {
  let component = load(&loader(), &fixture("publish.wat")).expect("publish should load");
  let imports = component.imports();
  assert_eq!(imports.len(), 1);
  assert_eq!(imports[0].name, "sluice:host/outbound@0.2.0");
  assert_eq!(imports[0].interface, HostInterface::Outbound);
}

#[test]
fn test_disallowed_imports() {
  let loader = loader();

  let foreign = fixture("publish.wat").replace("sluice:host/outbound@0.2.0", "wasi:io/outbound@0.2.0");
  assert!(matches!(
    load(&loader, &foreign),
    Err(LoadError::DisallowedImport { import, .. }) if import == "wasi:io/outbound@0.2.0"
  ));

  let newer = fixture("publish.wat").replace("sluice:host/outbound@0.2.0", "sluice:host/outbound@0.9.0");
  assert!(matches!(load(&loader, &newer), Err(LoadError::DisallowedImport { .. })));

  let engine = create_engine(EngineConfig::default()).unwrap();
  let no_outbound = ContractRegistry::new(
    [WorldContract::builtin(TriggerKind::Message, WorldVersion::new(0, 2, 0))
      .with_allowed_imports([HostInterface::Log])],
    CompatibilityRule::Semver,
  )
  .unwrap();
  let restricted = ComponentLoader::new(engine, Arc::new(no_outbound));
  assert!(matches!(
    load(&restricted, &fixture("publish.wat")),
    Err(LoadError::DisallowedImport { .. })
  ));
}

#[test]
fn test_resolve_handler() {
  let loader = loader();
  let component = load(&loader, &fixture("echo.wat")).unwrap();
  let message = loader.registry().contract_for(TriggerKind::Message).unwrap();

  let handler = component.resolve_handler(message, "on_message").unwrap();
  assert_eq!(handler.interface, "sluice:message/handler@0.2.0");
  assert_eq!(handler.function, "on-message");

  assert!(matches!(
    component.resolve_handler(message, "on_tick"),
    Err(LoadError::MissingExport { function, .. }) if function == "on-tick"
  ));

  let http = loader.registry().contract_for(TriggerKind::Http).unwrap();
  assert!(matches!(
    component.resolve_handler(http, "on_message"),
    Err(LoadError::IncompatibleWorld { .. })
  ));
}

#[test]
fn test_custom_world_handler_names() {
  let loader = loader();
  let wat = fixture("echo.wat")
    .replace("sluice:message/handler", "sluice:custom/handler")
    .replace("(export \"on-message\" (func $on-message))", "(export \"reindex-all\" (func $on-message))");
  let component = load(&loader, &wat).expect("custom world has no required exports");
  assert!(!component.allows_instance_reuse());

  let custom = loader.registry().contract_for(TriggerKind::Custom).unwrap();
  let handler = component.resolve_handler(custom, "reindex_all").unwrap();
  assert_eq!(handler.function, "reindex-all");
}
