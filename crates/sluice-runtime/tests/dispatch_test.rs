//! End-to-end dispatch tests: config in, invocation records out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sluice_config::{BindingDef, CapabilitiesDef, ComponentDef, PoolingMode, RuntimeConfig};
use sluice_host::RecordingSink;
use sluice_loader::LoadError;
use sluice_runtime::{
  DispatchError, Event, InvocationOutcome, InvocationPhase, Runtime, Signal, Trigger,
};
use sluice_world::SourceId;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn fixture_path(name: &str) -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("../../test-components")
    .join(name)
}

/// Write a variant of a fixture into `dir`, rewriting its world and handler.
fn variant(dir: &TempDir, fixture: &str, name: &str, world: &str, handler: &str) -> PathBuf {
  let wat = std::fs::read_to_string(fixture_path(fixture))
    .expect("failed to read test component")
    .replace("sluice:message/handler", world)
    .replace("on-message", handler);
  let path = dir.path().join(name);
  std::fs::write(&path, wat).expect("failed to write test component");
  path
}

fn component(id: &str, fixture: &str) -> ComponentDef {
  ComponentDef {
    id: id.to_string(),
    path: fixture_path(fixture),
  }
}

fn binding(source: &str, component: &str, handler: &str) -> BindingDef {
  BindingDef {
    source: source.to_string(),
    component: component.to_string(),
    handler: handler.to_string(),
    capabilities: CapabilitiesDef::default(),
    ordered: false,
    interval_ms: None,
  }
}

fn config(components: Vec<ComponentDef>, bindings: Vec<BindingDef>) -> RuntimeConfig {
  RuntimeConfig {
    max_concurrent_instances: 4,
    instance_memory_limit: 1024 * 1024,
    invocation_time_budget_ms: 2_000,
    queue_wait_ms: 50,
    components,
    bindings,
    ..RuntimeConfig::default()
  }
}

fn start(config: &RuntimeConfig) -> (Runtime, Arc<RecordingSink>) {
  let sink = Arc::new(RecordingSink::new());
  let runtime = Runtime::start(config, sink.clone()).expect("runtime failed to start");
  (runtime, sink)
}

fn source(s: &str) -> SourceId {
  s.parse().unwrap()
}

#[tokio::test]
async fn test_dispatch_echo() {
  let (runtime, _) = start(&config(
    vec![component("echo", "echo.wat")],
    vec![binding("queue:inbox", "echo", "on_message")],
  ));
  assert!(runtime.report().is_clean());

  let record = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:inbox"), b"hello".to_vec()).with_correlation_id("corr-1"))
    .await
    .unwrap();

  assert_eq!(record.outcome, InvocationOutcome::Succeeded(b"hello".to_vec()));
  assert_eq!(record.phase, InvocationPhase::Succeeded);
  assert_eq!(record.invocation_id, "corr-1");
  assert_eq!(record.component, "echo");
  assert_eq!(record.source, source("queue:inbox"));
}

#[tokio::test]
async fn test_generated_invocation_ids_are_unique() {
  let (runtime, _) = start(&config(
    vec![component("echo", "echo.wat")],
    vec![binding("queue:inbox", "echo", "on_message")],
  ));
  let dispatcher = runtime.dispatcher();

  let a = dispatcher.dispatch(Event::new(source("queue:inbox"), b"a".to_vec())).await.unwrap();
  let b = dispatcher.dispatch(Event::new(source("queue:inbox"), b"b".to_vec())).await.unwrap();
  assert!(!a.invocation_id.is_empty());
  assert_ne!(a.invocation_id, b.invocation_id);
}

#[tokio::test]
async fn test_unbound_source_touches_nothing() {
  let (runtime, _) = start(&config(
    vec![component("echo", "echo.wat")],
    vec![binding("queue:inbox", "echo", "on_message")],
  ));
  let before = runtime.pool_stats();

  let err = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:unknown"), b"x".to_vec()))
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::NoBindingFound { ref source_id } if *source_id == source("queue:unknown")));

  // Same name, different kind.
  let err = runtime
    .dispatcher()
    .dispatch(Event::new(source("timer:inbox"), b"x".to_vec()))
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::NoBindingFound { .. }));

  assert_eq!(runtime.pool_stats(), before);
}

#[tokio::test]
async fn test_app_error_and_fault() {
  let (runtime, _) = start(&config(
    vec![component("failing", "app-error.wat"), component("trapping", "trap.wat")],
    vec![
      binding("queue:failing", "failing", "on_message"),
      binding("queue:trapping", "trapping", "on_message"),
    ],
  ));
  let dispatcher = runtime.dispatcher();

  let record = dispatcher.dispatch(Event::new(source("queue:failing"), b"x".to_vec())).await.unwrap();
  assert_eq!(record.outcome, InvocationOutcome::AppError("boom".to_string()));

  let record = dispatcher.dispatch(Event::new(source("queue:trapping"), b"x".to_vec())).await.unwrap();
  assert_eq!(record.phase, InvocationPhase::Faulted);
  assert!(matches!(record.outcome, InvocationOutcome::Faulted(ref reason) if reason.starts_with("trap")));

  // The trapped instance never returns to the pool.
  assert_eq!(runtime.pool_stats().idle, 0);
  assert_eq!(runtime.pool_stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spin_times_out() {
  let mut config = config(
    vec![component("spin", "spin.wat")],
    vec![binding("queue:spin", "spin", "on_message")],
  );
  config.invocation_time_budget_ms = 100;
  let (runtime, _) = start(&config);

  let record = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:spin"), b"x".to_vec()))
    .await
    .unwrap();

  assert_eq!(
    record.outcome,
    InvocationOutcome::TimedOut {
      budget: Duration::from_millis(100)
    }
  );
  assert!(record.elapsed >= Duration::from_millis(100));
  assert!(record.elapsed < Duration::from_secs(2));
  assert_eq!(runtime.pool_stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overload_beyond_max_instances() {
  let mut config = config(
    vec![component("spin", "spin.wat")],
    vec![binding("queue:spin", "spin", "on_message")],
  );
  config.max_concurrent_instances = 2;
  config.invocation_time_budget_ms = 500;
  config.queue_wait_ms = 50;
  let (runtime, _) = start(&config);
  let dispatcher = runtime.dispatcher();

  let results = futures::future::join_all(
    (0..3).map(|_| dispatcher.dispatch(Event::new(source("queue:spin"), b"x".to_vec()))),
  )
  .await;

  let overloaded = results
    .iter()
    .filter(|r| matches!(r, Err(DispatchError::Overloaded { .. })))
    .count();
  let timed_out = results
    .iter()
    .filter(|r| matches!(r, Ok(record) if record.phase == InvocationPhase::TimedOut))
    .count();
  assert_eq!(overloaded, 1);
  assert_eq!(timed_out, 2);
  assert_eq!(runtime.pool_stats().overloaded, 1);
}

#[tokio::test]
async fn test_fresh_instances_share_no_state() {
  let (runtime, _) = start(&config(
    vec![component("counter", "counter.wat")],
    vec![binding("queue:count", "counter", "on_message")],
  ));
  let dispatcher = runtime.dispatcher();

  for _ in 0..3 {
    let record = dispatcher.dispatch(Event::new(source("queue:count"), Vec::new())).await.unwrap();
    assert_eq!(record.outcome, InvocationOutcome::Succeeded(vec![1]));
  }
}

#[tokio::test]
async fn test_warm_mode_reuses_message_instances() {
  let mut config = config(
    vec![component("counter", "counter.wat")],
    vec![binding("queue:count", "counter", "on_message")],
  );
  config.pooling_mode = PoolingMode::Warm;
  config.warm_instances_per_component = 1;
  let (runtime, _) = start(&config);
  let dispatcher = runtime.dispatcher();

  let first = dispatcher.dispatch(Event::new(source("queue:count"), Vec::new())).await.unwrap();
  let second = dispatcher.dispatch(Event::new(source("queue:count"), Vec::new())).await.unwrap();
  assert_eq!(first.outcome, InvocationOutcome::Succeeded(vec![1]));
  assert_eq!(second.outcome, InvocationOutcome::Succeeded(vec![2]));
  assert_eq!(runtime.pool_stats().reused, 1);
}

#[tokio::test]
async fn test_capability_denied_without_grant() {
  let (runtime, sink) = start(&config(
    vec![component("publisher", "publish.wat")],
    vec![binding("queue:orders", "publisher", "on_message")],
  ));

  let record = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:orders"), b"order-1".to_vec()))
    .await
    .unwrap();

  assert_eq!(record.phase, InvocationPhase::CapabilityDenied);
  assert!(matches!(record.outcome, InvocationOutcome::CapabilityDenied(ref c) if c.contains("orders")));
  assert!(sink.published().is_empty());
}

#[tokio::test]
async fn test_granted_topic_is_published() {
  let mut publish = binding("queue:orders", "publisher", "on_message");
  publish.capabilities.topics = vec!["orders".to_string()];
  let (runtime, sink) = start(&config(vec![component("publisher", "publish.wat")], vec![publish]));

  let record = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:orders"), b"order-1".to_vec()).with_correlation_id("inv-7"))
    .await
    .unwrap();
  assert_eq!(record.outcome, InvocationOutcome::Succeeded(b"order-1".to_vec()));

  let published = sink.published();
  assert_eq!(published.len(), 1);
  assert_eq!(published[0].topic, "orders");
  assert_eq!(published[0].payload, b"order-1".to_vec());
  assert_eq!(published[0].invocation_id, "inv-7");
}

#[tokio::test]
async fn test_memory_ceiling() {
  let (runtime, _) = start(&config(
    vec![component("big", "big-memory.wat"), component("grow", "grow-memory.wat")],
    vec![
      binding("queue:big", "big", "on_message"),
      binding("queue:grow", "grow", "on_message"),
    ],
  ));
  let dispatcher = runtime.dispatcher();

  let record = dispatcher.dispatch(Event::new(source("queue:big"), b"x".to_vec())).await.unwrap();
  assert_eq!(record.phase, InvocationPhase::ResourceLimitExceeded);

  let record = dispatcher.dispatch(Event::new(source("queue:grow"), b"x".to_vec())).await.unwrap();
  assert_eq!(record.phase, InvocationPhase::ResourceLimitExceeded);
  assert_eq!(runtime.pool_stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ordered_source_runs_in_arrival_order() {
  let mut publish = binding("queue:orders", "publisher", "on_message");
  publish.capabilities.topics = vec!["orders".to_string()];
  publish.ordered = true;
  let mut config = config(vec![component("publisher", "publish.wat")], vec![publish]);
  config.queue_wait_ms = 2_000;
  let (runtime, sink) = start(&config);
  let dispatcher = runtime.dispatcher();

  let payloads: Vec<Vec<u8>> = (1..=6).map(|i| format!("order-{}", i).into_bytes()).collect();
  let results = futures::future::join_all(
    payloads
      .iter()
      .map(|payload| dispatcher.dispatch(Event::new(source("queue:orders"), payload.clone()))),
  )
  .await;

  assert!(results.iter().all(|r| matches!(r, Ok(record) if record.outcome.is_success())));
  let seen: Vec<Vec<u8>> = sink.published().into_iter().map(|p| p.payload).collect();
  assert_eq!(seen, payloads);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ordered_lane_wait_is_bounded() {
  let mut spin = binding("queue:spin", "spin", "on_message");
  spin.ordered = true;
  let mut config = config(vec![component("spin", "spin.wat")], vec![spin]);
  config.invocation_time_budget_ms = 300;
  config.queue_wait_ms = 50;
  let (runtime, _) = start(&config);
  let dispatcher = runtime.dispatcher();

  let results = futures::future::join_all(
    (0..2).map(|_| dispatcher.dispatch(Event::new(source("queue:spin"), b"x".to_vec()))),
  )
  .await;

  assert!(matches!(results[0], Ok(ref record) if record.phase == InvocationPhase::TimedOut));
  assert!(matches!(results[1], Err(DispatchError::Overloaded { .. })));
  // The lane gave up before the pool was asked for a slot.
  assert_eq!(runtime.pool_stats().overloaded, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_function_bounded_by_budget() {
  let mut config = config(
    vec![component("boot", "start-spin.wat")],
    vec![binding("queue:boot", "boot", "on_message")],
  );
  config.invocation_time_budget_ms = 100;
  let (runtime, _) = start(&config);
  assert!(runtime.report().is_clean());

  let record = tokio::time::timeout(
    Duration::from_secs(3),
    runtime.dispatcher().dispatch(Event::new(source("queue:boot"), b"x".to_vec())),
  )
  .await
  .expect("dispatch must return within its budget")
  .unwrap();

  assert_eq!(
    record.outcome,
    InvocationOutcome::TimedOut {
      budget: Duration::from_millis(100)
    }
  );
  let stats = runtime.pool_stats();
  assert_eq!(stats.active, 0);
  assert_eq!(stats.idle, 0);
}

#[tokio::test]
async fn test_http_trigger_signal() {
  let dir = TempDir::new().unwrap();
  let path = variant(&dir, "echo.wat", "http-echo.wat", "sluice:http/handler", "handle-request");
  let (runtime, _) = start(&config(
    vec![ComponentDef {
      id: "http-echo".to_string(),
      path,
    }],
    vec![binding("http:/echo", "http-echo", "handle_request")],
  ));
  let dispatcher = runtime.dispatcher();

  let ok = dispatcher.dispatch(Event::new(source("http:/echo"), b"pong".to_vec())).await;
  assert_eq!(
    Trigger::Http.signal(&ok),
    Signal::Http {
      status: 200,
      body: b"pong".to_vec()
    }
  );

  let missing = dispatcher.dispatch(Event::new(source("http:/missing"), Vec::new())).await;
  assert!(matches!(Trigger::Http.signal(&missing), Signal::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_startup_report_isolates_rejections() {
  let config = config(
    vec![
      component("echo", "echo.wat"),
      ComponentDef {
        id: "missing".to_string(),
        path: fixture_path("does-not-exist.wat"),
      },
    ],
    vec![
      binding("queue:inbox", "echo", "on_message"),
      binding("queue:lost", "missing", "on_message"),
      binding("http:/echo", "echo", "handle_request"),
      binding("queue:inbox", "echo", "on_message"),
      binding("queue:typo", "echo", "on_mesage"),
    ],
  );
  let (runtime, _) = start(&config);
  let report = runtime.report();

  assert!(!report.is_clean());
  assert_eq!(report.loaded.len(), 1);
  assert_eq!(report.loaded[0].id, "echo");
  assert!(report.loaded[0].digest.starts_with("sha256:"));
  assert_eq!(report.loaded[0].world, "sluice:message@0.2.0");

  assert_eq!(report.rejected_components.len(), 1);
  assert_eq!(report.rejected_components[0].id, "missing");
  assert!(matches!(report.rejected_components[0].error, LoadError::Unreadable { .. }));

  assert_eq!(report.bound, vec![source("queue:inbox")]);
  let rejected: Vec<&str> = report.rejected_bindings.iter().map(|b| b.source.as_str()).collect();
  assert_eq!(rejected, vec!["queue:lost", "http:/echo", "queue:inbox", "queue:typo"]);
  assert!(report.rejected_bindings[2].reason.contains("already bound"));

  // The surviving binding still works.
  let record = runtime
    .dispatcher()
    .dispatch(Event::new(source("queue:inbox"), b"still here".to_vec()))
    .await
    .unwrap();
  assert!(record.outcome.is_success());
}

#[test]
fn test_invalid_config_stops_startup() {
  let mut config = config(
    vec![component("echo", "echo.wat")],
    vec![binding("queue:inbox", "echo", "on_message")],
  );
  config.max_concurrent_instances = 0;
  let sink = Arc::new(RecordingSink::new());
  assert!(Runtime::start(&config, sink).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timer_ticks_until_cancelled() {
  let dir = TempDir::new().unwrap();
  let path = variant(&dir, "publish.wat", "beat.wat", "sluice:timer/handler", "on-tick");
  let mut beat = binding("timer:beat", "beat", "on_tick");
  beat.interval_ms = Some(50);
  beat.capabilities.topics = vec!["orders".to_string()];
  let (runtime, sink) = start(&config(
    vec![ComponentDef {
      id: "beat".to_string(),
      path,
    }],
    vec![beat],
  ));
  assert!(runtime.report().is_clean());

  let cancel = CancellationToken::new();
  let handles = runtime.spawn_timers(cancel.clone());
  assert_eq!(handles.len(), 1);

  tokio::time::sleep(Duration::from_millis(300)).await;
  cancel.cancel();
  let mut ticks = 0;
  for handle in handles {
    ticks += handle.await.unwrap();
  }
  assert!(ticks >= 1);

  let published = sink.published();
  assert_eq!(published.len() as u64, ticks);
  let first: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
  assert_eq!(first["source"], "timer:beat");
  assert_eq!(first["tick"], 1);
}
