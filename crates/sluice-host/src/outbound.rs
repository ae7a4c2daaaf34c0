//! Where granted outbound traffic goes.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::state::InvocationScope;

/// Header carrying the invocation id on outbound HTTP requests.
pub const INVOCATION_ID_HEADER: &str = "x-sluice-invocation-id";

/// Receives the outbound traffic of guests.
///
/// Calls arrive only after the binding's grants have been checked. Both run
/// on the invocation's task, inside the invocation time budget.
#[async_trait]
pub trait OutboundSink: Send + Sync {
  /// Publish a message to a topic.
  fn publish(&self, scope: &InvocationScope, topic: &str, payload: &[u8]);

  /// Make a request to an outbound target. `Err` is handed to the guest as
  /// an application-level failure.
  async fn request(&self, scope: &InvocationScope, target: &Url, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// A message a guest published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
  pub invocation_id: String,
  pub topic: String,
  pub payload: Vec<u8>,
}

/// A request a guest made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requested {
  pub invocation_id: String,
  pub target: String,
  pub body: Vec<u8>,
}

/// Keeps everything in memory and answers requests by echoing the body.
#[derive(Debug, Default)]
pub struct RecordingSink {
  published: Mutex<Vec<Published>>,
  requested: Mutex<Vec<Requested>>,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn published(&self) -> Vec<Published> {
    self
      .published
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone()
  }

  pub fn requested(&self) -> Vec<Requested> {
    self
      .requested
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone()
  }
}

#[async_trait]
impl OutboundSink for RecordingSink {
  fn publish(&self, scope: &InvocationScope, topic: &str, payload: &[u8]) {
    self
      .published
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push(Published {
        invocation_id: scope.invocation_id.clone(),
        topic: topic.to_string(),
        payload: payload.to_vec(),
      });
  }

  async fn request(&self, scope: &InvocationScope, target: &Url, body: Vec<u8>) -> Result<Vec<u8>, String> {
    self
      .requested
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push(Requested {
        invocation_id: scope.invocation_id.clone(),
        target: target.to_string(),
        body: body.clone(),
      });
    Ok(body)
  }
}

/// Sends granted requests over HTTP with reqwest. Published messages have no
/// broker here and are logged.
///
/// A request is a `POST` of the guest's body to the target URL. The response
/// body comes back to the guest; a non-2xx status or transport failure comes
/// back as the guest-visible error string.
#[derive(Debug, Clone, Default)]
pub struct HttpSink {
  client: Client,
}

impl HttpSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl OutboundSink for HttpSink {
  fn publish(&self, scope: &InvocationScope, topic: &str, payload: &[u8]) {
    info!(
      invocation_id = %scope.invocation_id,
      component = %scope.component,
      topic,
      bytes = payload.len(),
      "guest_published"
    );
  }

  async fn request(&self, scope: &InvocationScope, target: &Url, body: Vec<u8>) -> Result<Vec<u8>, String> {
    let sent = body.len();
    let response = self
      .client
      .post(target.clone())
      .header(INVOCATION_ID_HEADER, scope.invocation_id.as_str())
      .body(body)
      .send()
      .await
      .map_err(|e| {
        warn!(invocation_id = %scope.invocation_id, target = %target, error = %e, "guest_request_failed");
        format!("request to {} failed: {}", target, e)
      })?;

    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| format!("reading response from {} failed: {}", target, e))?;
    info!(
      invocation_id = %scope.invocation_id,
      component = %scope.component,
      target = %target,
      status = status.as_u16(),
      sent,
      received = bytes.len(),
      "guest_requested"
    );

    if !status.is_success() {
      return Err(format!("{} returned {}", target, status));
    }
    Ok(bytes.to_vec())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sluice_world::{SourceId, TriggerKind};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  fn scope() -> InvocationScope {
    InvocationScope {
      invocation_id: "inv-1".to_string(),
      source: SourceId::new(TriggerKind::Http, "/orders"),
      component: "orders".to_string(),
    }
  }

  /// Serve one HTTP request on a local port. The handler gets the raw request
  /// head and body and returns the status line and response body.
  async fn serve_once<F>(respond: F) -> (Url, tokio::task::JoinHandle<(String, Vec<u8>)>)
  where
    F: FnOnce(&str, &[u8]) -> (&'static str, Vec<u8>) + Send + 'static,
  {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = Vec::new();
      let mut chunk = [0u8; 1024];
      let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
          break pos + 4;
        }
      };
      let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
      let length = head
        .lines()
        .find_map(|line| {
          let (name, value) = line.split_once(':')?;
          name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
      while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
      }
      let body = buf[head_end..head_end + length].to_vec();

      let (status, reply) = respond(&head, &body);
      let response = format!(
        "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        status,
        reply.len()
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      socket.write_all(&reply).await.unwrap();
      socket.shutdown().await.unwrap();
      (head, body)
    });
    (Url::parse(&format!("http://{}/hook", addr)).unwrap(), handle)
  }

  #[tokio::test]
  async fn test_recording_sink() {
    let sink = RecordingSink::new();
    sink.publish(&scope(), "orders", b"created");
    let url = Url::parse("https://api.example.com/x").unwrap();
    assert_eq!(sink.request(&scope(), &url, b"ping".to_vec()).await, Ok(b"ping".to_vec()));

    assert_eq!(
      sink.published(),
      vec![Published {
        invocation_id: "inv-1".to_string(),
        topic: "orders".to_string(),
        payload: b"created".to_vec(),
      }]
    );
    assert_eq!(sink.requested()[0].target, "https://api.example.com/x");
  }

  #[tokio::test]
  async fn test_http_sink_posts_body() {
    let (url, server) = serve_once(|_, body| {
      let mut reply = b"got ".to_vec();
      reply.extend_from_slice(body);
      ("200 OK", reply)
    })
    .await;

    let result = HttpSink::new().request(&scope(), &url, b"ping".to_vec()).await;
    assert_eq!(result, Ok(b"got ping".to_vec()));

    let (head, body) = server.await.unwrap();
    assert!(head.starts_with("POST /hook HTTP/1.1"));
    assert!(head.to_ascii_lowercase().contains("x-sluice-invocation-id: inv-1"));
    assert_eq!(body, b"ping".to_vec());
  }

  #[tokio::test]
  async fn test_http_sink_reports_error_status() {
    let (url, server) = serve_once(|_, _| ("503 Service Unavailable", b"busy".to_vec())).await;

    let result = HttpSink::new().request(&scope(), &url, Vec::new()).await;
    let err = result.unwrap_err();
    assert!(err.contains("503"), "unexpected error: {}", err);
    server.await.unwrap();
  }

  #[tokio::test]
  async fn test_http_sink_unreachable_target() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/", addr)).unwrap();
    assert!(HttpSink::new().request(&scope(), &url, Vec::new()).await.is_err());
  }
}
