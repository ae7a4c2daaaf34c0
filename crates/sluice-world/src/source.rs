//! Event source identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// The closed set of trigger kinds the core knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
  Http,
  Message,
  Timer,
  Custom,
}

impl TriggerKind {
  pub const ALL: [TriggerKind; 4] = [Self::Http, Self::Message, Self::Timer, Self::Custom];

  /// Prefix used in source identities, e.g. `queue` in `queue:inbox`.
  pub fn prefix(&self) -> &'static str {
    match self {
      Self::Http => "http",
      Self::Message => "queue",
      Self::Timer => "timer",
      Self::Custom => "custom",
    }
  }

  fn from_prefix(prefix: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
  }
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.prefix())
  }
}

/// Identity of an event source: `kind:name`, e.g. `queue:inbox`,
/// `http:/orders` or `timer:heartbeat`.
///
/// Two identities collide when both kind and name are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId {
  kind: TriggerKind,
  name: String,
}

impl SourceId {
  pub fn new(kind: TriggerKind, name: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
    }
  }

  pub fn kind(&self) -> TriggerKind {
    self.kind
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl FromStr for SourceId {
  type Err = WorldError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let (prefix, name) = input
      .split_once(':')
      .ok_or_else(|| WorldError::invalid_source(input, "expected 'kind:name'"))?;
    let kind = TriggerKind::from_prefix(prefix).ok_or_else(|| {
      WorldError::invalid_source(
        input,
        format!("unknown trigger kind '{}' (expected http, queue, timer or custom)", prefix),
      )
    })?;
    let name = name.trim();
    if name.is_empty() {
      return Err(WorldError::invalid_source(input, "empty source name"));
    }
    Ok(Self::new(kind, name))
  }
}

impl TryFrom<String> for SourceId {
  type Error = WorldError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<SourceId> for String {
  fn from(value: SourceId) -> Self {
    value.to_string()
  }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind.prefix(), self.name)
  }
}
