//! Capability grants.
//!
//! A binding grants its component a set of outbound hosts and message topics.
//! Anything not granted is denied at the host import boundary.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use url::Url;

use crate::error::HostError;

/// A guest tried to use a capability its binding does not grant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capability denied: {capability}")]
pub struct CapabilityDenied {
  /// Human-readable description, e.g. `topic 'audit'`.
  pub capability: String,
}

impl CapabilityDenied {
  pub fn topic(topic: &str) -> Self {
    Self {
      capability: format!("topic '{}'", topic),
    }
  }

  pub fn target(target: &str) -> Self {
    Self {
      capability: format!("outbound target '{}'", target),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
  Any,
  Exact(String),
  /// `*.example.com` matches `api.example.com` but not `example.com`.
  Subdomain(String),
}

/// One allowed outbound host, `scheme://host[:port]` with `*` wildcards
/// allowed for each part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedHost {
  original: String,
  scheme: Option<String>,
  host: HostMatch,
  port: Option<u16>,
}

impl AllowedHost {
  pub fn parse(grant: &str) -> Result<Self, HostError> {
    let trimmed = grant.trim();
    let (scheme, rest) = trimmed.split_once("://").ok_or_else(|| {
      HostError::invalid_grant(grant, "expected <scheme>://<host>[:<port>], e.g. 'https://*.example.com'")
    })?;

    let scheme = match scheme {
      "*" => None,
      s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => Some(s.to_ascii_lowercase()),
      _ => return Err(HostError::invalid_grant(grant, "scheme must be alphabetic or '*'")),
    };

    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.contains('/') {
      return Err(HostError::invalid_grant(grant, "paths are not allowed"));
    }

    let (host, port) = match rest.rsplit_once(':') {
      Some((host, "*")) => (host, None),
      Some((host, port)) => {
        let port = port
          .parse::<u16>()
          .map_err(|_| HostError::invalid_grant(grant, format!("invalid port '{}'", port)))?;
        (host, Some(port))
      }
      None => (rest, None),
    };

    let host = match host {
      "" => return Err(HostError::invalid_grant(grant, "empty host")),
      "*" => HostMatch::Any,
      h => match h.strip_prefix("*.") {
        Some(suffix) if !suffix.is_empty() && !suffix.contains('*') => {
          HostMatch::Subdomain(suffix.to_ascii_lowercase())
        }
        Some(_) => return Err(HostError::invalid_grant(grant, "invalid wildcard host")),
        None if h.contains('*') => {
          return Err(HostError::invalid_grant(grant, "wildcards are only allowed as '*' or '*.domain'"));
        }
        None => HostMatch::Exact(h.to_ascii_lowercase()),
      },
    };

    Ok(Self {
      original: grant.to_string(),
      scheme,
      host,
      port,
    })
  }

  fn allows(&self, url: &Url) -> bool {
    let scheme_ok = self.scheme.as_deref().is_none_or(|s| s == url.scheme());
    let host_ok = match (&self.host, url.host_str()) {
      (HostMatch::Any, Some(_)) => true,
      (HostMatch::Exact(expected), Some(host)) => host.eq_ignore_ascii_case(expected),
      (HostMatch::Subdomain(suffix), Some(host)) => {
        let host = host.to_ascii_lowercase();
        host.len() > suffix.len() + 1
          && host.ends_with(suffix.as_str())
          && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
      }
      (_, None) => false,
    };
    let port_ok = match self.port {
      None => true,
      Some(port) => url.port_or_known_default() == Some(port),
    };
    scheme_ok && host_ok && port_ok
  }
}

impl fmt::Display for AllowedHost {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.original)
  }
}

/// The capability set granted to one binding.
///
/// The default grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
  outbound_hosts: Vec<AllowedHost>,
  topics: BTreeSet<String>,
}

impl Grants {
  pub fn none() -> Self {
    Self::default()
  }

  /// Parse grants from configuration strings.
  pub fn parse<H, T>(hosts: H, topics: T) -> Result<Self, HostError>
  where
    H: IntoIterator,
    H::Item: AsRef<str>,
    T: IntoIterator,
    T::Item: Into<String>,
  {
    let outbound_hosts = hosts
      .into_iter()
      .map(|h| AllowedHost::parse(h.as_ref()))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self {
      outbound_hosts,
      topics: topics.into_iter().map(Into::into).collect(),
    })
  }

  /// Topics match exactly; a grant ending in `.*` matches any topic below
  /// that prefix; `*` matches everything.
  pub fn check_topic(&self, topic: &str) -> Result<(), CapabilityDenied> {
    let allowed = self.topics.iter().any(|grant| {
      grant == "*"
        || grant == topic
        || grant
          .strip_suffix(".*")
          .is_some_and(|prefix| topic.len() > prefix.len() + 1 && topic.starts_with(prefix) && topic.as_bytes()[prefix.len()] == b'.')
    });
    if allowed {
      Ok(())
    } else {
      Err(CapabilityDenied::topic(topic))
    }
  }

  /// Check an outbound target URL. Unparseable targets are denied.
  pub fn check_target(&self, target: &str) -> Result<Url, CapabilityDenied> {
    let url = Url::parse(target).map_err(|_| CapabilityDenied::target(target))?;
    if self.outbound_hosts.iter().any(|grant| grant.allows(&url)) {
      Ok(url)
    } else {
      Err(CapabilityDenied::target(target))
    }
  }

  pub fn is_empty(&self) -> bool {
    self.outbound_hosts.is_empty() && self.topics.is_empty()
  }
}
