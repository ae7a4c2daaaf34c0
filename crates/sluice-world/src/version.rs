//! World generations and the rule deciding which generations a host accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A world generation, `major.minor.patch` with an optional pre-release tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldVersion {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
  pub pre: Option<String>,
}

impl WorldVersion {
  pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
    Self {
      major,
      minor,
      patch,
      pre: None,
    }
  }
}

impl FromStr for WorldVersion {
  type Err = WorldError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let (core, pre) = match input.split_once('-') {
      Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
      Some(_) => return Err(WorldError::invalid_version(input, "empty pre-release tag")),
      None => (input, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let [major, minor, patch] = parts.as_slice() else {
      return Err(WorldError::invalid_version(
        input,
        "expected three dot-separated numbers",
      ));
    };

    let number = |part: &str| {
      part
        .parse::<u64>()
        .map_err(|e| WorldError::invalid_version(input, e.to_string()))
    };

    Ok(Self {
      major: number(major)?,
      minor: number(minor)?,
      patch: number(patch)?,
      pre,
    })
  }
}

impl fmt::Display for WorldVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
    if let Some(pre) = &self.pre {
      write!(f, "-{}", pre)?;
    }
    Ok(())
  }
}

/// Decides whether a component built against one generation may run on a
/// host that supports another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityRule {
  /// Same major; component minor at most the supported minor. When the minors
  /// match, the component patch may not be newer. Pre-release tags must match.
  #[default]
  Semver,
  /// Any difference at all is a mismatch.
  Exact,
}

impl CompatibilityRule {
  /// Returns true if a component declaring `declared` may load on a host
  /// whose current generation is `supported`.
  pub fn accepts(&self, supported: &WorldVersion, declared: &WorldVersion) -> bool {
    match self {
      Self::Exact => supported == declared,
      Self::Semver => {
        if supported.pre != declared.pre || supported.major != declared.major {
          return false;
        }
        match declared.minor.cmp(&supported.minor) {
          std::cmp::Ordering::Less => true,
          std::cmp::Ordering::Equal => declared.patch <= supported.patch,
          std::cmp::Ordering::Greater => false,
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> WorldVersion {
    s.parse().unwrap()
  }

  #[test]
  fn test_parse_and_display() {
    let version = v("0.2.1");
    assert_eq!(version, WorldVersion::new(0, 2, 1));
    assert_eq!(version.to_string(), "0.2.1");

    let pre = v("1.0.0-rc.1");
    assert_eq!(pre.pre.as_deref(), Some("rc.1"));
    assert_eq!(pre.to_string(), "1.0.0-rc.1");
  }

  #[test]
  fn test_parse_rejects_garbage() {
    assert!("1.0".parse::<WorldVersion>().is_err());
    assert!("1.0.x".parse::<WorldVersion>().is_err());
    assert!("1.0.0-".parse::<WorldVersion>().is_err());
    assert!("".parse::<WorldVersion>().is_err());
  }

  #[test]
  fn test_semver_rule() {
    let rule = CompatibilityRule::Semver;
    let supported = v("1.4.2");

    assert!(rule.accepts(&supported, &v("1.4.2")));
    assert!(rule.accepts(&supported, &v("1.4.0")));
    assert!(rule.accepts(&supported, &v("1.0.9")));
    assert!(!rule.accepts(&supported, &v("1.4.3")));
    assert!(!rule.accepts(&supported, &v("1.5.0")));
    assert!(!rule.accepts(&supported, &v("2.0.0")));
    assert!(!rule.accepts(&supported, &v("0.4.2")));
    assert!(!rule.accepts(&supported, &v("1.4.2-rc.1")));
  }

  #[test]
  fn test_exact_rule() {
    let rule = CompatibilityRule::Exact;
    assert!(rule.accepts(&v("0.2.0"), &v("0.2.0")));
    assert!(!rule.accepts(&v("0.2.1"), &v("0.2.0")));
    assert!(!rule.accepts(&v("0.2.0"), &v("0.1.0")));
  }
}
