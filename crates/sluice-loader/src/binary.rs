use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Immutable, content-addressed component bytes.
#[derive(Clone)]
pub struct ComponentBinary {
  bytes: Arc<[u8]>,
  digest: String,
}

impl ComponentBinary {
  pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
    let bytes: Arc<[u8]> = bytes.into().into();
    let digest = format!("sha256:{}", hex::encode(Sha256::digest(&bytes)));
    Self { bytes, digest }
  }

  /// `sha256:<hex>` of the bytes.
  pub fn digest(&self) -> &str {
    &self.digest
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

impl fmt::Debug for ComponentBinary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentBinary")
      .field("digest", &self.digest)
      .field("len", &self.bytes.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_digest_is_content_addressed() {
    let a = ComponentBinary::new(b"hello".to_vec());
    let b = ComponentBinary::new(b"hello".to_vec());
    let c = ComponentBinary::new(b"world".to_vec());

    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), c.digest());
    assert_eq!(
      a.digest(),
      "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(a.len(), 5);
  }
}
