//! Content hashing for permission ids, deployment addresses and setup ids
//!
//! Every derived identifier in Quorum goes through this module so that the
//! digest algorithm is declared in exactly one place. Hashing is pure and
//! synchronous: the same input always produces the same 32-byte digest.
//!
//! Current algorithm: **SHA-256**.
//!
//! # Usage
//!
//! ```
//! use quorum_core::hash::{hash, hasher};
//!
//! let digest = hash(b"EXECUTE_PERMISSION");
//! assert_eq!(digest.len(), 32);
//!
//! let mut h = hasher("quorum/example");
//! h.update(b"part-one");
//! h.update(b"part-two");
//! assert_ne!(h.finalize(), digest);
//! ```

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes to a 32-byte digest
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    into_digest(hasher)
}

fn into_digest(hasher: Sha256) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Create an incremental hasher bound to a domain tag
///
/// The tag is absorbed first and length-prefixed, so digests produced under
/// different tags do not collide with each other.
pub fn hasher(domain: &str) -> DomainHasher {
    let mut inner = Sha256::new();
    inner.update((domain.len() as u64).to_be_bytes());
    inner.update(domain.as_bytes());
    DomainHasher { inner }
}

/// Incremental, domain-separated hasher
#[derive(Clone)]
pub struct DomainHasher {
    inner: Sha256,
}

impl DomainHasher {
    /// Absorb raw bytes
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Absorb a variable-length field with a length prefix
    pub fn update_field(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update((data.len() as u64).to_be_bytes());
        self.inner.update(data);
        self
    }

    /// Finalize and return the 32-byte digest
    pub fn finalize(self) -> [u8; 32] {
        into_digest(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash(b"root"), hash(b"root"));
        assert_ne!(hash(b"root"), hash(b"ROOT"));
    }

    #[test]
    fn test_domain_separation() {
        let mut a = hasher("a");
        a.update(b"payload");
        let mut b = hasher("b");
        b.update(b"payload");
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_field_prefix_prevents_concatenation_collisions() {
        let mut a = hasher("t");
        a.update_field(b"ab").update_field(b"c");
        let mut b = hasher("t");
        b.update_field(b"a").update_field(b"bc");
        assert_ne!(a.finalize(), b.finalize());
    }
}
