//! Ciphersuite: curve and hash selection
//!
//! Every engine, proof and orchestrator carries an explicit [`Ciphersuite`]
//! instead of reaching for a global curve or hasher. Two engines configured
//! with different suites can live side by side in one process.
//!
//! ## Operations
//!
//! - **hash_to_point**: try-and-increment map from a message into the group
//! - **hash_to_scalar**: domain-separated hash reduced modulo the group order
//! - **tagged_digest**: BIP340-style tagged hash over the configured function

use crate::error::{Error, Result};
use secp256kfun::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Domain separation tag for hashing messages into the group.
pub const HASH_TO_POINT_TAG: &str = "TVRF/hash-to-point";

/// Domain separation tag for Fiat-Shamir challenges.
pub const HASH_TO_SCALAR_TAG: &str = "TVRF/hash-to-scalar";

/// Try-and-increment gives up after this many candidates. Each candidate
/// succeeds with probability ~1/2.
const MAX_HASH_TO_POINT_ATTEMPTS: u32 = 256;

/// Elliptic curves the crate can evaluate over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveId {
    #[default]
    Secp256k1,
}

impl CurveId {
    /// Name used as the tag of the canonical point encoding.
    pub fn name(&self) -> &'static str {
        match self {
            CurveId::Secp256k1 => "secp256k1",
        }
    }

    /// Parse a curve tag. Unknown tags yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "secp256k1" => Some(CurveId::Secp256k1),
            _ => None,
        }
    }

    /// Length of a SEC1 compressed point.
    pub fn compressed_point_len(&self) -> usize {
        match self {
            CurveId::Secp256k1 => 33,
        }
    }
}

impl std::fmt::Display for CurveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash functions usable for hash-to-point and Fiat-Shamir challenges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashId {
    #[default]
    Sha256,
    Sha512,
}

impl HashId {
    /// Tagged hash: H(H(tag) || H(tag) || parts...), truncated to 32 bytes.
    pub fn tagged_digest(&self, tag: &str, parts: &[&[u8]]) -> [u8; 32] {
        match self {
            HashId::Sha256 => tagged::<Sha256>(tag, parts),
            HashId::Sha512 => tagged::<Sha512>(tag, parts),
        }
    }
}

fn tagged<D: Digest>(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let tag_hash = D::digest(tag.as_bytes());
    let mut hasher = D::new();
    hasher.update(&tag_hash);
    hasher.update(&tag_hash);
    for part in parts {
        hasher.update(part);
    }
    let output = hasher.finalize();

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&output[..32]);
    digest
}

/// Group parameters and hash function of one TVRF instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphersuite {
    #[serde(default)]
    pub curve: CurveId,
    #[serde(default)]
    pub hash: HashId,
}

impl Ciphersuite {
    pub fn new(curve: CurveId, hash: HashId) -> Self {
        Self { curve, hash }
    }

    /// Deterministically map a message to a group element.
    ///
    /// The candidate x-coordinate is H(tag, curve, message, counter); the first
    /// candidate that lies on the curve is lifted to the point with even y.
    pub fn hash_to_point(&self, message: &[u8]) -> Result<Point> {
        let curve_name = self.curve.name().as_bytes();

        for counter in 0..MAX_HASH_TO_POINT_ATTEMPTS {
            let x = self.hash.tagged_digest(
                HASH_TO_POINT_TAG,
                &[curve_name, message, &counter.to_be_bytes()[..]],
            );

            let mut candidate = [0u8; 33];
            candidate[0] = 0x02;
            candidate[1..].copy_from_slice(&x);

            if let Some(point) = Point::from_bytes(candidate) {
                return Ok(point);
            }
        }

        Err(Error::HashToCurve)
    }

    /// Hash arbitrary byte strings to a scalar (mod group order).
    pub fn hash_to_scalar(&self, parts: &[&[u8]]) -> Scalar<Public, Zero> {
        let digest = self.hash.tagged_digest(HASH_TO_SCALAR_TAG, parts);
        Scalar::from_bytes_mod_order(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_to_point_deterministic() {
        let suite = Ciphersuite::default();
        let p1 = suite.hash_to_point(b"child").unwrap();
        let p2 = suite.hash_to_point(b"child").unwrap();
        assert_eq!(p1, p2);

        let p3 = suite.hash_to_point(b"other child").unwrap();
        assert_ne!(p1, p3);
    }

    #[test]
    fn test_hash_to_point_depends_on_hash_function() {
        let sha256 = Ciphersuite::new(CurveId::Secp256k1, HashId::Sha256);
        let sha512 = Ciphersuite::new(CurveId::Secp256k1, HashId::Sha512);
        assert_ne!(
            sha256.hash_to_point(b"m").unwrap(),
            sha512.hash_to_point(b"m").unwrap()
        );
    }

    #[test]
    fn test_tagged_digest_domain_separation() {
        let h1 = HashId::Sha256.tagged_digest("A", &[&b"data"[..]]);
        let h2 = HashId::Sha256.tagged_digest("B", &[&b"data"[..]]);
        assert_ne!(h1, h2);

        // Concatenation of parts is what gets hashed
        let split = HashId::Sha256.tagged_digest("A", &[&b"da"[..], &b"ta"[..]]);
        assert_eq!(h1, split);
    }

    #[test]
    fn test_curve_names() {
        assert_eq!(CurveId::from_name("secp256k1"), Some(CurveId::Secp256k1));
        assert_eq!(CurveId::from_name("P-256"), None);
        assert_eq!(CurveId::Secp256k1.to_string(), "secp256k1");
    }

    #[test]
    fn test_suite_from_json_defaults() {
        let suite: Ciphersuite = serde_json::from_str("{}").unwrap();
        assert_eq!(suite, Ciphersuite::default());

        let suite: Ciphersuite = serde_json::from_str(r#"{"hash":"sha512"}"#).unwrap();
        assert_eq!(suite.hash, HashId::Sha512);
    }
}
