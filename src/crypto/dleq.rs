//! Chaum-Pedersen DLEQ proof
//!
//! Proves `log_{H(m)}(phi) == log_G(pk)` without revealing the exponent.
//!
//! ```text
//! g = H(m),  r <- random
//! com1 = r·g,  com2 = r·G
//! c = H(phi || pk || com1 || com2)
//! z = r - c·sk
//! ```
//!
//! Verification recomputes `R = z·g + c·phi` and `R' = z·G + c·pk`, which
//! equal `com1` and `com2` exactly when the same `sk` was used for both.

use crate::crypto::encoding::encode_point;
use crate::crypto::suite::Ciphersuite;
use crate::error::Result;
use rand::{CryptoRng, RngCore};
use secp256kfun::prelude::*;
use subtle::ConstantTimeEq;

/// Bytes a proof occupies on the wire: challenge and response scalars. The
/// base point is recomputed from the message.
pub const PROOF_SIZE: usize = 64;

/// Non-interactive DLEQ proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proof {
    /// z = r - c·sk
    pub response: Scalar<Public, Zero>,
    /// Fiat-Shamir challenge c
    pub challenge: Scalar<Public, Zero>,
    /// g = H(m)
    pub base: Point,
}

/// Prover and verifier bound to one ciphersuite.
#[derive(Clone, Copy, Debug)]
pub struct Dleq {
    suite: Ciphersuite,
}

impl Dleq {
    pub fn new(suite: Ciphersuite) -> Self {
        Self { suite }
    }

    pub fn suite(&self) -> &Ciphersuite {
        &self.suite
    }

    /// Prove that `phi = sk·H(message)` and `pk = sk·G` share `sk`.
    pub fn prove(
        &self,
        phi: &Point,
        message: &[u8],
        sk: &Scalar<Secret, NonZero>,
        pk: &Point,
    ) -> Result<Proof> {
        self.prove_with_rng(phi, message, sk, pk, &mut rand::thread_rng())
    }

    /// Same as [`Dleq::prove`] with a caller-supplied nonce source.
    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        &self,
        phi: &Point,
        message: &[u8],
        sk: &Scalar<Secret, NonZero>,
        pk: &Point,
        rng: &mut R,
    ) -> Result<Proof> {
        let g = self.suite.hash_to_point(message)?;
        let r = Scalar::<Secret, NonZero>::random(rng);

        let com1 = g!(r * g).normalize();
        let com2 = g!(r * G).normalize();

        let c = self.challenge(phi, pk, &com1, &com2);
        let sk = *sk;
        let z = s!(r - c * sk).public();

        Ok(Proof {
            response: z,
            challenge: c,
            base: g,
        })
    }

    /// Check a proof against `phi` and `pk`. Never panics.
    pub fn verify(&self, phi: &Point, pk: &Point, proof: &Proof) -> bool {
        let (z, c, g) = (proof.response, proof.challenge, proof.base);
        let (phi_point, pk_point) = (*phi, *pk);

        let r = g!(z * g + c * phi_point).normalize().non_zero();
        let r_prime = g!(z * G + c * pk_point).normalize().non_zero();

        let (Some(r), Some(r_prime)) = (r, r_prime) else {
            return false;
        };

        let expected = self.challenge(phi, pk, &r, &r_prime);
        expected.to_bytes()[..].ct_eq(&c.to_bytes()[..]).into()
    }

    fn challenge(&self, phi: &Point, pk: &Point, com1: &Point, com2: &Point) -> Scalar<Public, Zero> {
        let curve = self.suite.curve;
        let phi = encode_point(curve, phi);
        let pk = encode_point(curve, pk);
        let com1 = encode_point(curve, com1);
        let com2 = encode_point(curve, com2);
        self.suite
            .hash_to_scalar(&[&phi[..], &pk[..], &com1[..], &com2[..]])
    }
}
