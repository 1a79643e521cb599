//! DDH-based Threshold VRF
//!
//! Implements the TVRF of Galindo et al. (ePrint 2020/096): each of the n
//! parties holds a Shamir share `s_i` of the secret `sk`, and any t of them can
//! jointly compute `H(m)^sk` without reconstructing `sk`.
//!
//! ## Protocol
//!
//! ```text
//! PEval:    phi_i = s_i·H(m)   + DLEQ proof that log_{H(m)} phi_i = log_G S_i
//! Combine:  drop partials whose proof fails, then
//!           eval = Σ λ_i(0)·phi_i   over the selected index set
//! Verify:   re-check the retained proofs and recombine
//! ```
//!
//! Any two quorums of size ≥ t interpolate the same degree-(t-1) polynomial
//! at 0, so they produce the same `eval = sk·H(m)`.
//!
//! ## Early exit
//!
//! With `optimized` enabled, `Combine` and `Verify` stop checking proofs once t
//! valid partials are found. The value is unchanged but which partials end up
//! in the audit trail depends on the order they were supplied in.

use crate::crypto::dleq::{Dleq, Proof, PROOF_SIZE};
use crate::crypto::helpers::lagrange_coefficient_at_zero;
use crate::crypto::suite::{Ciphersuite, CurveId};
use crate::error::{CombineError, Error, Result};
use crate::keys::{PublicKeyShare, SecretKeyShare};
use secp256kfun::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

/// Input to the TVRF. Derivations use the 4-byte little-endian child index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message(Vec<u8>);

impl Message {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Encode a child index as the derivation message.
    pub fn from_index(index: u32) -> Self {
        Self(index.to_le_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Message {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// One party's contribution `(S_i, phi_i, proof)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialEvaluation {
    pub public_share: PublicKeyShare,
    pub message: Message,
    pub eval: Point,
    pub proof: Proof,
}

impl PartialEvaluation {
    pub fn index(&self) -> u32 {
        self.public_share.index()
    }
}

/// Combined TVRF output with the partials it was interpolated from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub eval: Point,
    pub partials: Vec<PartialEvaluation>,
}

impl Evaluation {
    /// Party indices retained in the audit trail, in retention order.
    pub fn indices(&self) -> Vec<u32> {
        self.partials.iter().map(|pe| pe.index()).collect()
    }
}

/// Bytes sent when every party ships its evaluation and proof to a combiner.
pub fn derivation_bandwidth(curve: CurveId, parties: u32) -> usize {
    parties as usize * (curve.compressed_point_len() + PROOF_SIZE)
}

/// Threshold VRF operations used by the derivation orchestrator.
pub trait Tvrf: Send + Sync {
    fn threshold(&self) -> u32;

    fn parties(&self) -> u32;

    fn suite(&self) -> &Ciphersuite;

    /// Compute this party's partial evaluation on `message`.
    fn peval(
        &self,
        message: &Message,
        sk: &SecretKeyShare,
        pk: &PublicKeyShare,
    ) -> Result<PartialEvaluation>;

    /// Check a single partial evaluation's DLEQ proof.
    fn verify_partial_eval(&self, pe: &PartialEvaluation) -> bool;

    /// Combine at least t partial evaluations into the TVRF output.
    fn combine(&self, partials: &[PartialEvaluation]) -> Result<Evaluation>;

    /// Re-check a combined evaluation against its retained partials.
    fn verify(&self, evaluation: &Evaluation) -> bool;
}

/// The DDH-based TVRF.
#[derive(Clone, Debug)]
pub struct DdhTvrf {
    threshold: u32,
    parties: u32,
    suite: Ciphersuite,
    dleq: Dleq,
    optimized: bool,
}

impl DdhTvrf {
    /// Create a (t, n) instance. Requires 1 ≤ t ≤ n.
    pub fn new(threshold: u32, parties: u32, suite: Ciphersuite) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::Configuration("threshold must be at least 1".into()));
        }
        if threshold > parties {
            return Err(Error::Configuration(format!(
                "threshold {} exceeds number of parties {}",
                threshold, parties
            )));
        }

        Ok(Self {
            threshold,
            parties,
            suite,
            dleq: Dleq::new(suite),
            optimized: false,
        })
    }

    /// Stop checking proofs once t valid partials are found.
    pub fn with_optimized(mut self, optimized: bool) -> Self {
        self.optimized = optimized;
        self
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    /// Like [`Tvrf::verify_partial_eval`] but names the failing party.
    pub fn verify_partial_eval_strict(&self, pe: &PartialEvaluation) -> Result<()> {
        if self.verify_partial_eval(pe) {
            Ok(())
        } else {
            Err(Error::ProofVerification { index: pe.index() })
        }
    }

    /// Scan `partials` in order and keep those with a valid proof and an index
    /// in [1, n]. In optimized mode the scan stops at t valid entries.
    fn select_valid<'a>(
        &self,
        partials: &'a [PartialEvaluation],
    ) -> std::result::Result<Vec<&'a PartialEvaluation>, CombineError> {
        let mut selected = Vec::with_capacity(partials.len());
        let mut seen = BTreeSet::new();

        for pe in partials {
            if self.optimized && selected.len() >= self.threshold as usize {
                break;
            }

            let index = pe.index();
            if index == 0 || index > self.parties {
                warn!(index, parties = self.parties, "rejecting partial evaluation with out of range index");
                continue;
            }
            if !self.verify_partial_eval(pe) {
                warn!(index, "rejecting partial evaluation with invalid proof");
                continue;
            }
            if !seen.insert(index) {
                return Err(CombineError::DuplicateIndex(index));
            }

            selected.push(pe);
        }

        Ok(selected)
    }

    /// eval = Σ λ_i(0)·phi_i over the indices of `selected`.
    fn interpolate(
        &self,
        selected: &[&PartialEvaluation],
    ) -> std::result::Result<Point, CombineError> {
        let indices: Vec<u32> = selected.iter().map(|pe| pe.index()).collect();

        let term = |pe: &PartialEvaluation| {
            let lambda = lagrange_coefficient_at_zero(pe.index(), &indices)?;
            let eval = pe.eval;
            Ok::<_, CombineError>(g!(lambda * eval))
        };

        let mut iter = selected.iter();
        let first = iter.next().ok_or(CombineError::Empty)?;
        let mut combined = term(*first)?;
        for pe in iter {
            let weighted = term(*pe)?;
            combined = g!(combined + weighted);
        }

        combined
            .normalize()
            .non_zero()
            .ok_or(CombineError::PointAtInfinity)
    }
}

fn check_single_message(partials: &[PartialEvaluation]) -> std::result::Result<(), CombineError> {
    match partials.split_first() {
        Some((first, rest)) if rest.iter().any(|pe| pe.message != first.message) => {
            Err(CombineError::MixedMessages)
        }
        _ => Ok(()),
    }
}

impl Tvrf for DdhTvrf {
    fn threshold(&self) -> u32 {
        self.threshold
    }

    fn parties(&self) -> u32 {
        self.parties
    }

    fn suite(&self) -> &Ciphersuite {
        &self.suite
    }

    fn peval(
        &self,
        message: &Message,
        sk: &SecretKeyShare,
        pk: &PublicKeyShare,
    ) -> Result<PartialEvaluation> {
        if sk.index() != pk.index() {
            return Err(Error::ShareConversion(format!(
                "secret share index {} does not match public share index {}",
                sk.index(),
                pk.index()
            )));
        }

        let h = self.suite.hash_to_point(message.as_bytes())?;
        let share = *sk.scalar();
        let phi = g!(share * h).normalize();

        let proof = self
            .dleq
            .prove(&phi, message.as_bytes(), sk.scalar(), pk.point())?;
        trace!(index = pk.index(), "computed partial evaluation");

        Ok(PartialEvaluation {
            public_share: *pk,
            message: message.clone(),
            eval: phi,
            proof,
        })
    }

    fn verify_partial_eval(&self, pe: &PartialEvaluation) -> bool {
        let Ok(h) = self.suite.hash_to_point(pe.message.as_bytes()) else {
            return false;
        };
        if h != pe.proof.base {
            return false;
        }

        self.dleq
            .verify(&pe.eval, pe.public_share.point(), &pe.proof)
    }

    fn combine(&self, partials: &[PartialEvaluation]) -> Result<Evaluation> {
        let required = self.threshold as usize;
        if partials.len() < required {
            return Err(Error::InsufficientShares {
                required,
                got: partials.len(),
            });
        }
        check_single_message(partials)?;

        let selected = self.select_valid(partials)?;
        if selected.len() < required {
            return Err(Error::InsufficientValidShares {
                required,
                got: selected.len(),
            });
        }

        let eval = self.interpolate(&selected)?;
        debug!(
            selected = selected.len(),
            supplied = partials.len(),
            optimized = self.optimized,
            "combined partial evaluations"
        );

        Ok(Evaluation {
            eval,
            partials: selected.into_iter().cloned().collect(),
        })
    }

    fn verify(&self, evaluation: &Evaluation) -> bool {
        if check_single_message(&evaluation.partials).is_err() {
            return false;
        }

        let Ok(selected) = self.select_valid(&evaluation.partials) else {
            return false;
        };
        if selected.len() < self.threshold as usize {
            return false;
        }
        // Without early exit every retained partial must still verify
        if !self.optimized && selected.len() != evaluation.partials.len() {
            return false;
        }

        match self.interpolate(&selected) {
            Ok(recombined) => recombined == evaluation.eval,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dealer::generate_shared_key;

    fn setup(t: u32, n: u32) -> (DdhTvrf, Vec<SecretKeyShare>, Vec<PublicKeyShare>) {
        let material = generate_shared_key(t, n, &mut rand::thread_rng()).unwrap();
        let tvrf = DdhTvrf::new(t, n, Ciphersuite::default()).unwrap();
        (tvrf, material.secret_shares, material.public_shares)
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(matches!(
            DdhTvrf::new(0, 3, Ciphersuite::default()),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            DdhTvrf::new(4, 3, Ciphersuite::default()),
            Err(Error::Configuration(_))
        ));
        assert!(DdhTvrf::new(3, 3, Ciphersuite::default()).is_ok());
    }

    #[test]
    fn test_message_from_index_is_little_endian() {
        assert_eq!(Message::from_index(1).as_bytes(), &[1, 0, 0, 0]);
        assert_eq!(
            Message::from_index(0x8000_0001).as_bytes(),
            &[0x01, 0x00, 0x00, 0x80]
        );
    }

    #[test]
    fn test_peval_rejects_mismatched_shares() {
        let (tvrf, sks, pks) = setup(2, 3);
        let result = tvrf.peval(&Message::from_index(0), &sks[0], &pks[1]);
        assert!(matches!(result, Err(Error::ShareConversion(_))));
    }

    #[test]
    fn test_partial_from_other_message_rejected() {
        let (tvrf, sks, pks) = setup(2, 3);
        let mut pe = tvrf.peval(&Message::from_index(1), &sks[0], &pks[0]).unwrap();
        assert!(tvrf.verify_partial_eval(&pe));

        // Relabel the message; the proof's base no longer matches H(m)
        pe.message = Message::from_index(2);
        assert!(!tvrf.verify_partial_eval(&pe));
        assert!(matches!(
            tvrf.verify_partial_eval_strict(&pe),
            Err(Error::ProofVerification { index: 1 })
        ));
    }

    #[test]
    fn test_combine_rejects_mixed_messages() {
        let (tvrf, sks, pks) = setup(2, 3);
        let a = tvrf.peval(&Message::from_index(1), &sks[0], &pks[0]).unwrap();
        let b = tvrf.peval(&Message::from_index(2), &sks[1], &pks[1]).unwrap();
        let result = tvrf.combine(&[a, b]);
        assert!(matches!(
            result,
            Err(Error::Combine(CombineError::MixedMessages))
        ));
    }

    #[test]
    fn test_combine_rejects_duplicate_index() {
        let (tvrf, sks, pks) = setup(2, 3);
        let msg = Message::from_index(1);
        let a = tvrf.peval(&msg, &sks[0], &pks[0]).unwrap();
        let result = tvrf.combine(&[a.clone(), a]);
        assert!(matches!(
            result,
            Err(Error::Combine(CombineError::DuplicateIndex(1)))
        ));
    }

    #[test]
    fn test_optimized_combine_retains_exactly_t() {
        let (tvrf, sks, pks) = setup(3, 5);
        let tvrf = tvrf.with_optimized(true);
        let msg = Message::from_index(9);

        let partials: Vec<_> = (0..5)
            .map(|i| tvrf.peval(&msg, &sks[i], &pks[i]).unwrap())
            .collect();
        let eval = tvrf.combine(&partials).unwrap();
        assert_eq!(eval.indices(), vec![1, 2, 3]);
        assert!(tvrf.verify(&eval));

        // Reversed arrival order picks a different quorum with the same value
        let reversed: Vec<_> = partials.iter().rev().cloned().collect();
        let eval_rev = tvrf.combine(&reversed).unwrap();
        assert_eq!(eval_rev.indices(), vec![5, 4, 3]);
        assert_eq!(eval_rev.eval, eval.eval);
    }

    #[test]
    fn test_verify_rejects_swapped_eval() {
        let (tvrf, sks, pks) = setup(2, 3);
        let msg = Message::from_index(4);
        let partials: Vec<_> = (0..3)
            .map(|i| tvrf.peval(&msg, &sks[i], &pks[i]).unwrap())
            .collect();
        let mut eval = tvrf.combine(&partials).unwrap();
        assert!(tvrf.verify(&eval));

        eval.eval = partials[0].eval;
        assert!(!tvrf.verify(&eval));
    }

    #[test]
    fn test_bandwidth() {
        assert_eq!(derivation_bandwidth(CurveId::Secp256k1, 5), 5 * (33 + 64));
        assert_eq!(derivation_bandwidth(CurveId::Secp256k1, 0), 0);
    }
}
