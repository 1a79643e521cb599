//! Threshold HD derivation
//!
//! Hardened BIP32 derivation normally needs the parent secret key. Here the
//! parent key is only held as Shamir shares, so the child seed comes from the
//! threshold VRF instead:
//!
//! ```text
//! m      = index as 4 little-endian bytes
//! phi_i  = PEval(m, s_i)              on every device
//! eval   = Combine(phi_1..phi_n)      = sk·H(m)
//! seed   = SHA256(uncompressed(eval))[..8]   (big-endian u64)
//! sk'    = uniform non-zero scalar from ChaCha20(seed)
//! ```
//!
//! Any t honest devices reproduce the same child, so the derivation is
//! deterministic in `(PK, index)` without ever reconstructing `sk`.

use crate::crypto::chain_code::{hardened_child_chain_code, ChainCode};
use crate::crypto::encoding::encode_uncompressed;
use crate::error::{Error, Result};
use crate::node::{Device, Node};
use crate::protocol::resharing::{Resharing, UnavailableResharing};
use crate::protocol::tvrf::{DdhTvrf, Evaluation, Message, PartialEvaluation, Tvrf};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use secp256kfun::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Which key pair the TVRF runs under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// The wallet shares double as TVRF shares.
    #[default]
    Reuse,
    /// A separate TVRF sharing per wallet. Not supported.
    Fresh,
}

/// How partial evaluations are fanned out over the devices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    #[default]
    Parallel,
    Sequential,
}

/// Child derivation from a threshold node.
pub trait Derivation {
    /// Derive a non-hardened child, which stays a threshold node.
    fn derive_non_hardened_child(&self, index: u32) -> Result<Vec<Device>>;

    /// Derive a hardened child key pair.
    fn derive_hardened_child(&self, index: u32) -> Result<Node>;
}

/// Derivation orchestrator over a fixed device set.
pub struct TvrfDerivation<T: Tvrf = DdhTvrf> {
    devices: Vec<Device>,
    tvrf: T,
    eval_mode: EvalMode,
    workers: Option<usize>,
    network_latency: Duration,
    resharing: Box<dyn Resharing>,
}

impl<T: Tvrf> TvrfDerivation<T> {
    pub fn new(devices: Vec<Device>, tvrf: T, strategy: KeyStrategy) -> Result<Self> {
        if strategy == KeyStrategy::Fresh {
            return Err(Error::Configuration(
                "separate TVRF key pairs are not supported, use the reuse strategy".into(),
            ));
        }
        if devices.is_empty() {
            return Err(Error::Configuration("device set is empty".into()));
        }

        let (threshold, parties) = (tvrf.threshold() as usize, tvrf.parties() as usize);
        if devices.len() < threshold {
            return Err(Error::Configuration(format!(
                "{} devices cannot reach threshold {}",
                devices.len(),
                threshold
            )));
        }
        if devices.len() > parties {
            return Err(Error::Configuration(format!(
                "{} devices exceed the {} parties of the TVRF",
                devices.len(),
                parties
            )));
        }

        let curve = tvrf.suite().curve;
        if let Some(device) = devices.iter().find(|d| d.curve() != curve) {
            return Err(Error::Configuration(format!(
                "device {} uses curve {}, TVRF uses {}",
                device.share_index(),
                device.curve(),
                curve
            )));
        }

        let mut indices = BTreeSet::new();
        if let Some(device) = devices.iter().find(|d| !indices.insert(d.share_index())) {
            return Err(Error::Configuration(format!(
                "share index {} is held by more than one device",
                device.share_index()
            )));
        }

        Ok(Self {
            devices,
            tvrf,
            eval_mode: EvalMode::default(),
            workers: None,
            network_latency: Duration::ZERO,
            resharing: Box::new(UnavailableResharing),
        })
    }

    pub fn with_eval_mode(mut self, eval_mode: EvalMode) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    /// Cap the worker pool. Defaults to the available parallelism.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Simulated transmission delay between fan-out and combine.
    pub fn with_network_latency(mut self, latency: Duration) -> Self {
        self.network_latency = latency;
        self
    }

    pub fn with_resharing(mut self, resharing: Box<dyn Resharing>) -> Self {
        self.resharing = resharing;
        self
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn tvrf(&self) -> &T {
        &self.tvrf
    }

    pub fn eval_mode(&self) -> EvalMode {
        self.eval_mode
    }

    /// Run the TVRF on `message` and return the verified combined evaluation.
    pub fn evaluate(&self, message: &Message) -> Result<Evaluation> {
        trace!(devices = self.devices.len(), mode = ?self.eval_mode, "evaluating TVRF");
        let partials = match self.eval_mode {
            EvalMode::Parallel => self.parallel_eval(message)?,
            EvalMode::Sequential => self.sequential_eval(message)?,
        };

        if !self.network_latency.is_zero() {
            thread::sleep(self.network_latency);
        }

        trace!("combining partial evaluations");
        let evaluation = self.tvrf.combine(&partials)?;
        trace!(indices = ?evaluation.indices(), "combined evaluation");

        if !self.tvrf.verify(&evaluation) {
            return Err(Error::Verification);
        }
        trace!("verified combined evaluation");

        Ok(evaluation)
    }

    fn parent_chain_code(&self) -> Option<ChainCode> {
        self.devices.first().and_then(|d| d.state().chain_code)
    }

    fn evaluate_device(&self, device: &Device, message: &Message) -> Result<PartialEvaluation> {
        let (secret, public) = device.key_pair()?;
        self.tvrf.peval(message, &secret, &public)
    }

    fn sequential_eval(&self, message: &Message) -> Result<Vec<PartialEvaluation>> {
        self.devices
            .iter()
            .map(|device| self.evaluate_device(device, message))
            .collect()
    }

    fn worker_count(&self) -> usize {
        let available = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.workers
            .unwrap_or(available)
            .clamp(1, self.devices.len().max(1))
    }

    /// Workers pull device positions from a shared cursor. Results are put
    /// back in device order so both modes feed `combine` identical input.
    fn parallel_eval(&self, message: &Message) -> Result<Vec<PartialEvaluation>> {
        let workers = self.worker_count();
        debug!(workers, devices = self.devices.len(), "starting parallel evaluation");

        let cursor = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let (result_tx, result_rx) = mpsc::channel::<(usize, PartialEvaluation)>();
        let (error_tx, error_rx) = mpsc::channel::<Error>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let result_tx = result_tx.clone();
                let error_tx = error_tx.clone();
                let (cursor, abort) = (&cursor, &abort);

                scope.spawn(move || {
                    while !abort.load(Ordering::Acquire) {
                        let position = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(device) = self.devices.get(position) else {
                            break;
                        };

                        match self.evaluate_device(device, message) {
                            Ok(pe) => {
                                if result_tx.send((position, pe)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                abort.store(true, Ordering::Release);
                                let _ = error_tx.send(e);
                                break;
                            }
                        }
                    }
                });
            }
        });
        drop(result_tx);
        drop(error_tx);

        if let Ok(e) = error_rx.try_recv() {
            return Err(e);
        }

        let mut slots: Vec<Option<PartialEvaluation>> = vec![None; self.devices.len()];
        for (position, pe) in result_rx.try_iter() {
            slots[position] = Some(pe);
        }

        let received = slots.iter().filter(|slot| slot.is_some()).count();
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::InsufficientShares {
                required: self.devices.len(),
                got: received,
            })
    }

    /// Key pair of the hardened child seeded by `evaluation`.
    fn child_key_pair(evaluation: &Evaluation) -> (Scalar<Secret, NonZero>, Point) {
        let digest = Sha256::digest(encode_uncompressed(&evaluation.eval));
        // Only the leading 64 bits of the digest seed the generator
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);

        let mut rng = ChaCha20Rng::seed_from_u64(u64::from_be_bytes(seed));
        let secret = Scalar::<Secret, NonZero>::random(&mut rng);
        let public = g!(secret * G).normalize();
        (secret, public)
    }
}

impl<T: Tvrf> Derivation for TvrfDerivation<T> {
    fn derive_non_hardened_child(&self, index: u32) -> Result<Vec<Device>> {
        self.resharing.reshare(&self.devices, index)
    }

    fn derive_hardened_child(&self, index: u32) -> Result<Node> {
        let evaluation = self.evaluate(&Message::from_index(index))?;

        let (secret, public) = Self::child_key_pair(&evaluation);
        let chain_code = self
            .parent_chain_code()
            .map(|parent| {
                hardened_child_chain_code(&parent, &encode_uncompressed(&evaluation.eval), index)
            })
            .transpose()?;

        let node = Node::new(index, chain_code, secret, public);
        debug!(index, public_key = %node.public_key_hex(), "derived hardened child");
        Ok(node)
    }
}

impl<T: Tvrf> std::fmt::Debug for TvrfDerivation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TvrfDerivation")
            .field("devices", &self.devices.len())
            .field("threshold", &self.tvrf.threshold())
            .field("parties", &self.tvrf.parties())
            .field("eval_mode", &self.eval_mode)
            .field("workers", &self.workers)
            .field("network_latency", &self.network_latency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::chain_code::default_master_chain_code;
    use crate::crypto::suite::{Ciphersuite, CurveId};
    use crate::protocol::dealer::create_devices;

    fn derivation(t: u32, n: u32) -> TvrfDerivation {
        let devices = create_devices(
            t,
            n,
            CurveId::Secp256k1,
            Some(default_master_chain_code().unwrap()),
            &mut rand::thread_rng(),
        )
        .unwrap();
        let tvrf = DdhTvrf::new(t, n, Ciphersuite::default()).unwrap();
        TvrfDerivation::new(devices, tvrf, KeyStrategy::Reuse).unwrap()
    }

    #[test]
    fn test_fresh_strategy_rejected() {
        let devices =
            create_devices(2, 3, CurveId::Secp256k1, None, &mut rand::thread_rng()).unwrap();
        let tvrf = DdhTvrf::new(2, 3, Ciphersuite::default()).unwrap();
        assert!(matches!(
            TvrfDerivation::new(devices, tvrf, KeyStrategy::Fresh),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_too_few_devices_rejected() {
        let mut devices =
            create_devices(3, 4, CurveId::Secp256k1, None, &mut rand::thread_rng()).unwrap();
        devices.truncate(2);
        let tvrf = DdhTvrf::new(3, 4, Ciphersuite::default()).unwrap();
        assert!(matches!(
            TvrfDerivation::new(devices, tvrf.clone(), KeyStrategy::Reuse),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            TvrfDerivation::new(Vec::new(), tvrf, KeyStrategy::Reuse),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_share_index_rejected() {
        let devices =
            create_devices(2, 3, CurveId::Secp256k1, None, &mut rand::thread_rng()).unwrap();
        let repeated = vec![devices[0].clone(), devices[0].clone(), devices[1].clone()];
        let tvrf = DdhTvrf::new(2, 3, Ciphersuite::default()).unwrap();

        assert!(matches!(
            TvrfDerivation::new(repeated.clone(), tvrf.clone(), KeyStrategy::Reuse),
            Err(Error::Configuration(_))
        ));
        // Early exit would otherwise mask the duplicate
        assert!(matches!(
            TvrfDerivation::new(repeated, tvrf.with_optimized(true), KeyStrategy::Reuse),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_hardened_child_is_deterministic() {
        let derivation = derivation(2, 3);
        let a = derivation.derive_hardened_child(7).unwrap();
        let b = derivation.derive_hardened_child(7).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.secret_key().to_bytes(), b.secret_key().to_bytes());
        assert_eq!(a.index(), 7);
    }

    #[test]
    fn test_child_public_key_matches_secret() {
        let node = derivation(2, 3).derive_hardened_child(1).unwrap();
        let secret = *node.secret_key();
        assert_eq!(g!(secret * G).normalize(), *node.public_key());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let parallel = derivation(3, 5).with_workers(3);
        let message = Message::from_index(11);
        let a = parallel.evaluate(&message).unwrap();

        let sequential = TvrfDerivation::new(
            parallel.devices().to_vec(),
            parallel.tvrf().clone(),
            KeyStrategy::Reuse,
        )
        .unwrap()
        .with_eval_mode(EvalMode::Sequential);
        let b = sequential.evaluate(&message).unwrap();

        assert_eq!(a.eval, b.eval);
        assert_eq!(a.indices(), b.indices());
    }

    #[test]
    fn test_chain_code_propagates() {
        let node = derivation(2, 3).derive_hardened_child(5).unwrap();
        let chain_code = node.chain_code().copied().unwrap();
        assert_ne!(chain_code, default_master_chain_code().unwrap());
    }

    #[test]
    fn test_non_hardened_unavailable() {
        let result = derivation(2, 3).derive_non_hardened_child(0);
        assert!(matches!(result, Err(Error::ResharingUnavailable)));
    }

    #[test]
    fn test_single_worker_pool() {
        let derivation = derivation(2, 4).with_workers(1);
        assert_eq!(derivation.worker_count(), 1);
        assert!(derivation.derive_hardened_child(2).is_ok());
    }

    #[test]
    fn test_worker_count_capped_by_devices() {
        let derivation = derivation(2, 3).with_workers(64);
        assert_eq!(derivation.worker_count(), 3);
    }
}
