//! Devices and derived nodes
//!
//! A [`Device`] is one party's view of a threshold node: its raw share
//! material plus the node state (index, chain code). Shares are stored in
//! their serialized form and converted into a key pair on every use, so a
//! corrupted share surfaces as `ShareConversion` at evaluation time.
//!
//! A [`Node`] is a hardened child: an ordinary single-holder key pair.

use crate::crypto::chain_code::ChainCode;
use crate::crypto::helpers::evaluate_polynomial;
use crate::crypto::suite::{Ciphersuite, CurveId};
use crate::error::{Error, Result};
use crate::keys::{share_to_key_pair, GlobalPublicKey, PublicKeyShare, SecretKeyShare};
use secp256kfun::prelude::*;
use zeroize::Zeroizing;

/// Prefix for the rerandomization polynomial coefficients.
const RERANDOMIZE_DOMAIN: &[u8] = b"rerandomize";

/// Position of a node in the derivation tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct State {
    pub node_index: u32,
    pub chain_code: Option<ChainCode>,
}

impl State {
    pub fn new(node_index: u32, chain_code: Option<ChainCode>) -> Self {
        Self {
            node_index,
            chain_code,
        }
    }
}

/// One party's share of a threshold node.
#[derive(Clone)]
pub struct Device {
    share_index: u32,
    curve: CurveId,
    secret_key_share: Zeroizing<Vec<u8>>,
    public_key_share: Vec<u8>,
    public_key: GlobalPublicKey,
    state: State,
}

impl Device {
    /// Build a device from serialized share material. Nothing is validated
    /// until [`Device::key_pair`] is called.
    pub fn new(
        share_index: u32,
        secret_key_share: Zeroizing<Vec<u8>>,
        public_key_share: Vec<u8>,
        public_key: GlobalPublicKey,
        state: State,
        curve: CurveId,
    ) -> Self {
        Self {
            share_index,
            curve,
            secret_key_share,
            public_key_share,
            public_key,
            state,
        }
    }

    pub fn from_shares(
        secret: &SecretKeyShare,
        public: &PublicKeyShare,
        public_key: GlobalPublicKey,
        state: State,
        curve: CurveId,
    ) -> Self {
        Self::new(
            secret.index(),
            secret.to_bytes(),
            public.encode(curve),
            public_key,
            state,
            curve,
        )
    }

    pub fn share_index(&self) -> u32 {
        self.share_index
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    pub fn public_key_share(&self) -> &[u8] {
        &self.public_key_share
    }

    pub fn public_key(&self) -> &GlobalPublicKey {
        &self.public_key
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Parse the stored share into a matching key pair.
    pub fn key_pair(&self) -> Result<(SecretKeyShare, PublicKeyShare)> {
        share_to_key_pair(
            self.curve,
            self.share_index,
            &self.secret_key_share,
            &self.public_key_share,
        )
    }

    /// Shift the sharing by a public polynomial derived from `seed`.
    ///
    /// With `f(x) = a_0 + a_1·x + ... + a_{t-1}·x^{t-1}` and
    /// `a_k = H(seed || k)`, party i moves to `s_i + f(i)` and the global key
    /// moves to `PK + a_0·G`. Every device must use the same seed and
    /// threshold or the new shares no longer lie on one polynomial.
    pub fn rerandomize(&self, seed: &[u8], threshold: u32, suite: &Ciphersuite) -> Result<Device> {
        if threshold == 0 {
            return Err(Error::Configuration("threshold must be at least 1".into()));
        }
        let (secret, _) = self.key_pair()?;

        let coefficients: Vec<Scalar<Secret, Zero>> = (0..threshold)
            .map(|k| {
                suite
                    .hash_to_scalar(&[RERANDOMIZE_DOMAIN, seed, &k.to_be_bytes()[..]])
                    .secret()
            })
            .collect();

        let delta = evaluate_polynomial(&coefficients, self.share_index);
        let share = *secret.scalar();
        let new_share = s!(share + delta).non_zero().ok_or_else(|| {
            Error::ShareConversion(format!(
                "rerandomized share of party {} is zero",
                self.share_index
            ))
        })?;
        let new_secret = SecretKeyShare::new(self.share_index, new_share)?;

        let a0 = coefficients[0];
        let pk = *self.public_key.point();
        let new_pk = g!(pk + a0 * G)
            .normalize()
            .non_zero()
            .ok_or_else(|| Error::Configuration("rerandomized public key is the identity".into()))?;

        Ok(Device::from_shares(
            &new_secret,
            &new_secret.public_share(),
            GlobalPublicKey::new(new_pk),
            self.state,
            self.curve,
        ))
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("share_index", &self.share_index)
            .field("curve", &self.curve)
            .field("secret_key_share", &"<redacted>")
            .field("public_key_share", &hex::encode(&self.public_key_share))
            .field("public_key", &self.public_key.to_hex())
            .field("state", &self.state)
            .finish()
    }
}

/// A hardened child key, held by whoever ran the derivation.
#[derive(Clone)]
pub struct Node {
    state: State,
    secret_key: Scalar<Secret, NonZero>,
    public_key: Point,
}

impl Node {
    pub fn new(
        index: u32,
        chain_code: Option<ChainCode>,
        secret_key: Scalar<Secret, NonZero>,
        public_key: Point,
    ) -> Self {
        Self {
            state: State::new(index, chain_code),
            secret_key,
            public_key,
        }
    }

    pub fn index(&self) -> u32 {
        self.state.node_index
    }

    pub fn chain_code(&self) -> Option<&ChainCode> {
        self.state.chain_code.as_ref()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn secret_key(&self) -> &Scalar<Secret, NonZero> {
        &self.secret_key
    }

    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.to_bytes())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("state", &self.state)
            .field("secret_key", &"<redacted>")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}
