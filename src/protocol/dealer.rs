//! Trusted Dealer
//!
//! Produces the initial `(t, n)` Shamir sharing the TVRF runs on:
//!
//! 1. Pick `f(x) = sk + a_1·x + ... + a_{t-1}·x^{t-1}` with random coefficients
//! 2. Party i (1-based) receives `s_i = f(i)` and publishes `S_i = s_i·G`
//! 3. The global key is `PK = sk·G`
//!
//! The dealer sees `sk`. Deployments that cannot trust a single dealer should
//! replace this with a DKG; the derivation protocol only consumes its output.

use crate::crypto::chain_code::ChainCode;
use crate::crypto::helpers::evaluate_polynomial;
use crate::crypto::suite::CurveId;
use crate::error::{Error, Result};
use crate::keys::{GlobalPublicKey, PublicKeyShare, SecretKeyShare};
use crate::node::{Device, State};
use rand::{CryptoRng, RngCore};
use secp256kfun::prelude::*;
use tracing::debug;

/// Output of the dealer: n public shares, n secret shares and the global key.
/// Entry k of each vector belongs to party k + 1.
#[derive(Clone, Debug)]
pub struct SharedKeyMaterial {
    pub public_shares: Vec<PublicKeyShare>,
    pub secret_shares: Vec<SecretKeyShare>,
    pub public_key: GlobalPublicKey,
}

/// Share a fresh random secret among `parties` with threshold `threshold`.
pub fn generate_shared_key<R: RngCore + CryptoRng>(
    threshold: u32,
    parties: u32,
    rng: &mut R,
) -> Result<SharedKeyMaterial> {
    let secret = Scalar::<Secret, NonZero>::random(rng);
    deal_secret(&secret, threshold, parties, rng)
}

/// Share a given secret among `parties` with threshold `threshold`.
pub fn deal_secret<R: RngCore + CryptoRng>(
    secret: &Scalar<Secret, NonZero>,
    threshold: u32,
    parties: u32,
    rng: &mut R,
) -> Result<SharedKeyMaterial> {
    if threshold == 0 || threshold > parties {
        return Err(Error::Configuration(format!(
            "cannot deal a {}-of-{} sharing",
            threshold, parties
        )));
    }

    // f(0) = secret, random coefficients for higher terms
    let mut coefficients: Vec<Scalar<Secret, Zero>> = Vec::with_capacity(threshold as usize);
    coefficients.push(secret.mark_zero());
    for _ in 1..threshold {
        coefficients.push(Scalar::<Secret, NonZero>::random(rng).mark_zero());
    }

    let mut secret_shares = Vec::with_capacity(parties as usize);
    let mut public_shares = Vec::with_capacity(parties as usize);
    for index in 1..=parties {
        let share = evaluate_polynomial(&coefficients, index)
            .non_zero()
            .ok_or_else(|| Error::ShareConversion(format!("share of party {} is zero", index)))?;
        let secret_share = SecretKeyShare::new(index, share)?;
        public_shares.push(secret_share.public_share());
        secret_shares.push(secret_share);
    }

    let secret = *secret;
    let public_key = GlobalPublicKey::new(g!(secret * G).normalize());
    debug!(threshold, parties, public_key = %public_key.to_hex(), "dealt shared key");

    Ok(SharedKeyMaterial {
        public_shares,
        secret_shares,
        public_key,
    })
}

/// Build one device per party from fresh dealer output.
///
/// All devices start at node index 0 and share `chain_code`.
pub fn create_devices<R: RngCore + CryptoRng>(
    threshold: u32,
    parties: u32,
    curve: CurveId,
    chain_code: Option<ChainCode>,
    rng: &mut R,
) -> Result<Vec<Device>> {
    let material = generate_shared_key(threshold, parties, rng)?;
    Ok(devices_from_material(&material, curve, chain_code))
}

/// Wrap existing dealer output into devices.
pub fn devices_from_material(
    material: &SharedKeyMaterial,
    curve: CurveId,
    chain_code: Option<ChainCode>,
) -> Vec<Device> {
    material
        .secret_shares
        .iter()
        .zip(&material.public_shares)
        .map(|(sk, pk)| {
            Device::from_shares(
                sk,
                pk,
                material.public_key,
                State::new(0, chain_code),
                curve,
            )
        })
        .collect()
}
