//! Key share model
//!
//! A `(t, n)` sharing of the wallet secret `sk` gives party `i` (1-based) the
//! scalar `s_i = f(i)` and publishes `S_i = s_i·G`. The global key is
//! `PK = sk·G = f(0)·G`. Index 0 is reserved for the secret and never names a
//! party.

use crate::crypto::encoding::{decode_point_on, encode_point};
use crate::crypto::suite::CurveId;
use crate::error::{Error, Result};
use secp256kfun::prelude::*;
use zeroize::Zeroizing;

/// A party's secret share `(i, s_i)`.
#[derive(Clone)]
pub struct SecretKeyShare {
    index: u32,
    share: Scalar<Secret, NonZero>,
}

impl SecretKeyShare {
    pub fn new(index: u32, share: Scalar<Secret, NonZero>) -> Result<Self> {
        if index == 0 {
            return Err(Error::ShareConversion("party index cannot be zero".into()));
        }
        Ok(Self { index, share })
    }

    /// Parse a 32-byte big-endian share scalar.
    pub fn from_bytes(index: u32, bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::ShareConversion(format!(
                "secret share of party {} must be 32 bytes, got {}",
                index,
                bytes.len()
            ))
        })?;
        let share: Scalar<Secret, NonZero> = Scalar::from_bytes(bytes)
            .and_then(|s: Scalar<Secret, Zero>| s.non_zero())
            .ok_or_else(|| {
                Error::ShareConversion(format!(
                    "secret share of party {} is zero or not below the group order",
                    index
                ))
            })?;
        Self::new(index, share)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn scalar(&self) -> &Scalar<Secret, NonZero> {
        &self.share
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.share.to_bytes().to_vec())
    }

    /// `S_i = s_i·G`
    pub fn public_share(&self) -> PublicKeyShare {
        let share = self.share;
        let point = g!(share * G).normalize();
        PublicKeyShare {
            index: self.index,
            point,
        }
    }
}

impl std::fmt::Debug for SecretKeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeyShare")
            .field("index", &self.index)
            .field("share", &"<redacted>")
            .finish()
    }
}

/// A party's public share `(i, S_i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKeyShare {
    index: u32,
    point: Point,
}

impl PublicKeyShare {
    pub fn new(index: u32, point: Point) -> Result<Self> {
        if index == 0 {
            return Err(Error::ShareConversion("party index cannot be zero".into()));
        }
        Ok(Self { index, point })
    }

    /// Parse a canonically encoded public share tagged with `curve`.
    pub fn from_encoded(curve: CurveId, index: u32, bytes: &[u8]) -> Result<Self> {
        let point = decode_point_on(curve, bytes).map_err(|e| {
            Error::ShareConversion(format!("public share of party {}: {}", index, e))
        })?;
        Self::new(index, point)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn encode(&self, curve: CurveId) -> Vec<u8> {
        encode_point(curve, &self.point)
    }
}

/// The group public key `PK = sk·G`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalPublicKey(Point);

impl GlobalPublicKey {
    pub fn new(point: Point) -> Self {
        Self(point)
    }

    pub fn point(&self) -> &Point {
        &self.0
    }

    pub fn encode(&self, curve: CurveId) -> Vec<u8> {
        encode_point(curve, &self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

/// Convert raw share material into a matching key pair.
///
/// Fails with `ShareConversion` when either half is malformed or the secret
/// share does not correspond to the public share.
pub fn share_to_key_pair(
    curve: CurveId,
    index: u32,
    secret_bytes: &[u8],
    public_bytes: &[u8],
) -> Result<(SecretKeyShare, PublicKeyShare)> {
    let secret = SecretKeyShare::from_bytes(index, secret_bytes)?;
    let public = PublicKeyShare::from_encoded(curve, index, public_bytes)?;

    if secret.public_share() != public {
        return Err(Error::ShareConversion(format!(
            "secret share of party {} does not match its public share",
            index
        )));
    }

    Ok((secret, public))
}
