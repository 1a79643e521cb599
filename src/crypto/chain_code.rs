//! Chain codes
//!
//! BIP-32 master chain code: `IR` half of `HMAC-SHA512("Bitcoin seed", seed)`.
//! Hardened children of a threshold node get a chain code bound to the TVRF
//! output, so the same parent and index always yield the same child code.
//!
//! Chain codes ride along in device and node state; the TVRF math never
//! reads them.

use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;

/// Domain separation key for master chain codes.
pub const MASTER_DOMAIN: &[u8] = b"Bitcoin seed";

/// Fixed seed behind [`default_master_chain_code`]. Close to BIP-32 test
/// vector 2 but not equal to it: bytes 18 and 19 are `c7 a1`, not `c9 c6`.
pub const DEFAULT_MASTER_SEED: [u8; 64] = [
    0xff, 0xfc, 0xf9, 0xf6, 0xf3, 0xf0, 0xed, 0xea, 0xe7, 0xe4, 0xe1, 0xde, 0xdb, 0xd8, 0xd5, 0xd2,
    0xcf, 0xcc, 0xc7, 0xa1, 0xc3, 0xc0, 0xbd, 0xba, 0xb7, 0xb4, 0xb1, 0xae, 0xab, 0xa8, 0xa5, 0xa2,
    0x9f, 0x9c, 0x99, 0x96, 0x93, 0x90, 0x8d, 0x8a, 0x87, 0x84, 0x81, 0x7e, 0x7b, 0x78, 0x75, 0x72,
    0x6f, 0x6c, 0x69, 0x66, 0x63, 0x60, 0x5d, 0x5a, 0x57, 0x54, 0x51, 0x4e, 0x4b, 0x48, 0x45, 0x42,
];

pub type ChainCode = [u8; 32];

/// IL || IR = HMAC-SHA512(key, parts...); returns IR.
fn hmac_right_half(key: &[u8], parts: &[&[u8]]) -> Result<ChainCode> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|e| Error::Configuration(format!("chain code key: {}", e)))?;
    for part in parts {
        hmac.update(part);
    }
    let result = hmac.finalize().into_bytes();

    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&result[32..]);
    Ok(chain_code)
}

/// Master chain code for `seed`.
pub fn master_chain_code(seed: &[u8]) -> Result<ChainCode> {
    hmac_right_half(MASTER_DOMAIN, &[seed])
}

/// Master chain code for [`DEFAULT_MASTER_SEED`].
pub fn default_master_chain_code() -> Result<ChainCode> {
    master_chain_code(&DEFAULT_MASTER_SEED)
}

/// Hardened child chain code:
/// IR of HMAC-SHA512(parent_chain_code, 0x00 || uncompressed(eval) || index_be).
pub fn hardened_child_chain_code(
    parent: &ChainCode,
    evaluation_uncompressed: &[u8; 65],
    index: u32,
) -> Result<ChainCode> {
    hmac_right_half(
        parent,
        &[&[0x00u8][..], &evaluation_uncompressed[..], &index.to_be_bytes()[..]],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_chain_code_bip32_vector() {
        // BIP-32 test vector 1: seed 000102030405060708090a0b0c0d0e0f
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(
            hex::encode(master_chain_code(&seed).unwrap()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
    }

    #[test]
    fn test_default_master_chain_code() {
        let seed = hex::decode(
            "fffcf9f6f3f0edeae7e4e1dedbd8d5d2cfccc7a1c3c0bdbab7b4b1aeaba8a5a2\
             9f9c999693908d8a8784817e7b7875726f6c696663605d5a5754514e4b484542",
        )
        .unwrap();
        assert_eq!(seed, DEFAULT_MASTER_SEED);
        assert_eq!(
            hex::encode(default_master_chain_code().unwrap()),
            "54c2c8a105e42ece6b32811180d9cdc8a3af7c1bbc6f5a00532bf570a40c8ff2"
        );
    }

    #[test]
    fn test_hardened_child_chain_code() {
        let parent = [7u8; 32];
        let eval = [4u8; 65];
        let c1 = hardened_child_chain_code(&parent, &eval, 1).unwrap();
        assert_eq!(c1, hardened_child_chain_code(&parent, &eval, 1).unwrap());
        assert_ne!(c1, hardened_child_chain_code(&parent, &eval, 2).unwrap());
        assert_ne!(c1, hardened_child_chain_code(&[8u8; 32], &eval, 1).unwrap());
    }
}
