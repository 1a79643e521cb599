//! Cryptographic Primitives
//!
//! Building blocks for the threshold VRF:
//!
//! - **suite**: curve/hash selection, hash-to-point and hash-to-scalar
//! - **encoding**: canonical `curve:point` encoding
//! - **helpers**: Lagrange coefficients and polynomial evaluation
//! - **dleq**: Chaum-Pedersen proof of equal discrete logs
//! - **chain_code**: BIP-32 style chain codes

pub mod chain_code;
pub mod dleq;
pub mod encoding;
pub mod helpers;
pub mod suite;
