//! Threshold Derivation Protocol
//!
//! - **dealer**: trusted-dealer Shamir sharing of the wallet key
//! - **tvrf**: DDH-based threshold VRF (PEval, Combine, Verify)
//! - **derivation**: hardened child derivation driven by the TVRF
//! - **resharing**: hook for non-hardened derivation

pub mod dealer;
pub mod derivation;
pub mod resharing;
pub mod tvrf;
