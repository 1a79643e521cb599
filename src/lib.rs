//! Threshold HD derivation for a shared BIP32 wallet.
//!
//! The wallet secret is split among n devices with threshold t. Hardened
//! children are derived without reconstructing the secret: the devices jointly
//! evaluate a threshold VRF on the child index and the combined output seeds
//! the child key.

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod node;
pub mod protocol;

pub use config::DerivationConfig;
pub use crypto::suite::{Ciphersuite, CurveId, HashId};
pub use error::{CombineError, Error, Result};
pub use keys::{GlobalPublicKey, PublicKeyShare, SecretKeyShare};
pub use node::{Device, Node, State};
pub use protocol::dealer::{create_devices, generate_shared_key, SharedKeyMaterial};
pub use protocol::derivation::{Derivation, EvalMode, KeyStrategy, TvrfDerivation};
pub use protocol::resharing::{Resharing, UnavailableResharing};
pub use protocol::tvrf::{
    derivation_bandwidth, DdhTvrf, Evaluation, Message, PartialEvaluation, Tvrf,
};
