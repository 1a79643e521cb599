//! Derivation configuration
//!
//! JSON form:
//!
//! ```json
//! {
//!   "threshold": 3,
//!   "parties": 5,
//!   "suite": { "curve": "secp256k1", "hash": "sha256" },
//!   "optimized": false,
//!   "strategy": "reuse",
//!   "evaluation": "parallel",
//!   "workers": 4,
//!   "network_latency_ms": 0
//! }
//! ```
//!
//! Only `threshold` and `parties` are required.

use crate::crypto::suite::Ciphersuite;
use crate::error::{Error, Result};
use crate::node::Device;
use crate::protocol::derivation::{EvalMode, KeyStrategy, TvrfDerivation};
use crate::protocol::tvrf::DdhTvrf;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    pub threshold: u32,
    pub parties: u32,
    #[serde(default)]
    pub suite: Ciphersuite,
    #[serde(default)]
    pub optimized: bool,
    #[serde(default)]
    pub strategy: KeyStrategy,
    #[serde(default)]
    pub evaluation: EvalMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default)]
    pub network_latency_ms: u64,
}

impl DerivationConfig {
    pub fn new(threshold: u32, parties: u32) -> Self {
        Self {
            threshold,
            parties,
            suite: Ciphersuite::default(),
            optimized: false,
            strategy: KeyStrategy::default(),
            evaluation: EvalMode::default(),
            workers: None,
            network_latency_ms: 0,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::Configuration("threshold must be at least 1".into()));
        }
        if self.threshold > self.parties {
            return Err(Error::Configuration(format!(
                "threshold {} exceeds number of parties {}",
                self.threshold, self.parties
            )));
        }
        if self.workers == Some(0) {
            return Err(Error::Configuration("workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn network_latency(&self) -> Duration {
        Duration::from_millis(self.network_latency_ms)
    }

    pub fn build_tvrf(&self) -> Result<DdhTvrf> {
        self.validate()?;
        Ok(DdhTvrf::new(self.threshold, self.parties, self.suite)?.with_optimized(self.optimized))
    }

    pub fn build_derivation(&self, devices: Vec<Device>) -> Result<TvrfDerivation<DdhTvrf>> {
        let tvrf = self.build_tvrf()?;
        let mut derivation = TvrfDerivation::new(devices, tvrf, self.strategy)?
            .with_eval_mode(self.evaluation)
            .with_network_latency(self.network_latency());
        if let Some(workers) = self.workers {
            derivation = derivation.with_workers(workers);
        }
        Ok(derivation)
    }
}
