//! Non-hardened derivation hook
//!
//! A non-hardened child keeps the threshold structure: every device ends up
//! with a share of the child key. That needs a distributed resharing protocol
//! which this crate does not ship, so derivations default to
//! [`UnavailableResharing`]. Callers with a DPSS implementation can plug it in
//! through [`Resharing`].

use crate::error::{Error, Result};
use crate::node::Device;

/// Produce the device set of non-hardened child `index` from its parent set.
pub trait Resharing: Send + Sync {
    fn reshare(&self, devices: &[Device], index: u32) -> Result<Vec<Device>>;
}

/// Always fails with [`Error::ResharingUnavailable`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableResharing;

impl Resharing for UnavailableResharing {
    fn reshare(&self, _devices: &[Device], _index: u32) -> Result<Vec<Device>> {
        Err(Error::ResharingUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_resharing() {
        let result = UnavailableResharing.reshare(&[], 1);
        assert!(matches!(result, Err(Error::ResharingUnavailable)));
    }
}
