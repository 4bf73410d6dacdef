//! # Field Masking
//!
//! SHA-256 digests used to mask the `ip` and `device_id` fields before they
//! are stored. The same input always produces the same digest, so masked
//! values can still be joined and counted.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex-encoded SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap a digest previously produced by [`digest`] and read back from storage
    pub fn from_stored(hex: String) -> Self {
        Digest(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash `value` into a fixed-length hex digest
pub fn digest(value: &[u8]) -> Digest {
    let hash = Sha256::digest(value);
    Digest(hex::encode(hash))
}
