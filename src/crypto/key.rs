//! Key material for field obfuscation
//!
//! Zeroed on drop so the key does not linger in memory after use.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KesefError, KesefResult};

/// Key bytes used by [`super::FieldCipher`]
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ObfuscationKey {
    bytes: Vec<u8>,
}

impl ObfuscationKey {
    /// Build a key from a passphrase; blank passphrases are rejected
    pub fn new(passphrase: &str) -> KesefResult<Self> {
        if passphrase.trim().is_empty() {
            return Err(KesefError::Encryption("Key must not be empty".into()));
        }
        Ok(Self {
            bytes: passphrase.as_bytes().to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ObfuscationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObfuscationKey([REDACTED; {}])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank() {
        assert!(ObfuscationKey::new("").is_err());
        assert!(ObfuscationKey::new("   ").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let key = ObfuscationKey::new("sod-gadol").unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("sod-gadol"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(key.len(), 9);
    }
}
