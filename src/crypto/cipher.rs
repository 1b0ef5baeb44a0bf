//! Reversible XOR field cipher
//!
//! Sealed values carry a version prefix so plaintext written before
//! obfuscation was enabled still reads back unchanged.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{KesefError, KesefResult};

use super::ObfuscationKey;

/// Marker placed in front of every sealed value
pub const SEALED_PREFIX: &str = "enc:v1:";

/// Known plaintext used to check a key against stored data
const VERIFY_PLAINTEXT: &str = "kesef-verify";

/// Obfuscates and restores individual string fields
#[derive(Debug, Clone)]
pub struct FieldCipher {
    key: ObfuscationKey,
}

impl FieldCipher {
    pub fn new(key: ObfuscationKey) -> Self {
        Self { key }
    }

    /// Whether a stored value is in sealed form
    pub fn is_sealed(value: &str) -> bool {
        value.starts_with(SEALED_PREFIX)
    }

    /// Seal a value; empty and already-sealed values pass through
    pub fn seal(&self, plaintext: &str) -> String {
        if plaintext.is_empty() || Self::is_sealed(plaintext) {
            return plaintext.to_string();
        }
        let scrambled = self.xor(plaintext.as_bytes());
        format!("{}{}", SEALED_PREFIX, STANDARD.encode(scrambled))
    }

    /// Restore a sealed value; unsealed values pass through
    pub fn unseal(&self, value: &str) -> KesefResult<String> {
        let Some(encoded) = value.strip_prefix(SEALED_PREFIX) else {
            return Ok(value.to_string());
        };

        let scrambled = STANDARD
            .decode(encoded)
            .map_err(|e| KesefError::Encryption(format!("Invalid sealed value: {}", e)))?;

        String::from_utf8(self.xor(&scrambled)).map_err(|_| {
            KesefError::Encryption("Sealed value did not decode; wrong key?".to_string())
        })
    }

    /// Token stored in settings so a wrong key can be rejected up front
    pub fn verification_token(&self) -> String {
        self.seal(VERIFY_PLAINTEXT)
    }

    /// Check this key against a token produced by [`Self::verification_token`]
    pub fn verify(&self, token: &str) -> bool {
        matches!(self.unseal(token), Ok(plain) if plain == VERIFY_PLAINTEXT)
    }

    fn xor(&self, data: &[u8]) -> Vec<u8> {
        let key = self.key.as_bytes();
        data.iter()
            .zip(key.iter().cycle())
            .map(|(byte, k)| byte ^ k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(key: &str) -> FieldCipher {
        FieldCipher::new(ObfuscationKey::new(key).unwrap())
    }

    #[test]
    fn test_seal_unseal() {
        let c = cipher("מפתח-סודי");
        let sealed = c.seal("12-680-123456");
        assert!(FieldCipher::is_sealed(&sealed));
        assert!(!sealed.contains("123456"));
        assert_eq!(c.unseal(&sealed).unwrap(), "12-680-123456");
    }

    #[test]
    fn test_hebrew_roundtrip() {
        let c = cipher("k");
        let sealed = c.seal("הערה אישית");
        assert_eq!(c.unseal(&sealed).unwrap(), "הערה אישית");
    }

    #[test]
    fn test_plaintext_passes_through() {
        let c = cipher("key");
        assert_eq!(c.unseal("legacy value").unwrap(), "legacy value");
        assert_eq!(c.seal(""), "");
    }

    #[test]
    fn test_no_double_seal() {
        let c = cipher("key");
        let once = c.seal("secret");
        assert_eq!(c.seal(&once), once);
    }

    #[test]
    fn test_verification_token() {
        let right = cipher("correct horse");
        let token = right.verification_token();
        assert!(right.verify(&token));
        assert!(!cipher("wrong").verify(&token));
        assert!(!right.verify("not a token"));
    }

    #[test]
    fn test_corrupt_sealed_value() {
        let c = cipher("key");
        assert!(c.unseal("enc:v1:!!!notbase64").is_err());
    }
}
