//! At-rest obfuscation of sensitive fields
//!
//! A handful of fields (account numbers, ID numbers, transaction notes) can be
//! scrambled before they reach the key-value store. The scheme is a repeating
//! XOR with a user-supplied key, base64 encoded. It keeps casual eyes off the
//! data files; it is not encryption in any cryptographic sense.

pub mod cipher;
pub mod key;

pub use cipher::{FieldCipher, SEALED_PREFIX};
pub use key::ObfuscationKey;
