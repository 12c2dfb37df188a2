//! Encryption seam for stored refresh tokens.

use crate::Result;

/// Encrypts refresh tokens at rest.
pub trait SecretCipher: Send + Sync {
    /// Encrypt a secret for storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`](crate::Error::Crypto) if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a stored secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`](crate::Error::Crypto) if the value cannot be decrypted.
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Stores secrets as-is. For deployments where the database file itself is
/// protected, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl SecretCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
