//! Credential decryption
//!
//! Connection passwords are stored encrypted. The decryption service itself
//! lives outside this crate; the client only asks it for the plaintext right
//! before the login call.

use crate::config::SecretString;
use crate::domain::Result;

/// Turns a stored ciphertext into the plaintext password
pub trait CredentialDecryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &SecretString) -> Result<SecretString>;
}

/// Passthrough for deployments that inject the plaintext through `${VAR}`
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextDecryptor;

impl CredentialDecryptor for PlaintextDecryptor {
    fn decrypt(&self, ciphertext: &SecretString) -> Result<SecretString> {
        Ok(ciphertext.clone())
    }
}
