//! Master-key content-key wrapping
//!
//! Wraps each per-message content key with AES-256-GCM under a wrapping
//! key derived from a 256-bit master secret. The optional pepper is mixed
//! into the derivation and the wrap scope label is bound as associated
//! data, so a wrapped key survives neither a pepper change nor a scope
//! change - unwrap fails closed instead of yielding a wrong key.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::KeyWrapper;
use crate::crypto::{ContentKey, MasterKey};
use crate::error::{Result, VaultError};
use crate::settings::WrapScope;

type HmacSha256 = Hmac<Sha256>;

/// Domain label for wrapping-key derivation
const WRAP_KEY_CONTEXT: &[u8] = b"medvault-dek-wrap-v1";

/// Nonce size for the wrap AEAD (96 bits)
const WRAP_NONCE_SIZE: usize = 12;

/// Fixed wrapped-key size: nonce (12) + encrypted DEK (32) + tag (16)
pub const WRAPPED_KEY_SIZE: usize = WRAP_NONCE_SIZE + 32 + 16;

/// Content-key wrapper backed by a locally held master secret
pub struct MasterKeyWrapper {
    /// Derived wrapping key (never the raw master secret)
    wrapping_key: MasterKey,
    /// Scope bound into every wrap as associated data
    scope: WrapScope,
    /// Where the master secret came from
    backend: &'static str,
}

impl MasterKeyWrapper {
    /// Create a wrapper from an already-loaded master secret
    ///
    /// The wrapping key is derived once as
    /// `HMAC-SHA256(master, context || pepper)`, so the raw master secret
    /// is not retained past construction.
    pub fn new(
        master: MasterKey,
        pepper: Option<&[u8]>,
        scope: WrapScope,
        backend: &'static str,
    ) -> Self {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(master.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(WRAP_KEY_CONTEXT);
        if let Some(pepper) = pepper {
            mac.update(pepper);
        }
        let mut digest = mac.finalize().into_bytes();

        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        digest.as_mut_slice().zeroize();

        Self {
            wrapping_key: MasterKey::new(key),
            scope,
            backend,
        }
    }
}

impl KeyWrapper for MasterKeyWrapper {
    fn wrap(&self, dek: &ContentKey) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(self.wrapping_key.as_bytes())
            .map_err(|e| VaultError::WrapUnwrapFailure(e.to_string()))?;

        let mut nonce_bytes = [0u8; WRAP_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: dek.as_bytes(),
                    aad: self.scope.label().as_bytes(),
                },
            )
            .map_err(|e| VaultError::WrapUnwrapFailure(e.to_string()))?;

        let mut wrapped = Vec::with_capacity(WRAPPED_KEY_SIZE);
        wrapped.extend_from_slice(&nonce_bytes);
        wrapped.extend_from_slice(&sealed);
        Ok(wrapped)
    }

    fn unwrap(&self, wrapped: &[u8]) -> Result<ContentKey> {
        if wrapped.len() != WRAPPED_KEY_SIZE {
            return Err(VaultError::WrapUnwrapFailure(format!(
                "wrapped key has unexpected length {}",
                wrapped.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(self.wrapping_key.as_bytes())
            .map_err(|e| VaultError::WrapUnwrapFailure(e.to_string()))?;

        let nonce = Nonce::from_slice(&wrapped[..WRAP_NONCE_SIZE]);
        let dek_bytes = Zeroizing::new(
            cipher
                .decrypt(
                    nonce,
                    Payload {
                        msg: &wrapped[WRAP_NONCE_SIZE..],
                        aad: self.scope.label().as_bytes(),
                    },
                )
                .map_err(|_| {
                    VaultError::WrapUnwrapFailure(
                        "wrapped key rejected (tampered, wrong scope, or wrong master secret)"
                            .to_string(),
                    )
                })?,
        );

        ContentKey::from_slice(&dek_bytes).ok_or_else(|| {
            VaultError::WrapUnwrapFailure("unwrapped key has invalid size".to_string())
        })
    }

    fn backend_name(&self) -> &'static str {
        self.backend
    }
}
