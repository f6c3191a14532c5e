//! Envelope encryption producing self-describing authenticated blobs
//!
//! Blob layout (all multi-byte integers little-endian):
//!
//! | Offset | Size | Field                  |
//! |--------|------|------------------------|
//! | 0      | 1    | version                |
//! | 1      | 1    | algorithm id           |
//! | 2      | 8    | original length        |
//! | 10     | 4    | padding length         |
//! | 14     | 12   | nonce                  |
//! | 26     | 2    | wrapped-key length (N) |
//! | 28     | N    | wrapped content key    |
//! | 28+N   | M    | ciphertext             |
//! | 28+N+M | 16   | auth tag               |
//!
//! The entire header is bound as AAD, so any bit flip in the version,
//! lengths, nonce, or wrapped key fails authentication on decrypt -
//! headers and bodies cannot be mixed and matched across blobs.
//!
//! Every call generates a fresh single-use content key, which removes
//! nonce-reuse risk entirely. Random padding of up to 64 KiB obscures the
//! exact plaintext length from anyone observing stored blob sizes (a
//! coarse mitigation: blobs differing by more than 64 KiB remain
//! distinguishable by length).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::ContentKey;
use crate::error::{Result, VaultError};
use crate::keywrap::KeyWrapper;
use crate::settings::ProtectionSettings;

/// Current blob format version
pub const BLOB_VERSION: u8 = 1;

/// Algorithm id: AES-256-GCM with a wrapped single-use content key
pub const ALG_AES256_GCM_WRAPPED_DEK: u8 = 2;

/// Nonce size (96 bits, standard for GCM)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits)
pub const TAG_SIZE: usize = 16;

/// Fixed header size before the variable-length wrapped key
pub const FIXED_HEADER_SIZE: usize = 28;

/// Maximum random padding appended before encryption (inclusive)
pub const MAX_PADDING: usize = 64 * 1024;

/// Parsed fixed header of an encrypted blob
///
/// Parsing performs only structural and format checks; it proves nothing
/// about integrity. Fields are trustworthy only after [`EnvelopeCipher::decrypt`]
/// accepts the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    pub version: u8,
    pub algorithm: u8,
    /// Length of the true plaintext before padding
    pub original_len: u64,
    /// Random filler bytes appended after the plaintext
    pub padding_len: u32,
    pub nonce: [u8; NONCE_SIZE],
    pub wrapped_key_len: u16,
}

impl BlobHeader {
    /// Parse and structurally validate the header of a blob
    pub fn parse(blob: &[u8]) -> Result<Self> {
        if blob.len() < FIXED_HEADER_SIZE + TAG_SIZE {
            return Err(VaultError::CorruptBlob);
        }
        if blob[0] != BLOB_VERSION || blob[1] != ALG_AES256_GCM_WRAPPED_DEK {
            return Err(VaultError::UnsupportedFormat {
                version: blob[0],
                algorithm: blob[1],
            });
        }

        let original_len = u64::from_le_bytes(blob[2..10].try_into().map_err(|_| VaultError::CorruptBlob)?);
        let padding_len = u32::from_le_bytes(blob[10..14].try_into().map_err(|_| VaultError::CorruptBlob)?);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&blob[14..26]);
        let wrapped_key_len =
            u16::from_le_bytes(blob[26..28].try_into().map_err(|_| VaultError::CorruptBlob)?);

        let header = Self {
            version: blob[0],
            algorithm: blob[1],
            original_len,
            padding_len,
            nonce,
            wrapped_key_len,
        };

        if blob.len() < header.encoded_len() + TAG_SIZE {
            return Err(VaultError::CorruptBlob);
        }

        Ok(header)
    }

    /// Total header length including the wrapped key
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_SIZE + self.wrapped_key_len as usize
    }
}

/// Authenticated envelope encryption over a pluggable key-wrapping backend
///
/// Stateless beyond its construction-time wrapper; safe to share across
/// any number of concurrent callers.
pub struct EnvelopeCipher {
    wrapper: Arc<dyn KeyWrapper>,
}

impl EnvelopeCipher {
    /// Create an envelope cipher over a key-wrapping backend
    pub fn new(wrapper: Arc<dyn KeyWrapper>) -> Self {
        Self { wrapper }
    }

    /// Create an envelope cipher from protection settings
    pub fn from_settings(settings: &ProtectionSettings) -> Result<Self> {
        Ok(Self::new(crate::keywrap::from_settings(settings)?))
    }

    /// Encrypt a plaintext into a self-describing blob
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let padding_len = rand::thread_rng().gen_range(0..=MAX_PADDING);

        let mut padded = Zeroizing::new(vec![0u8; plaintext.len() + padding_len]);
        padded[..plaintext.len()].copy_from_slice(plaintext);
        if padding_len > 0 {
            OsRng.fill_bytes(&mut padded[plaintext.len()..]);
        }

        let dek = ContentKey::generate();
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let wrapped = self.wrapper.wrap(&dek)?;
        if wrapped.len() > u16::MAX as usize {
            return Err(VaultError::EncryptionFailure(format!(
                "wrapped key too large: {} bytes",
                wrapped.len()
            )));
        }

        let mut header = Vec::with_capacity(FIXED_HEADER_SIZE + wrapped.len());
        header.push(BLOB_VERSION);
        header.push(ALG_AES256_GCM_WRAPPED_DEK);
        header.extend_from_slice(&(plaintext.len() as u64).to_le_bytes());
        header.extend_from_slice(&(padding_len as u32).to_le_bytes());
        header.extend_from_slice(&nonce_bytes);
        header.extend_from_slice(&(wrapped.len() as u16).to_le_bytes());
        header.extend_from_slice(&wrapped);

        let cipher = Aes256Gcm::new_from_slice(dek.as_bytes())
            .map_err(|e| VaultError::EncryptionFailure(e.to_string()))?;

        // aes-gcm appends the auth tag to the ciphertext
        let ciphertext_with_tag = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: padded.as_slice(),
                    aad: &header,
                },
            )
            .map_err(|e| VaultError::EncryptionFailure(e.to_string()))?;

        let mut blob = header;
        blob.extend_from_slice(&ciphertext_with_tag);
        Ok(blob)
    }

    /// Decrypt a blob back into its original plaintext
    ///
    /// Fails closed on any structural, format, wrapping, or integrity
    /// problem - tampered or partial plaintext is never returned.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        let header = BlobHeader::parse(blob)?;
        let header_len = header.encoded_len();

        let wrapped = &blob[FIXED_HEADER_SIZE..header_len];
        let dek = self.wrapper.unwrap(wrapped)?;

        let cipher = Aes256Gcm::new_from_slice(dek.as_bytes())
            .map_err(|_| VaultError::AuthenticationFailure)?;

        let padded = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&header.nonce),
                    Payload {
                        msg: &blob[header_len..],
                        aad: &blob[..header_len],
                    },
                )
                .map_err(|_| VaultError::AuthenticationFailure)?,
        );

        let original_len =
            usize::try_from(header.original_len).map_err(|_| VaultError::InvalidLength)?;
        if original_len > padded.len() {
            return Err(VaultError::InvalidLength);
        }

        Ok(padded[..original_len].to_vec())
    }

    /// Encrypt a UTF-8 string
    pub fn encrypt_string(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt a blob and decode the plaintext as UTF-8
    pub fn decrypt_string(&self, blob: &[u8]) -> Result<String> {
        Ok(String::from_utf8(self.decrypt(blob)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;
    use crate::keywrap::{MasterKeyWrapper, WRAPPED_KEY_SIZE};
    use crate::settings::WrapScope;

    fn test_cipher() -> EnvelopeCipher {
        let wrapper = MasterKeyWrapper::new(
            MasterKey::new([9u8; 32]),
            Some(b"test-pepper"),
            WrapScope::CurrentUser,
            "test",
        );
        EnvelopeCipher::new(Arc::new(wrapper))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let plaintext = b"patient record contents";

        let blob = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&blob).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let cipher = test_cipher();

        let blob = cipher.encrypt(b"").unwrap();
        let decrypted = cipher.decrypt(&blob).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_blob_layout_arithmetic() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"hello").unwrap();

        let header = BlobHeader::parse(&blob).unwrap();
        assert_eq!(header.version, BLOB_VERSION);
        assert_eq!(header.algorithm, ALG_AES256_GCM_WRAPPED_DEK);
        assert_eq!(header.original_len, 5);
        assert_eq!(header.wrapped_key_len as usize, WRAPPED_KEY_SIZE);
        assert!(header.padding_len as usize <= MAX_PADDING);

        // total = fixed header + wrapped key + plaintext + padding + tag
        assert_eq!(
            blob.len(),
            FIXED_HEADER_SIZE
                + header.wrapped_key_len as usize
                + 5
                + header.padding_len as usize
                + TAG_SIZE
        );

        assert_eq!(cipher.decrypt(&blob).unwrap(), b"hello");
    }

    #[test]
    fn test_encryption_is_nondeterministic() {
        let cipher = test_cipher();
        let plaintext = b"same plaintext";

        let a = cipher.encrypt(plaintext).unwrap();
        let b = cipher.encrypt(plaintext).unwrap();
        assert_ne!(a, b);

        let ha = BlobHeader::parse(&a).unwrap();
        let hb = BlobHeader::parse(&b).unwrap();
        assert_ne!(ha.nonce, hb.nonce);
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        let header_len = BlobHeader::parse(&blob).unwrap().encoded_len();
        blob[header_len] ^= 0x01;

        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_tag_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        let last = blob.len() - 1;
        blob[last] ^= 0x80;

        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_length_fields_fail_authentication() {
        let cipher = test_cipher();

        // original length is header AAD - flipping it must not change
        // truncation behavior but fail authentication outright
        let mut blob = cipher.encrypt(b"secret data").unwrap();
        blob[2] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::AuthenticationFailure)
        ));

        // padding length likewise
        let mut blob = cipher.encrypt(b"secret data").unwrap();
        blob[10] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_nonce_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        blob[14] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_wrapped_key_fails_unwrap() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        // the wrap is itself authenticated, so this is rejected before
        // the outer AEAD ever runs
        blob[FIXED_HEADER_SIZE + 1] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::WrapUnwrapFailure(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_unsupported() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        blob[0] = 9;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::UnsupportedFormat { version: 9, .. })
        ));
    }

    #[test]
    fn test_unknown_algorithm_is_unsupported() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"secret data").unwrap();

        blob[1] = 0;
        assert!(matches!(
            cipher.decrypt(&blob),
            Err(VaultError::UnsupportedFormat { algorithm: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_blob_is_corrupt() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"secret data").unwrap();

        // below the minimum fixed header + tag
        assert!(matches!(
            cipher.decrypt(&blob[..FIXED_HEADER_SIZE + TAG_SIZE - 1]),
            Err(VaultError::CorruptBlob)
        ));
        assert!(matches!(cipher.decrypt(&[]), Err(VaultError::CorruptBlob)));

        // long enough for the fixed header but cut inside the wrapped key
        assert!(matches!(
            cipher.decrypt(&blob[..FIXED_HEADER_SIZE + TAG_SIZE + 4]),
            Err(VaultError::CorruptBlob)
        ));
    }

    #[test]
    fn test_blobs_do_not_cross_wrappers() {
        let cipher_a = test_cipher();
        let wrapper_b = MasterKeyWrapper::new(
            MasterKey::new([1u8; 32]),
            None,
            WrapScope::CurrentUser,
            "test",
        );
        let cipher_b = EnvelopeCipher::new(Arc::new(wrapper_b));

        let blob = cipher_a.encrypt(b"secret data").unwrap();
        assert!(matches!(
            cipher_b.decrypt(&blob),
            Err(VaultError::WrapUnwrapFailure(_))
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        let cipher = test_cipher();

        let blob = cipher.encrypt_string("Петровић, Ана").unwrap();
        assert_eq!(cipher.decrypt_string(&blob).unwrap(), "Петровић, Ана");
    }

    #[test]
    fn test_decrypt_string_rejects_invalid_utf8() {
        let cipher = test_cipher();

        let blob = cipher.encrypt(&[0xff, 0xfe, 0x01]).unwrap();
        assert!(matches!(
            cipher.decrypt_string(&blob),
            Err(VaultError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_padding_stays_in_bounds() {
        let cipher = test_cipher();

        for _ in 0..8 {
            let blob = cipher.encrypt(b"x").unwrap();
            let header = BlobHeader::parse(&blob).unwrap();
            assert!(header.padding_len as usize <= MAX_PADDING);
            assert_eq!(
                blob.len() - header.encoded_len() - TAG_SIZE,
                1 + header.padding_len as usize
            );
        }
    }

    #[test]
    fn test_larger_payload_roundtrip() {
        let cipher = test_cipher();
        let plaintext: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let blob = cipher.encrypt(&plaintext).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), plaintext);
    }
}
