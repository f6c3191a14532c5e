//! # vault-core
//!
//! Data-protection core for MedVault: every sensitive field and file in
//! the clinical record store passes through this layer. It provides:
//! - Envelope encryption into versioned, self-describing, authenticated
//!   blobs (AES-256-GCM, single-use content keys, header bound as AAD)
//! - Content-key wrapping behind a pluggable master-secret boundary
//!   (OS keychain or local key file; KMS/HSM via the [`KeyWrapper`] trait)
//! - Blind index tokens for equality search over ciphertext
//! - Salted iterated password hashing with constant-time verification
//!
//! This layer neither persists anything nor decides who may call it -
//! storage, sessions, and transport are external collaborators that only
//! ever see opaque bytes. All components are immutable after construction
//! and safe for unbounded concurrent use.

pub mod crypto;
pub mod error;
pub mod keywrap;
pub mod password;
pub mod search;
pub mod settings;

pub use crypto::{BlobHeader, ContentKey, EnvelopeCipher, MasterKey};
pub use error::{Result, VaultError};
pub use keywrap::{KeyWrapper, MasterKeyWrapper};
pub use password::{CredentialHasher, PasswordRecord};
pub use search::{BlindIndex, CanonicalizationRules, IndexToken, IndexedValueKind};
pub use settings::{KeyStoreBackend, ProtectionSettings, WrapScope};
