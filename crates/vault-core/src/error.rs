//! Error types for vault-core

use thiserror::Error;

/// Result type alias for protection-layer operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Protection-layer error types
///
/// Every variant is terminal at this layer - nothing here indicates a
/// transient condition worth an automatic retry. Mapping these to HTTP
/// statuses or user-facing messages is the caller's job. Error messages
/// never carry plaintext, key material, or passwords.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Corrupt blob: too short or inconsistent lengths")]
    CorruptBlob,

    #[error("Unsupported blob format: version {version}, algorithm {algorithm}")]
    UnsupportedFormat { version: u8, algorithm: u8 },

    #[error("Key wrap/unwrap failed: {0}")]
    WrapUnwrapFailure(String),

    #[error("Authentication failed: blob rejected")]
    AuthenticationFailure,

    #[error("Declared plaintext length exceeds decrypted data")]
    InvalidLength,

    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decrypted data is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
