//! Cryptographic primitives for protecting clinical record fields
//!
//! This module provides:
//! - Envelope encryption into self-describing authenticated blobs
//! - Secure memory handling with zeroize

mod envelope;
mod secure_memory;

pub use envelope::{
    BlobHeader, EnvelopeCipher, ALG_AES256_GCM_WRAPPED_DEK, BLOB_VERSION, FIXED_HEADER_SIZE,
    MAX_PADDING, NONCE_SIZE, TAG_SIZE,
};
pub use secure_memory::{ContentKey, MasterKey};
