//! Key-wrapping trait definition

use crate::crypto::ContentKey;
use crate::error::Result;

/// Trait for content-key wrapping backends
///
/// The envelope cipher only ever sees this boundary, so deployments can
/// swap the bundled master-key implementation for an external KMS or an
/// HSM without touching any encryption code. Implementations must be a
/// deterministic round trip (`unwrap(wrap(k)) == k`) and must fail closed
/// on any tampered or foreign input - never return a key derived from
/// garbage.
pub trait KeyWrapper: Send + Sync {
    /// Wrap a content key into an opaque byte sequence (at most 65535 bytes)
    fn wrap(&self, dek: &ContentKey) -> Result<Vec<u8>>;

    /// Unwrap a previously wrapped content key
    fn unwrap(&self, wrapped: &[u8]) -> Result<ContentKey>;

    /// Get a human-readable name for this wrapping backend
    fn backend_name(&self) -> &'static str;
}
