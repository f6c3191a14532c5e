//! Salted iterated password hashing with constant-time verification
//!
//! PBKDF2-HMAC-SHA256 with a per-record salt and iteration count, packed
//! into a single self-describing record. Because the iteration count
//! travels inside the record, it can be raised for new accounts while
//! every existing record stays verifiable with the parameters it was
//! created under.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::settings::{ProtectionSettings, DEFAULT_PBKDF2_ITERATIONS};

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Derived key size in bytes
pub const DERIVED_KEY_SIZE: usize = 32;

/// Packed record size: iterations (u32 LE) + salt + derived key
pub const RECORD_SIZE: usize = 4 + SALT_SIZE + DERIVED_KEY_SIZE;

/// A self-describing password verifier
///
/// Created once at account creation, stored verbatim, and passed back
/// whole into [`CredentialHasher::verify`].
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    iterations: u32,
    salt: [u8; SALT_SIZE],
    derived_key: [u8; DERIVED_KEY_SIZE],
}

impl PasswordRecord {
    /// Iteration count this record was created under
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Pack into the opaque stored form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(RECORD_SIZE);
        packed.extend_from_slice(&self.iterations.to_le_bytes());
        packed.extend_from_slice(&self.salt);
        packed.extend_from_slice(&self.derived_key);
        packed
    }

    /// Parse the packed form; `None` for anything structurally invalid
    pub fn from_bytes(packed: &[u8]) -> Option<Self> {
        if packed.len() != RECORD_SIZE {
            return None;
        }

        let iterations = u32::from_le_bytes(packed[..4].try_into().ok()?);
        if iterations == 0 {
            return None;
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&packed[4..4 + SALT_SIZE]);
        let mut derived_key = [0u8; DERIVED_KEY_SIZE];
        derived_key.copy_from_slice(&packed[4 + SALT_SIZE..]);

        Some(Self {
            iterations,
            salt,
            derived_key,
        })
    }
}

impl std::fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("iterations", &self.iterations)
            .field("salt", &hex::encode(self.salt))
            .field("derived_key", &"[REDACTED]")
            .finish()
    }
}

/// Password hasher with a configurable iteration count for new records
///
/// Verification always uses the parameters stored in the record, never
/// the hasher's own default.
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl CredentialHasher {
    /// Create a hasher with a specific iteration count for new records
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Create a hasher from protection settings
    pub fn from_settings(settings: &ProtectionSettings) -> Self {
        Self::new(settings.pbkdf2_iterations)
    }

    /// Hash a password with a fresh random salt
    pub fn hash_password(&self, password: &str) -> PasswordRecord {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let mut derived_key = [0u8; DERIVED_KEY_SIZE];
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            &salt,
            self.iterations,
            &mut derived_key,
        );

        PasswordRecord {
            iterations: self.iterations,
            salt,
            derived_key,
        }
    }

    /// Verify a password against a packed record in constant time
    ///
    /// Returns `false` for a wrong password and for a malformed record
    /// alike - a caller gets no signal distinguishing the two. Malformed
    /// stored records are a data-integrity problem for the storage layer,
    /// not something to surface through the login path.
    pub fn verify(&self, password: &str, packed: &[u8]) -> bool {
        let record = match PasswordRecord::from_bytes(packed) {
            Some(record) => record,
            None => return false,
        };

        let mut derived = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            &record.salt,
            record.iterations,
            &mut derived[..],
        );

        derived[..].ct_eq(&record.derived_key[..]).into()
    }
}
