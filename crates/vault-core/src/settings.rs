//! Protection-layer configuration
//!
//! All knobs the protection layer consumes are fixed at construction time
//! and passed in explicitly - components never read ambient global state.
//! Settings hold only non-secret handles (the pepper travels hex-encoded
//! the way deployments ship it; decode it once and hand the bytes to the
//! component constructors).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// Default PBKDF2 iteration count for new password records
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 210_000;

/// Principal boundary whose master secret wraps content keys
///
/// Selected once at startup and fixed for the process lifetime. The scope
/// label is cryptographically bound into every wrap, so blobs produced
/// under one scope never unwrap under the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum WrapScope {
    /// Key recoverable only by the same logical identity (per-user secret)
    #[default]
    CurrentUser,
    /// Key recoverable by any sufficiently privileged process on this host
    LocalMachine,
}

impl WrapScope {
    /// Stable label bound as associated data into every wrap operation
    pub fn label(&self) -> &'static str {
        match self {
            WrapScope::CurrentUser => "current-user",
            WrapScope::LocalMachine => "local-machine",
        }
    }
}

/// Where the master secret lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum KeyStoreBackend {
    /// OS secret store (macOS Keychain, Windows Credential Manager,
    /// Linux Secret Service)
    #[default]
    Keychain,
    /// Hex-encoded master key file on local disk (development)
    File,
}

/// Immutable protection-layer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtectionSettings {
    /// Hex-encoded pepper: extra entropy for key wrapping and the blind
    /// index HMAC key (e.g. 32 random bytes as 64 hex chars)
    pub pepper_hex: Option<String>,
    /// Wrap scope for content keys
    pub scope: WrapScope,
    /// Master-secret backend
    pub key_store: KeyStoreBackend,
    /// Master key file path for the `File` backend; defaults to the
    /// platform data directory when absent
    pub master_key_file: Option<PathBuf>,
    /// Iteration count for new password records
    pub pbkdf2_iterations: u32,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            pepper_hex: None,
            scope: WrapScope::default(),
            key_store: KeyStoreBackend::default(),
            master_key_file: None,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl ProtectionSettings {
    /// Load settings from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: ProtectionSettings = serde_json::from_str(&contents)
            .map_err(|e| VaultError::InvalidConfig(format!("settings parse error: {}", e)))?;
        debug!("Loaded protection settings from {:?}", path);
        Ok(settings)
    }

    /// Decode the configured pepper, if any
    ///
    /// The decoded bytes are handed out in a [`Zeroizing`] buffer so the
    /// transient copy is scrubbed once the consuming component has keyed
    /// itself.
    pub fn pepper(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match self.pepper_hex.as_deref() {
            None | Some("") => Ok(None),
            Some(hex_str) => {
                let bytes = hex::decode(hex_str.trim())
                    .map_err(|e| VaultError::InvalidConfig(format!("invalid pepper hex: {}", e)))?;
                Ok(Some(Zeroizing::new(bytes)))
            }
        }
    }
}
