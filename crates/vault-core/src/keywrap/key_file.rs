//! Local key-file master-key store (development backend)
//!
//! Holds the master secret as a hex-encoded file on disk, created on
//! first use with owner-only permissions. Intended for development and
//! single-host deployments; production should use the keychain backend
//! or an external KMS behind [`KeyWrapper`](super::KeyWrapper).
//!
//! Because the file is readable by any sufficiently privileged process on
//! the host, this backend realizes the *local-machine* wrap scope.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::crypto::MasterKey;
use crate::error::{Result, VaultError};

/// Get the default master key file path under the platform data directory
pub fn default_key_file_path() -> Result<PathBuf> {
    ProjectDirs::from("com", "medvault", "medvault")
        .map(|dirs| dirs.data_dir().join("master.key"))
        .ok_or_else(|| VaultError::KeyStore("Could not determine data directory".to_string()))
}

/// Load the master key from a hex-encoded file, creating the file with a
/// fresh key on first use
pub fn load_or_create_master_key(path: &Path) -> Result<MasterKey> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let decoded = hex::decode(contents.trim())
            .map_err(|e| VaultError::KeyStore(format!("invalid key file hex: {}", e)))?;
        let key = MasterKey::from_slice(&decoded).ok_or_else(|| {
            VaultError::KeyStore(format!("key file {:?} holds a key of invalid size", path))
        })?;
        debug!("Loaded master key from {:?}", path);
        return Ok(key);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let key = MasterKey::generate();
    std::fs::write(path, hex::encode(key.as_bytes()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    warn!("No master key file found; created a new one at {:?}", path);
    Ok(key)
}
