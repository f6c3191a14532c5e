//! Content-key wrapping
//!
//! Separates per-message content keys from the master secret: the
//! envelope cipher never sees the master secret, only the [`KeyWrapper`]
//! boundary. Two master-secret stores are bundled:
//! 1. OS keychain (production)
//! 2. Local key file (development)

mod key_file;
mod keychain;
mod master_key;
mod traits;

pub use key_file::default_key_file_path;
pub use master_key::{MasterKeyWrapper, WRAPPED_KEY_SIZE};
pub use traits::KeyWrapper;

use std::sync::Arc;

use crate::error::Result;
use crate::settings::{KeyStoreBackend, ProtectionSettings};

/// Build the configured key wrapper from protection settings
///
/// Loads (or creates, on first use) the master secret from the selected
/// backend and derives the wrapping key from it together with the pepper.
pub fn from_settings(settings: &ProtectionSettings) -> Result<Arc<dyn KeyWrapper>> {
    let pepper = settings.pepper()?;

    let (master, backend) = match settings.key_store {
        KeyStoreBackend::Keychain => (
            keychain::load_or_create_master_key(settings.scope)?,
            "OS Keychain",
        ),
        KeyStoreBackend::File => {
            let path = match &settings.master_key_file {
                Some(path) => path.clone(),
                None => default_key_file_path()?,
            };
            (key_file::load_or_create_master_key(&path)?, "Key File")
        }
    };

    Ok(Arc::new(MasterKeyWrapper::new(
        master,
        pepper.as_ref().map(|p| p.as_slice()),
        settings.scope,
        backend,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WrapScope;
    use tempfile::TempDir;

    #[test]
    fn test_from_settings_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ProtectionSettings {
            pepper_hex: Some("aabbccdd".to_string()),
            scope: WrapScope::LocalMachine,
            key_store: KeyStoreBackend::File,
            master_key_file: Some(temp_dir.path().join("master.key")),
            ..Default::default()
        };

        let wrapper = from_settings(&settings).unwrap();
        assert_eq!(wrapper.backend_name(), "Key File");

        let dek = crate::crypto::ContentKey::generate();
        let wrapped = wrapper.wrap(&dek).unwrap();
        assert_eq!(wrapper.unwrap(&wrapped).unwrap().as_bytes(), dek.as_bytes());
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ProtectionSettings {
            key_store: KeyStoreBackend::File,
            master_key_file: Some(temp_dir.path().join("master.key")),
            ..Default::default()
        };

        let dek = crate::crypto::ContentKey::generate();
        let wrapped = from_settings(&settings).unwrap().wrap(&dek).unwrap();

        // A second wrapper over the same key file can unwrap
        let again = from_settings(&settings).unwrap();
        assert_eq!(again.unwrap(&wrapped).unwrap().as_bytes(), dek.as_bytes());
    }
}
