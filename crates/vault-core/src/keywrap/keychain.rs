//! OS keychain master-key store
//!
//! Keeps the master secret in the system secret store:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! The secret is created on first use and stored base64-encoded (the
//! keychain stores strings). Entries are scope-qualified so switching the
//! configured scope never silently reuses the other scope's secret.

use keyring::Entry;
use tracing::{debug, warn};

use crate::crypto::MasterKey;
use crate::error::{Result, VaultError};
use crate::settings::WrapScope;

/// Service name used for keychain entries
const SERVICE_NAME: &str = "medvault";

/// Keychain entry name for a scope
fn entry_name(scope: WrapScope) -> String {
    format!("master-key-{}", scope.label())
}

/// Get the keyring entry for a scope
fn get_entry(scope: WrapScope) -> Result<Entry> {
    Entry::new(SERVICE_NAME, &entry_name(scope)).map_err(|e| VaultError::KeyStore(e.to_string()))
}

/// Load the scope's master key from the OS keychain, creating and storing
/// a fresh one on first use
pub fn load_or_create_master_key(scope: WrapScope) -> Result<MasterKey> {
    let entry = get_entry(scope)?;

    match entry.get_password() {
        Ok(encoded) => {
            let decoded = base64_decode(&encoded)?;
            let key = MasterKey::from_slice(&decoded).ok_or_else(|| {
                VaultError::KeyStore(format!(
                    "keychain entry {} holds a key of invalid size",
                    entry_name(scope)
                ))
            })?;
            debug!("Loaded master key from keychain ({})", scope.label());
            Ok(key)
        }
        Err(keyring::Error::NoEntry) => {
            let key = MasterKey::generate();
            let encoded = base64_encode(key.as_bytes());
            entry
                .set_password(&encoded)
                .map_err(|e| VaultError::KeyStore(e.to_string()))?;
            warn!(
                "No master key found for scope {}; created a new one in the keychain",
                scope.label()
            );
            Ok(key)
        }
        Err(e) => Err(VaultError::KeyStore(e.to_string())),
    }
}

/// Base64 encode bytes
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 decode string
fn base64_decode(encoded: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::KeyStore(format!("Base64 decode error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names_are_scope_qualified() {
        assert_ne!(
            entry_name(WrapScope::CurrentUser),
            entry_name(WrapScope::LocalMachine)
        );
    }

    #[test]
    fn test_base64_roundtrip() {
        let data = [7u8; 32];
        let encoded = base64_encode(&data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
    }
}
