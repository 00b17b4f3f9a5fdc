//! Secret Accessor Module
//!
//! The narrow surface external collaborators call into. Secret bytes cross
//! this boundary base64-encoded so callers that expect printable values can
//! pass them through configuration, headers, or environment variables
//! unchanged.

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::x509::X509;
use std::sync::Arc;

use crate::coordinator::{Coordinator, SECRET_ALGORITHM};
use crate::entry::CredentialEntry;
use crate::store::StoreError;

/// Accessor handle over an initialized [`Coordinator`].
///
/// Cheap to clone; every clone shares the same underlying stores.
#[derive(Clone)]
pub struct SecretAccessor {
    coordinator: Arc<Coordinator>,
}

impl SecretAccessor {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    /// Look up a secret by alias, base64-encoded for transport.
    ///
    /// Resolution follows the coordinator's fallback policy: the secret store
    /// first, then the primary store's key material. An absent alias is
    /// `Ok(None)`; an unavailable secret store is an error, never a silent
    /// `None`.
    pub fn get_secret(&self, alias: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .coordinator
            .resolve_secret(alias)?
            .map(|bytes| STANDARD.encode(bytes)))
    }

    /// Store `value` as a symmetric-secret entry and persist immediately.
    ///
    /// Write-through: once this returns `Ok`, the secret survives a crash.
    pub fn store_secret(&self, alias: &str, value: &str) -> Result<(), StoreError> {
        self.coordinator.store_secret(
            alias,
            CredentialEntry::Secret {
                material: value.as_bytes().to_vec(),
                algorithm: SECRET_ALGORITHM.to_string(),
            },
        )
    }

    /// Look up a certificate by alias in the primary store.
    ///
    /// A mismatched entry kind yields `None`, not an error.
    pub fn get_certificate(&self, alias: &str) -> Option<X509> {
        self.coordinator.certificate(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use anyhow::Result;
    use tempfile::tempdir;

    fn accessor_over_fresh_vault(dir: &std::path::Path) -> Result<SecretAccessor> {
        let toml_str = format!(
            r#"
            primary_store_path = "{}"
            secret_store_path = "{}"
            protection_password = "accessor-test"
            "#,
            dir.join("identity.store").display(),
            dir.join("secrets.store").display(),
        );
        let config: VaultConfig = toml::from_str(&toml_str)?;
        let coordinator = Coordinator::init(&config).expect("init should succeed");
        Ok(SecretAccessor::new(Arc::new(coordinator)))
    }

    #[test]
    fn stored_secret_round_trips_through_base64() -> Result<()> {
        let dir = tempdir()?;
        let accessor = accessor_over_fresh_vault(dir.path())?;

        accessor.store_secret("service-token", "s3cret-value")?;
        let encoded = accessor.get_secret("service-token")?.expect("present");
        assert_eq!(STANDARD.decode(&encoded)?, b"s3cret-value");
        Ok(())
    }

    #[test]
    fn aliases_are_isolated() -> Result<()> {
        let dir = tempdir()?;
        let accessor = accessor_over_fresh_vault(dir.path())?;

        accessor.store_secret("a", "x")?;
        accessor.store_secret("b", "y")?;
        let a = accessor.get_secret("a")?.expect("a present");
        assert_eq!(STANDARD.decode(&a)?, b"x");
        Ok(())
    }

    #[test]
    fn absent_alias_is_none_not_error() -> Result<()> {
        let dir = tempdir()?;
        let accessor = accessor_over_fresh_vault(dir.path())?;
        assert_eq!(accessor.get_secret("nonexistent")?, None);
        Ok(())
    }

    #[test]
    fn seeded_api_key_is_nonempty_base64() -> Result<()> {
        let dir = tempdir()?;
        let accessor = accessor_over_fresh_vault(dir.path())?;
        let encoded = accessor.get_secret("api-key")?.expect("seeded");
        assert!(!encoded.is_empty());
        assert_eq!(STANDARD.decode(&encoded)?.len(), 32);
        Ok(())
    }

    #[test]
    fn certificate_lookup_tolerates_mismatched_kind() -> Result<()> {
        let dir = tempdir()?;
        let accessor = accessor_over_fresh_vault(dir.path())?;

        assert!(accessor.get_certificate("app-cert").is_some());
        // A secret-kind alias is not a certificate; absent and mismatched both
        // read as None.
        assert!(accessor.get_certificate("api-key").is_none());
        assert!(accessor.get_certificate("nonexistent").is_none());
        Ok(())
    }

    #[test]
    fn stored_secret_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        {
            let accessor = accessor_over_fresh_vault(dir.path())?;
            accessor.store_secret("durable", "written-through")?;
        }
        let accessor = accessor_over_fresh_vault(dir.path())?;
        let encoded = accessor.get_secret("durable")?.expect("persisted");
        assert_eq!(STANDARD.decode(&encoded)?, b"written-through");
        Ok(())
    }
}
