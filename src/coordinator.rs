//! Dual-Store Coordinator Module
//!
//! Sequences the bootstrap of two independent credential stores and provides
//! the fallback-aware lookup the accessor surface is built on:
//!
//! - the *primary store* holds asymmetric identity material (the self-signed
//!   certificate and its private key),
//! - the *secret store* holds opaque symmetric secrets.
//!
//! The primary store bootstraps first, because it carries the identity other
//! operations may reference. Both bootstraps always run, so when both fail the
//! caller sees both failures. A coordinator with a healthy primary store but a
//! failed secret store is a legal partial state: certificate lookups work,
//! secret lookups fail fast until the caller has inspected
//! [`Coordinator::secret_store_failure`].
//!
//! Secret lookups consult the secret store first and fall back to the primary
//! store's key material only when the secret store has no entry for the alias.
//! The fallback keeps aliases reachable that were persisted under the older
//! single-store layout.

use std::sync::RwLock;
use thiserror::Error;

use openssl::x509::X509;

use crate::config::VaultConfig;
use crate::entry::{CredentialEntry, EntryKind};
use crate::identity::SelfSignedIdentityBuilder;
use crate::store::{CredentialStore, StoreError};

/// Size of generated symmetric seed secrets (256 bits).
const SYMMETRIC_KEY_SIZE: usize = 32;
/// Algorithm tag recorded on generated secret entries.
pub(crate) const SECRET_ALGORITHM: &str = "AES";

/// Errors raised while bootstrapping the coordinator, tagged by store.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("primary store bootstrap failed: {0}")]
    Primary(#[source] StoreError),
    #[error("secret store bootstrap failed: {0}")]
    Secret(#[source] StoreError),
    #[error("primary and secret store bootstrap failed: {primary}; {secret}")]
    Both {
        primary: StoreError,
        secret: StoreError,
    },
}

#[derive(Debug)]
enum SecretSlot {
    Ready(RwLock<CredentialStore>),
    Failed(InitError),
}

/// Owns the primary and secret stores for the lifetime of the process.
///
/// Construct once at startup with [`Coordinator::init`] and hand the handle
/// (typically behind an `Arc`) to whoever needs credential access. Reads may
/// run concurrently; writes serialize per store.
#[derive(Debug)]
pub struct Coordinator {
    primary: RwLock<CredentialStore>,
    secret: SecretSlot,
}

impl Coordinator {
    /// Bootstrap both stores per the configuration.
    ///
    /// Load-or-create semantics make this idempotent: a second `init` against
    /// the same data directory loads the existing stores, so the identity
    /// certificate keeps its serial number and no second key pair is created.
    pub fn init(config: &VaultConfig) -> Result<Self, InitError> {
        let primary = Self::bootstrap_primary(config);
        let secret = Self::bootstrap_secret(config);

        match (primary, secret) {
            (Ok(primary), Ok(secret)) => {
                let coordinator = Coordinator {
                    primary: RwLock::new(primary),
                    secret: SecretSlot::Ready(RwLock::new(secret)),
                };
                for (alias, kind) in coordinator.list_aliases() {
                    tracing::debug!(alias = %alias, kind = ?kind, "credential store entry");
                }
                Ok(coordinator)
            }
            (Ok(primary), Err(secret_err)) => {
                tracing::warn!(
                    error = %secret_err,
                    "secret store bootstrap failed; secret lookups disabled"
                );
                Ok(Coordinator {
                    primary: RwLock::new(primary),
                    secret: SecretSlot::Failed(InitError::Secret(secret_err)),
                })
            }
            (Err(primary_err), Ok(_)) => Err(InitError::Primary(primary_err)),
            (Err(primary_err), Err(secret_err)) => Err(InitError::Both {
                primary: primary_err,
                secret: secret_err,
            }),
        }
    }

    fn bootstrap_primary(config: &VaultConfig) -> Result<CredentialStore, StoreError> {
        let identity = &config.identity;
        let alias = &config.identity_alias;
        CredentialStore::load_or_create(
            &config.primary_store_path,
            config.protection_password.clone(),
            |store| {
                let (key, certificate) = SelfSignedIdentityBuilder::new()
                    .common_name(identity.common_name.clone())
                    .organization(identity.organization.clone())
                    .locality(identity.locality.clone())
                    .state(identity.state.clone())
                    .country(identity.country.clone())
                    .validity_days(identity.validity_days)
                    .build()?;
                store.put(
                    alias.clone(),
                    CredentialEntry::PrivateKey {
                        key,
                        chain: vec![certificate],
                    },
                );
                tracing::info!(alias = %alias, "generated self-signed identity");
                Ok(())
            },
        )
    }

    fn bootstrap_secret(config: &VaultConfig) -> Result<CredentialStore, StoreError> {
        let seed_aliases = std::iter::once(&config.api_key_alias)
            .chain(config.extra_seed_aliases.iter());
        CredentialStore::load_or_create(
            &config.secret_store_path,
            config.protection_password.clone(),
            |store| {
                // Every seed slot gets independently random material; a static
                // default here would put the same plaintext in every deployment.
                for alias in seed_aliases {
                    let mut material = vec![0u8; SYMMETRIC_KEY_SIZE];
                    openssl::rand::rand_bytes(&mut material)?;
                    store.put(
                        alias.clone(),
                        CredentialEntry::Secret {
                            material,
                            algorithm: SECRET_ALGORITHM.to_string(),
                        },
                    );
                    tracing::info!(alias = %alias, "seeded random symmetric secret");
                }
                Ok(())
            },
        )
    }

    /// Resolve raw secret bytes for `alias`: secret store first, then the
    /// primary store's key material.
    pub fn resolve_secret(&self, alias: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let secret_store = self.secret_store()?;
        {
            let guard = secret_store.read().unwrap();
            if let Some(entry) = guard.get(alias) {
                return entry_key_material(entry);
            }
        }

        let guard = self.primary.read().unwrap();
        match guard.get(alias) {
            Some(entry) => entry_key_material(entry),
            None => Ok(None),
        }
    }

    /// Upsert an entry into the secret store and persist it write-through.
    ///
    /// The write lock is held across the persist, so a concurrent `put` cannot
    /// race the bytes being serialized to disk.
    pub fn store_secret(&self, alias: &str, entry: CredentialEntry) -> Result<(), StoreError> {
        let secret_store = self.secret_store()?;
        let mut guard = secret_store.write().unwrap();
        guard.put(alias, entry);
        guard.persist()
    }

    /// Certificate lookup against the primary store only.
    ///
    /// A private-key entry yields the leaf of its chain; a mismatched entry
    /// kind yields `None` rather than an error, so callers needing strictness
    /// must check the kind themselves.
    pub fn certificate(&self, alias: &str) -> Option<X509> {
        let guard = self.primary.read().unwrap();
        match guard.get(alias) {
            Some(CredentialEntry::PrivateKey { chain, .. }) => chain.first().cloned(),
            Some(CredentialEntry::TrustedCertificate { certificate }) => {
                Some(certificate.clone())
            }
            Some(CredentialEntry::Secret { .. }) | None => None,
        }
    }

    /// Whether secret lookups are serviceable.
    pub fn secret_store_ready(&self) -> bool {
        matches!(self.secret, SecretSlot::Ready(_))
    }

    /// The recorded bootstrap failure when the secret store is unavailable.
    pub fn secret_store_failure(&self) -> Option<&InitError> {
        match &self.secret {
            SecretSlot::Ready(_) => None,
            SecretSlot::Failed(err) => Some(err),
        }
    }

    /// Aliases across both stores with their kinds. Diagnostics only.
    pub fn list_aliases(&self) -> Vec<(String, EntryKind)> {
        let mut aliases = self.primary.read().unwrap().list_aliases();
        if let SecretSlot::Ready(secret) = &self.secret {
            aliases.extend(secret.read().unwrap().list_aliases());
        }
        aliases
    }

    /// Persist both stores. Call before shutdown to flush pending writes.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.primary.write().unwrap().persist()?;
        if let SecretSlot::Ready(secret) = &self.secret {
            secret.write().unwrap().persist()?;
        }
        Ok(())
    }

    fn secret_store(&self) -> Result<&RwLock<CredentialStore>, StoreError> {
        match &self.secret {
            SecretSlot::Ready(store) => Ok(store),
            SecretSlot::Failed(_) => Err(StoreError::NotInitialized),
        }
    }
}

fn entry_key_material(entry: &CredentialEntry) -> Result<Option<Vec<u8>>, StoreError> {
    match entry {
        CredentialEntry::Secret { material, .. } => Ok(Some(material.clone())),
        CredentialEntry::PrivateKey { key, .. } => Ok(Some(key.private_key_to_der()?)),
        CredentialEntry::TrustedCertificate { .. } => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> VaultConfig {
        let toml_str = format!(
            r#"
            primary_store_path = "{}"
            secret_store_path = "{}"
            protection_password = "test-password"
            "#,
            dir.join("identity.store").display(),
            dir.join("secrets.store").display(),
        );
        toml::from_str(&toml_str).expect("test config should parse")
    }

    #[test]
    fn bootstrap_on_empty_directory_seeds_both_stores() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());
        let coordinator = Coordinator::init(&config).expect("init should succeed");

        assert!(coordinator.secret_store_ready());

        // Primary store holds exactly the identity entry, valid for 365 days.
        let certificate = coordinator
            .certificate("app-cert")
            .expect("identity certificate present");
        let not_before = certificate.not_before();
        let diff = not_before.diff(certificate.not_after()).unwrap();
        assert_eq!(diff.days, 365);

        // Secret store holds exactly the seeded API key with 256 bits of material.
        let material = coordinator
            .resolve_secret("api-key")?
            .expect("api key present");
        assert_eq!(material.len(), 32);
        assert!(material.iter().any(|&b| b != 0));

        let mut aliases = coordinator.list_aliases();
        aliases.sort();
        assert_eq!(
            aliases,
            vec![
                ("api-key".to_string(), EntryKind::Secret),
                ("app-cert".to_string(), EntryKind::Key),
            ]
        );

        assert_eq!(coordinator.resolve_secret("nonexistent")?, None);
        Ok(())
    }

    #[test]
    fn init_is_idempotent_across_restarts() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());

        let first = Coordinator::init(&config).expect("first init");
        let first_serial = first
            .certificate("app-cert")
            .unwrap()
            .serial_number()
            .to_bn()
            .unwrap();
        let first_api_key = first.resolve_secret("api-key")?.unwrap();
        drop(first);

        let second = Coordinator::init(&config).expect("second init");
        let second_serial = second
            .certificate("app-cert")
            .unwrap()
            .serial_number()
            .to_bn()
            .unwrap();
        assert_eq!(first_serial, second_serial);
        assert_eq!(second.resolve_secret("api-key")?.unwrap(), first_api_key);
        Ok(())
    }

    #[test]
    fn secret_store_wins_over_primary_fallback() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());
        let coordinator = Coordinator::init(&config)?;

        // The identity alias resolves via fallback to primary key material.
        let fallback = coordinator
            .resolve_secret("app-cert")?
            .expect("fallback yields private key material");
        assert!(!fallback.is_empty());

        // Shadow the alias in the secret store; the secret-store value now wins.
        coordinator.store_secret(
            "app-cert",
            CredentialEntry::Secret {
                material: b"shadowed".to_vec(),
                algorithm: SECRET_ALGORITHM.to_string(),
            },
        )?;
        assert_eq!(
            coordinator.resolve_secret("app-cert")?.unwrap(),
            b"shadowed".to_vec()
        );
        Ok(())
    }

    #[test]
    fn partial_init_keeps_certificates_and_fails_secret_lookups() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());

        // Plant garbage where the secret store belongs.
        fs::write(&config.secret_store_path, b"not a sealed container")?;

        let coordinator = Coordinator::init(&config).expect("partial init is legal");
        assert!(!coordinator.secret_store_ready());
        assert!(matches!(
            coordinator.secret_store_failure(),
            Some(InitError::Secret(StoreError::Corrupt(_)))
        ));

        // Certificate lookups still work; secret lookups fail fast.
        assert!(coordinator.certificate("app-cert").is_some());
        let err = coordinator.resolve_secret("api-key").unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized));
        let err = coordinator
            .store_secret(
                "x",
                CredentialEntry::Secret {
                    material: vec![1],
                    algorithm: SECRET_ALGORITHM.to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized));
        Ok(())
    }

    #[test]
    fn primary_failure_is_fatal_and_both_failures_are_reported() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());
        fs::write(&config.primary_store_path, b"garbage")?;

        let err = Coordinator::init(&config).unwrap_err();
        assert!(matches!(err, InitError::Primary(_)));

        fs::write(&config.secret_store_path, b"also garbage")?;
        let err = Coordinator::init(&config).unwrap_err();
        assert!(matches!(err, InitError::Both { .. }));
        Ok(())
    }

    #[test]
    fn wrong_password_on_existing_stores_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());
        Coordinator::init(&config).expect("first init");

        let mut reopened = config.clone();
        reopened.protection_password = SecretString::new("different-password".to_string());
        let err = Coordinator::init(&reopened).unwrap_err();
        assert!(matches!(
            err,
            InitError::Both {
                primary: StoreError::BadPassword,
                secret: StoreError::BadPassword,
            }
        ));
        Ok(())
    }

    #[test]
    fn extra_seed_aliases_get_independent_material() -> Result<()> {
        let dir = tempdir()?;
        let mut config = test_config(dir.path());
        config.extra_seed_aliases = vec!["db-password".to_string()];

        let coordinator = Coordinator::init(&config)?;
        let api_key = coordinator.resolve_secret("api-key")?.unwrap();
        let db_password = coordinator.resolve_secret("db-password")?.unwrap();
        assert_eq!(db_password.len(), 32);
        assert_ne!(api_key, db_password);
        Ok(())
    }

    #[test]
    fn flush_persists_unpersisted_primary_changes() -> Result<()> {
        let dir = tempdir()?;
        let config = test_config(dir.path());
        let coordinator = Coordinator::init(&config)?;

        coordinator
            .primary
            .write()
            .unwrap()
            .put(
                "extra-secret",
                CredentialEntry::Secret {
                    material: b"pending".to_vec(),
                    algorithm: SECRET_ALGORITHM.to_string(),
                },
            );
        coordinator.flush()?;
        drop(coordinator);

        let reopened = Coordinator::init(&config)?;
        assert_eq!(
            reopened.resolve_secret("extra-secret")?.unwrap(),
            b"pending".to_vec()
        );
        // A secret-kind entry in the primary store is not a certificate.
        assert!(reopened.certificate("extra-secret").is_none());
        Ok(())
    }
}
