//! Password-Protected Credential Store Module
//!
//! One store is a flat alias-to-entry mapping held in memory and persisted as
//! a single password-sealed container file. Load is all-or-nothing: a store
//! either decrypts completely or the load fails with a typed error; it never
//! falls back to an empty store, which would silently discard a previously
//! persisted identity.
//!
//! # On-Disk Format
//! `[Magic (8)][Version (u16)][Salt (16)][Nonce (12)][Tag (16)][Data Len (u32)][Ciphertext]`
//!
//! The ciphertext is the JSON entry map encrypted with AES-GCM-256 under a
//! PBKDF2-derived key. Writes go to a temporary file in the same directory and
//! are renamed into place, so an interrupted persist leaves the previous
//! container intact.

use secrecy::SecretString;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::container::SealedContainer;
use crate::entry::{CredentialEntry, EntryKind, StoredEntry};
use crate::identity::GenerationError;

/// Errors raised by credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrong password or tampered container; the two are reported as one kind.
    #[error("store password rejected or container tampered")]
    BadPassword,
    #[error("credential store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store container is corrupt: {0}")]
    Corrupt(String),
    #[error("crypto operation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
    #[error("store bootstrap failed: {0}")]
    Bootstrap(#[from] GenerationError),
    /// Accessor use of a store whose bootstrap did not complete.
    #[error("secret store is not initialized")]
    NotInitialized,
}

/// An in-memory credential store bound to an encrypted backing file.
#[derive(Debug)]
pub struct CredentialStore {
    entries: HashMap<String, CredentialEntry>,
    password: SecretString,
    backing_path: PathBuf,
}

impl CredentialStore {
    /// Load the store from its backing file, or create and persist a new one.
    ///
    /// When the backing file exists it is decrypted with `password`; any
    /// failure is returned as-is. When it does not exist, an empty store is
    /// populated by `bootstrap` and persisted before being returned, so a
    /// successfully created store is always durable.
    pub fn load_or_create<F>(
        path: impl Into<PathBuf>,
        password: SecretString,
        bootstrap: F,
    ) -> Result<Self, StoreError>
    where
        F: FnOnce(&mut CredentialStore) -> Result<(), StoreError>,
    {
        let path = path.into();
        if path.exists() {
            return Self::load(path, password);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut store = CredentialStore {
            entries: HashMap::new(),
            password,
            backing_path: path,
        };
        bootstrap(&mut store)?;
        store.persist()?;
        tracing::info!(
            path = %store.backing_path.display(),
            entries = store.entries.len(),
            "created new credential store"
        );
        Ok(store)
    }

    /// Load and decrypt an existing store.
    pub fn load(path: impl Into<PathBuf>, password: SecretString) -> Result<Self, StoreError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let container = SealedContainer::deserialize(&bytes)?;
        let plaintext = container.open(&password)?;

        let stored: HashMap<String, StoredEntry> = serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::Corrupt(format!("entry payload: {}", e)))?;

        let mut entries = HashMap::with_capacity(stored.len());
        for (alias, stored_entry) in &stored {
            entries.insert(alias.clone(), CredentialEntry::from_stored(stored_entry)?);
        }

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "loaded credential store"
        );
        Ok(CredentialStore {
            entries,
            password,
            backing_path: path,
        })
    }

    /// Exact, case-sensitive alias lookup. Absent aliases are `None`, never an error.
    pub fn get(&self, alias: &str) -> Option<&CredentialEntry> {
        self.entries.get(alias)
    }

    /// Insert or overwrite an entry in memory. Does not persist.
    pub fn put(&mut self, alias: impl Into<String>, entry: CredentialEntry) {
        self.entries.insert(alias.into(), entry);
    }

    /// Durably write the full store to its backing path.
    ///
    /// The container is written to a temporary file in the target directory
    /// and renamed into place, so a crash mid-write cannot clobber the
    /// previous on-disk version.
    pub fn persist(&self) -> Result<(), StoreError> {
        let mut stored = HashMap::with_capacity(self.entries.len());
        for (alias, entry) in &self.entries {
            stored.insert(alias.clone(), entry.to_stored()?);
        }
        let plaintext = zeroize::Zeroizing::new(
            serde_json::to_vec(&stored)
                .map_err(|e| StoreError::Corrupt(format!("entry payload: {}", e)))?,
        );

        let container = SealedContainer::seal(&self.password, &plaintext)?;

        let dir = match self.backing_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(&container.serialize())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp_file
                .as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        temp_file
            .persist(&self.backing_path)
            .map_err(|e| StoreError::Io(e.error))?;
        tracing::debug!(
            path = %self.backing_path.display(),
            entries = self.entries.len(),
            "persisted credential store"
        );
        Ok(())
    }

    /// List every alias and its entry kind. Diagnostics only.
    pub fn list_aliases(&self) -> Vec<(String, EntryKind)> {
        self.entries
            .iter()
            .map(|(alias, entry)| (alias.clone(), entry.kind()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.backing_path
    }
}
