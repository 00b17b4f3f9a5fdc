//! Credential entry types shared by both protected stores.
//!
//! An entry is either asymmetric identity material (a private key with its
//! certificate chain), a bare trusted certificate, or an opaque symmetric
//! secret. The wire form used inside the encrypted container base64-encodes
//! all DER material so the payload stays valid JSON.

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::StoreError;

/// One credential held under an alias in a [`crate::store::CredentialStore`].
#[derive(Clone)]
pub enum CredentialEntry {
    /// A private key and its certificate chain, leaf first.
    PrivateKey { key: PKey<Private>, chain: Vec<X509> },
    /// A certificate trusted without an accompanying private key.
    TrustedCertificate { certificate: X509 },
    /// Opaque symmetric key material.
    Secret { material: Vec<u8>, algorithm: String },
}

/// Coarse entry classification, used for diagnostics listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Key,
    Certificate,
    Secret,
}

impl CredentialEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            CredentialEntry::PrivateKey { .. } => EntryKind::Key,
            CredentialEntry::TrustedCertificate { .. } => EntryKind::Certificate,
            CredentialEntry::Secret { .. } => EntryKind::Secret,
        }
    }

    pub(crate) fn to_stored(&self) -> Result<StoredEntry, StoreError> {
        match self {
            CredentialEntry::PrivateKey { key, chain } => {
                let private_key = STANDARD.encode(key.private_key_to_der()?);
                let chain = chain
                    .iter()
                    .map(|cert| Ok(STANDARD.encode(cert.to_der()?)))
                    .collect::<Result<Vec<_>, StoreError>>()?;
                Ok(StoredEntry::Key { private_key, chain })
            }
            CredentialEntry::TrustedCertificate { certificate } => Ok(StoredEntry::Certificate {
                certificate: STANDARD.encode(certificate.to_der()?),
            }),
            CredentialEntry::Secret {
                material,
                algorithm,
            } => Ok(StoredEntry::Secret {
                material: STANDARD.encode(material),
                algorithm: algorithm.clone(),
            }),
        }
    }

    pub(crate) fn from_stored(stored: &StoredEntry) -> Result<Self, StoreError> {
        match stored {
            StoredEntry::Key { private_key, chain } => {
                let key_der = decode_field(private_key, "private key")?;
                let key = PKey::private_key_from_der(&key_der)
                    .map_err(|e| StoreError::Corrupt(format!("private key entry: {}", e)))?;
                let chain = chain
                    .iter()
                    .map(|cert| {
                        let der = decode_field(cert, "certificate chain")?;
                        X509::from_der(&der)
                            .map_err(|e| StoreError::Corrupt(format!("certificate chain: {}", e)))
                    })
                    .collect::<Result<Vec<_>, StoreError>>()?;
                Ok(CredentialEntry::PrivateKey { key, chain })
            }
            StoredEntry::Certificate { certificate } => {
                let der = decode_field(certificate, "trusted certificate")?;
                let certificate = X509::from_der(&der)
                    .map_err(|e| StoreError::Corrupt(format!("trusted certificate: {}", e)))?;
                Ok(CredentialEntry::TrustedCertificate { certificate })
            }
            StoredEntry::Secret {
                material,
                algorithm,
            } => Ok(CredentialEntry::Secret {
                material: decode_field(material, "secret material")?,
                algorithm: algorithm.clone(),
            }),
        }
    }
}

fn decode_field(encoded: &str, field: &str) -> Result<Vec<u8>, StoreError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| StoreError::Corrupt(format!("{}: invalid base64: {}", field, e)))
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialEntry::PrivateKey { chain, .. } => f
                .debug_struct("PrivateKey")
                .field("key", &"<redacted>")
                .field("chain_len", &chain.len())
                .finish(),
            CredentialEntry::TrustedCertificate { .. } => {
                f.debug_struct("TrustedCertificate").finish_non_exhaustive()
            }
            CredentialEntry::Secret { algorithm, .. } => f
                .debug_struct("Secret")
                .field("material", &"<redacted>")
                .field("algorithm", algorithm)
                .finish(),
        }
    }
}

/// Serialized form of an entry inside the encrypted container payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum StoredEntry {
    Key {
        private_key: String,
        chain: Vec<String>,
    },
    Certificate {
        certificate: String,
    },
    Secret {
        material: String,
        algorithm: String,
    },
}
