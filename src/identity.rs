//! Self-Signed Identity Generation Module
//!
//! This module produces the RSA key pair and self-signed X.509v3 certificate
//! that bootstrap the application's local identity on first startup.
//!
//! # Certificate Properties
//! - **Self-signed**: Issuer and subject are the same distinguished name
//! - **Key Size**: RSA 2048-bit
//! - **Signature Algorithm**: SHA-256 with RSA
//! - **Serial Number**: Random 64-bit number from a secure RNG
//! - **Default Validity**: 365 days
//! - **Version**: X.509v3
//!
//! # Example
//! ```rust,no_run
//! use credvault::identity::SelfSignedIdentityBuilder;
//! # fn example() -> Result<(), credvault::identity::GenerationError> {
//!
//! let (private_key, certificate) = SelfSignedIdentityBuilder::new()
//!     .common_name("LegacyApp".to_string())
//!     .organization("Example Organization".to_string())
//!     .locality("City".to_string())
//!     .state("State".to_string())
//!     .country("US".to_string())
//!     .validity_days(365)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use thiserror::Error;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const RSA_KEY_SIZE: u32 = 2048;
const SERIAL_NUMBER_BITS: i32 = 64;

/// Errors raised while generating the self-signed identity.
///
/// Generation does not retry: a failure here is fatal to startup because a
/// second attempt against the same crypto provider will not change the outcome.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("crypto provider unavailable: {0}")]
    CryptoProviderUnavailable(#[from] openssl::error::ErrorStack),
    #[error("invalid subject name: {0}")]
    InvalidSubjectName(String),
}

/// Builder for generating an RSA key pair and self-signed identity certificate
///
/// The resulting certificate is the trust anchor for nothing but the local
/// process: it carries no CA extensions and signs only itself. The issuer and
/// subject distinguished names are identical.
///
/// # Required Fields
/// The common name must be set before calling `build()`; the remaining
/// distinguished-name components default to empty and are rejected by the
/// name builder if the underlying provider cannot encode them.
///
/// # Examples
/// ```rust,no_run
/// use credvault::identity::SelfSignedIdentityBuilder;
/// # fn example() -> Result<(), credvault::identity::GenerationError> {
///
/// let (private_key, certificate) = SelfSignedIdentityBuilder::new()
///     .common_name("Gateway Identity".to_string())
///     .organization("ACME Corporation".to_string())
///     .locality("New York".to_string())
///     .state("New York".to_string())
///     .country("US".to_string())
///     .validity_days(730)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SelfSignedIdentityBuilder {
    common_name: String,
    organization: String,
    locality: String,
    state: String,
    country: String,
    validity_days: u32,
}

impl SelfSignedIdentityBuilder {
    /// Create a new identity builder with default values
    pub fn new() -> Self {
        Self {
            common_name: String::new(),
            organization: String::new(),
            locality: String::new(),
            state: String::new(),
            country: String::new(),
            validity_days: 365,
        }
    }

    /// Set the common name (CN) for the certificate
    pub fn common_name(mut self, cn: String) -> Self {
        self.common_name = cn;
        self
    }

    /// Set the organization (O) for the certificate
    pub fn organization(mut self, org: String) -> Self {
        self.organization = org;
        self
    }

    /// Set the locality (L) for the certificate
    pub fn locality(mut self, locality: String) -> Self {
        self.locality = locality;
        self
    }

    /// Set the state/province (ST) for the certificate
    pub fn state(mut self, state: String) -> Self {
        self.state = state;
        self
    }

    /// Set the country (C) for the certificate (2-letter ISO code)
    pub fn country(mut self, country: String) -> Self {
        self.country = country;
        self
    }

    /// Set validity period in days
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Build the RSA key pair and self-signed identity certificate
    ///
    /// Generates a new RSA-2048 key pair and creates a self-signed X.509v3
    /// certificate over it. The serial number is drawn fresh from a secure RNG
    /// on every call, so two bootstraps never produce colliding serials.
    ///
    /// # Returns
    /// * `Ok((PKey<Private>, X509))` - Tuple of (private key, self-signed certificate)
    /// * `Err(GenerationError)` - If key generation, name encoding, or signing fails
    ///
    /// # Errors
    /// * [`GenerationError::InvalidSubjectName`] - empty common name, or a
    ///   distinguished-name component the provider cannot encode
    /// * [`GenerationError::CryptoProviderUnavailable`] - RSA key generation,
    ///   serial generation, or certificate signing failed
    pub fn build(self) -> Result<(PKey<Private>, X509), GenerationError> {
        if self.common_name.is_empty() {
            return Err(GenerationError::InvalidSubjectName(
                "common name must not be empty".to_string(),
            ));
        }

        // Generate RSA key pair
        let rsa = openssl::rsa::Rsa::generate(RSA_KEY_SIZE)?;
        let private_key = PKey::from_rsa(rsa)?;

        // Build X509 certificate
        let mut builder = X509::builder()?;
        builder.set_version(X509_VERSION_3)?;

        // Generate random 64-bit serial number
        let mut serial = BigNum::new()?;
        serial.rand(SERIAL_NUMBER_BITS, MsbOption::MAYBE_ZERO, false)?;
        let asn1_serial = serial.to_asn1_integer()?;
        builder.set_serial_number(&asn1_serial)?;

        // Build subject/issuer name
        let name = self.build_subject_name()?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;

        let not_before = openssl::asn1::Asn1Time::days_from_now(0)?;
        builder.set_not_before(&not_before)?;

        let not_after = openssl::asn1::Asn1Time::days_from_now(self.validity_days)?;
        builder.set_not_after(&not_after)?;

        // Set public key (extracted from private_key automatically)
        builder.set_pubkey(&private_key)?;

        builder.sign(&private_key, MessageDigest::sha256())?;
        let x509 = builder.build();
        Ok((private_key, x509))
    }

    fn build_subject_name(&self) -> Result<openssl::x509::X509Name, GenerationError> {
        let mut name_builder = openssl::x509::X509Name::builder()
            .map_err(GenerationError::CryptoProviderUnavailable)?;

        let entries = [
            (openssl::nid::Nid::COMMONNAME, &self.common_name),
            (openssl::nid::Nid::ORGANIZATIONNAME, &self.organization),
            (openssl::nid::Nid::LOCALITYNAME, &self.locality),
            (openssl::nid::Nid::STATEORPROVINCENAME, &self.state),
            (openssl::nid::Nid::COUNTRYNAME, &self.country),
        ];

        for (nid, value) in entries {
            if value.is_empty() {
                continue;
            }
            name_builder.append_entry_by_nid(nid, value).map_err(|e| {
                GenerationError::InvalidSubjectName(format!(
                    "cannot encode {:?} entry: {}",
                    nid, e
                ))
            })?;
        }

        Ok(name_builder.build())
    }
}

impl Default for SelfSignedIdentityBuilder {
    fn default() -> Self {
        Self::new()
    }
}
