//! CredVault - Local Credential Bootstrap
//!
//! An embedded credential-bootstrap subsystem: on first startup it generates a
//! self-signed X.509 identity, persists it alongside derived symmetric secrets
//! in two separate password-protected stores, and thereafter serves
//! lookup/update operations for both certificate material and opaque secrets.
//!
//! # Overview
//!
//! Two protected stores are coordinated behind one handle:
//!
//! ```text
//! Coordinator
//!   ├── primary store  (asymmetric identity: private key + certificate chain)
//!   └── secret store   (opaque symmetric secrets)
//! ```
//!
//! Secret lookups consult the secret store first and fall back to the primary
//! store's key material, preserving access to values persisted under the
//! historical single-store layout.
//!
//! # Quick Start
//!
//! ```no_run
//! use credvault::accessor::SecretAccessor;
//! use credvault::config::VaultConfig;
//! use credvault::coordinator::Coordinator;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = VaultConfig::load()?;
//!
//!     // Bootstrap both stores; generates the identity on first run only.
//!     let coordinator = Arc::new(Coordinator::init(&config)?);
//!
//!     let accessor = SecretAccessor::new(coordinator);
//!     if let Some(api_key) = accessor.get_secret("api-key")? {
//!         println!("api key (base64): {}", api_key);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! ## [`identity`]
//!
//! Builder for the RSA-2048 key pair and self-signed X.509v3 certificate that
//! form the process identity.
//!
//! ## [`store`]
//!
//! The password-protected credential store: load-or-create semantics, atomic
//! persist, all-or-nothing decryption.
//!
//! ## [`coordinator`]
//!
//! Bootstrap sequencing of the primary and secret stores, the fallback lookup
//! policy, and the partial-initialization state.
//!
//! ## [`accessor`]
//!
//! The narrow `get_secret` / `store_secret` / `get_certificate` surface
//! exposed to external collaborators, with base64 transport encoding.
//!
//! ## [`config`]
//!
//! The consumed configuration: store paths, protection password, aliases, and
//! identity distinguished-name defaults.
//!
//! # Error Handling
//!
//! Every fallible operation returns a typed error
//! ([`identity::GenerationError`], [`store::StoreError`],
//! [`coordinator::InitError`]); nothing is logged-and-swallowed at this
//! boundary. A store that fails to load surfaces the failure instead of
//! falling back to an empty store, and the hosting application decides whether
//! a failed secret store is fatal to startup.

pub mod accessor;
pub mod config;
mod container;
pub mod coordinator;
pub mod entry;
pub mod identity;
pub mod store;
