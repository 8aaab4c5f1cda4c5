//! # Certsmith - Self-Signed Certificates in Pure Rust
//!
//! Certsmith assembles the parameters of a self-signed X.509 certificate
//! through a fluent builder, mints the certificate with a fresh RSA key, and
//! exports the result as PEM or PKCS#12. It is built entirely on rustcrypto
//! crates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certsmith::builder::CertificateBuilder;
//! use certsmith::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
//! use certsmith::export::{self, ExportFormat};
//!
//! # fn main() -> Result<(), certsmith::error::CertError> {
//! let issued = CertificateBuilder::new()
//!     .with_dns_names(["localhost"])
//!     .with_common_name("localhost")
//!     .with_organization("Acme.")
//!     .with_organization_unit("Anvils")
//!     .with_city("Saskatoon")
//!     .with_state("Saskatchewan")
//!     .with_country("Canada")
//!     .with_key_usage(KeyUsages::DigitalSignature | KeyUsages::DataEncipherment)
//!     .with_extended_key_usage([
//!         ExtendedKeyUsageOption::ServerAuth,
//!         ExtendedKeyUsageOption::ClientAuth,
//!     ])
//!     .with_basic_constraints()
//!     .with_subject_key_identifier_critical(true)
//!     .build()?;
//!
//! export::write_file(
//!     "server.pfx",
//!     ExportFormat::Pkcs12,
//!     &issued.cert,
//!     &issued.key,
//!     export::DEFAULT_PKCS12_PASSWORD,
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The builder records the first invalid value it is given and ignores every
//! later setter call. That error comes back from the terminal call, through
//! the same [`CertError`] channel as key generation, signing and export
//! failures:
//!
//! ```rust
//! use certsmith::{builder::CertificateBuilder, error::CertError};
//!
//! let builder = CertificateBuilder::new()
//!     .with_bit_size(1024)
//!     .with_common_name("");
//!
//! match builder.build() {
//!     Err(CertError::InvalidInput(msg)) => assert!(msg.contains("bit size")),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`builder`]: Fluent configuration and the terminal build
//! - [`template`]: Resolved certificate templates and their X.509 form
//! - [`sign`]: Self-signing
//! - [`export`]: PEM and PKCS#12 export
//! - [`cert`]: Certificates, subject names and extensions
//! - [`key`]: RSA key generation and encoding
//! - [`error`]: Error types

pub mod builder;
pub mod cert;
pub mod error;
pub mod export;
pub mod key;
pub mod sign;
pub mod template;

pub use builder::CertificateBuilder;
pub use cert::{Certificate, SelfSignedCertificate};
pub use error::{CertError, Result};
pub use export::ExportFormat;
