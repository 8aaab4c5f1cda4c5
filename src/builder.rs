//! Fluent configuration of a self-signed certificate.
//!
//! [`CertificateBuilder`] accumulates parameters through chained `with_*`
//! calls. The first rejected value puts the builder into a failed state; from
//! then on every setter returns the builder untouched and the terminal
//! operations report that first error.
//!
//! ```rust,no_run
//! use certsmith::builder::CertificateBuilder;
//!
//! # fn main() -> Result<(), certsmith::error::CertError> {
//! let issued = CertificateBuilder::new()
//!     .with_dns_names(["localhost"])
//!     .with_common_name("localhost")
//!     .with_organization("Acme.")
//!     .with_country("Canada")
//!     .with_basic_constraints()
//!     .with_subject_key_identifier_critical(true)
//!     .build()?;
//!
//! println!("{}", issued.cert.to_pem()?);
//! # Ok(())
//! # }
//! ```

use rand_core::CryptoRngCore;
use rsa::BigUint;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::cert::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages};
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::cert::SelfSignedCertificate;
use crate::error::{CertError, Result};
use crate::key::KeyPair;
use crate::sign;
use crate::template::CertificateTemplate;

/// Key size used when none is configured.
pub const DEFAULT_BIT_SIZE: usize = 4096;

/// Smallest accepted RSA key size.
pub const MIN_BIT_SIZE: usize = 2048;

/// Generated serial numbers are drawn uniformly from `0..SERIAL_NUMBER_LIMIT`.
pub const SERIAL_NUMBER_LIMIT: u32 = 200_000_000;

/// Validity length applied when no not-after is configured.
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

/// Key usages present on a fresh builder.
pub fn default_key_usage() -> FlagSet<KeyUsages> {
    KeyUsages::KeyEncipherment
        | KeyUsages::DigitalSignature
        | KeyUsages::DataEncipherment
        | KeyUsages::NonRepudiation
}

/// The accumulated certificate parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateConfig {
    pub bit_size: usize,
    pub is_certificate_authority: bool,
    pub common_name: String,
    pub organization: String,
    pub organization_unit: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub dns_names: Vec<String>,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub extensions: Vec<ExtensionParam>,
    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
    pub serial_number: Option<BigUint>,
    pub include_basic_constraints: bool,
    pub include_subject_key_identifier: bool,
    pub subject_key_identifier_critical: bool,
    pub include_authority_key_identifier: bool,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            bit_size: DEFAULT_BIT_SIZE,
            is_certificate_authority: false,
            common_name: String::new(),
            organization: String::new(),
            organization_unit: String::new(),
            city: String::new(),
            state: String::new(),
            country: String::new(),
            dns_names: Vec::new(),
            key_usage: default_key_usage(),
            extended_key_usage: Vec::new(),
            extensions: Vec::new(),
            not_before: None,
            not_after: None,
            serial_number: None,
            include_basic_constraints: false,
            include_subject_key_identifier: false,
            subject_key_identifier_critical: false,
            include_authority_key_identifier: false,
        }
    }
}

impl CertificateConfig {
    /// Subject name from the configured fields. Empty optional fields are
    /// left out.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::builder()
            .common_name(self.common_name.clone())
            .maybe_organization(non_empty(&self.organization))
            .maybe_organization_unit(non_empty(&self.organization_unit))
            .maybe_locality(non_empty(&self.city))
            .maybe_state(non_empty(&self.state))
            .maybe_country(non_empty(&self.country))
            .build()
    }

    /// Resolves the validity window. not-before defaults to `now`, not-after
    /// to not-before plus [`DEFAULT_VALIDITY_DAYS`]. Explicit values are used
    /// as given, even when not-after precedes not-before.
    pub fn validity_at(&self, now: OffsetDateTime) -> Validity {
        let not_before = self.not_before.unwrap_or(now);
        let not_after = self
            .not_after
            .unwrap_or_else(|| not_before + Duration::days(DEFAULT_VALIDITY_DAYS));
        Validity {
            not_before,
            not_after,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum BuilderState {
    Configuring(CertificateConfig),
    /// The first rejected input. The configuration is frozen as it was just
    /// before the rejection.
    Failed(CertError, CertificateConfig),
}

/// Fluent builder for a self-signed RSA certificate.
///
/// A builder describes exactly one certificate: [`build`](Self::build)
/// consumes it. [`template`](Self::template) persists a generated serial
/// number, so repeated calls on the same builder agree on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateBuilder {
    state: BuilderState,
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateBuilder {
    pub fn new() -> Self {
        Self {
            state: BuilderState::Configuring(CertificateConfig::default()),
        }
    }

    /// Returns the first validation error, if any.
    pub fn error(&self) -> Option<&CertError> {
        match &self.state {
            BuilderState::Configuring(_) => None,
            BuilderState::Failed(err, _) => Some(err),
        }
    }

    /// The last accepted configuration.
    pub fn config(&self) -> &CertificateConfig {
        match &self.state {
            BuilderState::Configuring(config) | BuilderState::Failed(_, config) => config,
        }
    }

    /// The accepted configuration, or the first validation error.
    pub fn into_config(self) -> Result<CertificateConfig> {
        match self.state {
            BuilderState::Configuring(config) => Ok(config),
            BuilderState::Failed(err, _) => Err(err),
        }
    }

    /// Applies `update` unless the builder has already failed. `update` must
    /// validate before it mutates: an `Err` freezes the configuration as it
    /// is.
    fn and_then<F>(self, update: F) -> Self
    where
        F: FnOnce(&mut CertificateConfig) -> Result<()>,
    {
        match self.state {
            BuilderState::Configuring(mut config) => match update(&mut config) {
                Ok(()) => Self {
                    state: BuilderState::Configuring(config),
                },
                Err(err) => {
                    debug!(error = %err, "certificate builder rejected input");
                    Self {
                        state: BuilderState::Failed(err, config),
                    }
                }
            },
            failed @ BuilderState::Failed(..) => Self { state: failed },
        }
    }

    /// RSA key size in bits. Must be at least [`MIN_BIT_SIZE`].
    pub fn with_bit_size(self, bits: usize) -> Self {
        self.and_then(|config| {
            if bits < MIN_BIT_SIZE {
                return Err(CertError::InvalidInput(format!(
                    "bit size cannot be less than {MIN_BIT_SIZE}, got {bits}"
                )));
            }
            config.bit_size = bits;
            Ok(())
        })
    }

    pub fn with_is_certificate_authority(self, value: bool) -> Self {
        self.and_then(|config| {
            config.is_certificate_authority = value;
            Ok(())
        })
    }

    /// Subject common name. Must not be empty.
    pub fn with_common_name(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            if value.is_empty() {
                return Err(CertError::InvalidInput(
                    "common name cannot be empty".to_string(),
                ));
            }
            config.common_name = value;
            Ok(())
        })
    }

    /// Subject organization (O). An empty value omits it.
    pub fn with_organization(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.organization = value;
            Ok(())
        })
    }

    /// Subject organizational unit (OU). An empty value omits it.
    pub fn with_organization_unit(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.organization_unit = value;
            Ok(())
        })
    }

    /// Subject locality (L). An empty value omits it.
    pub fn with_city(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.city = value;
            Ok(())
        })
    }

    /// Subject state or province (ST). An empty value omits it.
    pub fn with_state(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.state = value;
            Ok(())
        })
    }

    /// Subject country (C). An empty value omits it.
    pub fn with_country(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.country = value;
            Ok(())
        })
    }

    /// Appends DNS subject alternative names. Order and duplicates are kept.
    pub fn with_dns_names<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.and_then(|config| {
            config.dns_names.extend(values.into_iter().map(Into::into));
            Ok(())
        })
    }

    /// Adds key usages to the current set, which starts at
    /// [`default_key_usage`].
    pub fn with_key_usage(self, usage: impl Into<FlagSet<KeyUsages>>) -> Self {
        let usage = usage.into();
        self.and_then(|config| {
            config.key_usage |= usage;
            Ok(())
        })
    }

    /// Appends extended key usage purposes.
    pub fn with_extended_key_usage<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = ExtendedKeyUsageOption>,
    {
        self.and_then(|config| {
            config.extended_key_usage.extend(values);
            Ok(())
        })
    }

    /// Appends raw extensions, emitted after the structural ones.
    pub fn with_extensions<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = ExtensionParam>,
    {
        self.and_then(|config| {
            config.extensions.extend(values);
            Ok(())
        })
    }

    pub fn with_not_before(self, value: OffsetDateTime) -> Self {
        self.and_then(|config| {
            config.not_before = Some(value);
            Ok(())
        })
    }

    pub fn with_not_after(self, value: OffsetDateTime) -> Self {
        self.and_then(|config| {
            config.not_after = Some(value);
            Ok(())
        })
    }

    pub fn with_serial_number(self, value: impl Into<BigUint>) -> Self {
        let value = value.into();
        self.and_then(|config| {
            config.serial_number = Some(value);
            Ok(())
        })
    }

    /// Emit a basic constraints extension.
    pub fn with_basic_constraints(self) -> Self {
        self.and_then(|config| {
            config.include_basic_constraints = true;
            Ok(())
        })
    }

    /// Emit a subject key identifier extension.
    pub fn with_subject_key_identifier(self) -> Self {
        self.and_then(|config| {
            config.include_subject_key_identifier = true;
            Ok(())
        })
    }

    /// Sets the criticality of the subject key identifier extension. This
    /// also turns the extension on.
    pub fn with_subject_key_identifier_critical(self, critical: bool) -> Self {
        self.and_then(|config| {
            config.include_subject_key_identifier = true;
            config.subject_key_identifier_critical = critical;
            Ok(())
        })
    }

    /// Emit an authority key identifier extension.
    pub fn with_authority_key_identifier(self) -> Self {
        self.and_then(|config| {
            config.include_authority_key_identifier = true;
            Ok(())
        })
    }

    /// Resolves the certificate template using the operating system's random
    /// source.
    pub fn template(&mut self) -> Result<CertificateTemplate> {
        self.template_with_rng(&mut rand_core::OsRng)
    }

    /// Resolves the certificate template.
    ///
    /// A missing serial number is generated and stored in the builder; the
    /// validity window is resolved against the current time on every call.
    pub fn template_with_rng<R: CryptoRngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<CertificateTemplate> {
        let config = match &mut self.state {
            BuilderState::Configuring(config) => config,
            BuilderState::Failed(err, _) => return Err(err.clone()),
        };
        if config.common_name.is_empty() {
            return Err(CertError::InvalidInput(
                "common name is required".to_string(),
            ));
        }

        let serial_number = match &config.serial_number {
            Some(serial) => serial.clone(),
            None => {
                let serial = BigUint::from(random_serial(rng)?);
                debug!(%serial, "generated certificate serial number");
                config.serial_number = Some(serial.clone());
                serial
            }
        };

        let validity = config.validity_at(now_utc_seconds()?);

        Ok(CertificateTemplate {
            serial_number,
            subject: config.subject(),
            validity,
            is_ca: config.is_certificate_authority,
            basic_constraints_valid: config.include_basic_constraints,
            key_usage: config.key_usage,
            extended_key_usage: config.extended_key_usage.clone(),
            dns_names: config.dns_names.clone(),
            include_subject_key_identifier: config.include_subject_key_identifier,
            subject_key_identifier_critical: config.subject_key_identifier_critical,
            include_authority_key_identifier: config.include_authority_key_identifier,
            extensions: config.extensions.clone(),
        })
    }

    /// Builds the self-signed certificate and its key using the operating
    /// system's random source.
    pub fn build(self) -> Result<SelfSignedCertificate> {
        self.build_with_rng(&mut rand_core::OsRng)
    }

    /// Builds the self-signed certificate and its key.
    ///
    /// Fails with the first validation error if any setter rejected its
    /// input. Randomness, key generation and signing failures are returned
    /// as they occur; nothing is retried.
    pub fn build_with_rng<R: CryptoRngCore + ?Sized>(
        mut self,
        rng: &mut R,
    ) -> Result<SelfSignedCertificate> {
        let template = self.template_with_rng(rng)?;
        let key = KeyPair::generate_rsa_with_rng(rng, self.config().bit_size)?;
        let cert = sign::self_sign(&template, &key)?;

        info!(
            common_name = %template.subject.common_name,
            serial = %template.serial_number,
            "built self-signed certificate"
        );
        Ok(SelfSignedCertificate { cert, key })
    }
}

/// Uniform draw from `0..SERIAL_NUMBER_LIMIT` by rejection sampling over the
/// smallest covering power of two.
fn random_serial<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<u32> {
    let mask = u32::MAX >> SERIAL_NUMBER_LIMIT.leading_zeros();
    loop {
        let mut bytes = [0u8; 4];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CertError::RandomnessError(e.to_string()))?;
        let candidate = u32::from_be_bytes(bytes) & mask;
        if candidate < SERIAL_NUMBER_LIMIT {
            return Ok(candidate);
        }
    }
}

/// Current UTC time truncated to whole seconds, the resolution certificates
/// carry.
fn now_utc_seconds() -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp(
        OffsetDateTime::now_utc().unix_timestamp(),
    )?)
}
