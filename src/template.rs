use std::time::SystemTime;

use der::DateTime;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use rsa::BigUint;
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet,
    KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::Result;
use crate::key::KeyPair;

/// A fully resolved certificate template.
///
/// Every field is final: serial number and validity window have already been
/// defaulted. For a self-signed certificate the template is both subject and
/// issuer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub serial_number: BigUint,
    pub subject: DistinguishedName,
    pub validity: Validity,
    /// CA capability marker carried by the basic constraints extension.
    pub is_ca: bool,
    /// Emit the basic constraints extension.
    pub basic_constraints_valid: bool,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub dns_names: Vec<String>,
    pub include_subject_key_identifier: bool,
    pub subject_key_identifier_critical: bool,
    pub include_authority_key_identifier: bool,
    /// Caller supplied extensions, appended after the structural ones.
    pub extensions: Vec<ExtensionParam>,
}

impl CertificateTemplate {
    /// Builds the extension list for a certificate carrying `key`.
    ///
    /// Structural extensions come first in a fixed order. A caller supplied
    /// extension with the same OID as a structural one replaces it.
    pub fn extensions_for(&self, key: &KeyPair) -> Result<Vec<ExtensionParam>> {
        let mut structural = Vec::new();

        if self.basic_constraints_valid || self.is_ca {
            let bc = BasicConstraints {
                is_ca: self.is_ca,
                max_path_length: None,
            };
            structural.push(ExtensionParam::from_extension(bc, true)?);
        }

        let mut key_usage = self.key_usage;
        if self.is_ca {
            key_usage |= KeyUsages::KeyCertSign;
        }
        if !key_usage.is_empty() {
            structural.push(ExtensionParam::from_extension(KeyUsage(key_usage), true)?);
        }

        if !self.extended_key_usage.is_empty() {
            let eku = ExtendedKeyUsage {
                usage: self.extended_key_usage.clone(),
            };
            structural.push(ExtensionParam::from_extension(eku, false)?);
        }

        if self.include_subject_key_identifier || self.include_authority_key_identifier {
            let key_identifier = key.key_identifier()?;
            if self.include_subject_key_identifier {
                let ski = SubjectKeyIdentifier {
                    key_identifier: key_identifier.clone(),
                };
                structural.push(ExtensionParam::from_extension(
                    ski,
                    self.subject_key_identifier_critical,
                )?);
            }
            if self.include_authority_key_identifier {
                let aki = AuthorityKeyIdentifier { key_identifier };
                structural.push(ExtensionParam::from_extension(aki, false)?);
            }
        }

        if !self.dns_names.is_empty() {
            let san = SubjectAltName {
                names: self.dns_names.clone(),
            };
            structural.push(ExtensionParam::from_extension(san, false)?);
        }

        let combined = structural
            .into_iter()
            .filter(|ext| !self.extensions.iter().any(|custom| custom.oid == ext.oid))
            .chain(self.extensions.iter().cloned())
            .collect();

        Ok(combined)
    }

    /// Converts the template into a `TbsCertificateInner` for the public key
    /// of `key`, with the subject doubling as issuer.
    pub fn to_tbs_certificate_inner(&self, key: &KeyPair) -> Result<TbsCertificateInner> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithRSA.into();

        let extensions = self
            .extensions_for(key)?
            .into_iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(&self.serial_number.to_bytes_be())?;
        let name = self.subject.as_x509_name()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: name.clone(),
            validity,
            subject: name,
            subject_public_key_info: key.as_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }
}

/// UTCTime through 2049, GeneralizedTime from 2050 on (RFC 5280 4.1.2.5).
fn to_x509_time(value: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let date_time = DateTime::from_system_time(SystemTime::from(value))?;
    if date_time.year() < 2050 {
        Ok(x509_cert::time::Time::UtcTime(UtcTime::from_date_time(
            date_time,
        )?))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        ))
    }
}
