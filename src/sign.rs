use der::Encode;
use tracing::debug;
use x509_cert::certificate::CertificateInner;

use crate::cert::{Certificate, SignatureAlgorithm};
use crate::error::{CertError, Result};
use crate::key::KeyPair;
use crate::template::CertificateTemplate;

/// Signs `template` with `key`, using the template as both subject and
/// issuer.
///
/// The assembled certificate is DER-encoded and parsed back, so the returned
/// value is exactly what a consumer of the encoding would see.
pub fn self_sign(template: &CertificateTemplate, key: &KeyPair) -> Result<Certificate> {
    let tbs_cert_inner = template.to_tbs_certificate_inner(key)?;
    let tbs_der = tbs_cert_inner.to_der()?;

    debug!(tbs_len = tbs_der.len(), "signing certificate");
    let signature = key.sign_data(&tbs_der)?;

    let cert_inner = CertificateInner {
        tbs_certificate: tbs_cert_inner,
        signature_algorithm: SignatureAlgorithm::Sha256WithRSA.into(),
        signature: der::asn1::BitString::from_bytes(&signature)
            .map_err(|e| CertError::SigningError(e.to_string()))?,
    };

    let cert_der = cert_inner.to_der()?;
    Certificate::from_der(&cert_der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{DistinguishedName, Validity};
    use crate::cert::extensions::FlagSet;
    use rsa::BigUint;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use sha2::Sha256;

    fn template() -> CertificateTemplate {
        CertificateTemplate {
            serial_number: BigUint::from(199_999_999u32),
            subject: DistinguishedName::builder()
                .common_name("localhost".to_string())
                .organization("Acme.".to_string())
                .build(),
            validity: Validity::for_days(30),
            is_ca: false,
            basic_constraints_valid: true,
            key_usage: FlagSet::empty(),
            extended_key_usage: vec![],
            dns_names: vec!["localhost".to_string()],
            include_subject_key_identifier: true,
            subject_key_identifier_critical: false,
            include_authority_key_identifier: true,
            extensions: vec![],
        }
    }

    #[test]
    fn test_self_signed_signature_verifies_with_own_key() {
        let key = KeyPair::generate_rsa(2048).unwrap();
        let cert = self_sign(&template(), &key).unwrap();

        let tbs_der = cert.inner.tbs_certificate.to_der().unwrap();
        let signature =
            Signature::try_from(cert.inner.signature.raw_bytes()).unwrap();
        let verifying_key = VerifyingKey::<Sha256>::new(key.public_key().clone());
        assert!(verifying_key.verify(&tbs_der, &signature).is_ok());
    }

    #[test]
    fn test_issuer_equals_subject() {
        let key = KeyPair::generate_rsa(2048).unwrap();
        let cert = self_sign(&template(), &key).unwrap();
        assert_eq!(cert.issuer().unwrap(), cert.subject().unwrap());
        assert_eq!(cert.serial_number(), BigUint::from(199_999_999u32));
        assert_eq!(
            cert.inner.signature_algorithm.oid,
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
        );
    }
}
