#![allow(dead_code)]

use certsmith::builder::CertificateBuilder;
use certsmith::cert::SelfSignedCertificate;

/// The localhost server configuration used across the integration tests,
/// with a 2048-bit key to keep generation quick.
pub fn localhost_builder() -> CertificateBuilder {
    CertificateBuilder::new()
        .with_bit_size(2048)
        .with_dns_names(["localhost"])
        .with_common_name("localhost")
        .with_organization("Acme.")
        .with_country("Canada")
        .with_basic_constraints()
        .with_subject_key_identifier_critical(true)
}

pub fn issue_localhost() -> SelfSignedCertificate {
    localhost_builder()
        .build()
        .expect("Failed to build localhost certificate")
}
