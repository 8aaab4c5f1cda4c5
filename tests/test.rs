mod util;

use std::fs;

use certsmith::builder::{CertificateBuilder, SERIAL_NUMBER_LIMIT};
use certsmith::cert::extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use certsmith::error::CertError;
use certsmith::export::{self, ExportFormat};
use rsa::BigUint;
use time::{Duration, OffsetDateTime};

#[test]
fn build_localhost_certificate() {
    let started = OffsetDateTime::now_utc();
    let issued = util::issue_localhost();

    let subject = issued.cert.subject().unwrap();
    assert_eq!(subject.common_name, "localhost");
    assert_eq!(subject.organization.as_deref(), Some("Acme."));
    assert_eq!(subject.country.as_deref(), Some("Canada"));
    assert_eq!(subject.organization_unit, None);
    assert_eq!(subject.locality, None);
    assert_eq!(subject.state, None);

    let validity = issued.cert.validity();
    assert_eq!(validity.duration(), Duration::hours(365 * 24));
    assert!((validity.not_before - started).abs() < Duration::seconds(5));

    assert!(issued.cert.serial_number() < BigUint::from(SERIAL_NUMBER_LIMIT));
}

#[test]
fn build_localhost_certificate_extensions() {
    let issued = util::issue_localhost();
    let cert = &issued.cert;

    let (bc, critical) = cert.extension::<BasicConstraints>().unwrap().unwrap();
    assert!(critical);
    assert!(!bc.is_ca);

    let (ski, critical) = cert.extension::<SubjectKeyIdentifier>().unwrap().unwrap();
    assert!(critical);
    assert_eq!(ski.key_identifier, issued.key.key_identifier().unwrap());

    let (san, _) = cert.extension::<SubjectAltName>().unwrap().unwrap();
    assert_eq!(san.names, vec!["localhost"]);

    let (ku, critical) = cert.extension::<KeyUsage>().unwrap().unwrap();
    assert!(critical);
    assert_eq!(ku.0, certsmith::builder::default_key_usage());

    assert!(cert.extension::<ExtendedKeyUsage>().unwrap().is_none());
}

#[test]
fn build_with_explicit_serial_and_validity() {
    let not_before = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    let not_after = not_before + Duration::days(30);
    let issued = util::localhost_builder()
        .with_serial_number(4_000_000_000u64)
        .with_not_before(not_before)
        .with_not_after(not_after)
        .build()
        .unwrap();

    assert_eq!(issued.cert.serial_number(), BigUint::from(4_000_000_000u64));
    assert_eq!(issued.cert.validity().not_before, not_before);
    assert_eq!(issued.cert.validity().not_after, not_after);
}

#[test]
fn build_ca_without_basic_constraints_request() {
    let issued = CertificateBuilder::new()
        .with_bit_size(2048)
        .with_common_name("Acme Root")
        .with_is_certificate_authority(true)
        .with_extended_key_usage([ExtendedKeyUsageOption::ServerAuth])
        .build()
        .unwrap();

    assert!(issued.cert.is_ca().unwrap());
    let (ku, _) = issued.cert.extension::<KeyUsage>().unwrap().unwrap();
    assert!(ku.0.contains(KeyUsages::KeyCertSign));
    let (eku, critical) = issued.cert.extension::<ExtendedKeyUsage>().unwrap().unwrap();
    assert!(!critical);
    assert_eq!(eku.usage, vec![ExtendedKeyUsageOption::ServerAuth]);
}

#[test]
fn build_fails_with_first_validation_error() {
    let err = util::localhost_builder()
        .with_common_name("")
        .with_bit_size(512)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        CertError::InvalidInput("common name cannot be empty".to_string())
    );
}

#[test]
fn export_pkcs12_bundle() {
    let issued = util::issue_localhost();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("go-server.pfx");

    export::write_file(&path, ExportFormat::Pkcs12, &issued.cert, &issued.key, "hunter2").unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(!bytes.is_empty());

    let pfx = p12::PFX::parse(&bytes).unwrap();
    assert!(pfx.verify_mac("hunter2"));
    assert!(!pfx.verify_mac("wrong"));
    let keys = pfx.key_bags("hunter2").unwrap();
    assert_eq!(keys, vec![issued.key.to_pkcs8_der().unwrap()]);
}

#[test]
fn export_pem_certificate_and_key() {
    let issued = util::issue_localhost();
    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");

    export::write_file(&cert_path, "pem", &issued.cert, &issued.key, "").unwrap();
    export::write_file(&key_path, 1, &issued.cert, &issued.key, "").unwrap();

    let cert_pem = fs::read_to_string(&cert_path).unwrap();
    let parsed = pem::parse(&cert_pem).unwrap();
    assert_eq!(parsed.tag(), "CERTIFICATE");
    assert_eq!(parsed.contents(), issued.cert.to_der().unwrap().as_slice());

    let key_pem = fs::read_to_string(&key_path).unwrap();
    let parsed = pem::parse(&key_pem).unwrap();
    assert_eq!(parsed.tag(), "RSA PRIVATE KEY");
    assert_eq!(parsed.contents(), issued.key.to_pkcs1_der().unwrap().as_slice());
}

#[test]
fn export_overwrites_existing_artifact() {
    let issued = util::issue_localhost();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cert.pem");
    fs::write(&path, "stale contents that are longer than nothing").unwrap();

    export::write_file(&path, ExportFormat::PemPublicCertificate, &issued.cert, &issued.key, "")
        .unwrap();

    assert_eq!(
        fs::read(&path).unwrap(),
        export::encode(ExportFormat::PemPublicCertificate, &issued.cert, &issued.key, "").unwrap()
    );
}

#[cfg(unix)]
#[test]
fn export_sets_artifact_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let issued = util::issue_localhost();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("key.pem");
    fs::write(&path, "").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

    export::write_file(&path, ExportFormat::PemPrivateKey, &issued.cert, &issued.key, "").unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, export::ARTIFACT_MODE);
}

#[test]
fn export_with_unknown_format_touches_nothing() {
    let issued = util::issue_localhost();
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.der");
    let err = export::write_file(&missing, "der", &issued.cert, &issued.key, "").unwrap_err();
    assert!(matches!(err, CertError::UnsupportedEncoding(_)));
    assert!(!missing.exists());

    let existing = dir.path().join("existing.bin");
    fs::write(&existing, b"keep me").unwrap();
    let err = export::write_file(&existing, 7, &issued.cert, &issued.key, "").unwrap_err();
    assert!(matches!(err, CertError::UnsupportedEncoding(_)));
    assert_eq!(fs::read(&existing).unwrap(), b"keep me");
}
