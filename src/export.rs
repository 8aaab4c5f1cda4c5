//! Serialization of a certificate and its key into the supported artifact
//! encodings, and persisting the result.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::cert::Certificate;
use crate::error::{CertError, Result};
use crate::key::KeyPair;

/// Password commonly used for PKCS#12 bundles when none is chosen.
pub const DEFAULT_PKCS12_PASSWORD: &str = "changeit";

/// Unix permission bits of written artifacts.
pub const ARTIFACT_MODE: u32 = 0o644;

/// Artifact encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// The certificate in a PEM `CERTIFICATE` block.
    PemPublicCertificate,
    /// The PKCS#1 private key in a PEM `RSA PRIVATE KEY` block.
    PemPrivateKey,
    /// Password protected PKCS#12 bundle holding key and certificate.
    Pkcs12,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::PemPublicCertificate => write!(f, "PEM certificate"),
            ExportFormat::PemPrivateKey => write!(f, "PEM private key"),
            ExportFormat::Pkcs12 => write!(f, "PKCS#12"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pem" | "cert" | "crt" | "certificate" | "pem-public" => {
                Ok(ExportFormat::PemPublicCertificate)
            }
            "key" | "private-key" | "pem-private" => Ok(ExportFormat::PemPrivateKey),
            "pfx" | "p12" | "pkcs12" => Ok(ExportFormat::Pkcs12),
            other => Err(CertError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl TryFrom<&str> for ExportFormat {
    type Error = CertError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Numeric selectors: 0 certificate PEM, 1 private key PEM, 2 PKCS#12.
impl TryFrom<i32> for ExportFormat {
    type Error = CertError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(ExportFormat::PemPublicCertificate),
            1 => Ok(ExportFormat::PemPrivateKey),
            2 => Ok(ExportFormat::Pkcs12),
            other => Err(CertError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Encodes `cert` and `key` as `format`. `password` is only used for
/// PKCS#12.
pub fn encode(
    format: ExportFormat,
    cert: &Certificate,
    key: &KeyPair,
    password: &str,
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::PemPublicCertificate => {
            Ok(der_to_pem(&cert.to_der()?, "CERTIFICATE").into_bytes())
        }
        ExportFormat::PemPrivateKey => {
            Ok(der_to_pem(&key.to_pkcs1_der()?, "RSA PRIVATE KEY").into_bytes())
        }
        ExportFormat::Pkcs12 => encode_pkcs12(cert, key, password),
    }
}

/// Encodes and writes an artifact to `path`, creating or replacing it.
///
/// `format` may be an [`ExportFormat`] or a raw selector (`&str` or `i32`).
/// An unsupported selector fails before `path` is touched. A failed write may
/// leave a partial file behind.
pub fn write_file<F>(
    path: impl AsRef<Path>,
    format: F,
    cert: &Certificate,
    key: &KeyPair,
    password: &str,
) -> Result<()>
where
    F: TryInto<ExportFormat>,
    CertError: From<F::Error>,
{
    let path = path.as_ref();
    let format = format.try_into()?;
    let bytes = encode(format, cert, key, password)?;

    debug!(path = %path.display(), %format, len = bytes.len(), "writing artifact");
    write_artifact(path, &bytes)?;
    info!(path = %path.display(), %format, "exported certificate artifact");
    Ok(())
}

fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

fn encode_pkcs12(cert: &Certificate, key: &KeyPair, password: &str) -> Result<Vec<u8>> {
    let cert_der = cert.to_der()?;
    let key_der = key.to_pkcs8_der()?;
    let friendly_name = cert.subject()?.common_name;

    let pfx = p12::PFX::new(&cert_der, &key_der, None, password, &friendly_name)
        .ok_or_else(|| CertError::EncodingError("failed to build PKCS#12 bundle".to_string()))?;
    Ok(pfx.to_der())
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(ARTIFACT_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(ARTIFACT_MODE))?;
    }

    Ok(())
}
