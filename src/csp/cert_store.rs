//! CertificateStore CSP: system certificate groups.
//!
//! Layout under the store root:
//!
//! ```text
//! {root}/{subPath}/System                         hash listing
//! {root}/{subPath}/System/{hash}                  one certificate
//! {root}/{subPath}/System/{hash}/EncodedCertificate
//! {root}/{subPath}/System/{hash}/IssuedBy ...
//! ```

use base64::Engine as _;
use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::provisioning::{ProvisioningPath, Provisioner};

/// Accessor for the certificate store namespace.
pub struct CertificateStore<'a, P: Provisioner + ?Sized> {
    prov: &'a P,
    root: ProvisioningPath,
}

impl<'a, P: Provisioner + ?Sized> CertificateStore<'a, P> {
    pub fn new(prov: &'a P, root: &str) -> Self {
        CertificateStore { prov, root: ProvisioningPath::root(root) }
    }

    fn system(&self, sub_path: &str) -> ProvisioningPath {
        self.root.join(sub_path).join("System")
    }

    fn certificate(&self, sub_path: &str, hash: &str) -> ProvisioningPath {
        self.system(sub_path).join(hash)
    }

    /// Raw hash listing of the `System` node, in the store's own delimiter
    /// format.
    pub fn system_cert_hashes(&self, sub_path: &str) -> Result<String> {
        let path = self.system(sub_path);
        let hashes = self.prov.get_string(&path)?;
        debug!("{sub_path} system hashes = {hashes}");
        Ok(hashes)
    }

    /// Install a base64 encoded certificate.  The payload is handed to the
    /// store as-is; a malformed one fails there.
    pub fn add_system_certificate(&self, sub_path: &str, hash: &str, cert_base64: &str) -> Result<()> {
        let path = self.certificate(sub_path, hash).join("EncodedCertificate");
        self.prov.add_data(&path, cert_base64)?;
        info!("certificate {hash} added to {sub_path}");
        Ok(())
    }

    /// Remove a certificate.  Deleting an unknown hash fails with the store's
    /// not-found error.
    pub fn delete_system_certificate(&self, sub_path: &str, hash: &str) -> Result<()> {
        self.prov.delete(&self.certificate(sub_path, hash))?;
        info!("certificate {hash} deleted from {sub_path}");
        Ok(())
    }

    /// Bind a [`CertificateInfo`] to the certificate's node.  Nothing is read
    /// until a field is requested.
    pub fn system_certificate_info(&self, sub_path: &str, hash: &str) -> CertificateInfo<'a, P> {
        CertificateInfo { prov: self.prov, path: self.certificate(sub_path, hash) }
    }
}

// ── CertificateInfo ───────────────────────────────────────────────────────────

/// Lazily resolved metadata of one stored certificate.
pub struct CertificateInfo<'a, P: Provisioner + ?Sized> {
    prov: &'a P,
    path: ProvisioningPath,
}

/// Point-in-time copy of every [`CertificateInfo`] field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDetails {
    pub path:                String,
    pub encoded_certificate: String,
    pub issued_by:           String,
    pub issued_to:           String,
    pub valid_from:          String,
    pub valid_to:            String,
    pub template_name:       String,
}

impl<P: Provisioner + ?Sized> CertificateInfo<'_, P> {
    pub fn path(&self) -> &ProvisioningPath { &self.path }

    fn field(&self, name: &str) -> Result<String> {
        self.prov.get_string(&self.path.join(name))
    }

    pub fn encoded_certificate(&self) -> Result<String> { self.field("EncodedCertificate") }
    pub fn issued_by(&self) -> Result<String>           { self.field("IssuedBy") }
    pub fn issued_to(&self) -> Result<String>           { self.field("IssuedTo") }
    pub fn valid_from(&self) -> Result<String>          { self.field("ValidFrom") }
    pub fn valid_to(&self) -> Result<String>            { self.field("ValidTo") }
    pub fn template_name(&self) -> Result<String>       { self.field("TemplateName") }

    /// Read every field, one store round-trip each.
    pub fn fetch(&self) -> Result<CertificateDetails> {
        Ok(CertificateDetails {
            path:                self.path().to_string(),
            encoded_certificate: self.encoded_certificate()?,
            issued_by:           self.issued_by()?,
            issued_to:           self.issued_to()?,
            valid_from:          self.valid_from()?,
            valid_to:            self.valid_to()?,
            template_name:       self.template_name()?,
        })
    }
}

// ── Payload helpers ───────────────────────────────────────────────────────────

/// Turn certificate file contents into the base64 payload the store expects.
///
/// PEM input keeps its base64 body with the armour lines removed; anything
/// else is treated as DER and encoded.
pub fn certificate_payload(contents: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(contents) {
        if text.trim_start().starts_with("-----BEGIN") {
            return text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with("-----"))
                .collect();
        }
    }
    base64::engine::general_purpose::STANDARD.encode(contents)
}
