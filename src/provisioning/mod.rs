//! Provisioning-path namespace and the primitives used to read and write it.
//!
//! Configuration nodes are addressed by `/`-separated paths rooted at fixed
//! prefixes such as `./Vendor/MSFT/CertificateStore`.  The engine that
//! executes the primitives lives outside this crate; [`Provisioner`] is the
//! seam, [`command::CommandProvisioner`] the shipped backend.

pub mod command;
#[cfg(test)]
pub mod memory;

use crate::error::Result;

pub const SEPARATOR: char = '/';

/// A fully composed provisioning path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProvisioningPath(String);

impl ProvisioningPath {
    /// Start a path at a namespace root.  Trailing separators are dropped.
    pub fn root(root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with(SEPARATOR) {
            root.pop();
        }
        ProvisioningPath(root)
    }

    /// Append one segment.  A separator (or escape character) inside the
    /// segment is percent-escaped so it can never open a new level.
    pub fn join(&self, segment: &str) -> Self {
        let mut path = String::with_capacity(self.0.len() + segment.len() + 1);
        path.push_str(&self.0);
        path.push(SEPARATOR);
        for ch in segment.chars() {
            match ch {
                '%'       => path.push_str("%25"),
                SEPARATOR => path.push_str("%2F"),
                c         => path.push(c),
            }
        }
        ProvisioningPath(path)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for ProvisioningPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Get / add / delete / exec primitives of the provisioning engine.
///
/// Every call is a blocking round-trip; failures are reported as
/// [`crate::error::DmError::Store`] and never retried.
pub trait Provisioner {
    fn get_string(&self, path: &ProvisioningPath) -> Result<String>;
    fn get_uint(&self, path: &ProvisioningPath) -> Result<u32>;
    fn get_bool(&self, path: &ProvisioningPath) -> Result<bool>;
    fn add_data(&self, path: &ProvisioningPath, value: &str) -> Result<()>;
    fn delete(&self, path: &ProvisioningPath) -> Result<()>;
    fn exec(&self, path: &ProvisioningPath) -> Result<()>;
}
