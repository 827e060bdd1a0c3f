//! CertificateStore/My/WSTEP/Renew: client-side renewal policy.
//!
//! Every field is its own node, read independently; a snapshot is not atomic.

use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::provisioning::{ProvisioningPath, Provisioner};

pub struct RenewalPolicy<'a, P: Provisioner + ?Sized> {
    prov: &'a P,
    root: ProvisioningPath,
}

/// Readable renewal-policy fields at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalPolicySnapshot {
    pub renew_period:              u32,
    pub server_url:                String,
    pub retry_interval:            u32,
    pub robo_support:              bool,
    pub status:                    u32,
    pub error_code:                u32,
    pub last_renewal_attempt_time: String,
    pub cert_thumbprint:           String,
}

impl<'a, P: Provisioner + ?Sized> RenewalPolicy<'a, P> {
    pub fn new(prov: &'a P, root: &str) -> Self {
        RenewalPolicy { prov, root: ProvisioningPath::root(root) }
    }

    fn node(&self, name: &str) -> ProvisioningPath { self.root.join(name) }

    /// Days before expiry at which renewal starts.
    pub fn renew_period(&self) -> Result<u32> { self.prov.get_uint(&self.node("RenewPeriod")) }

    pub fn server_url(&self) -> Result<String> { self.prov.get_string(&self.node("ServerURL")) }

    /// Minutes between failed renewal attempts.
    pub fn retry_interval(&self) -> Result<u32> { self.prov.get_uint(&self.node("RetryInterval")) }

    /// Renewal-on-behalf-of support.
    pub fn robo_support(&self) -> Result<bool> { self.prov.get_bool(&self.node("ROBOSupport")) }

    pub fn status(&self) -> Result<u32> { self.prov.get_uint(&self.node("Status")) }

    pub fn error_code(&self) -> Result<u32> { self.prov.get_uint(&self.node("ErrorCode")) }

    pub fn last_renewal_attempt_time(&self) -> Result<String> {
        self.prov.get_string(&self.node("LastRenewalAttemptTime"))
    }

    pub fn cert_thumbprint(&self) -> Result<String> {
        self.prov.get_string(&self.node("CertThumbprint"))
    }

    /// Trigger a renewal.  Returns once the request is accepted; completion is
    /// not observed.
    pub fn renew_now(&self) -> Result<()> {
        self.prov.exec(&self.node("RenewNow"))?;
        info!("certificate renewal requested");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<RenewalPolicySnapshot> {
        let snap = RenewalPolicySnapshot {
            renew_period:              self.renew_period()?,
            server_url:                self.server_url()?,
            retry_interval:            self.retry_interval()?,
            robo_support:              self.robo_support()?,
            status:                    self.status()?,
            error_code:                self.error_code()?,
            last_renewal_attempt_time: self.last_renewal_attempt_time()?,
            cert_thumbprint:           self.cert_thumbprint()?,
        };
        debug!("renewal policy: {snap:?}");
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DmError;
    use crate::provisioning::memory::MemoryProvisioner;

    const ROOT: &str = "./Vendor/MSFT/CertificateStore/My/WSTEP/Renew";

    fn populated() -> MemoryProvisioner {
        [
            ("RenewPeriod", "42"),
            ("ServerURL", "https://enroll.example.com/wstep"),
            ("RetryInterval", "7"),
            ("ROBOSupport", "true"),
            ("Status", "2"),
            ("ErrorCode", "0"),
            ("LastRenewalAttemptTime", "2026-10-01T08:30:00Z"),
            ("CertThumbprint", "0123ABCD"),
        ]
        .into_iter()
        .fold(MemoryProvisioner::new(), |p, (name, v)| p.with(&format!("{ROOT}/{name}"), v))
    }

    #[test]
    fn fields_read_from_fixed_suffixes() {
        let prov = populated();
        let policy = RenewalPolicy::new(&prov, ROOT);
        assert_eq!(policy.renew_period().unwrap(), 42);
        assert_eq!(policy.server_url().unwrap(), "https://enroll.example.com/wstep");
        assert_eq!(policy.retry_interval().unwrap(), 7);
        assert!(policy.robo_support().unwrap());
        assert_eq!(policy.cert_thumbprint().unwrap(), "0123ABCD");
    }

    #[test]
    fn snapshot_gathers_all_fields() {
        let prov = populated();
        let snap = RenewalPolicy::new(&prov, ROOT).snapshot().unwrap();
        assert_eq!(snap.status, 2);
        assert_eq!(snap.error_code, 0);
        assert_eq!(snap.last_renewal_attempt_time, "2026-10-01T08:30:00Z");
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["roboSupport"], true);
    }

    #[test]
    fn missing_field_propagates_store_error() {
        let prov = MemoryProvisioner::new();
        let policy = RenewalPolicy::new(&prov, ROOT);
        assert!(matches!(policy.status(), Err(DmError::Store { .. })));
        assert!(policy.snapshot().is_err());
    }

    #[test]
    fn renew_now_executes_node() {
        let prov = MemoryProvisioner::new();
        RenewalPolicy::new(&prov, ROOT).renew_now().unwrap();
        assert_eq!(prov.executed(), vec![format!("{ROOT}/RenewNow")]);
    }
}
