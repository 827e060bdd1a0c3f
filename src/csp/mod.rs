//! Configuration service providers reached through provisioning paths.
//!
//! Each sub-module wraps one namespace of the provisioning store, composing
//! paths under a root injected from [`crate::config::DmConfig`].

pub mod cert_store;
pub mod wstep;

pub use cert_store::CertificateStore;
pub use wstep::RenewalPolicy;
