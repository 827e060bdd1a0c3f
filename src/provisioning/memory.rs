//! In-memory provisioning store used by unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{DmError, Result};

use super::{ProvisioningPath, Provisioner};

const NOT_FOUND: i32 = 404;

#[derive(Debug, Default)]
pub struct MemoryProvisioner {
    nodes:    RefCell<BTreeMap<String, String>>,
    executed: RefCell<Vec<String>>,
}

impl MemoryProvisioner {
    pub fn new() -> Self { Self::default() }

    pub fn with(self, path: &str, value: &str) -> Self {
        self.nodes.borrow_mut().insert(path.to_string(), value.to_string());
        self
    }

    pub fn value(&self, path: &str) -> Option<String> {
        self.nodes.borrow().get(path).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    fn missing(path: &ProvisioningPath) -> DmError {
        DmError::Store { path: path.to_string(), code: NOT_FOUND, message: "node not found".into() }
    }
}

impl Provisioner for MemoryProvisioner {
    fn get_string(&self, path: &ProvisioningPath) -> Result<String> {
        self.value(path.as_str()).ok_or_else(|| Self::missing(path))
    }

    fn get_uint(&self, path: &ProvisioningPath) -> Result<u32> {
        let raw = self.get_string(path)?;
        raw.parse().map_err(|_| DmError::Store {
            path:    path.to_string(),
            code:    -1,
            message: format!("not an integer: {raw}"),
        })
    }

    fn get_bool(&self, path: &ProvisioningPath) -> Result<bool> {
        Ok(self.get_string(path)? == "true")
    }

    fn add_data(&self, path: &ProvisioningPath, value: &str) -> Result<()> {
        self.nodes.borrow_mut().insert(path.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, path: &ProvisioningPath) -> Result<()> {
        let prefix = format!("{path}/");
        let mut nodes = self.nodes.borrow_mut();
        let before = nodes.len();
        nodes.retain(|k, _| k != path.as_str() && !k.starts_with(&prefix));
        if nodes.len() == before {
            return Err(Self::missing(path));
        }
        Ok(())
    }

    fn exec(&self, path: &ProvisioningPath) -> Result<()> {
        self.executed.borrow_mut().push(path.to_string());
        Ok(())
    }
}
