//! Port descriptions and enumeration.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// PortInfo
// ============================================================================

/// A port visible to the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    /// OS path or address of the port.
    pub path: String,
    /// USB vendor identifier, absent for non-USB ports.
    #[serde(default)]
    pub vendor_id: Option<u16>,
    /// USB product identifier.
    #[serde(default)]
    pub product_id: Option<u16>,
    /// Manufacturer string.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Serial number string.
    #[serde(default)]
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// Creates a port description with only a path.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the vendor identifier.
    #[inline]
    #[must_use]
    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    /// Sets the product identifier.
    #[inline]
    #[must_use]
    pub fn with_product_id(mut self, product_id: u16) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Returns `true` if the port reports a vendor identifier.
    #[inline]
    #[must_use]
    pub fn has_vendor_id(&self) -> bool {
        self.vendor_id.is_some()
    }
}

// ============================================================================
// PortEnumerator
// ============================================================================

/// Lists the ports a transport layer can see.
#[async_trait]
pub trait PortEnumerator: Send + Sync {
    /// Returns every visible port, in enumeration order.
    async fn list_ports(&self) -> Result<Vec<PortInfo>>;
}

/// Enumerator over a fixed, configured list.
#[derive(Debug, Clone, Default)]
pub struct StaticPorts(pub Vec<PortInfo>);

#[async_trait]
impl PortEnumerator for StaticPorts {
    async fn list_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_info_json() {
        let port: PortInfo =
            serde_json::from_str(r#"{"path":"/dev/ttyUSB0","vendorId":4292}"#).unwrap();
        assert_eq!(port.path, "/dev/ttyUSB0");
        assert_eq!(port.vendor_id, Some(0x10C4));
        assert!(port.has_vendor_id());
        assert!(port.product_id.is_none());
    }

    #[tokio::test]
    async fn test_static_ports() {
        let ports = StaticPorts(vec![PortInfo::new("/dev/ttyS0")]);
        let listed = ports.list_ports().await.unwrap();
        assert_eq!(listed, vec![PortInfo::new("/dev/ttyS0")]);
    }
}
