pub mod connection;
pub mod scanner;

#[cfg(test)]
pub mod mod_test;

use std::ffi::CString;
use std::fmt;

use hidapi::DeviceInfo;

/// HID usage pages that mark a device as generic input. Devices on any
/// other usage page are ignored during scanning.
pub const GENERIC_USAGE_PAGES: [u16; 2] = [0, 1];

/// Main properties of a USB Human Interface Device that are used to decide
/// whether the device is supported. Constructed fresh on every enumeration
/// pass and compared by value to deduplicate devices that show up under
/// multiple usage entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HidDescriptor {
    /// Platform path of the device, used to identify and open it
    pub path: CString,
    /// USB vendor id
    pub vid: u16,
    /// USB product id
    pub pid: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
}

impl HidDescriptor {
    /// Builds a descriptor from a [DeviceInfo] entry returned by HID
    /// enumeration. Missing string fields become empty strings.
    pub fn from_device_info(info: &DeviceInfo) -> Self {
        Self {
            path: info.path().to_owned(),
            vid: info.vendor_id(),
            pid: info.product_id(),
            manufacturer: info.manufacturer_string().unwrap_or_default().to_string(),
            product: info.product_string().unwrap_or_default().to_string(),
            serial_number: info.serial_number().unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for HidDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if !self.manufacturer.is_empty() {
            parts.push(self.manufacturer.clone());
        }
        if !self.product.is_empty() {
            parts.push(self.product.clone());
        }
        if !self.serial_number.is_empty() {
            parts.push(format!("(S/N: {})", self.serial_number));
        }
        if parts.is_empty() {
            write!(f, "unknown HID device")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}
