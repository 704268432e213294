//! Station addresses.

use std::fmt;

/// 48-bit IEEE MAC address identifying a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Broadcast address.
    pub const BROADCAST: Self = Self([0xFF; 6]);

    /// Create an address from bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Locally administered address derived from a station index.
    pub const fn from_index(index: u32) -> Self {
        let b = index.to_be_bytes();
        Self([0x02, 0x00, b[0], b[1], b[2], b[3]])
    }

    /// Get the address bytes.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check for the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self::new(bytes)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(addr: MacAddress) -> [u8; 6] {
        addr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let addr = MacAddress::new([0x00, 0x1b, 0x2c, 0x3d, 0x4e, 0xff]);
        assert_eq!(addr.to_string(), "00:1b:2c:3d:4e:ff");
    }

    #[test]
    fn test_from_index_is_unique() {
        assert_ne!(MacAddress::from_index(1), MacAddress::from_index(2));
        assert!(!MacAddress::from_index(1).is_broadcast());
    }
}
