//! Device addressing: the factory identifier, the 64-bit long address derived
//! from it, and the short address choices.

use core::fmt;

use ieee802154::mac::{ExtendedAddress, ShortAddress};

/// Short address meaning "no short address assigned".
pub const SHORT_ADDRESS_UNCONFIGURED: u16 = 0xfffe;

/// Short address every device in the PAN accepts.
pub const BROADCAST_SHORT_ADDRESS: u16 = 0xffff;

/// Padding appended to the factory identifier to form the long address.
pub const LONG_ADDRESS_PADDING: [u8; 2] = [0xff, 0xfe];

/// The 6-byte factory-unique value stored with the calibration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FactoryId(pub [u8; 6]);

impl FactoryId {
    /// The long address this identifier expands to.
    pub const fn long_address(&self) -> LongAddress {
        let id = self.0;
        LongAddress([
            id[0],
            id[1],
            id[2],
            id[3],
            id[4],
            id[5],
            LONG_ADDRESS_PADDING[0],
            LONG_ADDRESS_PADDING[1],
        ])
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_colon_hex(f, &self.0)
    }
}

/// A 64-bit IEEE 802.15.4 extended address, most significant byte first.
///
/// On air the address is sent least significant byte first, so byte 0 ends up
/// last in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LongAddress(pub [u8; 8]);

impl LongAddress {
    /// The address as the big-endian integer form used by the drivers.
    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    pub const fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<LongAddress> for ExtendedAddress {
    fn from(address: LongAddress) -> Self {
        ExtendedAddress(address.to_u64())
    }
}

impl From<ExtendedAddress> for LongAddress {
    fn from(address: ExtendedAddress) -> Self {
        LongAddress::from_u64(address.0)
    }
}

impl fmt::Display for LongAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_colon_hex(f, &self.0)
    }
}

/// How the short address gets chosen during configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShortAddressSetting {
    /// Leave the device without a short address ([`SHORT_ADDRESS_UNCONFIGURED`]).
    #[default]
    Unconfigured,
    /// Use a fixed short address.
    Fixed(u16),
}

impl ShortAddressSetting {
    pub const fn value(self) -> u16 {
        match self {
            ShortAddressSetting::Unconfigured => SHORT_ADDRESS_UNCONFIGURED,
            ShortAddressSetting::Fixed(address) => address,
        }
    }
}

impl From<ShortAddressSetting> for ShortAddress {
    fn from(setting: ShortAddressSetting) -> Self {
        ShortAddress(setting.value())
    }
}

fn write_colon_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}
