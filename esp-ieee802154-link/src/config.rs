use core::fmt;

use crate::address::ShortAddressSetting;

/// PAN ID shared by the receiver and the sender.
pub const DEFAULT_PAN_ID: u16 = 0x4242;

/// Channel both roles tune to.
pub const DEFAULT_CHANNEL: u8 = 11;

/// Short address the sender assigns itself.
pub const SENDER_SHORT_ADDRESS: u16 = 0x2323;

/// Lowest and highest channel of the 2.4 GHz O-QPSK PHY.
pub const MIN_CHANNEL: u8 = 11;
pub const MAX_CHANNEL: u8 = 26;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The channel is outside `11..=26`.
    InvalidChannel(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidChannel(channel) => write!(
                f,
                "Channel {channel} is outside {MIN_CHANNEL}..={MAX_CHANNEL}."
            ),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Radio link configuration, applied once at bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub pan_id: u16,
    pub channel: u8,
    pub coordinator: bool,
    /// Accept every frame regardless of addressing.
    pub promiscuous: bool,
    /// Keep the receiver on while no operation is pending.
    pub rx_when_idle: bool,
    pub short_address: ShortAddressSetting,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            pan_id: DEFAULT_PAN_ID,
            channel: DEFAULT_CHANNEL,
            coordinator: false,
            promiscuous: true,
            rx_when_idle: true,
            short_address: ShortAddressSetting::Unconfigured,
        }
    }
}

impl RadioConfig {
    /// Configuration used by the receiver role.
    pub fn receiver() -> Self {
        Self::default()
    }

    /// Configuration used by the sender role.
    pub fn sender() -> Self {
        Self {
            short_address: ShortAddressSetting::Fixed(SENDER_SHORT_ADDRESS),
            ..Self::default()
        }
    }

    pub fn with_pan_id(self, pan_id: u16) -> Self {
        Self { pan_id, ..self }
    }

    pub fn with_channel(self, channel: u8) -> Self {
        Self { channel, ..self }
    }

    /// Check the values a driver can't be asked to apply.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&self.channel) {
            return Err(ConfigError::InvalidChannel(self.channel));
        }

        Ok(())
    }
}
