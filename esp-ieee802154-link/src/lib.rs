//! Single-frame [IEEE 802.15.4] link harness.
//!
//! Brings a radio from power-on to an addressable, channel-tuned state and
//! runs one of two roles on it:
//!
//! - the [`receiver`] enters continuous receive and logs every receive event,
//! - the [`sender`] transmits one fixed frame, signed with its own long
//!   address, once per period and logs the transmit outcomes.
//!
//! The radio itself sits behind the [`RadioDriver`] trait and reports events
//! through a [`RadioEventSink`], so everything here runs against a test
//! double as well as against the ESP32-C6/H2 driver used by the
//! `esp-ieee802154-demos` firmware.
//!
//! [IEEE 802.15.4]: https://en.wikipedia.org/wiki/IEEE_802.15.4
//!
//! ## Feature Flags
#![doc = document_features::document_features!()]
#![doc(html_logo_url = "https://avatars.githubusercontent.com/u/46717278")]
#![cfg_attr(not(test), no_std)]

pub use self::{
    address::{FactoryId, LongAddress, ShortAddressSetting, SHORT_ADDRESS_UNCONFIGURED},
    config::{ConfigError, RadioConfig},
    driver::{RadioDriver, RadioEventSink, RadioState},
    events::{EventJournal, RadioEvent, ReceiverEvents, SenderEvents},
    frame::{FrameBuilder, FrameError, WireFrame},
    receiver::{IdleSupervisor, Receiver},
    sender::{Sender, TransmitLoop},
    setup::{bring_up, bring_up_provisioned, configure, ConfiguredRadio, RadioIdentity},
    storage::{
        init_storage,
        load_or_provision,
        CalibrationData,
        CalibrationStorage,
        FlashCalibrationStorage,
        StorageError,
    },
};

mod fmt;

pub mod address;
pub mod config;
pub mod driver;
pub mod events;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod setup;
pub mod storage;

#[cfg(test)]
mod mock;

/// Link harness errors
///
/// `E` is the error type of the [`RadioDriver`] in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Persistent storage could not be brought up or read.
    Storage(StorageError),
    /// The configuration can't be applied.
    Config(ConfigError),
    /// The outgoing frame could not be built.
    Frame(FrameError),
    /// A radio driver call failed.
    Radio(E),
}

impl<E> core::fmt::Display for Error<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Storage(err) => write!(f, "Storage error: {err}"),
            Error::Config(err) => write!(f, "Configuration error: {err}"),
            Error::Frame(err) => write!(f, "Frame error: {err}"),
            Error::Radio(err) => write!(f, "Radio driver error: {err:?}"),
        }
    }
}

impl<E> core::error::Error for Error<E> where E: core::fmt::Debug {}

impl<E> From<StorageError> for Error<E> {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl<E> From<ConfigError> for Error<E> {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl<E> From<FrameError> for Error<E> {
    fn from(err: FrameError) -> Self {
        Error::Frame(err)
    }
}
