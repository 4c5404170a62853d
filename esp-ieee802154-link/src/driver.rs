//! The seams between the link harness and a concrete radio.
//!
//! [`RadioDriver`] is what the bring-up and both roles drive; [`RadioEventSink`]
//! is what a driver calls back into when something happens on air.

use core::fmt;

use ieee802154::mac::{ExtendedAddress, PanId, ShortAddress};

/// Device state as reported by the radio driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    Disabled,
    Idle,
    Sleep,
    Receive,
    TxAck,
    TxCca,
    Transmit,
    RxAck,
    EnergyDetect,
    Cca,
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioState::Disabled => "disabled",
            RadioState::Idle => "idle",
            RadioState::Sleep => "sleep",
            RadioState::Receive => "receive",
            RadioState::TxAck => "tx ack",
            RadioState::TxCca => "tx cca",
            RadioState::Transmit => "transmit",
            RadioState::RxAck => "rx ack",
            RadioState::EnergyDetect => "energy detect",
            RadioState::Cca => "cca",
        };
        f.write_str(name)
    }
}

/// Callbacks raised by a radio driver.
///
/// Drivers may call these from interrupt context, so implementations must not
/// block. Every method defaults to doing nothing; a role only overrides the
/// events it cares about.
pub trait RadioEventSink {
    /// A frame was received. `frame[0]` is the PSDU length.
    fn receive_done(&self, frame: &[u8]) {
        let _ = frame;
    }

    /// Reception was aborted.
    fn receive_failed(&self, error: u16) {
        let _ = error;
    }

    /// A start-of-frame delimiter was detected while receiving.
    fn receive_sfd_done(&self, state: RadioState) {
        let _ = state;
    }

    /// `frame` went out. `ack` holds the acknowledgement frame if one came
    /// back.
    fn transmit_done(&self, frame: &[u8], ack: Option<&[u8]>) {
        let _ = (frame, ack);
    }

    /// Transmitting `frame` failed.
    fn transmit_failed(&self, frame: &[u8], error: u16) {
        let _ = (frame, error);
    }

    /// The start-of-frame delimiter of `frame` went out.
    fn transmit_sfd_done(&self, frame: &[u8]) {
        let _ = frame;
    }
}

/// The radio operations used during bring-up and by the two roles.
pub trait RadioDriver {
    type Error: fmt::Debug;

    /// Power up the radio.
    fn enable(&mut self) -> Result<(), Self::Error>;

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), Self::Error>;

    fn set_rx_when_idle(&mut self, enable: bool) -> Result<(), Self::Error>;

    fn set_pan_id(&mut self, pan_id: PanId) -> Result<(), Self::Error>;

    fn set_coordinator(&mut self, enable: bool) -> Result<(), Self::Error>;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error>;

    fn set_extended_address(&mut self, address: ExtendedAddress) -> Result<(), Self::Error>;

    fn set_short_address(&mut self, address: ShortAddress) -> Result<(), Self::Error>;

    fn pan_id(&self) -> PanId;

    fn channel(&self) -> u8;

    fn extended_address(&self) -> ExtendedAddress;

    fn short_address(&self) -> ShortAddress;

    fn state(&self) -> RadioState;

    /// Enter continuous receive.
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Submit a frame for transmission. `frame[0]` is the PSDU length and the
    /// PSDU follows it.
    fn transmit(&mut self, frame: &[u8], cca: bool) -> Result<(), Self::Error>;

    /// Route every future event to `sink`.
    fn register_sink(&mut self, sink: &'static (dyn RadioEventSink + Sync));

    /// Hand queued events over to the registered sink.
    ///
    /// Drivers that call the sink straight from their interrupt handler have
    /// nothing to do here.
    fn poll(&mut self) {}
}
