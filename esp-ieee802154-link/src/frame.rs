//! Building raw IEEE 802.15.4 frames.
//!
//! A [`WireFrame`] is laid out the way the radio consumes it: one length byte
//! (the PSDU length, including the 2-byte FCS) followed by the PSDU itself.

use core::fmt;

use byte::BytesExt;
use ieee802154::mac::{
    self,
    Address,
    FooterMode,
    FrameContent,
    FrameSerDesContext,
    FrameType,
    FrameVersion,
    Header,
    PanId,
    ShortAddress,
};

use crate::address::LongAddress;

/// Length byte plus the largest PSDU plus one spare byte, as the driver's
/// transmit buffer.
pub const FRAME_SIZE: usize = 129;

/// Largest PSDU the PHY carries.
pub const MAX_PSDU_LEN: usize = 127;

/// Length of the frame check sequence at the end of every PSDU.
pub const FCS_LEN: usize = 2;

const FRAME_AR_BIT: u8 = 0x20;

/// Frame building errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The PSDU would exceed 127 bytes.
    TooLong,
    /// The header could not be encoded.
    Encoding,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooLong => write!(f, "Frame exceeds {MAX_PSDU_LEN} bytes."),
            FrameError::Encoding => write!(f, "Frame header could not be encoded."),
        }
    }
}

impl core::error::Error for FrameError {}

impl From<byte::Error> for FrameError {
    fn from(err: byte::Error) -> Self {
        match err {
            byte::Error::Incomplete | byte::Error::BadOffset(_) => FrameError::TooLong,
            byte::Error::BadInput { .. } => FrameError::Encoding,
        }
    }
}

/// Builds a data frame field by field.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder<'p> {
    header: Header,
    payload: &'p [u8],
}

impl<'p> FrameBuilder<'p> {
    /// An IEEE 802.15.4-2003 data frame with sequence number 0, no addressing,
    /// no acknowledgement request and no payload.
    pub fn data() -> Self {
        Self {
            header: Header {
                frame_type: FrameType::Data,
                frame_pending: false,
                ack_request: false,
                pan_id_compress: false,
                seq_no_suppress: false,
                ie_present: false,
                version: FrameVersion::Ieee802154_2003,
                seq: 0,
                destination: None,
                source: None,
                auxiliary_security_header: None,
            },
            payload: &[],
        }
    }

    pub fn sequence_number(mut self, seq: u8) -> Self {
        self.header.seq = seq;
        self
    }

    pub fn ack_request(mut self, ack_request: bool) -> Self {
        self.header.ack_request = ack_request;
        self
    }

    /// Address the frame to a short address in `pan_id`.
    pub fn destination(mut self, pan_id: u16, address: u16) -> Self {
        self.header.destination = Some(Address::Short(PanId(pan_id), ShortAddress(address)));
        self
    }

    /// Sign the frame with the sender's long address. The PAN ID is carried
    /// in full, not compressed.
    pub fn source(mut self, pan_id: u16, address: LongAddress) -> Self {
        self.header.source = Some(Address::Extended(PanId(pan_id), address.into()));
        self
    }

    pub fn payload(mut self, payload: &'p [u8]) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize into the radio's buffer layout. The FCS is left zeroed for
    /// the hardware to fill in.
    pub fn build(&self) -> Result<WireFrame, FrameError> {
        let frame = mac::Frame {
            header: self.header,
            content: FrameContent::Data,
            payload: self.payload,
            footer: [0u8; FCS_LEN],
        };

        let mut buffer = [0u8; FRAME_SIZE];
        let mut offset = 1usize;
        buffer.write_with(
            &mut offset,
            frame,
            &mut FrameSerDesContext::no_security(FooterMode::Explicit),
        )?;

        let psdu_len = offset - 1;
        if psdu_len > MAX_PSDU_LEN {
            return Err(FrameError::TooLong);
        }
        buffer[0] = psdu_len as u8;

        Ok(WireFrame { buffer })
    }
}

/// A serialized frame, prefixed by its PSDU length
#[derive(Clone, PartialEq, Eq)]
pub struct WireFrame {
    buffer: [u8; FRAME_SIZE],
}

impl WireFrame {
    /// PSDU length, as carried in byte 0.
    pub fn psdu_len(&self) -> usize {
        self.buffer[0] as usize
    }

    /// Length byte followed by the PSDU; what the driver transmits.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..1 + self.psdu_len()]
    }

    pub fn psdu(&self) -> &[u8] {
        &self.buffer[1..][..self.psdu_len()]
    }

    pub fn is_ack_required(&self) -> bool {
        frame_is_ack_required(self.psdu())
    }
}

impl fmt::Debug for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireFrame({:02x?})", self.as_bytes())
    }
}

/// Whether the frame control field of `psdu` asks for an acknowledgement.
pub fn frame_is_ack_required(psdu: &[u8]) -> bool {
    psdu.first().is_some_and(|fc| (fc & FRAME_AR_BIT) != 0)
}
