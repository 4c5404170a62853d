//! The sender role: one fixed frame, submitted once per period.

use embedded_hal::delay::DelayNs;

use crate::{
    address::BROADCAST_SHORT_ADDRESS,
    driver::{RadioDriver, RadioEventSink},
    frame::{FrameBuilder, FrameError, WireFrame},
    setup::{ConfiguredRadio, RadioIdentity},
    Error,
};

/// Time between two transmissions.
pub const TRANSMIT_PERIOD_MS: u32 = 1000;

/// Payload of the frame the sender repeats.
pub const DEMO_PAYLOAD: &[u8; 84] =
    b"IEEE 802.15.4 link harness: fixed demo frame transmitted once per second on PAN 4242";

/// The sender's frame: a broadcast data frame in its own PAN, signed with its
/// long address, carrying [`DEMO_PAYLOAD`].
pub fn demo_frame(identity: &RadioIdentity) -> Result<WireFrame, FrameError> {
    FrameBuilder::data()
        .destination(identity.pan_id, BROADCAST_SHORT_ADDRESS)
        .source(identity.pan_id, identity.long_address)
        .payload(DEMO_PAYLOAD)
        .build()
}

/// Fixed-period transmit cadence.
///
/// Each cycle submits the frame and then sleeps for the period. Completion
/// is reported to the event sink; the cycle neither waits for nor looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitLoop {
    period_ms: u32,
}

impl Default for TransmitLoop {
    fn default() -> Self {
        Self::new(TRANSMIT_PERIOD_MS)
    }
}

impl TransmitLoop {
    pub const fn new(period_ms: u32) -> Self {
        Self { period_ms }
    }

    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Submit `frame` once, then wait one period.
    ///
    /// A rejected submission is returned after the wait; the next cycle just
    /// tries again.
    pub fn cycle<R, D>(
        &self,
        radio: &mut R,
        frame: &WireFrame,
        delay: &mut D,
    ) -> Result<(), R::Error>
    where
        R: RadioDriver,
        D: DelayNs,
    {
        radio.poll();

        let result = radio.transmit(frame.as_bytes(), false);
        match result {
            Ok(()) => trace!("Submitted {} byte frame", frame.psdu_len()),
            Err(_) => warn!("Radio rejected the frame, retrying next period"),
        }

        delay.delay_ms(self.period_ms);
        result
    }
}

/// A radio repeating one frame
pub struct Sender<R> {
    radio: ConfiguredRadio<R>,
    frame: WireFrame,
    transmit_loop: TransmitLoop,
}

impl<R> Sender<R>
where
    R: RadioDriver,
{
    /// Route events to `sink` and prepare [`demo_frame`] for this radio.
    pub fn new(
        mut radio: ConfiguredRadio<R>,
        sink: &'static (dyn RadioEventSink + Sync),
    ) -> Result<Self, Error<R::Error>> {
        let frame = demo_frame(radio.identity())?;
        radio.radio_mut().register_sink(sink);

        info!("Sender ready, {}", radio.identity());
        debug!(
            "Frame of {} bytes, ack requested: {}",
            frame.psdu_len(),
            frame.is_ack_required()
        );

        Ok(Self {
            radio,
            frame,
            transmit_loop: TransmitLoop::default(),
        })
    }

    /// Repeat `frame` instead of the demo frame.
    pub fn with_frame(self, frame: WireFrame) -> Self {
        Self { frame, ..self }
    }

    pub fn with_transmit_loop(self, transmit_loop: TransmitLoop) -> Self {
        Self {
            transmit_loop,
            ..self
        }
    }

    pub fn frame(&self) -> &WireFrame {
        &self.frame
    }

    pub fn identity(&self) -> &RadioIdentity {
        self.radio.identity()
    }

    pub fn radio_mut(&mut self) -> &mut R {
        self.radio.radio_mut()
    }

    /// One transmit period.
    pub fn cycle<D>(&mut self, delay: &mut D) -> Result<(), R::Error>
    where
        D: DelayNs,
    {
        self.transmit_loop
            .cycle(self.radio.radio_mut(), &self.frame, delay)
    }

    /// Transmit forever.
    pub fn run<D>(mut self, delay: &mut D) -> !
    where
        D: DelayNs,
    {
        loop {
            // Rejections are logged by the loop and retried next period.
            let _ = self.cycle(delay);
        }
    }
}
