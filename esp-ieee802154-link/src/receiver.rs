//! The receiver role: continuous receive, everything else happens in the
//! event sink.

use embedded_hal::delay::DelayNs;

use crate::{
    driver::{RadioDriver, RadioEventSink},
    setup::{ConfiguredRadio, RadioIdentity},
    Error,
};

/// How long the idle loop sleeps between polls.
pub const IDLE_PERIOD_MS: u32 = 10;

/// Keeps the main context alive while the driver and the sink do the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSupervisor {
    period_ms: u32,
}

impl Default for IdleSupervisor {
    fn default() -> Self {
        Self::new(IDLE_PERIOD_MS)
    }
}

impl IdleSupervisor {
    pub const fn new(period_ms: u32) -> Self {
        Self { period_ms }
    }

    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Forward pending driver events, then yield for one period.
    pub fn tick<R, D>(&self, radio: &mut R, delay: &mut D)
    where
        R: RadioDriver,
        D: DelayNs,
    {
        radio.poll();
        delay.delay_ms(self.period_ms);
    }
}

/// A radio in continuous receive
pub struct Receiver<R> {
    radio: ConfiguredRadio<R>,
    supervisor: IdleSupervisor,
}

impl<R> Receiver<R>
where
    R: RadioDriver,
{
    /// Route events to `sink` and start receiving.
    pub fn start(
        mut radio: ConfiguredRadio<R>,
        sink: &'static (dyn RadioEventSink + Sync),
    ) -> Result<Self, Error<R::Error>> {
        radio.radio_mut().register_sink(sink);
        radio.radio_mut().start_receive().map_err(Error::Radio)?;

        info!("Receiver ready, {}", radio.identity());

        Ok(Self {
            radio,
            supervisor: IdleSupervisor::default(),
        })
    }

    pub fn with_supervisor(self, supervisor: IdleSupervisor) -> Self {
        Self { supervisor, ..self }
    }

    pub fn identity(&self) -> &RadioIdentity {
        self.radio.identity()
    }

    pub fn radio_mut(&mut self) -> &mut R {
        self.radio.radio_mut()
    }

    /// One idle period.
    pub fn tick<D>(&mut self, delay: &mut D)
    where
        D: DelayNs,
    {
        self.supervisor.tick(self.radio.radio_mut(), delay);
    }

    /// Idle forever; all further work happens in the event sink.
    pub fn run<D>(mut self, delay: &mut D) -> !
    where
        D: DelayNs,
    {
        loop {
            self.tick(delay);
        }
    }
}
