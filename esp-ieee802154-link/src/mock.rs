//! Test doubles for the storage, radio and delay seams.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, vec::Vec};

use embedded_hal::delay::DelayNs;
use ieee802154::mac::{ExtendedAddress, PanId, ShortAddress};

use crate::{
    driver::{RadioDriver, RadioEventSink, RadioState},
    storage::{CalibrationData, CalibrationStorage, StorageError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StorageInit,
    StorageErase,
    StorageLoad,
    StorageStore,
    Enable,
    SetPromiscuous(bool),
    SetRxWhenIdle(bool),
    SetPanId(u16),
    SetCoordinator(bool),
    SetChannel(u8),
    SetExtendedAddress(u64),
    SetShortAddress(u16),
    StartReceive,
    Transmit(Vec<u8>),
    RegisterSink,
}

impl Call {
    pub fn is_radio(&self) -> bool {
        !matches!(
            self,
            Call::StorageInit | Call::StorageErase | Call::StorageLoad | Call::StorageStore
        )
    }
}

/// Calls shared between the doubles, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn transmissions(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Transmit(_)))
            .count()
    }
}

pub struct MockStorage {
    log: CallLog,
    init_results: VecDeque<Result<(), StorageError>>,
    calibration: Result<CalibrationData, StorageError>,
}

impl MockStorage {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            init_results: VecDeque::new(),
            calibration: Err(StorageError::NotFound),
        }
    }

    /// Results of successive `init` calls; `Ok` once they run out.
    pub fn with_init_results(
        mut self,
        results: impl IntoIterator<Item = Result<(), StorageError>>,
    ) -> Self {
        self.init_results = results.into_iter().collect();
        self
    }

    pub fn with_calibration(mut self, data: CalibrationData) -> Self {
        self.calibration = Ok(data);
        self
    }
}

impl CalibrationStorage for MockStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        self.log.push(Call::StorageInit);
        self.init_results.pop_front().unwrap_or(Ok(()))
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.log.push(Call::StorageErase);
        Ok(())
    }

    fn load_calibration(&mut self) -> Result<CalibrationData, StorageError> {
        self.log.push(Call::StorageLoad);
        self.calibration
    }

    fn store_calibration(&mut self, data: &CalibrationData) -> Result<(), StorageError> {
        self.log.push(Call::StorageStore);
        self.calibration = Ok(*data);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub &'static str);

pub struct MockRadio {
    log: CallLog,
    fail_at: Option<&'static str>,
    rejected_transmissions: usize,
    complete_transmissions: bool,
    pending_rx: VecDeque<Vec<u8>>,
    sink: Option<&'static (dyn RadioEventSink + Sync)>,
    state: RadioState,
    rx_when_idle: bool,
    pan_id: u16,
    channel: u8,
    extended_address: u64,
    short_address: u16,
}

impl MockRadio {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_at: None,
            rejected_transmissions: 0,
            complete_transmissions: false,
            pending_rx: VecDeque::new(),
            sink: None,
            state: RadioState::Disabled,
            rx_when_idle: false,
            pan_id: 0,
            channel: 11,
            extended_address: u64::MAX,
            short_address: 0,
        }
    }

    /// Make the named operation fail.
    pub fn failing_at(mut self, operation: &'static str) -> Self {
        self.fail_at = Some(operation);
        self
    }

    /// Reject the next `count` transmissions.
    pub fn rejecting_transmissions(mut self, count: usize) -> Self {
        self.rejected_transmissions = count;
        self
    }

    /// Report every accepted transmission as done right away.
    pub fn completing_transmissions(mut self) -> Self {
        self.complete_transmissions = true;
        self
    }

    /// Queue a frame to be handed to the sink on the next poll.
    pub fn queue_received(&mut self, frame: &[u8]) {
        self.pending_rx.push_back(frame.to_vec());
    }

    pub fn sink(&self) -> Option<&'static (dyn RadioEventSink + Sync)> {
        self.sink
    }

    fn call(&mut self, operation: &'static str, call: Call) -> Result<(), MockError> {
        if self.fail_at == Some(operation) {
            return Err(MockError(operation));
        }
        self.log.push(call);
        Ok(())
    }
}

impl RadioDriver for MockRadio {
    type Error = MockError;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.call("enable", Call::Enable)?;
        self.state = RadioState::Idle;
        Ok(())
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.call("set_promiscuous", Call::SetPromiscuous(enable))
    }

    fn set_rx_when_idle(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.call("set_rx_when_idle", Call::SetRxWhenIdle(enable))?;
        self.rx_when_idle = enable;
        Ok(())
    }

    fn set_pan_id(&mut self, pan_id: PanId) -> Result<(), Self::Error> {
        self.call("set_pan_id", Call::SetPanId(pan_id.0))?;
        self.pan_id = pan_id.0;
        Ok(())
    }

    fn set_coordinator(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.call("set_coordinator", Call::SetCoordinator(enable))
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        self.call("set_channel", Call::SetChannel(channel))?;
        self.channel = channel;
        Ok(())
    }

    fn set_extended_address(&mut self, address: ExtendedAddress) -> Result<(), Self::Error> {
        self.call("set_extended_address", Call::SetExtendedAddress(address.0))?;
        self.extended_address = address.0;
        Ok(())
    }

    fn set_short_address(&mut self, address: ShortAddress) -> Result<(), Self::Error> {
        self.call("set_short_address", Call::SetShortAddress(address.0))?;
        self.short_address = address.0;
        Ok(())
    }

    fn pan_id(&self) -> PanId {
        PanId(self.pan_id)
    }

    fn channel(&self) -> u8 {
        self.channel
    }

    fn extended_address(&self) -> ExtendedAddress {
        ExtendedAddress(self.extended_address)
    }

    fn short_address(&self) -> ShortAddress {
        ShortAddress(self.short_address)
    }

    fn state(&self) -> RadioState {
        self.state
    }

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        self.call("start_receive", Call::StartReceive)?;
        self.state = RadioState::Receive;
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8], _cca: bool) -> Result<(), Self::Error> {
        if self.rejected_transmissions > 0 {
            self.rejected_transmissions -= 1;
            return Err(MockError("transmit"));
        }
        self.call("transmit", Call::Transmit(frame.to_vec()))?;

        if self.complete_transmissions {
            if let Some(sink) = self.sink {
                sink.transmit_done(frame, None);
            }
        }
        self.state = if self.rx_when_idle {
            RadioState::Receive
        } else {
            RadioState::Idle
        };
        Ok(())
    }

    fn register_sink(&mut self, sink: &'static (dyn RadioEventSink + Sync)) {
        self.log.push(Call::RegisterSink);
        self.sink = Some(sink);
    }

    fn poll(&mut self) {
        while let Some(frame) = self.pending_rx.pop_front() {
            if let Some(sink) = self.sink {
                sink.receive_sfd_done(self.state);
                sink.receive_done(&frame);
            }
        }
    }
}

/// Delay that returns immediately, remembering what it was asked for.
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub delays_ms: Vec<u32>,
    pub total_ns: u64,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}
