//! Event logging for the two roles.

use core::{cell::RefCell, fmt};

use critical_section::Mutex;
use heapless::Deque;

use crate::driver::{RadioEventSink, RadioState};

/// Number of recent events a role keeps around.
pub const JOURNAL_DEPTH: usize = 16;

/// One driver event, as logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    ReceiveDone { length: u8 },
    ReceiveFailed { error: u16 },
    ReceiveSfd { state: RadioState },
    TransmitDone { ack_present: bool },
    TransmitFailed { error: u16 },
    TransmitSfd,
}

impl fmt::Display for RadioEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioEvent::ReceiveDone { length } => write!(f, "rx OK, received {length} bytes"),
            RadioEvent::ReceiveFailed { error } => write!(f, "rx failed, error {error}"),
            RadioEvent::ReceiveSfd { state } => write!(f, "rx sfd done, radio state: {state}"),
            RadioEvent::TransmitDone { ack_present } => {
                write!(f, "tx OK, ack frame present: {ack_present}")
            }
            RadioEvent::TransmitFailed { error } => write!(f, "tx failed, error {error}"),
            RadioEvent::TransmitSfd => f.write_str("tx sfd done"),
        }
    }
}

struct JournalState<const N: usize> {
    recent: Deque<RadioEvent, N>,
    total: u32,
}

/// Bounded record of the most recent events, oldest dropped first.
///
/// Guarded by a critical section so it can be written from the driver's
/// interrupt context.
pub struct EventJournal<const N: usize> {
    state: Mutex<RefCell<JournalState<N>>>,
}

impl<const N: usize> EventJournal<N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(JournalState {
                recent: Deque::new(),
                total: 0,
            })),
        }
    }

    pub fn push(&self, event: RadioEvent) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.recent.is_full() {
                state.recent.pop_front();
            }
            // There is room after the pop above.
            let _ = state.recent.push_back(event);
            state.total = state.total.wrapping_add(1);
        });
    }

    /// Events still held, oldest first.
    pub fn recent(&self) -> heapless::Vec<RadioEvent, N> {
        critical_section::with(|cs| self.state.borrow_ref(cs).recent.iter().copied().collect())
    }

    /// Events recorded since creation, including the ones already dropped.
    pub fn total(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).total)
    }

    pub fn count(&self, matches: impl Fn(&RadioEvent) -> bool) -> usize {
        critical_section::with(|cs| {
            self.state
                .borrow_ref(cs)
                .recent
                .iter()
                .filter(|event| matches(event))
                .count()
        })
    }
}

impl<const N: usize> Default for EventJournal<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn record<const N: usize>(journal: &EventJournal<N>, event: RadioEvent) {
    info!("{}", event);
    journal.push(event);
}

/// Event sink of the receiver role: logs the three receive events.
#[derive(Default)]
pub struct ReceiverEvents {
    journal: EventJournal<JOURNAL_DEPTH>,
}

impl ReceiverEvents {
    pub const fn new() -> Self {
        Self {
            journal: EventJournal::new(),
        }
    }

    pub fn journal(&self) -> &EventJournal<JOURNAL_DEPTH> {
        &self.journal
    }
}

impl RadioEventSink for ReceiverEvents {
    fn receive_done(&self, frame: &[u8]) {
        let length = frame.first().copied().unwrap_or(0);
        record(&self.journal, RadioEvent::ReceiveDone { length });
    }

    fn receive_failed(&self, error: u16) {
        record(&self.journal, RadioEvent::ReceiveFailed { error });
    }

    fn receive_sfd_done(&self, state: RadioState) {
        record(&self.journal, RadioEvent::ReceiveSfd { state });
    }
}

/// Event sink of the sender role: logs transmit outcomes.
#[derive(Default)]
pub struct SenderEvents {
    journal: EventJournal<JOURNAL_DEPTH>,
}

impl SenderEvents {
    pub const fn new() -> Self {
        Self {
            journal: EventJournal::new(),
        }
    }

    pub fn journal(&self) -> &EventJournal<JOURNAL_DEPTH> {
        &self.journal
    }
}

impl RadioEventSink for SenderEvents {
    fn transmit_done(&self, _frame: &[u8], ack: Option<&[u8]>) {
        record(
            &self.journal,
            RadioEvent::TransmitDone {
                ack_present: ack.is_some(),
            },
        );
    }

    fn transmit_failed(&self, _frame: &[u8], error: u16) {
        record(&self.journal, RadioEvent::TransmitFailed { error });
    }

    fn transmit_sfd_done(&self, _frame: &[u8]) {
        record(&self.journal, RadioEvent::TransmitSfd);
    }
}
