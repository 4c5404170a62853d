//! Glue between the link harness and the ESP32-C6/H2 hardware.
//!
//! [`EspRadio`] drives the `esp-ieee802154` radio through the
//! [`RadioDriver`] trait, and [`boot`] runs the storage and radio bring-up
//! both binaries share.
#![no_std]

use core::sync::atomic::{AtomicBool, Ordering};

use esp_config::esp_config_int;
use esp_hal::{
    efuse::Efuse,
    peripherals::{IEEE802154, RADIO_CLK},
};
use esp_ieee802154::{Config, Ieee802154};
use esp_ieee802154_link::{
    bring_up_provisioned,
    frame::{FRAME_SIZE, MAX_PSDU_LEN},
    ConfiguredRadio,
    Error,
    FactoryId,
    FlashCalibrationStorage,
    RadioConfig,
    RadioDriver,
    RadioEventSink,
    RadioState,
    ShortAddressSetting,
};
use esp_storage::FlashStorage;
use ieee802154::mac::{ExtendedAddress, PanId, ShortAddress};

/// PAN both roles join.
pub const PAN_ID: u16 = esp_config_int!(u16, "IEEE802154_DEMO_PAN_ID");
/// Radio channel both roles tune to.
pub const CHANNEL: u8 = esp_config_int!(u8, "IEEE802154_DEMO_CHANNEL");
/// Short address the sender assigns itself.
pub const SENDER_SHORT_ADDRESS: u16 = esp_config_int!(u16, "IEEE802154_DEMO_SENDER_SHORT_ADDRESS");
/// Flash offset of the calibration sector.
pub const CALIBRATION_OFFSET: u32 = esp_config_int!(u32, "IEEE802154_DEMO_CALIBRATION_OFFSET");

pub fn receiver_config() -> RadioConfig {
    RadioConfig::receiver()
        .with_pan_id(PAN_ID)
        .with_channel(CHANNEL)
}

pub fn sender_config() -> RadioConfig {
    RadioConfig {
        short_address: ShortAddressSetting::Fixed(SENDER_SHORT_ADDRESS),
        ..RadioConfig::sender()
            .with_pan_id(PAN_ID)
            .with_channel(CHANNEL)
    }
}

/// Bring up the calibration storage, provisioning it from the efuse MAC on
/// first boot, then power up and configure `radio` with `config`.
pub fn boot(
    radio: EspRadio,
    config: &RadioConfig,
) -> Result<ConfiguredRadio<EspRadio>, Error<EspRadioError>> {
    let mut storage = FlashCalibrationStorage::new(FlashStorage::new(), CALIBRATION_OFFSET);

    bring_up_provisioned(
        &mut storage,
        || FactoryId(Efuse::read_base_mac_address()),
        radio,
        config,
    )
}

static TX_DONE: AtomicBool = AtomicBool::new(false);

fn tx_done() {
    TX_DONE.store(true, Ordering::Release);
}

/// [`EspRadio`] errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EspRadioError {
    /// The radio has not been enabled yet.
    Disabled,
    /// The frame's length byte doesn't match the buffer.
    InvalidFrame,
    /// The driver refused the frame.
    Driver(esp_ieee802154::Error),
}

impl From<esp_ieee802154::Error> for EspRadioError {
    fn from(err: esp_ieee802154::Error) -> Self {
        EspRadioError::Driver(err)
    }
}

/// [`RadioDriver`] on top of the `esp-ieee802154` driver.
///
/// The driver only takes a complete [`Config`], so the adapter keeps a copy
/// and pushes it whole on every change. Received frames and transmit
/// completions are forwarded to the sink from [`RadioDriver::poll`]. The
/// driver reports no receive errors, and a start-of-frame delimiter is only
/// known once its frame has been queued.
///
/// The radio stays powered down until [`RadioDriver::enable`].
pub struct EspRadio {
    peripherals: Option<(IEEE802154, RADIO_CLK)>,
    driver: Option<Ieee802154<'static>>,
    config: Config,
    state: RadioState,
    sink: Option<&'static (dyn RadioEventSink + Sync)>,
    last_frame: [u8; FRAME_SIZE],
}

impl EspRadio {
    pub fn new(radio: IEEE802154, radio_clocks: RADIO_CLK) -> Self {
        Self {
            peripherals: Some((radio, radio_clocks)),
            driver: None,
            config: Config {
                auto_ack_rx: false,
                auto_ack_tx: false,
                ..Config::default()
            },
            state: RadioState::Disabled,
            sink: None,
            last_frame: [0; FRAME_SIZE],
        }
    }

    fn driver(&mut self) -> Result<&mut Ieee802154<'static>, EspRadioError> {
        self.driver.as_mut().ok_or(EspRadioError::Disabled)
    }

    fn update(&mut self, update: impl FnOnce(&mut Config)) -> Result<(), EspRadioError> {
        let mut config = self.config;
        update(&mut config);
        self.driver()?.set_config(config);
        self.config = config;
        Ok(())
    }

    fn idle_state(&self) -> RadioState {
        if self.config.rx_when_idle {
            RadioState::Receive
        } else {
            RadioState::Idle
        }
    }
}

impl RadioDriver for EspRadio {
    type Error = EspRadioError;

    fn enable(&mut self) -> Result<(), Self::Error> {
        if let Some((radio, radio_clocks)) = self.peripherals.take() {
            // Powers up the PHY, baseband and MAC.
            let mut driver = Ieee802154::new(radio, radio_clocks);
            driver.set_tx_done_callback_fn(tx_done);
            self.driver = Some(driver);
        }

        let config = self.config;
        self.driver()?.set_config(config);
        self.state = RadioState::Idle;
        Ok(())
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.update(|config| config.promiscuous = enable)
    }

    fn set_rx_when_idle(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.update(|config| config.rx_when_idle = enable)
    }

    fn set_pan_id(&mut self, pan_id: PanId) -> Result<(), Self::Error> {
        self.update(|config| config.pan_id = Some(pan_id.0))
    }

    fn set_coordinator(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.update(|config| config.coordinator = enable)
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        self.update(|config| config.channel = channel)
    }

    fn set_extended_address(&mut self, address: ExtendedAddress) -> Result<(), Self::Error> {
        self.update(|config| config.ext_addr = Some(address.0))
    }

    fn set_short_address(&mut self, address: ShortAddress) -> Result<(), Self::Error> {
        self.update(|config| config.short_addr = Some(address.0))
    }

    fn pan_id(&self) -> PanId {
        PanId(self.config.pan_id.unwrap_or(0xffff))
    }

    fn channel(&self) -> u8 {
        self.config.channel
    }

    fn extended_address(&self) -> ExtendedAddress {
        ExtendedAddress(self.config.ext_addr.unwrap_or(0))
    }

    fn short_address(&self) -> ShortAddress {
        ShortAddress(self.config.short_addr.unwrap_or(0xffff))
    }

    fn state(&self) -> RadioState {
        self.state
    }

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        self.driver()?.start_receive();
        self.state = RadioState::Receive;
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8], cca: bool) -> Result<(), Self::Error> {
        let len = usize::from(*frame.first().ok_or(EspRadioError::InvalidFrame)?);
        let psdu = frame
            .get(1..=len)
            .filter(|psdu| psdu.len() <= MAX_PSDU_LEN)
            .ok_or(EspRadioError::InvalidFrame)?;

        if cca {
            log::warn!("CCA not supported by this driver, transmitting without");
        }

        self.driver()?.transmit_raw(psdu)?;
        self.last_frame[..=len].copy_from_slice(&frame[..=len]);
        self.state = RadioState::Transmit;
        Ok(())
    }

    fn register_sink(&mut self, sink: &'static (dyn RadioEventSink + Sync)) {
        self.sink = Some(sink);
    }

    fn poll(&mut self) {
        if TX_DONE.swap(false, Ordering::AcqRel) {
            self.state = self.idle_state();
            if let Some(sink) = self.sink {
                let len = usize::from(self.last_frame[0]);
                sink.transmit_done(&self.last_frame[..=len], None);
            }
        }

        let Some(driver) = self.driver.as_mut() else {
            return;
        };

        while let Some(raw) = driver.raw_received() {
            let len = usize::from(raw.data[0]).min(FRAME_SIZE - 1);
            if let Some(sink) = self.sink {
                sink.receive_sfd_done(self.state);
                sink.receive_done(&raw.data[..=len]);
            }
        }
    }
}
