//! Receiver role: joins the PAN, listens on the configured channel and logs
//! every receive event.
//!
//! Run with `ESP_LOG=info cargo run --release --bin receiver`.

#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::{delay::Delay, prelude::*};
use esp_ieee802154_demos::{boot, receiver_config, EspRadio};
use esp_ieee802154_link::{Receiver, ReceiverEvents};

static EVENTS: ReceiverEvents = ReceiverEvents::new();

#[entry]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let mut delay = Delay::new();

    let radio = EspRadio::new(peripherals.IEEE802154, peripherals.RADIO_CLK);
    let radio = boot(radio, &receiver_config()).unwrap();

    Receiver::start(radio, &EVENTS).unwrap().run(&mut delay)
}
