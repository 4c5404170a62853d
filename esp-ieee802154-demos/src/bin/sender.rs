//! Sender role: joins the PAN and broadcasts a fixed data frame, signed with
//! the device's long address, once per second.
//!
//! Run with `ESP_LOG=info cargo run --release --bin sender`.

#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::{delay::Delay, prelude::*};
use esp_ieee802154_demos::{boot, sender_config, EspRadio};
use esp_ieee802154_link::{Sender, SenderEvents};

static EVENTS: SenderEvents = SenderEvents::new();

#[entry]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let mut delay = Delay::new();

    let radio = EspRadio::new(peripherals.IEEE802154, peripherals.RADIO_CLK);
    let radio = boot(radio, &sender_config()).unwrap();

    Sender::new(radio, &EVENTS).unwrap().run(&mut delay)
}
