use esp_config::{generate_config, Value};

fn main() {
    // Values end up as `IEEE802154_DEMO_<NAME>` and are read with
    // `esp_config_int!`, so they are given in decimal.
    generate_config(
        "ieee802154_demo",
        &[
            (
                "pan_id",
                Value::UnsignedInteger(0x4242),
                "PAN both roles join",
            ),
            (
                "channel",
                Value::UnsignedInteger(11),
                "Radio channel, 11 to 26",
            ),
            (
                "sender_short_address",
                Value::UnsignedInteger(0x2323),
                "Short address of the sender",
            ),
            (
                "calibration_offset",
                Value::UnsignedInteger(0x9000),
                "Flash offset of the sector holding the calibration record",
            ),
        ],
        true,
    );
}
