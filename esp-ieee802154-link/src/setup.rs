//! Bring-up shared by both roles.

use core::fmt;

use ieee802154::mac::{PanId, ShortAddress};

use crate::{
    address::{FactoryId, LongAddress},
    config::RadioConfig,
    driver::RadioDriver,
    storage::{init_storage, load_or_provision, CalibrationData, CalibrationStorage},
    Error,
};

/// Addressing the radio ended up with, as read back from the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioIdentity {
    pub pan_id: u16,
    pub channel: u8,
    pub long_address: LongAddress,
    pub short_address: u16,
}

impl fmt::Display for RadioIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "panId={:#06x}, channel={}, long={}, short={:04x}",
            self.pan_id, self.channel, self.long_address, self.short_address
        )
    }
}

/// A radio that went through [`configure`], along with its identity.
#[derive(Debug)]
pub struct ConfiguredRadio<R> {
    radio: R,
    identity: RadioIdentity,
}

impl<R> ConfiguredRadio<R>
where
    R: RadioDriver,
{
    pub fn identity(&self) -> &RadioIdentity {
        &self.identity
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn into_inner(self) -> R {
        self.radio
    }
}

/// Apply `config` to `radio` and give it the long address derived from
/// `calibration`.
///
/// Every driver call has to succeed; the first failure is returned and the
/// radio is left as it is.
pub fn configure<R>(
    mut radio: R,
    config: &RadioConfig,
    calibration: &CalibrationData,
) -> Result<ConfiguredRadio<R>, Error<R::Error>>
where
    R: RadioDriver,
{
    config.validate()?;

    radio.enable().map_err(Error::Radio)?;
    radio
        .set_promiscuous(config.promiscuous)
        .map_err(Error::Radio)?;
    radio
        .set_rx_when_idle(config.rx_when_idle)
        .map_err(Error::Radio)?;
    radio
        .set_pan_id(PanId(config.pan_id))
        .map_err(Error::Radio)?;
    radio
        .set_coordinator(config.coordinator)
        .map_err(Error::Radio)?;
    radio.set_channel(config.channel).map_err(Error::Radio)?;

    let long_address = calibration.factory_id.long_address();
    radio
        .set_extended_address(long_address.into())
        .map_err(Error::Radio)?;
    radio
        .set_short_address(ShortAddress::from(config.short_address))
        .map_err(Error::Radio)?;

    let identity = RadioIdentity {
        pan_id: radio.pan_id().0,
        channel: radio.channel(),
        long_address: radio.extended_address().into(),
        short_address: radio.short_address().0,
    };
    debug!("Radio configured: {}", identity);

    Ok(ConfiguredRadio { radio, identity })
}

/// The whole boot sequence: storage first, then the radio.
pub fn bring_up<S, R>(
    storage: &mut S,
    radio: R,
    config: &RadioConfig,
) -> Result<ConfiguredRadio<R>, Error<R::Error>>
where
    S: CalibrationStorage + ?Sized,
    R: RadioDriver,
{
    init_storage(storage)?;
    let calibration = storage.load_calibration()?;
    configure(radio, config, &calibration)
}

/// Like [`bring_up`], but a store without calibration data is provisioned
/// from `factory_id` instead of failing.
///
/// `radio` is not touched before the storage is done, so drivers that power
/// up in [`RadioDriver::enable`] stay off during an erase.
pub fn bring_up_provisioned<S, R>(
    storage: &mut S,
    factory_id: impl FnOnce() -> FactoryId,
    radio: R,
    config: &RadioConfig,
) -> Result<ConfiguredRadio<R>, Error<R::Error>>
where
    S: CalibrationStorage + ?Sized,
    R: RadioDriver,
{
    init_storage(storage)?;
    let calibration = load_or_provision(storage, factory_id)?;
    configure(radio, config, &calibration)
}
