//! Persistent calibration storage and its bring-up.
//!
//! The only value the link harness needs from storage is the factory
//! identifier its long address is derived from. [`init_storage`] brings the
//! store up, erasing it once when it holds a page layout this firmware can't
//! use.

use core::fmt;

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};

use crate::address::FactoryId;

/// Failure reported by a flash device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashErrorKind {
    NotAligned,
    OutOfBounds,
    Other,
}

impl From<NorFlashErrorKind> for FlashErrorKind {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashErrorKind::NotAligned,
            NorFlashErrorKind::OutOfBounds => FlashErrorKind::OutOfBounds,
            _ => FlashErrorKind::Other,
        }
    }
}

/// Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The storage pages hold no usable layout and have to be erased.
    NoFreePages,
    /// The storage was written with another format version.
    NewVersionFound,
    /// The store was used before a successful [`CalibrationStorage::init`].
    NotInitialized,
    /// No calibration record has been stored yet.
    NotFound,
    /// The calibration record failed its integrity check.
    Corrupted,
    /// The underlying flash reported an error.
    Flash(FlashErrorKind),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NoFreePages => write!(f, "No free storage pages."),
            StorageError::NewVersionFound => write!(f, "Storage holds a different format version."),
            StorageError::NotInitialized => write!(f, "Storage is not initialized."),
            StorageError::NotFound => write!(f, "No calibration data stored."),
            StorageError::Corrupted => write!(f, "Calibration data is corrupted."),
            StorageError::Flash(kind) => write!(f, "Flash error: {kind:?}."),
        }
    }
}

impl core::error::Error for StorageError {}

/// Factory calibration values kept in persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationData {
    pub factory_id: FactoryId,
}

/// A persistent store holding the calibration data.
pub trait CalibrationStorage {
    /// Open the store, checking its layout.
    fn init(&mut self) -> Result<(), StorageError>;

    /// Wipe the store. It must be initialized again afterwards.
    fn erase(&mut self) -> Result<(), StorageError>;

    fn load_calibration(&mut self) -> Result<CalibrationData, StorageError>;

    fn store_calibration(&mut self, data: &CalibrationData) -> Result<(), StorageError>;
}

/// Initialize `storage`, erasing and retrying once if its pages are full or
/// were written by another format version.
pub fn init_storage<S>(storage: &mut S) -> Result<(), StorageError>
where
    S: CalibrationStorage + ?Sized,
{
    info!("Initializing calibration storage");

    match storage.init() {
        Err(err @ (StorageError::NoFreePages | StorageError::NewVersionFound)) => {
            warn!("Storage unusable ({}), erasing", err);
            storage.erase()?;
            storage.init()
        }
        result => result,
    }
}

/// Load the calibration data, storing a fresh record from `factory_id` if
/// none exists yet.
pub fn load_or_provision<S>(
    storage: &mut S,
    factory_id: impl FnOnce() -> FactoryId,
) -> Result<CalibrationData, StorageError>
where
    S: CalibrationStorage + ?Sized,
{
    match storage.load_calibration() {
        Err(StorageError::NotFound) => {
            let data = CalibrationData {
                factory_id: factory_id(),
            };
            info!("Provisioning calibration data, factory id {}", data.factory_id);
            storage.store_calibration(&data)?;
            Ok(data)
        }
        result => result,
    }
}

const MAGIC: [u8; 4] = *b"LCAL";

/// Layout version written into the page header.
pub const FORMAT_VERSION: u8 = 1;

const BLOCK_LEN: usize = 8;
const HEADER_OFFSET: u32 = 0;
const RECORD_OFFSET: u32 = BLOCK_LEN as u32;
const RECORD_TAG: u8 = 0xa5;
const ERASED: [u8; BLOCK_LEN] = [0xff; BLOCK_LEN];

/// Calibration store occupying one erase sector of a NOR flash.
///
/// The sector starts with an 8-byte header (magic, format version) followed
/// by an 8-byte record (tag, factory identifier, check byte). `offset` must be
/// aligned to the flash's erase size, and its read and write sizes must divide
/// 8.
#[derive(Debug)]
pub struct FlashCalibrationStorage<F> {
    flash: F,
    offset: u32,
    initialized: bool,
}

impl<F> FlashCalibrationStorage<F>
where
    F: NorFlash,
{
    pub fn new(flash: F, offset: u32) -> Self {
        Self {
            flash,
            offset,
            initialized: false,
        }
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn read_block(&mut self, at: u32) -> Result<[u8; BLOCK_LEN], StorageError> {
        let mut block = [0u8; BLOCK_LEN];
        self.flash
            .read(self.offset + at, &mut block)
            .map_err(flash_error)?;
        Ok(block)
    }

    fn write_block(&mut self, at: u32, block: &[u8; BLOCK_LEN]) -> Result<(), StorageError> {
        self.flash
            .write(self.offset + at, block)
            .map_err(flash_error)
    }

    fn write_header(&mut self) -> Result<(), StorageError> {
        let mut header = ERASED;
        header[..MAGIC.len()].copy_from_slice(&MAGIC);
        header[MAGIC.len()] = FORMAT_VERSION;
        self.write_block(HEADER_OFFSET, &header)
    }
}

impl<F> CalibrationStorage for FlashCalibrationStorage<F>
where
    F: NorFlash,
{
    fn init(&mut self) -> Result<(), StorageError> {
        let header = self.read_block(HEADER_OFFSET)?;

        if header == ERASED {
            debug!("Formatting blank calibration sector at {:#x}", self.offset);
            self.write_header()?;
        } else if header[..MAGIC.len()] != MAGIC {
            return Err(StorageError::NoFreePages);
        } else if header[MAGIC.len()] != FORMAT_VERSION {
            return Err(StorageError::NewVersionFound);
        }

        self.initialized = true;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.initialized = false;
        self.flash
            .erase(self.offset, self.offset + F::ERASE_SIZE as u32)
            .map_err(flash_error)
    }

    fn load_calibration(&mut self) -> Result<CalibrationData, StorageError> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        decode_record(&self.read_block(RECORD_OFFSET)?)
    }

    fn store_calibration(&mut self, data: &CalibrationData) -> Result<(), StorageError> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let record = encode_record(data);
        let existing = self.read_block(RECORD_OFFSET)?;
        if existing == record {
            return Ok(());
        }

        if existing != ERASED {
            // NOR flash can't overwrite in place: rewrite the whole sector.
            self.erase()?;
            self.write_header()?;
            self.initialized = true;
        }

        self.write_block(RECORD_OFFSET, &record)
    }
}

fn flash_error<E: NorFlashError>(err: E) -> StorageError {
    StorageError::Flash(err.kind().into())
}

fn check_byte(id: &[u8; 6]) -> u8 {
    id.iter().fold(RECORD_TAG, |acc, byte| acc ^ byte)
}

fn encode_record(data: &CalibrationData) -> [u8; BLOCK_LEN] {
    let id = &data.factory_id.0;
    let mut record = [0u8; BLOCK_LEN];
    record[0] = RECORD_TAG;
    record[1..7].copy_from_slice(id);
    record[7] = check_byte(id);
    record
}

fn decode_record(record: &[u8; BLOCK_LEN]) -> Result<CalibrationData, StorageError> {
    if *record == ERASED {
        return Err(StorageError::NotFound);
    }

    let mut id = [0u8; 6];
    id.copy_from_slice(&record[1..7]);
    if record[0] != RECORD_TAG || record[7] != check_byte(&id) {
        return Err(StorageError::Corrupted);
    }

    Ok(CalibrationData {
        factory_id: FactoryId(id),
    })
}

#[cfg(test)]
mod tests {
    use embedded_storage::nor_flash::{
        check_erase,
        check_read,
        check_write,
        ErrorType,
        ReadNorFlash,
    };

    use super::*;
    use crate::mock::{Call, CallLog, MockStorage};

    const SECTOR_SIZE: usize = 4096;

    /// RAM-backed NOR flash: erase sets bits, writes can only clear them.
    struct MemFlash {
        data: Vec<u8>,
        erases: usize,
    }

    impl MemFlash {
        fn new(sectors: usize) -> Self {
            Self {
                data: vec![0xff; sectors * SECTOR_SIZE],
                erases: 0,
            }
        }
    }

    impl ErrorType for MemFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MemFlash {
        const READ_SIZE: usize = 4;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            check_read(self, offset, bytes.len())?;
            let offset = offset as usize;
            bytes.copy_from_slice(&self.data[offset..][..bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MemFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = SECTOR_SIZE;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            check_erase(self, from, to)?;
            self.data[from as usize..to as usize].fill(0xff);
            self.erases += 1;
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            check_write(self, offset, bytes.len())?;
            let offset = offset as usize;
            for (cell, byte) in self.data[offset..][..bytes.len()].iter_mut().zip(bytes) {
                *cell &= *byte;
            }
            Ok(())
        }
    }

    const ID: FactoryId = FactoryId([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

    #[test]
    fn blank_sector_is_formatted() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(2), SECTOR_SIZE as u32);

        assert_eq!(storage.load_calibration(), Err(StorageError::NotInitialized));
        storage.init().unwrap();
        assert_eq!(storage.load_calibration(), Err(StorageError::NotFound));

        let flash = storage.into_inner();
        assert_eq!(&flash.data[SECTOR_SIZE..][..5], b"LCAL\x01");
        // The first sector is left alone.
        assert!(flash.data[..SECTOR_SIZE].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn calibration_survives_reopen() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(1), 0);
        storage.init().unwrap();
        storage
            .store_calibration(&CalibrationData { factory_id: ID })
            .unwrap();

        let mut storage = FlashCalibrationStorage::new(storage.into_inner(), 0);
        storage.init().unwrap();
        assert_eq!(
            storage.load_calibration(),
            Ok(CalibrationData { factory_id: ID })
        );
    }

    #[test]
    fn foreign_header_reports_no_free_pages() {
        let mut flash = MemFlash::new(1);
        flash.data[..8].copy_from_slice(b"NVS\0\0\0\0\0");

        let mut storage = FlashCalibrationStorage::new(flash, 0);
        assert_eq!(storage.init(), Err(StorageError::NoFreePages));
    }

    #[test]
    fn other_version_reports_new_version_found() {
        let mut flash = MemFlash::new(1);
        flash.data[..5].copy_from_slice(b"LCAL\x02");

        let mut storage = FlashCalibrationStorage::new(flash, 0);
        assert_eq!(storage.init(), Err(StorageError::NewVersionFound));
    }

    #[test]
    fn damaged_record_is_corrupted() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(1), 0);
        storage.init().unwrap();
        storage
            .store_calibration(&CalibrationData { factory_id: ID })
            .unwrap();

        let mut flash = storage.into_inner();
        flash.data[RECORD_OFFSET as usize + 3] &= 0x0f;

        let mut storage = FlashCalibrationStorage::new(flash, 0);
        storage.init().unwrap();
        assert_eq!(storage.load_calibration(), Err(StorageError::Corrupted));
    }

    #[test]
    fn replacing_a_record_rewrites_the_sector() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(1), 0);
        storage.init().unwrap();
        storage
            .store_calibration(&CalibrationData { factory_id: ID })
            .unwrap();

        let other = CalibrationData {
            factory_id: FactoryId([1, 2, 3, 4, 5, 6]),
        };
        storage.store_calibration(&other).unwrap();
        assert_eq!(storage.load_calibration(), Ok(other));

        // Storing the same record again doesn't touch the flash.
        storage.store_calibration(&other).unwrap();
        assert_eq!(storage.into_inner().erases, 1);
    }

    #[test]
    fn misaligned_sector_is_a_flash_error() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(1), 2);
        assert_eq!(
            storage.init(),
            Err(StorageError::Flash(FlashErrorKind::NotAligned))
        );
    }

    #[test]
    fn init_storage_recovers_flash_with_foreign_layout() {
        let mut flash = MemFlash::new(1);
        flash.data[..8].copy_from_slice(b"NVS\0\0\0\0\0");

        let mut storage = FlashCalibrationStorage::new(flash, 0);
        init_storage(&mut storage).unwrap();
        assert_eq!(storage.load_calibration(), Err(StorageError::NotFound));
        assert_eq!(storage.into_inner().erases, 1);
    }

    #[test]
    fn init_storage_erases_once_on_no_free_pages() {
        let log = CallLog::default();
        let mut storage = MockStorage::new(log.clone())
            .with_init_results([Err(StorageError::NoFreePages), Ok(())]);

        init_storage(&mut storage).unwrap();
        assert_eq!(
            log.calls(),
            [Call::StorageInit, Call::StorageErase, Call::StorageInit]
        );
    }

    #[test]
    fn init_storage_erases_once_on_new_version() {
        let log = CallLog::default();
        let mut storage = MockStorage::new(log.clone())
            .with_init_results([Err(StorageError::NewVersionFound), Ok(())]);

        init_storage(&mut storage).unwrap();
        assert_eq!(
            log.calls(),
            [Call::StorageInit, Call::StorageErase, Call::StorageInit]
        );
    }

    #[test]
    fn init_storage_fails_if_retry_fails() {
        let log = CallLog::default();
        let mut storage = MockStorage::new(log.clone()).with_init_results([
            Err(StorageError::NoFreePages),
            Err(StorageError::NoFreePages),
        ]);

        assert_eq!(init_storage(&mut storage), Err(StorageError::NoFreePages));
        assert_eq!(
            log.calls(),
            [Call::StorageInit, Call::StorageErase, Call::StorageInit]
        );
    }

    #[test]
    fn init_storage_does_not_erase_on_other_errors() {
        let log = CallLog::default();
        let mut storage = MockStorage::new(log.clone())
            .with_init_results([Err(StorageError::Flash(FlashErrorKind::Other))]);

        assert_eq!(
            init_storage(&mut storage),
            Err(StorageError::Flash(FlashErrorKind::Other))
        );
        assert_eq!(log.calls(), [Call::StorageInit]);
    }

    #[test]
    fn provisioning_only_happens_once() {
        let mut storage = FlashCalibrationStorage::new(MemFlash::new(1), 0);
        init_storage(&mut storage).unwrap();

        let data = load_or_provision(&mut storage, || ID).unwrap();
        assert_eq!(data.factory_id, ID);

        let data = load_or_provision(&mut storage, || FactoryId([0; 6])).unwrap();
        assert_eq!(data.factory_id, ID);
    }
}
