use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use log::{info, warn};
use rawpager_core::settings::{PagerSettings, SettingsStore};

use super::record::{self, RecordError, SETTINGS_RECORD_LEN};

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashSettingsError {
    PartitionTable,
    SettingsPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Corrupted,
    Unsupported,
}

impl From<RecordError> for FlashSettingsError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Corrupted => Self::Corrupted,
        }
    }
}

fn check(rc: i32) -> Result<(), FlashSettingsError> {
    if rc == ESP_ROM_SPIFLASH_RESULT_OK {
        Ok(())
    } else {
        Err(FlashSettingsError::FlashOpFailed(rc))
    }
}

/// ROM SPI-flash routines; they move whole 32-bit words only.
#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashSettingsError> {
        check(unsafe { esp_rom_spiflash_unlock() })?;
        Ok(Self)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashSettingsError> {
        if !addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashSettingsError::Unsupported);
        }
        check(unsafe { esp_rom_spiflash_erase_sector(addr / FLASH_SECTOR_SIZE) })
    }

    /// Reads `out.len()` bytes from any address by fetching the covering
    /// words and copying out the requested span.
    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashSettingsError> {
        let lead = (addr % 4) as usize;
        let mut word_addr = addr - lead as u32;
        let mut copied = 0usize;

        while copied < out.len() {
            let mut word = 0u32;
            check(unsafe {
                esp_rom_spiflash_read(word_addr, &mut word as *mut u32 as *const u32, 4)
            })?;
            let bytes = word.to_le_bytes();
            let skip = if copied == 0 { lead } else { 0 };
            let take = (4 - skip).min(out.len() - copied);
            out[copied..copied + take].copy_from_slice(&bytes[skip..skip + take]);
            copied += take;
            word_addr += 4;
        }
        Ok(())
    }

    /// Programs `data` at a word-aligned address of an erased sector. A
    /// short final word is padded with `0xFF`, which leaves those bits erased.
    fn write_erased_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashSettingsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashSettingsError::Unsupported);
        }

        for (index, chunk) in data.chunks(4).enumerate() {
            let mut bytes = [0xFFu8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let word = u32::from_le_bytes(bytes);
            let word_addr = addr + (index as u32) * 4;
            check(unsafe { esp_rom_spiflash_write(word_addr, &word as *const u32, 4) })?;
        }
        Ok(())
    }
}

/// Read-only view used by the partition table parser.
impl ReadStorage for RawFlash {
    type Error = FlashSettingsError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashSettingsError::Unsupported)
    }
}

/// Settings kept in the last sector of a writable data partition.
#[derive(Debug)]
pub struct FlashSettingsStore {
    flash: RawFlash,
    settings_sector_addr: u32,
}

impl FlashSettingsStore {
    /// Locates the settings sector, preferring a data partition of
    /// `undefined` subtype over the first `nvs` one.
    pub fn new() -> Result<Self, FlashSettingsError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FlashSettingsError::PartitionTable)?;

        let mut data_undefined: Option<(u32, u32)> = None;
        let mut fallback_nvs: Option<(u32, u32)> = None;

        for entry in table.iter() {
            if entry.is_read_only() || entry.len() < FLASH_SECTOR_SIZE {
                continue;
            }

            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    data_undefined = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) if fallback_nvs.is_none() => {
                    fallback_nvs = Some((entry.offset(), entry.len()));
                }
                _ => {}
            }
        }

        let (offset, len) = data_undefined
            .or(fallback_nvs)
            .ok_or(FlashSettingsError::SettingsPartitionMissing)?;

        if len < FLASH_SECTOR_SIZE {
            return Err(FlashSettingsError::PartitionTooSmall);
        }

        let settings_sector_addr = offset + len - FLASH_SECTOR_SIZE;
        info!(
            "settings sector at 0x{:08x} (partition 0x{:08x}+0x{:x})",
            settings_sector_addr, offset, len
        );
        Ok(Self {
            flash,
            settings_sector_addr,
        })
    }
}

impl SettingsStore for FlashSettingsStore {
    type Error = FlashSettingsError;

    fn load(&mut self) -> Result<Option<PagerSettings>, Self::Error> {
        let mut buf = [0u8; SETTINGS_RECORD_LEN];
        self.flash.read_bytes(self.settings_sector_addr, &mut buf)?;
        record::decode(&buf).map_err(|err| {
            warn!("settings record rejected: {:?}", err);
            FlashSettingsError::from(err)
        })
    }

    fn save(&mut self, settings: &PagerSettings) -> Result<(), Self::Error> {
        let buf = record::encode(settings);
        self.flash.erase_sector(self.settings_sector_addr)?;
        self.flash
            .write_erased_bytes(self.settings_sector_addr, &buf)?;
        Ok(())
    }
}
