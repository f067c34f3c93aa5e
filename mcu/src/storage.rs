use anyhow::Result;
use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;
use partylight_strip::{CalibrationStore, error_with_location};

/// Start of the default `nvs` partition, which this firmware does not otherwise use.
pub const CALIBRATION_FLASH_OFFSET: u32 = 0x9000;

pub struct FlashCalibrationStore {
    flash: FlashStorage,
    offset: u32,
}

impl FlashCalibrationStore {
    pub fn new(flash: FlashStorage, offset: u32) -> Self {
        Self { flash, offset }
    }
}

impl CalibrationStore for FlashCalibrationStore {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.flash
            .read(self.offset, buf)
            .map_err(|e| error_with_location!("Failed to read calibration from flash: {:?}", e))?;
        Ok(buf.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.flash
            .write(self.offset, data)
            .map_err(|e| error_with_location!("Failed to write calibration to flash: {:?}", e))
    }
}
