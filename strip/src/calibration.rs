//! Persisted microphone DC offset.
//!
//! The offset is measured once per firmware build and kept in non-volatile storage.
//! A record written by another build is treated as missing.

use anyhow::Result;
use common::config::{CALIBRATION_RECORD_SIZE, CalibrationRecord};

use crate::error_with_location;

/// Non-volatile storage for one calibration record.
pub trait CalibrationStore {
    /// Reads the stored record into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn write(&mut self, data: &[u8]) -> Result<()>;
}

/// Returns the stored offset for `build`, or runs `measure` and stores its result.
pub fn load_or_calibrate<S: CalibrationStore>(
    store: &mut S,
    build: u32,
    force: bool,
    measure: impl FnOnce() -> i32,
) -> Result<i32> {
    if !force {
        if let Some(record) = load(store) {
            if record.build == build {
                log::info!("Using stored DC offset {}", record.dc_offset);
                return Ok(record.dc_offset);
            }
            log::info!("Stored calibration is from build {:#x}, recalibrating", record.build);
        }
    }

    log::info!("Calibrating...");
    let dc_offset = measure();
    let record = CalibrationRecord { build, dc_offset };
    let bytes = record
        .to_bytes()
        .map_err(|e| error_with_location!("failed to encode calibration: {:?}", e))?;
    store.write(&bytes)?;
    log::info!("Calibrated DC offset {}", dc_offset);
    Ok(dc_offset)
}

fn load<S: CalibrationStore>(store: &mut S) -> Option<CalibrationRecord> {
    let mut buf = [0u8; CALIBRATION_RECORD_SIZE];
    let len = match store.read(&mut buf) {
        Ok(len) => len.min(buf.len()),
        Err(e) => {
            log::warn!("Failed to read calibration: {:?}", e);
            return None;
        }
    };
    match CalibrationRecord::from_bytes(&buf[..len]) {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("No usable calibration record: {:?}", e);
            None
        }
    }
}
