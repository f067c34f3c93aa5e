//! Startup validation of a [`StripConfig`] against the compile-time band and LED counts.

use anyhow::Result;
use common::config::{Autoscale, BandConfig, DisplayTransform, StripConfig};

use crate::box_fade::MAX_BOXES;
use crate::error_with_location;

/// One band of the validated layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandSpec {
    pub start_bin: usize,
    pub end_bin: usize,
    pub start_led: usize,
    pub end_led: usize,
    pub transform: DisplayTransform,
}

impl BandSpec {
    /// Number of magnitude samples summed into this band.
    pub fn bin_count(&self) -> usize {
        self.end_bin - self.start_bin
    }

    /// Samples the aggregator hands this band. A zero-width band at bin 0 takes bin 0 alone.
    pub fn sample_count(&self) -> usize {
        if self.start_bin == 0 && self.end_bin == 0 { 1 } else { self.bin_count() }
    }

    pub fn led_count(&self) -> usize {
        self.end_led - self.start_led
    }
}

impl From<&BandConfig> for BandSpec {
    fn from(band: &BandConfig) -> Self {
        Self {
            start_bin: band.start_bin as usize,
            end_bin: band.end_bin as usize,
            start_led: band.start_led as usize,
            end_led: band.end_led as usize,
            transform: band.transform,
        }
    }
}

/// Checks `config` and returns its band layout, or a description of the first problem found.
///
/// FFT ranges must tile the front of the magnitude buffer without gaps, since the
/// aggregator walks the buffer once and hands out samples by band size.
pub fn validate<const N: usize, const L: usize>(config: &StripConfig) -> Result<[BandSpec; N]> {
    if config.bands.len() != N {
        return Err(error_with_location!(
            "config has {} bands, firmware is built for {}",
            config.bands.len(),
            N
        ));
    }
    if config.led_count as usize != L {
        return Err(error_with_location!(
            "config has {} LEDs, firmware is built for {}",
            config.led_count,
            L
        ));
    }

    let specs: [BandSpec; N] = core::array::from_fn(|i| BandSpec::from(&config.bands[i]));
    let fft_size = config.fft_size as usize;

    let mut previous_end = 0;
    for (i, band) in config.bands.iter().enumerate() {
        if band.end_bin < band.start_bin {
            return Err(error_with_location!(
                "band {} ends at bin {} before it starts at {}",
                i,
                band.end_bin,
                band.start_bin
            ));
        }
        if band.end_bin == band.start_bin && band.start_bin != 0 {
            return Err(error_with_location!(
                "band {} is empty at bin {}, only bin 0 may be zero-width",
                i,
                band.start_bin
            ));
        }
        if band.start_bin as usize != previous_end {
            return Err(error_with_location!(
                "band {} starts at bin {}, previous band ends at {}",
                i,
                band.start_bin,
                previous_end
            ));
        }
        if band.end_bin as usize > fft_size {
            return Err(error_with_location!(
                "band {} ends at bin {}, buffer only has {}",
                i,
                band.end_bin,
                fft_size
            ));
        }
        previous_end = specs[i].start_bin + specs[i].sample_count();

        if band.end_led < band.start_led {
            return Err(error_with_location!(
                "band {} LED range {}..{} is reversed",
                i,
                band.start_led,
                band.end_led
            ));
        }
        if band.end_led as usize > L {
            return Err(error_with_location!(
                "band {} LED range ends at {}, strip has {}",
                i,
                band.end_led,
                L
            ));
        }
    }

    for (i, a) in specs.iter().enumerate() {
        for (j, b) in specs.iter().enumerate().skip(i + 1) {
            if a.start_led < b.end_led && b.start_led < a.end_led {
                return Err(error_with_location!(
                    "bands {} and {} share LEDs ({}..{} and {}..{})",
                    i,
                    j,
                    a.start_led,
                    a.end_led,
                    b.start_led,
                    b.end_led
                ));
            }
        }
    }

    if let Autoscale::Uniform { scale } = config.autoscale {
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(error_with_location!("uniform scale must be positive, got {}", scale));
        }
    }
    if config.average_window == 0 {
        return Err(error_with_location!("average window must be at least one frame"));
    }
    if config.fade.edge_fade_us < crate::RESOLUTION || config.fade.new_value_fade_us < crate::RESOLUTION {
        return Err(error_with_location!(
            "fade times must be at least {}us (edge {}, new value {})",
            crate::RESOLUTION,
            config.fade.edge_fade_us,
            config.fade.new_value_fade_us
        ));
    }
    if config.hue.sweep_time_ms == 0 {
        return Err(error_with_location!("hue sweep time must be non-zero"));
    }
    let boxes = &config.boxes;
    let max_boxes = L.min(MAX_BOXES);
    if boxes.box_count == 0 || boxes.box_count as usize > max_boxes {
        return Err(error_with_location!(
            "box count {} must be between 1 and {}",
            boxes.box_count,
            max_boxes
        ));
    }
    if boxes.fade_step == 0 || boxes.fade_step > boxes.max_progress {
        return Err(error_with_location!(
            "box fade step {} must be between 1 and max progress {}",
            boxes.fade_step,
            boxes.max_progress
        ));
    }

    Ok(specs)
}

/// Logs the band layout, one band per line.
pub fn print_bins(specs: &[BandSpec]) {
    log::info!("Display bin configuration:");
    for (i, spec) in specs.iter().enumerate() {
        log::info!(
            "Display bin {}: FFT bins {}-{}, LEDs {}-{}, {:?}",
            i,
            spec.start_bin,
            spec.end_bin,
            spec.start_led,
            spec.end_led,
            spec.transform
        );
    }
}
