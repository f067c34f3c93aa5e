use serde::{Deserialize, Serialize};

/// Upper bound on the number of display bands a config can carry.
pub const MAX_BANDS: usize = 32;

/// Non-linear mapping applied to a normalized band value before it is turned into a pixel count.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayTransform {
    Linear,
    Log,
    Square,
    SquareRoot,
}

/// How the per-band divisor is chosen.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum Autoscale {
    /// every band adapts its own scale each analysis cycle
    PerBand,
    /// one fixed scale shared by all bands, no adaptation
    Uniform { scale: f32 },
}

/// Fraction of the moving average subtracted from a band before range mapping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseFloorOffset {
    /// average / 1.25
    Standard,
    /// average / 1.5
    Aggressive,
}

impl NoiseFloorOffset {
    pub fn divisor(self) -> f32 {
        match self {
            NoiseFloorOffset::Standard => 1.25,
            NoiseFloorOffset::Aggressive => 1.5,
        }
    }
}

/// Where the lit pixels of a band sit inside its LED segment.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelAlignment {
    /// half of the lit pixels on each side of the segment midpoint
    Centered,
    /// lit pixels start at the first LED of the segment
    LeftAligned,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BandConfig {
    /// index into the magnitude buffer, inclusive
    pub start_bin: u16,
    /// index into the magnitude buffer, exclusive
    pub end_bin: u16,
    /// first LED of the segment, inclusive
    pub start_led: u16,
    /// last LED of the segment, exclusive
    pub end_led: u16,
    pub transform: DisplayTransform,
}

impl BandConfig {
    pub fn bin_count(&self) -> usize {
        self.end_bin.saturating_sub(self.start_bin) as usize
    }

    pub fn led_count(&self) -> usize {
        self.end_led.saturating_sub(self.start_led) as usize
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HueSweepConfig {
    /// hue the sweep starts at (0-255 around the color wheel)
    pub start_hue: u8,
    pub end_hue: u8,
    pub saturation: u8,
    /// traverse the wheel backwards from start to end
    pub reverse_wheel: bool,
    /// milliseconds for one pass from start to end
    pub sweep_time_ms: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FadeConfig {
    /// microseconds for a dim edge pixel to fade out completely
    pub edge_fade_us: u32,
    /// microseconds for a freshly lit pixel to fade out completely
    pub new_value_fade_us: u32,
    /// pixels brighter than this use the new-value rate, dimmer ones collapse from the edges
    pub high_brightness_threshold: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoxFadeConfig {
    pub box_count: u16,
    /// progress at which a box has arrived at its destination color
    pub max_progress: u16,
    /// progress added per render call
    pub fade_step: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StripConfig {
    pub config_version: u32,
    /// number of samples in the analyzer's magnitude buffer
    pub fft_size: u16,
    pub led_count: u16,
    pub bands: heapless::Vec<BandConfig, MAX_BANDS>,
    pub autoscale: Autoscale,
    pub offset: NoiseFloorOffset,
    pub alignment: PixelAlignment,
    /// upper bound of the moving-average window, in frames
    pub average_window: u16,
    pub hue: HueSweepConfig,
    pub fade: FadeConfig,
    pub boxes: BoxFadeConfig,
}

pub const CONFIG_VERSION: u32 = 1;

impl StripConfig {
    /// Serialize config to binary data using postcard
    pub fn to_bytes<const B: usize>(&self) -> postcard::Result<heapless::Vec<u8, B>> {
        postcard::to_vec::<_, B>(self)
    }

    /// Deserialize config from binary data using postcard
    pub fn from_bytes(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}

/// Persisted result of the analog front-end calibration.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationRecord {
    /// firmware build tag the offset was measured with
    pub build: u32,
    pub dc_offset: i32,
}

/// Upper bound on the encoded size of a [`CalibrationRecord`].
pub const CALIBRATION_RECORD_SIZE: usize = 16;

impl CalibrationRecord {
    pub fn to_bytes(&self) -> postcard::Result<heapless::Vec<u8, CALIBRATION_RECORD_SIZE>> {
        postcard::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_survives_postcard() {
        let config = StripConfig::default();
        let bytes = config.to_bytes::<1024>().unwrap();
        let decoded = StripConfig::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn calibration_record_fits_its_buffer() {
        let record = CalibrationRecord {
            build: u32::MAX,
            dc_offset: i32::MIN,
        };
        let bytes = record.to_bytes().unwrap();
        assert_eq!(CalibrationRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn offset_divisors() {
        assert_eq!(NoiseFloorOffset::Standard.divisor(), 1.25);
        assert_eq!(NoiseFloorOffset::Aggressive.divisor(), 1.5);
    }
}
