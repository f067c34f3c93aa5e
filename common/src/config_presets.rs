use crate::config::*;

pub const DEFAULT_FFT_SIZE: u16 = 512;
pub const DEFAULT_BAND_COUNT: usize = 8;
pub const DEFAULT_LED_COUNT: u16 = 120;

impl StripConfig {
    /// Octave bands: bin 0 alone in band 0, then 1, 2, 4, 8, ... bins per band.
    ///
    /// The last band is truncated at `DEFAULT_FFT_SIZE`, so at most 10 bands cover a
    /// 512-bin buffer before ranges collapse to zero width.
    pub fn octave(band_count: usize, led_count: u16) -> Self {
        let mut config = Self::empty(led_count);
        let fft_size = config.fft_size;
        for i in 0..band_count.min(MAX_BANDS) {
            let (start, end) = if i == 0 {
                (0, 1)
            } else {
                (1u32 << (i - 1), 1u32 << i)
            };
            let start_bin = start.min(fft_size as u32) as u16;
            let end_bin = end.min(fft_size as u32) as u16;
            let (start_led, end_led) = even_led_split(i, band_count, led_count);
            // capacity is MAX_BANDS and the loop is bounded by it
            let _ = config.bands.push(BandConfig {
                start_bin,
                end_bin,
                start_led,
                end_led,
                transform: DisplayTransform::Linear,
            });
        }
        config
    }

    /// Equal-width bands over the whole magnitude buffer.
    pub fn linear(band_count: usize, led_count: u16) -> Self {
        let mut config = Self::empty(led_count);
        let fft_size = config.fft_size as usize;
        let band_count = band_count.clamp(1, MAX_BANDS);
        for i in 0..band_count {
            let start_bin = (i * fft_size / band_count) as u16;
            let end_bin = ((i + 1) * fft_size / band_count) as u16;
            let (start_led, end_led) = even_led_split(i, band_count, led_count);
            let _ = config.bands.push(BandConfig {
                start_bin,
                end_bin,
                start_led,
                end_led,
                transform: DisplayTransform::Linear,
            });
        }
        config
    }

    /// Same bands, every one of them rendered through `transform`.
    pub fn with_transform(mut self, transform: DisplayTransform) -> Self {
        for band in self.bands.iter_mut() {
            band.transform = transform;
        }
        self
    }

    fn empty(led_count: u16) -> Self {
        Self {
            config_version: CONFIG_VERSION,
            fft_size: DEFAULT_FFT_SIZE,
            led_count,
            bands: heapless::Vec::new(),
            autoscale: Autoscale::PerBand,
            offset: NoiseFloorOffset::Standard,
            alignment: PixelAlignment::Centered,
            average_window: 512,
            hue: HueSweepConfig::default(),
            fade: FadeConfig::default(),
            boxes: BoxFadeConfig::default(),
        }
    }
}

fn even_led_split(index: usize, band_count: usize, led_count: u16) -> (u16, u16) {
    let leds = led_count as usize;
    let start = index * leds / band_count;
    let end = (index + 1) * leds / band_count;
    (start as u16, end as u16)
}

impl Default for StripConfig {
    fn default() -> Self {
        Self::octave(DEFAULT_BAND_COUNT, DEFAULT_LED_COUNT)
    }
}

impl Default for HueSweepConfig {
    fn default() -> Self {
        Self {
            start_hue: 0,
            end_hue: 255,
            saturation: 255,
            reverse_wheel: false,
            sweep_time_ms: 20_000,
        }
    }
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            edge_fade_us: 2_000,
            new_value_fade_us: 10_000,
            high_brightness_threshold: 80,
        }
    }
}

impl Default for BoxFadeConfig {
    fn default() -> Self {
        Self {
            box_count: 8,
            max_progress: 1 << 15,
            fade_step: 1 << 7,
        }
    }
}
