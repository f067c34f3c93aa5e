use core::ops::Range;

use common::config::{NoiseFloorOffset, PixelAlignment};
use smart_leds::RGB8;

use crate::hue::HueSweep;
use crate::layout::BandSpec;
use crate::transform::{self, TransformMaxima};

/// Running average whose window grows by one sample per push until it reaches `window`.
#[derive(Clone, Copy, Debug)]
pub struct MovingAverage {
    value: f32,
    count: u32,
    window: u32,
}

impl MovingAverage {
    pub fn new(window: u16) -> Self {
        Self {
            value: 0.0,
            count: 0,
            window: (window as u32).max(1),
        }
    }

    pub fn push(&mut self, sample: f32) -> f32 {
        if self.count < self.window {
            self.count += 1;
        }
        let n = self.count as f32;
        self.value -= self.value / n;
        self.value += sample / n;
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Samples currently weighted into the average.
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Brightness units to remove from pixels this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FadeAmounts {
    /// applied to dim pixels touching a dark neighbour or the segment boundary
    pub edge: u8,
    /// applied to pixels above the high-brightness threshold
    pub new_value: u8,
}

impl FadeAmounts {
    pub fn is_zero(&self) -> bool {
        self.edge == 0 && self.new_value == 0
    }
}

/// Intermediate values of one band update, kept for the render debug dump.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandUpdate {
    pub transformed: f32,
    pub scaled_average: f32,
    pub excursion: f32,
    pub range: f32,
    pub lit: usize,
}

/// Animation state of one band's LED segment.
pub struct BandRenderState {
    spec: BandSpec,
    average: MovingAverage,
    lit: usize,
}

impl BandRenderState {
    pub fn new(spec: BandSpec, average_window: u16) -> Self {
        Self {
            spec,
            average: MovingAverage::new(average_window),
            lit: 0,
        }
    }

    pub fn spec(&self) -> &BandSpec {
        &self.spec
    }

    pub fn lit(&self) -> usize {
        self.lit
    }

    pub fn average(&self) -> &MovingAverage {
        &self.average
    }

    /// Feeds one normalized band value and recomputes the lit pixel count.
    ///
    /// Only the excursion above the scaled moving average is shown, mapped from
    /// `[0, transform max - scaled average]` onto the segment.
    pub fn update(&mut self, value: u8, maxima: &TransformMaxima, offset: NoiseFloorOffset) -> BandUpdate {
        let transformed = transform::apply(self.spec.transform, value as f32);
        let scaled_average = self.average.push(transformed) / offset.divisor();
        let excursion = (transformed - scaled_average).max(0.0);
        let range = maxima.get(self.spec.transform) - scaled_average;
        let led_count = self.spec.led_count();

        let lit = if range > 0.0 {
            (excursion / range * led_count as f32) as usize
        } else if excursion > 0.0 {
            led_count
        } else {
            0
        };
        self.lit = lit.min(led_count);

        BandUpdate {
            transformed,
            scaled_average,
            excursion,
            range,
            lit: self.lit,
        }
    }

    /// Lit pixels, relative to the start of the segment.
    pub fn lit_range(&self, alignment: PixelAlignment) -> Range<usize> {
        let start = match alignment {
            PixelAlignment::Centered => (self.spec.led_count() - self.lit) / 2,
            PixelAlignment::LeftAligned => 0,
        };
        start..start + self.lit
    }

    /// Writes the segment: lights the current lit range (when `new_value`) and fades the rest.
    ///
    /// `brightness` and `leds` are this band's slices of the strip. Dim pixels only fade when
    /// they touch a dark neighbour or the boundary, so the segment collapses from its edges.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        brightness: &mut [u8],
        leds: &mut [RGB8],
        fade: FadeAmounts,
        new_value: bool,
        alignment: PixelAlignment,
        high_brightness_threshold: u8,
        color: &HueSweep,
    ) {
        let count = brightness.len().min(leds.len());
        let lit = self.lit_range(alignment);
        for j in 0..count {
            if new_value && lit.contains(&j) {
                brightness[j] = u8::MAX;
                leds[j] = color.color();
            } else if !fade.is_zero() {
                let pixel = brightness[j];
                brightness[j] = if pixel > high_brightness_threshold {
                    pixel.saturating_sub(fade.new_value)
                } else if pixel > fade.edge {
                    let at_edge =
                        j == 0 || j == count - 1 || brightness[j - 1] == 0 || brightness[j + 1] == 0;
                    if at_edge { pixel - fade.edge } else { pixel }
                } else {
                    0
                };
                leds[j] = color.dimmed(brightness[j]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use common::config::{DisplayTransform, HueSweepConfig};

    fn band(leds: usize, transform: DisplayTransform) -> BandRenderState {
        BandRenderState::new(
            BandSpec {
                start_bin: 0,
                end_bin: 1,
                start_led: 0,
                end_led: leds,
                transform,
            },
            512,
        )
    }

    #[test]
    fn average_window_grows_then_caps() {
        let mut average = MovingAverage::new(4);
        assert_eq!(average.push(8.0), 8.0);
        assert_eq!(average.push(0.0), 4.0);
        assert_eq!(average.count(), 2);
        for _ in 0..10 {
            average.push(0.0);
        }
        assert_eq!(average.count(), 4);
        // capped window keeps a quarter of each new sample
        let before = average.value();
        assert_abs_diff_eq!(average.push(4.0), before * 0.75 + 1.0, epsilon = 1e-6);
    }

    #[test]
    fn first_value_is_offset_by_its_own_average() {
        let mut band = band(10, DisplayTransform::Linear);
        let update = band.update(200, &TransformMaxima::new(), NoiseFloorOffset::Standard);
        assert_abs_diff_eq!(update.scaled_average, 160.0, epsilon = 1e-4);
        assert_abs_diff_eq!(update.excursion, 40.0, epsilon = 1e-4);
        assert_abs_diff_eq!(update.range, 95.0, epsilon = 1e-4);
        // 40 / 95 * 10
        assert_eq!(update.lit, 4);
    }

    #[test]
    fn steady_input_goes_dark() {
        let mut band = band(10, DisplayTransform::Linear);
        let maxima = TransformMaxima::new();
        for _ in 0..50 {
            band.update(100, &maxima, NoiseFloorOffset::Aggressive);
        }
        // the average settles at 100, so the excursion is 100 - 100 / 1.5
        let update = band.update(100, &maxima, NoiseFloorOffset::Aggressive);
        assert_abs_diff_eq!(update.excursion, 100.0 / 3.0, epsilon = 1e-2);
        assert!(update.lit < 3);
        assert_eq!(band.update(0, &maxima, NoiseFloorOffset::Aggressive).lit, 0);
    }

    #[test]
    fn lit_count_stays_in_segment() {
        let maxima = TransformMaxima::new();
        for transform in [
            DisplayTransform::Linear,
            DisplayTransform::Log,
            DisplayTransform::Square,
            DisplayTransform::SquareRoot,
        ] {
            let mut band = band(7, transform);
            for v in [0u8, 255, 3, 255, 255, 0, 128, 255] {
                let lit = band.update(v, &maxima, NoiseFloorOffset::Standard).lit;
                assert!(lit <= 7, "{transform:?} lit {lit}");
            }
        }
    }

    #[test]
    fn centered_and_left_aligned_ranges() {
        let mut band = band(10, DisplayTransform::Linear);
        band.lit = 4;
        assert_eq!(band.lit_range(PixelAlignment::Centered), 3..7);
        assert_eq!(band.lit_range(PixelAlignment::LeftAligned), 0..4);
        band.lit = 10;
        assert_eq!(band.lit_range(PixelAlignment::Centered), 0..10);
    }

    #[test]
    fn dim_pixels_collapse_from_the_edges() {
        let band = band(5, DisplayTransform::Linear);
        let hue = HueSweep::new(&HueSweepConfig::default());
        let mut brightness = [50u8; 5];
        let mut leds = [RGB8::default(); 5];
        let fade = FadeAmounts { edge: 10, new_value: 1 };
        band.render(&mut brightness, &mut leds, fade, false, PixelAlignment::Centered, 80, &hue);
        assert_eq!(brightness, [40, 50, 50, 50, 40]);
    }

    #[test]
    fn bright_pixels_fade_everywhere() {
        let band = band(3, DisplayTransform::Linear);
        let hue = HueSweep::new(&HueSweepConfig::default());
        let mut brightness = [255u8, 200, 255];
        let mut leds = [RGB8::default(); 3];
        let fade = FadeAmounts { edge: 10, new_value: 5 };
        band.render(&mut brightness, &mut leds, fade, false, PixelAlignment::Centered, 80, &hue);
        assert_eq!(brightness, [250, 195, 250]);
    }

    #[test]
    fn pixel_at_or_below_edge_amount_goes_dark() {
        let band = band(3, DisplayTransform::Linear);
        let hue = HueSweep::new(&HueSweepConfig::default());
        let mut brightness = [60u8, 8, 60];
        let mut leds = [RGB8::new(1, 1, 1); 3];
        let fade = FadeAmounts { edge: 10, new_value: 5 };
        band.render(&mut brightness, &mut leds, fade, false, PixelAlignment::Centered, 80, &hue);
        assert_eq!(brightness, [50, 0, 50]);
        assert_eq!(leds[1], RGB8::new(0, 0, 0));
    }

    #[test]
    fn new_value_lights_with_current_color() {
        let mut band = band(6, DisplayTransform::Linear);
        band.lit = 2;
        let hue = HueSweep::new(&HueSweepConfig::default());
        let mut brightness = [0u8; 6];
        let mut leds = [RGB8::default(); 6];
        band.render(
            &mut brightness,
            &mut leds,
            FadeAmounts::default(),
            true,
            PixelAlignment::Centered,
            80,
            &hue,
        );
        assert_eq!(brightness, [0, 0, 255, 255, 0, 0]);
        assert_eq!(leds[2], hue.color());
        assert_eq!(leds[0], RGB8::default());
    }
}
