use common::config::{FadeConfig, NoiseFloorOffset, PixelAlignment, StripConfig};

use crate::RESOLUTION;
use crate::band::{BandRenderState, FadeAmounts};
use crate::layout::BandSpec;
use crate::processor::{FrameSnapshot, FrameSubscriber, RenderContext};
use crate::transform::TransformMaxima;

/// Turns elapsed time into whole fade units.
///
/// One unit is `fade_us / RESOLUTION`, so a full 8-bit fade takes roughly `fade_us`.
#[derive(Clone, Copy, Debug)]
struct FadeClock {
    unit_us: u64,
    last_us: Option<u64>,
}

impl FadeClock {
    fn new(fade_us: u32) -> Self {
        Self {
            unit_us: (fade_us / RESOLUTION).max(1) as u64,
            last_us: None,
        }
    }

    /// Units elapsed since the last consumed unit. The first call only starts the clock.
    fn take(&mut self, now_us: u64) -> u8 {
        let last = *self.last_us.get_or_insert(now_us);
        let units = now_us.saturating_sub(last) / self.unit_us;
        if units > 0 {
            self.last_us = Some(last + units * self.unit_us);
        }
        units.min(u8::MAX as u64) as u8
    }
}

/// Spectrum renderer: one [`BandRenderState`] per band, written into the shared framebuffer.
pub struct FrameRenderer<const N: usize, const L: usize> {
    bands: [BandRenderState; N],
    brightness: [u8; L],
    maxima: TransformMaxima,
    offset: NoiseFloorOffset,
    alignment: PixelAlignment,
    high_brightness_threshold: u8,
    edge_clock: FadeClock,
    new_value_clock: FadeClock,
}

impl<const N: usize, const L: usize> FrameRenderer<N, L> {
    pub fn new(specs: &[BandSpec; N], config: &StripConfig) -> Self {
        Self {
            bands: core::array::from_fn(|i| BandRenderState::new(specs[i], config.average_window)),
            brightness: [0; L],
            maxima: TransformMaxima::new(),
            offset: config.offset,
            alignment: config.alignment,
            high_brightness_threshold: config.fade.high_brightness_threshold,
            edge_clock: FadeClock::new(config.fade.edge_fade_us),
            new_value_clock: FadeClock::new(config.fade.new_value_fade_us),
        }
    }

    pub fn set_fade(&mut self, fade: &FadeConfig) {
        self.edge_clock = FadeClock::new(fade.edge_fade_us);
        self.new_value_clock = FadeClock::new(fade.new_value_fade_us);
        self.high_brightness_threshold = fade.high_brightness_threshold;
    }

    pub fn bands(&self) -> &[BandRenderState; N] {
        &self.bands
    }

    pub fn brightness(&self) -> &[u8; L] {
        &self.brightness
    }

    /// Renders one tick. With `frame == None` only the fade runs.
    pub fn render(&mut self, frame: Option<&FrameSnapshot<N>>, ctx: &mut RenderContext<'_, L>) {
        let fade = FadeAmounts {
            edge: self.edge_clock.take(ctx.now_us),
            new_value: self.new_value_clock.take(ctx.now_us),
        };

        for (i, band) in self.bands.iter_mut().enumerate() {
            if let Some(frame) = frame {
                let update = band.update(frame.values()[i], &self.maxima, self.offset);
                if ctx.debug.render && i == 0 {
                    log::debug!(
                        "Render band 0: value {} transformed {:.2} avg {:.2} excursion {:.2} range {:.2} lit {}",
                        frame.values()[i],
                        update.transformed,
                        update.scaled_average,
                        update.excursion,
                        update.range,
                        update.lit
                    );
                }
            }

            let leds = band.spec().start_led..band.spec().end_led;
            band.render(
                &mut self.brightness[leds.clone()],
                &mut ctx.leds[leds],
                fade,
                frame.is_some(),
                self.alignment,
                self.high_brightness_threshold,
                ctx.color,
            );
        }
    }
}

impl<const N: usize, const L: usize> FrameSubscriber<N, L> for FrameRenderer<N, L> {
    fn on_frame(&mut self, frame: Option<&FrameSnapshot<N>>, ctx: &mut RenderContext<'_, L>) {
        self.render(frame, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::DebugFlags;
    use crate::hue::HueSweep;
    use common::config::HueSweepConfig;
    use smart_leds::RGB8;

    const L: usize = 10;

    fn renderer() -> FrameRenderer<1, L> {
        let config = StripConfig::linear(1, L as u16);
        let specs = [BandSpec::from(&config.bands[0])];
        FrameRenderer::new(&specs, &config)
    }

    fn tick(renderer: &mut FrameRenderer<1, L>, leds: &mut [RGB8; L], now_us: u64, value: Option<u8>) {
        let hue = HueSweep::new(&HueSweepConfig::default());
        let frame = value.map(|v| FrameSnapshot::new([v]));
        let mut ctx = RenderContext {
            now_us,
            color: &hue,
            leds,
            debug: DebugFlags::default(),
        };
        renderer.render(frame.as_ref(), &mut ctx);
    }

    #[test]
    fn clock_counts_whole_units() {
        let mut clock = FadeClock::new(2000);
        assert_eq!(clock.take(1_000), 0);
        assert_eq!(clock.take(1_100), 0);
        assert_eq!(clock.take(1_600), 2);
        // remainder carries over
        assert_eq!(clock.take(1_650), 0);
        assert_eq!(clock.take(1_750), 1);
        assert_eq!(clock.take(1_000_000), u8::MAX);
    }

    #[test]
    fn loud_frame_lights_segment() {
        let mut renderer = renderer();
        let mut leds = [RGB8::default(); L];
        tick(&mut renderer, &mut leds, 0, Some(255));
        assert_eq!(renderer.bands()[0].lit(), L);
        assert!(renderer.brightness().iter().all(|&b| b == u8::MAX));
        assert!(leds.iter().all(|&led| led != RGB8::default()));
    }

    #[test]
    fn empty_tick_without_elapsed_time_changes_nothing() {
        let mut renderer = renderer();
        let mut leds = [RGB8::default(); L];
        tick(&mut renderer, &mut leds, 0, Some(255));
        let brightness = *renderer.brightness();
        let snapshot = leds;

        tick(&mut renderer, &mut leds, 0, None);
        tick(&mut renderer, &mut leds, 0, None);
        assert_eq!(renderer.brightness(), &brightness);
        assert_eq!(leds, snapshot);
    }

    #[test]
    fn bright_pixels_fade_over_time() {
        let mut renderer = renderer();
        let mut leds = [RGB8::default(); L];
        tick(&mut renderer, &mut leds, 0, Some(255));

        // 10 ms new-value fade: one unit per 1250 us
        tick(&mut renderer, &mut leds, 12_500, None);
        assert!(renderer.brightness().iter().all(|&b| b == u8::MAX - 10));

        tick(&mut renderer, &mut leds, 10_000_000, None);
        assert!(renderer.brightness().iter().all(|&b| b == 0));
        assert!(leds.iter().all(|&led| led == RGB8::default()));
    }
}
