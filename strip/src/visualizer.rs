use alloc::boxed::Box;

use anyhow::Result;
use common::config::StripConfig;
use smart_leds::RGB8;

use crate::box_fade::BoxFadeController;
use crate::bus::LedBus;
use crate::debug::{DebugCommand, DebugFlags};
use crate::hue::HueSweep;
use crate::layout::{self, BandSpec};
use crate::processor::{Analyzer, AudioProcessor, FrameSubscriber, RenderContext};
use crate::renderer::FrameRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightingMode {
    /// spectrum from the analyzer
    Audio,
    /// box fades, analyzer ignored
    Ambient,
}

/// Outcome of one [`Visualizer::tick`].
#[derive(Debug)]
pub struct TickReport<E> {
    pub frame_ready: bool,
    /// average band sum of the frame, when there was one
    pub average: Option<u32>,
    pub flush: Result<(), E>,
}

/// Polling control loop: analyzer in, one LED flush out per tick.
pub struct Visualizer<A, B, const N: usize, const L: usize>
where
    A: Analyzer,
    B: LedBus<L>,
{
    analyzer: A,
    bus: B,
    leds: [RGB8; L],
    specs: [BandSpec; N],
    processor: AudioProcessor<N, L>,
    hue: HueSweep,
    last_hue_us: Option<u64>,
    boxes: BoxFadeController,
    debug: DebugFlags,
    mode: LightingMode,
    override_scale: Option<f32>,
    calibration_requested: bool,
}

impl<A, B, const N: usize, const L: usize> Visualizer<A, B, N, L>
where
    A: Analyzer,
    B: LedBus<L>,
{
    /// Validates `config` and wires the spectrum renderer as the first subscriber.
    pub fn new(config: &StripConfig, analyzer: A, bus: B) -> Result<Self> {
        let specs = layout::validate::<N, L>(config)?;
        let mut processor = AudioProcessor::new(&specs, config.autoscale);
        processor.connect(Box::new(FrameRenderer::<N, L>::new(&specs, config)))?;
        layout::print_bins(&specs);

        Ok(Self {
            analyzer,
            bus,
            leds: [RGB8::default(); L],
            specs,
            processor,
            hue: HueSweep::new(&config.hue),
            last_hue_us: None,
            boxes: BoxFadeController::new(&config.boxes),
            debug: DebugFlags::default(),
            mode: LightingMode::Audio,
            override_scale: None,
            calibration_requested: false,
        })
    }

    /// Replaces the whole layout. Extra subscribers are dropped with the old processor.
    pub fn reconfigure(&mut self, config: &StripConfig) -> Result<()> {
        let specs = layout::validate::<N, L>(config)?;
        let mut processor = AudioProcessor::new(&specs, config.autoscale);
        processor.connect(Box::new(FrameRenderer::<N, L>::new(&specs, config)))?;
        self.specs = specs;
        self.processor = processor;
        self.hue = HueSweep::new(&config.hue);
        self.boxes = BoxFadeController::new(&config.boxes);
        self.leds = [RGB8::default(); L];
        layout::print_bins(&self.specs);
        Ok(())
    }

    pub fn connect(&mut self, subscriber: Box<dyn FrameSubscriber<N, L>>) -> Result<()> {
        self.processor.connect(subscriber)
    }

    pub fn tick(&mut self, now_us: u64) -> TickReport<B::Error> {
        let elapsed_ms = match self.last_hue_us.replace(now_us) {
            Some(last) => now_us.saturating_sub(last) as f32 / 1000.0,
            None => 0.0,
        };

        let (average, flush) = match self.mode {
            LightingMode::Audio => {
                let mut ctx = RenderContext {
                    now_us,
                    color: &self.hue,
                    leds: &mut self.leds,
                    debug: self.debug,
                };
                let average = self.processor.analyze(&mut self.analyzer, self.override_scale, &mut ctx);
                self.hue.advance(elapsed_ms);
                (average, self.bus.flush(&self.leds))
            }
            LightingMode::Ambient => {
                self.hue.advance(elapsed_ms);
                (None, self.boxes.render(&mut self.leds, &mut self.bus))
            }
        };

        if let Err(e) = &flush {
            log::error!("Failed to write LEDs: {:?}", e);
        }

        TickReport {
            frame_ready: average.is_some(),
            average,
            flush,
        }
    }

    /// Handles one console character. Unknown characters are ignored.
    pub fn handle_command(&mut self, c: char) -> Option<DebugCommand> {
        let Some(command) = DebugCommand::parse(c) else {
            log::warn!("Unknown command {:?}", c);
            return None;
        };
        match command {
            DebugCommand::PrintBins => layout::print_bins(&self.specs),
            DebugCommand::Calibrate => {
                log::info!("Calibration requested, keep the input silent");
                self.calibration_requested = true;
            }
            _ => {
                self.debug.apply(command);
            }
        }
        Some(command)
    }

    /// Clears and returns a pending `c` request.
    pub fn take_calibration_request(&mut self) -> bool {
        core::mem::take(&mut self.calibration_requested)
    }

    pub fn set_mode(&mut self, mode: LightingMode) {
        if mode != self.mode {
            log::info!("Lighting mode {:?}", mode);
        }
        self.mode = mode;
    }

    pub fn mode(&self) -> LightingMode {
        self.mode
    }

    /// Divides every band by `scale` instead of its adaptive scale. `None` restores autoscale.
    pub fn set_override_scale(&mut self, scale: Option<f32>) {
        self.override_scale = scale;
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }

    pub fn specs(&self) -> &[BandSpec; N] {
        &self.specs
    }

    pub fn leds(&self) -> &[RGB8; L] {
        &self.leds
    }

    pub fn hue(&self) -> &HueSweep {
        &self.hue
    }

    pub fn hue_mut(&mut self) -> &mut HueSweep {
        &mut self.hue
    }

    pub fn boxes_mut(&mut self) -> &mut BoxFadeController {
        &mut self.boxes
    }

    pub fn processor(&self) -> &AudioProcessor<N, L> {
        &self.processor
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Analyzer for Silent {
        fn is_frame_ready(&mut self) -> bool {
            false
        }

        fn read_magnitudes(&mut self) -> &[u16] {
            &[]
        }
    }

    #[derive(Default)]
    struct Counting {
        flushes: usize,
        fail: bool,
    }

    impl LedBus<120> for Counting {
        type Error = ();

        fn flush(&mut self, _leds: &[RGB8; 120]) -> Result<(), ()> {
            self.flushes += 1;
            if self.fail { Err(()) } else { Ok(()) }
        }
    }

    fn visualizer() -> Visualizer<Silent, Counting, 8, 120> {
        Visualizer::new(&StripConfig::default(), Silent, Counting::default()).unwrap()
    }

    #[test]
    fn rejects_layout_that_does_not_fit() {
        let result = Visualizer::<Silent, Counting, 4, 120>::new(&StripConfig::default(), Silent, Counting::default());
        assert!(result.is_err());
    }

    #[test]
    fn flushes_once_per_tick_in_both_modes() {
        let mut visualizer = visualizer();
        let report = visualizer.tick(0);
        assert!(!report.frame_ready);
        assert_eq!(visualizer.bus().flushes, 1);

        visualizer.set_mode(LightingMode::Ambient);
        visualizer.tick(1_000);
        assert_eq!(visualizer.bus().flushes, 2);
    }

    #[test]
    fn flush_errors_are_reported_and_loop_continues() {
        let mut visualizer = visualizer();
        visualizer.bus_mut().fail = true;
        assert!(visualizer.tick(0).flush.is_err());
        visualizer.bus_mut().fail = false;
        assert!(visualizer.tick(10).flush.is_ok());
    }

    #[test]
    fn hue_advances_with_wall_clock() {
        let mut visualizer = visualizer();
        visualizer.tick(5_000_000);
        assert_eq!(visualizer.hue().hue(), 0.0);
        visualizer.tick(5_000_000 + 1_000_000);
        assert!(visualizer.hue().hue() > 0.0);
    }

    #[test]
    fn reconfigure_replaces_the_layout() {
        let mut visualizer = visualizer();
        visualizer.reconfigure(&StripConfig::linear(8, 120)).unwrap();
        assert_eq!(visualizer.specs()[7].end_bin, 512);
        assert_eq!(visualizer.processor().aggregator().bin_sum_counts()[0], 64);
        assert_eq!(visualizer.processor().subscriber_count(), 1);

        assert!(visualizer.reconfigure(&StripConfig::linear(4, 120)).is_err());
        assert_eq!(visualizer.specs()[7].end_bin, 512);
    }

    #[test]
    fn console_commands() {
        let mut visualizer = visualizer();
        assert_eq!(visualizer.handle_command('s'), Some(DebugCommand::Autoscale));
        assert!(visualizer.debug_flags().autoscale);
        assert_eq!(visualizer.handle_command('b'), Some(DebugCommand::PrintBins));
        assert!(visualizer.debug_flags().autoscale);
        assert_eq!(visualizer.handle_command('?'), None);

        assert!(!visualizer.take_calibration_request());
        visualizer.handle_command('c');
        assert!(visualizer.take_calibration_request());
        assert!(!visualizer.take_calibration_request());
    }
}
