use alloc::boxed::Box;

use anyhow::Result;
use common::config::Autoscale;
use smart_leds::RGB8;

use crate::aggregator::BandAggregator;
use crate::autogain::AutoGainController;
use crate::debug::DebugFlags;
use crate::error_with_location;
use crate::hue::HueSweep;
use crate::layout::BandSpec;
use crate::{MAX_BIN_VALUE, MIN_PEAK_VALUE};

/// Upper bound on renderers fed by one processor.
pub const MAX_SUBSCRIBERS: usize = 16;

/// Source of magnitude buffers (the FFT).
pub trait Analyzer {
    fn is_frame_ready(&mut self) -> bool;

    /// Latest magnitude buffer. Only valid until the next call into the analyzer.
    fn read_magnitudes(&mut self) -> &[u16];
}

/// Normalized band values of one analysis cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSnapshot<const N: usize> {
    peak: u8,
    values: [u8; N],
}

impl<const N: usize> FrameSnapshot<N> {
    pub fn new(values: [u8; N]) -> Self {
        let mut snapshot = Self { peak: 0, values };
        snapshot.set_peak(values.iter().copied().max().unwrap_or(0));
        snapshot
    }

    /// Sets the peak, clamped to `[MIN_PEAK_VALUE, MAX_BIN_VALUE]`.
    pub fn set_peak(&mut self, peak: u8) {
        self.peak = peak.clamp(MIN_PEAK_VALUE, MAX_BIN_VALUE);
    }

    pub fn peak(&self) -> u8 {
        self.peak
    }

    pub fn values(&self) -> &[u8; N] {
        &self.values
    }
}

/// Everything a renderer may touch during one tick.
pub struct RenderContext<'a, const L: usize> {
    pub now_us: u64,
    pub color: &'a HueSweep,
    pub leds: &'a mut [RGB8; L],
    pub debug: DebugFlags,
}

/// Receives every analysis cycle, or `None` when the analyzer had nothing new.
pub trait FrameSubscriber<const N: usize, const L: usize> {
    fn on_frame(&mut self, frame: Option<&FrameSnapshot<N>>, ctx: &mut RenderContext<'_, L>);
}

/// Aggregates, gains and fans each analysis cycle out to its subscribers.
pub struct AudioProcessor<const N: usize, const L: usize> {
    aggregator: BandAggregator<N>,
    gain: AutoGainController<N>,
    subscribers: heapless::Vec<Box<dyn FrameSubscriber<N, L>>, MAX_SUBSCRIBERS>,
}

impl<const N: usize, const L: usize> AudioProcessor<N, L> {
    pub fn new(specs: &[BandSpec; N], autoscale: Autoscale) -> Self {
        Self {
            aggregator: BandAggregator::new(specs),
            gain: AutoGainController::new(autoscale),
            subscribers: heapless::Vec::new(),
        }
    }

    pub fn connect(&mut self, subscriber: Box<dyn FrameSubscriber<N, L>>) -> Result<()> {
        self.subscribers
            .push(subscriber)
            .map_err(|_| error_with_location!("all {} subscriber slots are taken", MAX_SUBSCRIBERS))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn gain(&self) -> &AutoGainController<N> {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut AutoGainController<N> {
        &mut self.gain
    }

    pub fn aggregator(&self) -> &BandAggregator<N> {
        &self.aggregator
    }

    /// Runs one cycle. Returns the average band sum when the analyzer had a frame.
    ///
    /// Subscribers are notified either way so they can keep animating without input.
    pub fn analyze<A: Analyzer>(
        &mut self,
        analyzer: &mut A,
        override_scale: Option<f32>,
        ctx: &mut RenderContext<'_, L>,
    ) -> Option<u32> {
        if !analyzer.is_frame_ready() {
            self.visualize(None, ctx);
            return None;
        }

        let magnitudes = analyzer.read_magnitudes();
        if ctx.debug.fft {
            log::debug!("FFT: {:?}", magnitudes);
        }
        let sums = self.aggregator.aggregate(magnitudes);
        let average = sums.iter().map(|&sum| sum / N.max(1) as u32).sum();

        if ctx.debug.autoscale {
            for (i, &sum) in sums.iter().enumerate() {
                log::debug!(
                    "Freq bin {:2}: value {}, scale {:.2}",
                    i,
                    sum,
                    self.gain.scale_for(i, override_scale)
                );
            }
        }
        let values = self.gain.process(&sums, override_scale);
        if ctx.debug.autoscale {
            log::debug!("Scaled values: {:?}", values);
        }

        let frame = FrameSnapshot::new(values);
        self.visualize(Some(&frame), ctx);
        Some(average)
    }

    fn visualize(&mut self, frame: Option<&FrameSnapshot<N>>, ctx: &mut RenderContext<'_, L>) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_frame(frame, ctx);
        }
    }
}
