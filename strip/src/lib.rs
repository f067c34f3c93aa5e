//! Signal-to-light pipeline for an addressable LED strip.
//!
//! One analysis cycle flows
//! magnitude buffer → [`BandAggregator`] → [`AutoGainController`] → display transform →
//! [`FrameRenderer`] → RGB framebuffer → [`LedBus`].
//! [`Visualizer`] is the polling control loop that drives it once per tick.
#![no_std]

extern crate alloc;

pub mod aggregator;
pub mod autogain;
pub mod band;
pub mod box_fade;
pub mod bus;
pub mod calibration;
pub mod debug;
pub mod hue;
pub mod layout;
pub mod processor;
pub mod renderer;
pub mod transform;
pub mod util;
pub mod visualizer;

pub use aggregator::BandAggregator;
pub use autogain::AutoGainController;
pub use band::{BandRenderState, MovingAverage};
pub use box_fade::BoxFadeController;
pub use bus::{LedBus, SmartLedsBus};
pub use calibration::{CalibrationStore, load_or_calibrate};
pub use debug::{DebugCommand, DebugFlags};
pub use hue::{HueSweep, SweepDirection};
pub use layout::{BandSpec, validate};
pub use processor::{Analyzer, AudioProcessor, FrameSnapshot, FrameSubscriber, RenderContext};
pub use renderer::FrameRenderer;
pub use transform::TransformMaxima;
pub use visualizer::{LightingMode, TickReport, Visualizer};

pub use common::config;

/// Amplitude bits per band value.
pub const RESOLUTION: u32 = 8;
/// Largest normalized band value.
pub const MAX_BIN_VALUE: u8 = ((1u32 << RESOLUTION) - 1) as u8;
/// Floor for a frame's reported peak.
pub const MIN_PEAK_VALUE: u8 = 2;
