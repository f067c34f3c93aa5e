use common::config::HueSweepConfig;
use smart_leds::RGB8;
use smart_leds::hsv::{Hsv, hsv2rgb};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepDirection {
    Forward,
    Backward,
}

/// Active color of the strip: a hue bouncing between two bounds over wall-clock time.
///
/// Hues are fractions of the color wheel. A bound may sit outside `[0, 1]` after
/// wheel-direction adjustment; it wraps when converted to an 8-bit hue.
#[derive(Clone, Debug)]
pub struct HueSweep {
    hue: f32,
    start_hue: f32,
    end_hue: f32,
    direction: SweepDirection,
    /// wheel fraction per millisecond
    hue_delta: f32,
    sweep_time_ms: u32,
    saturation: u8,
    current_color: RGB8,
}

impl HueSweep {
    pub fn new(config: &HueSweepConfig) -> Self {
        let mut sweep = Self {
            hue: 0.0,
            start_hue: 0.0,
            end_hue: 1.0,
            direction: SweepDirection::Forward,
            hue_delta: 0.0,
            sweep_time_ms: config.sweep_time_ms.max(1),
            saturation: config.saturation,
            current_color: RGB8::default(),
        };
        sweep.set_color_sweep(
            config.start_hue,
            config.end_hue,
            config.saturation,
            config.reverse_wheel,
        );
        sweep
    }

    /// Milliseconds for one pass from start to end.
    pub fn set_sweep_time(&mut self, sweep_time_ms: u32) {
        self.sweep_time_ms = sweep_time_ms.max(1);
        self.hue_delta = libm::fabsf(self.end_hue - self.start_hue) / self.sweep_time_ms as f32;
    }

    /// Restarts the sweep at `start_hue8`.
    ///
    /// With `reverse_wheel` the sweep runs backwards around the wheel to reach the end hue.
    pub fn set_color_sweep(&mut self, start_hue8: u8, end_hue8: u8, saturation: u8, reverse_wheel: bool) {
        self.saturation = saturation;
        self.start_hue = start_hue8 as f32 / 255.0;
        self.end_hue = end_hue8 as f32 / 255.0;
        self.hue = self.start_hue;

        if reverse_wheel {
            self.direction = SweepDirection::Backward;
            if self.start_hue < self.end_hue {
                self.end_hue -= 1.0;
            }
        } else {
            self.direction = SweepDirection::Forward;
            if self.end_hue < self.start_hue {
                self.end_hue += 1.0;
            }
        }

        self.set_sweep_time(self.sweep_time_ms);
        self.current_color = self.hsv(u8::MAX);
    }

    /// Moves the hue by `elapsed_ms` worth of sweep, bouncing off the end bound.
    ///
    /// A sweep whose bounds coincide holds its hue and direction.
    pub fn advance(&mut self, elapsed_ms: f32) {
        if self.hue_delta == 0.0 {
            return;
        }
        let step = self.hue_delta * elapsed_ms.max(0.0);
        match self.direction {
            SweepDirection::Forward => {
                self.hue += step;
                if self.hue >= self.end_hue {
                    self.bounce(SweepDirection::Backward);
                }
            }
            SweepDirection::Backward => {
                self.hue -= step;
                if self.hue <= self.end_hue {
                    self.bounce(SweepDirection::Forward);
                }
            }
        }
        self.current_color = self.hsv(u8::MAX);
    }

    fn bounce(&mut self, direction: SweepDirection) {
        self.hue = self.end_hue;
        core::mem::swap(&mut self.start_hue, &mut self.end_hue);
        self.direction = direction;
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    /// Current hue on the 8-bit color wheel.
    pub fn hue8(&self) -> u8 {
        (libm::floorf(self.hue * 255.0) as i32).rem_euclid(256) as u8
    }

    pub fn direction(&self) -> SweepDirection {
        self.direction
    }

    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Full-brightness color for newly lit pixels.
    pub fn color(&self) -> RGB8 {
        self.current_color
    }

    /// Current hue at `brightness`.
    pub fn dimmed(&self, brightness: u8) -> RGB8 {
        if brightness == 0 {
            return RGB8::default();
        }
        self.hsv(brightness)
    }

    fn hsv(&self, val: u8) -> RGB8 {
        hsv2rgb(Hsv {
            hue: self.hue8(),
            sat: self.saturation,
            val,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(start_hue: u8, end_hue: u8, sweep_time_ms: u32) -> HueSweepConfig {
        HueSweepConfig {
            start_hue,
            end_hue,
            saturation: 255,
            reverse_wheel: false,
            sweep_time_ms,
        }
    }

    #[test]
    fn full_sweep_returns_to_start() {
        let mut sweep = HueSweep::new(&config(0, 255, 1024));
        let start = sweep.hue();
        let mut flips = 0;
        let mut direction = sweep.direction();
        for _ in 0..2048 {
            sweep.advance(1.0);
            if sweep.direction() != direction {
                flips += 1;
                direction = sweep.direction();
            }
        }
        assert_eq!(flips, 2);
        assert_abs_diff_eq!(sweep.hue(), start, epsilon = 1.0 / 1024.0);
        assert_eq!(sweep.direction(), SweepDirection::Forward);
    }

    #[test]
    fn speed_depends_on_time_not_ticks() {
        let mut coarse = HueSweep::new(&config(0, 255, 20_000));
        let mut fine = coarse.clone();
        coarse.advance(500.0);
        for _ in 0..100 {
            fine.advance(5.0);
        }
        assert_abs_diff_eq!(coarse.hue(), fine.hue(), epsilon = 1e-4);
        assert_abs_diff_eq!(coarse.hue(), 0.025, epsilon = 1e-5);
    }

    #[test]
    fn fixed_hue_never_bounces() {
        let mut sweep = HueSweep::new(&config(100, 100, 1000));
        let hue8 = sweep.hue8();
        let color = sweep.color();
        for _ in 0..5 {
            sweep.advance(250.0);
            assert_eq!(sweep.direction(), SweepDirection::Forward);
        }
        assert_eq!(sweep.hue8(), hue8);
        assert_eq!(sweep.color(), color);
    }

    #[test]
    fn overshoot_is_clamped_to_the_bound() {
        let mut sweep = HueSweep::new(&config(0, 255, 100));
        sweep.advance(250.0);
        assert_eq!(sweep.hue(), 1.0);
        assert_eq!(sweep.direction(), SweepDirection::Backward);
    }

    #[test]
    fn end_below_start_wraps_forward() {
        let mut sweep = HueSweep::new(&config(200, 50, 1000));
        sweep.advance(2000.0);
        // the end bound sits one wheel turn above 50/255
        assert!(sweep.hue() > 1.0);
        assert!(sweep.hue8().abs_diff(50) <= 1, "hue8 {}", sweep.hue8());
        assert_eq!(sweep.direction(), SweepDirection::Backward);
    }

    #[test]
    fn reverse_wheel_runs_backwards() {
        let mut sweep = HueSweep::new(&HueSweepConfig {
            reverse_wheel: true,
            ..config(100, 200, 1000)
        });
        assert_eq!(sweep.direction(), SweepDirection::Backward);
        sweep.advance(10.0);
        assert!(sweep.hue() < 100.0 / 255.0);
    }

    #[test]
    fn dark_pixels_are_black() {
        let sweep = HueSweep::new(&HueSweepConfig::default());
        assert_eq!(sweep.dimmed(0), RGB8::default());
        assert_ne!(sweep.color(), RGB8::default());
    }
}
