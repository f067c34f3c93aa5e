//! Per-band automatic gain.
//!
//! The controller assumes last cycle's scale was roughly right and nudges it. Bands under
//! quarter scale lower their divisor and bands over it raise it. A clipped band raises it five
//! times as fast. No PID, no hysteresis.

use common::config::Autoscale;

use crate::MAX_BIN_VALUE;

pub const AUTOSCALE_INCREMENT: f32 = 0.1;
pub const INITIAL_AUTOSCALE: f32 = 4.0;
pub const MINIMUM_SCALE: f32 = 1.0;
/// Activation threshold: a quarter of the largest band value.
pub const QUARTER_MAX_BIN_VALUE: u8 = MAX_BIN_VALUE / 4;

/// Divides `raw` by `scale`, clamped into the displayable range.
pub fn normalize(raw: u32, scale: f32) -> u8 {
    let scaled = raw as f32 / scale;
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, MAX_BIN_VALUE as f32) as u8
}

/// Scale to use next cycle given the value this cycle produced.
pub fn next_scale(normalized: u8, scale: f32) -> f32 {
    if normalized < QUARTER_MAX_BIN_VALUE {
        if scale >= AUTOSCALE_INCREMENT && scale > MINIMUM_SCALE {
            (scale - AUTOSCALE_INCREMENT).max(MINIMUM_SCALE)
        } else {
            MINIMUM_SCALE
        }
    } else if normalized > QUARTER_MAX_BIN_VALUE {
        if normalized >= MAX_BIN_VALUE {
            scale + 5.0 * AUTOSCALE_INCREMENT
        } else {
            scale + AUTOSCALE_INCREMENT
        }
    } else {
        scale
    }
}

/// One autogain step: `(normalized value, scale for the next cycle)`.
pub fn update(raw: u32, scale: f32) -> (u8, f32) {
    let normalized = normalize(raw, scale);
    (normalized, next_scale(normalized, scale))
}

/// Holds one scale per band.
pub struct AutoGainController<const N: usize> {
    scales: [f32; N],
    mode: Autoscale,
}

impl<const N: usize> AutoGainController<N> {
    pub fn new(mode: Autoscale) -> Self {
        Self {
            scales: [INITIAL_AUTOSCALE; N],
            mode,
        }
    }

    pub fn scales(&self) -> &[f32; N] {
        &self.scales
    }

    pub fn mode(&self) -> Autoscale {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Autoscale) {
        self.mode = mode;
    }

    /// Scale band `band` will be divided by this cycle.
    pub fn scale_for(&self, band: usize, override_scale: Option<f32>) -> f32 {
        match (override_scale, self.mode) {
            (Some(scale), _) => scale,
            (None, Autoscale::Uniform { scale }) => scale,
            (None, Autoscale::PerBand) => self.scales[band],
        }
    }

    /// Normalizes one cycle of band sums.
    ///
    /// Per-band scales only adapt when neither an override nor uniform mode supplies the scale.
    pub fn process(&mut self, sums: &[u32; N], override_scale: Option<f32>) -> [u8; N] {
        let adaptive = override_scale.is_none() && self.mode == Autoscale::PerBand;
        let mut values = [0u8; N];
        for (i, (&raw, value)) in sums.iter().zip(values.iter_mut()).enumerate() {
            let scale = self.scale_for(i, override_scale);
            if adaptive {
                let (normalized, next) = update(raw, scale);
                *value = normalized;
                self.scales[i] = next;
            } else {
                *value = normalize(raw, scale);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quiet_band_lowers_scale() {
        let (value, scale) = update(40, 4.0);
        assert_eq!(value, 10);
        assert_abs_diff_eq!(scale, 3.9, epsilon = 1e-6);
    }

    #[test]
    fn loud_band_raises_scale() {
        let (value, scale) = update(400, 4.0);
        assert_eq!(value, 100);
        assert_abs_diff_eq!(scale, 4.1, epsilon = 1e-6);
    }

    #[test]
    fn clipped_band_raises_scale_faster() {
        let (value, scale) = update(10_000, 4.0);
        assert_eq!(value, MAX_BIN_VALUE);
        assert_abs_diff_eq!(scale, 4.5, epsilon = 1e-6);
    }

    #[test]
    fn threshold_holds_scale() {
        let raw = QUARTER_MAX_BIN_VALUE as u32 * 2;
        assert_eq!(update(raw, 2.0), (QUARTER_MAX_BIN_VALUE, 2.0));
    }

    #[test]
    fn scale_never_drops_below_minimum() {
        let mut scale = INITIAL_AUTOSCALE;
        for _ in 0..10_000 {
            scale = update(0, scale).1;
            assert!(scale >= MINIMUM_SCALE);
        }
        assert_eq!(scale, MINIMUM_SCALE);

        // a scale just above the floor snaps to it instead of undershooting
        assert_eq!(next_scale(0, 1.05), MINIMUM_SCALE);
        assert_eq!(next_scale(0, 0.05), MINIMUM_SCALE);
    }

    #[test]
    fn constant_loud_input_converges_to_threshold() {
        let raw = 200;
        let mut scale = MINIMUM_SCALE;
        let mut value = normalize(raw, scale);
        // climbs strictly while the band sits above the threshold
        while value > QUARTER_MAX_BIN_VALUE {
            let (_, next) = update(raw, scale);
            assert!(next > scale);
            scale = next;
            value = normalize(raw, scale);
        }
        // then settles within one increment of the threshold
        for _ in 0..1_000 {
            let (v, next) = update(raw, scale);
            scale = next;
            let tolerance = (raw as f32 / (scale - AUTOSCALE_INCREMENT)
                - raw as f32 / (scale + AUTOSCALE_INCREMENT))
                .ceil() as i32;
            assert!(
                (v as i32 - QUARTER_MAX_BIN_VALUE as i32).abs() <= tolerance,
                "value {v} drifted from threshold at scale {scale}"
            );
        }
    }

    #[test]
    fn first_cycle_uses_initial_scale() {
        let mut controller = AutoGainController::<3>::new(Autoscale::PerBand);
        let values = controller.process(&[200, 0, 5000], None);
        assert_eq!(values, [50, 0, 255]);
        assert_abs_diff_eq!(controller.scales()[0], 3.9, epsilon = 1e-6);
        assert_abs_diff_eq!(controller.scales()[2], 4.5, epsilon = 1e-6);
    }

    #[test]
    fn uniform_mode_bypasses_adaptation() {
        let mut controller = AutoGainController::<2>::new(Autoscale::Uniform { scale: 2.0 });
        for _ in 0..10 {
            assert_eq!(controller.process(&[100, 1000], None), [50, 255]);
        }
        assert_eq!(controller.scales(), &[INITIAL_AUTOSCALE; 2]);
    }

    #[test]
    fn override_scale_bypasses_adaptation() {
        let mut controller = AutoGainController::<2>::new(Autoscale::PerBand);
        assert_eq!(controller.process(&[100, 10], Some(10.0)), [10, 1]);
        assert_eq!(controller.scales(), &[INITIAL_AUTOSCALE; 2]);
    }
}
