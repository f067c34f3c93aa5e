use common::config::DisplayTransform;

use crate::MAX_BIN_VALUE;

/// Evaluates `kind` at `value`.
///
/// The log of anything below 1 is taken as 0 so silence maps to the bottom of the range
/// instead of negative infinity.
pub fn apply(kind: DisplayTransform, value: f32) -> f32 {
    match kind {
        DisplayTransform::Linear => value,
        DisplayTransform::Log => libm::logf(value.max(1.0)),
        DisplayTransform::Square => value * value,
        DisplayTransform::SquareRoot => libm::sqrtf(value.max(0.0)),
    }
}

/// Each transform evaluated at the largest band value, computed once at startup.
#[derive(Clone, Copy, Debug)]
pub struct TransformMaxima {
    linear: f32,
    log: f32,
    square: f32,
    square_root: f32,
}

impl TransformMaxima {
    pub fn new() -> Self {
        let max = MAX_BIN_VALUE as f32;
        Self {
            linear: apply(DisplayTransform::Linear, max),
            log: apply(DisplayTransform::Log, max),
            square: apply(DisplayTransform::Square, max),
            square_root: apply(DisplayTransform::SquareRoot, max),
        }
    }

    pub fn get(&self, kind: DisplayTransform) -> f32 {
        match kind {
            DisplayTransform::Linear => self.linear,
            DisplayTransform::Log => self.log,
            DisplayTransform::Square => self.square,
            DisplayTransform::SquareRoot => self.square_root,
        }
    }
}

impl Default for TransformMaxima {
    fn default() -> Self {
        Self::new()
    }
}
