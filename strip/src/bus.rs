use core::fmt::Debug;

use smart_leds::RGB8;
use smart_leds_trait::SmartLedsWrite;

/// Sink for a finished framebuffer. One `flush` per tick.
pub trait LedBus<const L: usize> {
    type Error: Debug;

    fn flush(&mut self, leds: &[RGB8; L]) -> Result<(), Self::Error>;
}

/// Adapts any `smart-leds` driver to [`LedBus`].
pub struct SmartLedsBus<W>(pub W);

impl<W, const L: usize> LedBus<L> for SmartLedsBus<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    type Error = W::Error;

    fn flush(&mut self, leds: &[RGB8; L]) -> Result<(), Self::Error> {
        self.0.write(leds.iter().copied())
    }
}
