//! Ambient lighting: the strip split into equal boxes, each fading toward its own color.

use common::config::BoxFadeConfig;
use smart_leds::RGB8;

use crate::bus::LedBus;

pub const MAX_BOXES: usize = 64;

#[derive(Clone, Copy, Debug, Default)]
struct ColorBox {
    current: RGB8,
    destination: RGB8,
    progress: u16,
}

pub struct BoxFadeController {
    boxes: heapless::Vec<ColorBox, MAX_BOXES>,
    max_progress: u16,
    fade_step: u16,
}

impl BoxFadeController {
    pub fn new(config: &BoxFadeConfig) -> Self {
        let boxes = (0..(config.box_count as usize).min(MAX_BOXES))
            .map(|_| ColorBox {
                progress: config.max_progress,
                ..Default::default()
            })
            .collect();
        Self {
            boxes,
            max_progress: config.max_progress,
            fade_step: config.fade_step.max(1),
        }
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// Sets a box's destination. Without `animate` the box jumps there on the next render.
    pub fn set_color(&mut self, index: usize, color: RGB8, animate: bool) {
        let max_progress = self.max_progress;
        match self.boxes.get_mut(index) {
            Some(b) => {
                b.destination = color;
                b.progress = if animate { 0 } else { max_progress };
            }
            None => log::warn!("No box {} (have {})", index, self.boxes.len()),
        }
    }

    pub fn set_all(&mut self, color: RGB8, animate: bool) {
        for index in 0..self.boxes.len() {
            self.set_color(index, color, animate);
        }
    }

    /// Color the box currently shows.
    pub fn color(&self, index: usize) -> Option<RGB8> {
        self.boxes.get(index).map(|b| b.current)
    }

    pub fn is_rendered(&self, index: usize) -> bool {
        self.boxes.get(index).is_some_and(|b| b.current == b.destination)
    }

    /// Steps every box once and writes it into its run of `leds`.
    ///
    /// Boxes are `leds.len() / box_count` long; leftover pixels at the end are untouched.
    pub fn paint(&mut self, leds: &mut [RGB8]) {
        let size = leds.len() / self.boxes.len().max(1);
        for (i, b) in self.boxes.iter_mut().enumerate() {
            if b.progress >= self.max_progress {
                b.current = b.destination;
            } else {
                let divisor = self.max_progress / self.fade_step - b.progress / self.fade_step;
                b.current = if divisor == 0 {
                    b.destination
                } else {
                    step_toward(b.current, b.destination, divisor as i16)
                };
                b.progress = b.progress.saturating_add(self.fade_step);
            }
            leds[i * size..(i + 1) * size].fill(b.current);
        }
    }

    pub fn render<B: LedBus<L>, const L: usize>(
        &mut self,
        leds: &mut [RGB8; L],
        bus: &mut B,
    ) -> Result<(), B::Error> {
        self.paint(leds);
        bus.flush(leds)
    }
}

fn step_toward(current: RGB8, destination: RGB8, divisor: i16) -> RGB8 {
    let channel = |c: u8, d: u8| {
        let c = c as i16;
        (c + (d as i16 - c) / divisor).clamp(0, u8::MAX as i16) as u8
    };
    RGB8::new(
        channel(current.r, destination.r),
        channel(current.g, destination.g),
        channel(current.b, destination.b),
    )
}
