// Note: based on https://github.com/smart-leds-rs/ws2812-spi-rs

use esp_hal::Blocking;
use smart_leds::RGB8;
use smart_leds_trait::SmartLedsWrite;

pub const WS2812_RESET_BYTES: usize = 140;
/// 4 SPI bytes per color byte
pub const WS2812_PIXEL_BYTES: usize = 12;

/// SPI buffer size for `leds` pixels plus one reset sequence.
pub const fn ws2812_buffer_size(leds: usize) -> usize {
    WS2812_PIXEL_BYTES * leds + WS2812_RESET_BYTES
}

#[derive(Debug)]
pub enum Ws2812Error {
    /// the encoded frame does not fit the SPI buffer
    BufferTooSmall { pixels: usize },
    Spi(esp_hal::spi::Error),
}

#[allow(non_camel_case_types)]
pub struct WS2812_Spi<'spi, 'buffer, const B: usize> {
    pub spi: esp_hal::spi::master::SpiDmaBus<'spi, Blocking>,
    pub buffer: &'buffer mut [u8; B],
}

impl<const B: usize> SmartLedsWrite for WS2812_Spi<'_, '_, B> {
    type Error = Ws2812Error;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let len = encode_sequence(self.buffer, iterator)?;
        self.spi.write(&self.buffer[..len]).map_err(Ws2812Error::Spi)
    }
}

// ----------------------------------------------------------------

fn encode_byte(buffer: &mut [u8], mut data: u8) {
    // Send two bits in one spi byte. High time first, then the low time
    // The maximum for T0H is 500ns, the minimum for one bit 1063 ns.
    // These result in the upper and lower spi frequency limits
    let patterns = [0b1000_1000, 0b1000_1110, 0b11101000, 0b11101110];
    for byte in buffer.iter_mut().take(4) {
        let bits = (data & 0b1100_0000) >> 6;
        *byte = patterns[bits as usize];
        data <<= 2;
    }
}

fn encode_pixel(buffer: &mut [u8], pixel: RGB8) {
    for (chunk, channel) in buffer.chunks_exact_mut(4).zip([pixel.g, pixel.r, pixel.b]) {
        encode_byte(chunk, channel);
    }
}

/// Encodes `pixels` followed by a reset sequence. Returns the number of bytes used.
pub fn encode_sequence<const B: usize, T, I>(buffer: &mut [u8; B], pixels: T) -> Result<usize, Ws2812Error>
where
    T: IntoIterator<Item = I>,
    I: Into<RGB8>,
{
    let mut index = 0;
    for (n, pixel) in pixels.into_iter().enumerate() {
        let end = index + WS2812_PIXEL_BYTES;
        let chunk = buffer
            .get_mut(index..end)
            .ok_or(Ws2812Error::BufferTooSmall { pixels: n + 1 })?;
        encode_pixel(chunk, pixel.into());
        index = end;
    }

    let end = index + WS2812_RESET_BYTES;
    buffer
        .get_mut(index..end)
        .ok_or(Ws2812Error::BufferTooSmall {
            pixels: index / WS2812_PIXEL_BYTES,
        })?
        .fill(0);
    Ok(end)
}
