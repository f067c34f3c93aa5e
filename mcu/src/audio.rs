use anyhow::Result;
use microfft::real::rfft_1024;
use partylight_strip::Analyzer;

pub const FFT_SIZE: usize = 1024;
pub const MAGNITUDE_BINS: usize = FFT_SIZE / 2;

/// 2 * 24 bit stereo in 32-bit containers
pub const SAMPLE_BYTES: usize = 4 * 2;
pub const FRAME_BYTES: usize = FFT_SIZE * SAMPLE_BYTES;
pub const I2S_BUFFER_SIZE: usize = 16 * 4 * 1024;

/// Left-channel samples averaged for one DC offset measurement.
const CALIBRATION_SAMPLES: i64 = 16 * FFT_SIZE as i64;
const FULL_SCALE: f32 = (1 << 23) as f32;
/// Maps a normalized spectrum magnitude onto the u16 band scale.
const MAGNITUDE_SCALE: f32 = 64.0;

/// Microphone analyzer over a circular I2S DMA transfer.
///
/// `pop` drains the DMA buffer into the given slice and returns the byte count, or 0 when
/// less than one frame is available.
pub struct I2sAnalyzer<F> {
    pop: F,
    raw: &'static mut [u8; I2S_BUFFER_SIZE],
    samples: [f32; FFT_SIZE],
    window: Option<[f32; FFT_SIZE]>,
    magnitudes: [u16; MAGNITUDE_BINS],
    dc_offset: i32,
}

impl<F> I2sAnalyzer<F>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    pub fn new(pop: F, raw: &'static mut [u8; I2S_BUFFER_SIZE], use_hann_window: bool) -> Self {
        Self {
            pop,
            raw,
            samples: [0.0; FFT_SIZE],
            window: use_hann_window.then(hann_window),
            magnitudes: [0; MAGNITUDE_BINS],
            dc_offset: 0,
        }
    }

    pub fn set_dc_offset(&mut self, dc_offset: i32) {
        self.dc_offset = dc_offset;
    }

    /// Averages the left channel over a silent input. Blocks until enough frames arrived.
    pub fn measure_dc_offset(&mut self) -> i32 {
        let mut sum = 0i64;
        let mut count = 0i64;
        while count < CALIBRATION_SAMPLES {
            match (self.pop)(&mut self.raw[..]) {
                Ok(len) if len >= FRAME_BYTES => {
                    for sample in left_samples(&self.raw[..len]) {
                        sum += sample as i64;
                        count += 1;
                    }
                }
                Ok(_) => core::hint::spin_loop(),
                Err(e) => {
                    log::error!("{e:?}");
                    return self.dc_offset;
                }
            }
        }
        (sum / count) as i32
    }

    fn transform(&mut self, frame_end: usize) {
        let frame = &self.raw[frame_end - FRAME_BYTES..frame_end];
        for (dst, sample) in self.samples.iter_mut().zip(left_samples(frame)) {
            *dst = (sample - self.dc_offset) as f32 / FULL_SCALE;
        }
        if let Some(window) = &self.window {
            for (v, w) in self.samples.iter_mut().zip(window.iter()) {
                *v *= w;
            }
        }

        let spectrum = rfft_1024(&mut self.samples);
        // bin 0 carries the Nyquist term in its imaginary part
        spectrum[0].im = 0.0;
        for (magnitude, c) in self.magnitudes.iter_mut().zip(spectrum.iter()) {
            let scaled = libm::sqrtf(c.norm_sqr()) * MAGNITUDE_SCALE;
            *magnitude = scaled.clamp(0.0, u16::MAX as f32) as u16;
        }
    }
}

impl<F> Analyzer for I2sAnalyzer<F>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    fn is_frame_ready(&mut self) -> bool {
        match (self.pop)(&mut self.raw[..]) {
            Ok(len) if len >= FRAME_BYTES => {
                // newest whole samples
                self.transform(len - len % SAMPLE_BYTES);
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::error!("Audio input error: {e:?}");
                false
            }
        }
    }

    fn read_magnitudes(&mut self) -> &[u16] {
        &self.magnitudes
    }
}

/// Left-channel 24-bit samples of an interleaved stereo buffer.
fn left_samples(buffer: &[u8]) -> impl Iterator<Item = i32> + '_ {
    buffer
        .chunks_exact(SAMPLE_BYTES)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) >> 8)
}

fn hann_window() -> [f32; FFT_SIZE] {
    let denom = (FFT_SIZE - 1) as f32;
    core::array::from_fn(|i| {
        // w[n] = 0.5 * (1 - cos(2π n / (N-1)))
        let phase = i as f32 / denom;
        0.5 * (1.0 - libm::cosf(2.0 * core::f32::consts::PI * phase))
    })
}
