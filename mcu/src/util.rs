use alloc::string::String;
use log::{Metadata, Record};

use core::fmt::Write;

use rtt_target::rprintln;

pub struct MultiLogger;

impl log::Log for MultiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // format once
        let mut buf = String::new();
        let _ = write!(
            &mut buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );

        // RTT
        rprintln!("{}", buf);

        // UART: esp_println::println! writes directly to UART (avoid log! macros here
        // to prevent recursion)
        esp_println::println!("{}", buf);
    }

    fn flush(&self) {}
}

/// Build tag stored next to the calibration, so a new firmware measures again.
pub const BUILD_TAG: u32 = fnv1a(concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION")).as_bytes());

const fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = 0x811c_9dc5u32;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

#[macro_use]
mod static_cell_helpers {
    #[macro_export]
    macro_rules! static_buf {
        ($ty:ty, $size:expr) => {{
            {
                static mut BUF: [$ty; $size] = [0; $size];
                #[allow(static_mut_refs)]
                #[allow(unsafe_code)]
                unsafe {
                    &mut BUF
                }
            }
        }};
    }
}
