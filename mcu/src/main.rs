#![no_std]
#![no_main]
#![feature(never_type)]

extern crate alloc;
use embassy_executor::Spawner;
use embassy_time::Instant;
use log::LevelFilter;

use core::panic::PanicInfo;

use esp_hal::{
    dma::{DmaRxBuf, DmaTxBuf},
    dma_buffers,
    i2s::master::DataFormat,
    time::Rate,
    timer::{AnyTimer, timg::TimerGroup},
    uart::Uart,
};

use anyhow::Result;

use esp_hal::peripherals::Peripherals;
use esp_storage::FlashStorage;

use static_cell::StaticCell;

use rtt_target::{ChannelMode, rprintln, rtt_init_print};

use common::config::StripConfig;
use partylight_strip::{SmartLedsBus, Visualizer, error_with_location, load_or_calibrate};

mod audio;
mod storage;
pub mod util;

mod ws2812;

use audio::*;
use storage::*;
use util::*;
use ws2812::*;

esp_bootloader_esp_idf::esp_app_desc!();

use esp_alloc as _;

const BAND_COUNT: usize = 8;
const LED_COUNT: usize = 120;
const NEOPIXEL_BUFFER_SIZE: usize = ws2812_buffer_size(LED_COUNT);

#[inline(never)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    rprintln!("{}", info);
    log::error!("{info}");

    loop {
        // prevent optimization
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}

#[esp_hal_embassy::main]
async fn main(_spawner: Spawner) -> ! {
    log::info!("Hello, world!");

    match _main().await {
        Err(e) => {
            log::error!("Error!");
            log::error!("{e:?}");
            loop {}
        }
    }
}

async fn _main() -> Result<!> {
    esp_alloc::heap_allocator!(#[unsafe(link_section = ".dram2_uninit")] size: 64_000);

    // ---------------------------------------------------------------------------

    rtt_init_print!(ChannelMode::NoBlockTrim, 4 * 1024);

    static LOGGER: StaticCell<MultiLogger> = StaticCell::new();
    let logger = LOGGER.init(MultiLogger);

    log::set_logger(logger).map_err(|_| error_with_location!("Failed to set logger"))?;
    log::set_max_level(LevelFilter::Debug);

    // ---------------------------------------------------------------------------

    let peripherals: Peripherals = esp_hal::init(esp_hal::Config::default()); // Note: 'default()' runs at 80 MHz (for the esp32-s3)

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let timer0: AnyTimer = timg0.timer0.into();
    let timer1: AnyTimer = timg0.timer1.into();
    esp_hal_embassy::init([timer0, timer1]);

    // Neopixel setup:
    //  DMA TX buffer size:
    //    120 LEDs * 3 bytes (r g b) * 4 (4 SPI bytes are used for one ws2812 byte) + 140 reset bytes
    //    ==> round up to 2 kB
    let (rx_buffer, rx_descriptors, tx_buffer, tx_descriptors) = dma_buffers!(1, 2 * 1024);
    let dma_rx_buf = DmaRxBuf::new(rx_descriptors, rx_buffer)
        .map_err(|err| error_with_location!("Failed to create DMA RX buffer: {:?}", err))?;
    let dma_tx_buf = DmaTxBuf::new(tx_descriptors, tx_buffer)
        .map_err(|err| error_with_location!("Failed to create DMA TX buffer: {:?}", err))?;

    let spi: esp_hal::spi::master::SpiDmaBus<'_, esp_hal::Blocking> =
        esp_hal::spi::master::Spi::new(
            peripherals.SPI2,
            esp_hal::spi::master::Config::default().with_frequency(Rate::from_khz(4_500)),
        )?
        .with_mosi(peripherals.GPIO21)
        .with_dma(peripherals.DMA_CH1)
        .with_buffers(dma_rx_buf, dma_tx_buf);

    let bus = SmartLedsBus(WS2812_Spi {
        spi,
        buffer: static_buf!(u8, NEOPIXEL_BUFFER_SIZE),
    });

    // I2S microphone
    let (mut i2s_rx_buffer, i2s_rx_descriptors, _, _) = dma_buffers!(I2S_BUFFER_SIZE, 0);

    let i2s = esp_hal::i2s::master::I2s::new(
        peripherals.I2S0,
        peripherals.DMA_CH0,
        esp_hal::i2s::master::Config::new_tdm_philips()
            .with_sample_rate(Rate::from_khz(48))
            .with_data_format(DataFormat::Data32Channel32),
    )
    .map_err(|err| error_with_location!("Failed to create I2S: {:?}", err))?
    .with_mclk(peripherals.GPIO0);

    let mut i2s_rx: esp_hal::i2s::master::I2sRx<'_, esp_hal::Blocking> = i2s
        .i2s_rx
        .with_bclk(peripherals.GPIO4)
        .with_ws(peripherals.GPIO6)
        .with_din(peripherals.GPIO5)
        .build(i2s_rx_descriptors);

    let mut transfer = i2s_rx
        .read_dma_circular(&mut i2s_rx_buffer)
        .map_err(|err| error_with_location!("Failed to start I2S transfer: {:?}", err))?;

    let pop = move |buf: &mut [u8]| -> Result<usize> {
        let available = transfer
            .available()
            .map_err(|err| error_with_location!("Failed to get available data: {:?}", err))?;
        if available < FRAME_BYTES {
            return Ok(0);
        }
        transfer
            .pop(buf)
            .map_err(|err| error_with_location!("Failed to pop data from transfer: {:?}", err))
    };
    let mut analyzer = I2sAnalyzer::new(pop, static_buf!(u8, I2S_BUFFER_SIZE), true);

    // Calibration
    let mut store = FlashCalibrationStore::new(FlashStorage::new(), CALIBRATION_FLASH_OFFSET);
    let dc_offset = load_or_calibrate(&mut store, BUILD_TAG, false, || analyzer.measure_dc_offset())?;
    analyzer.set_dc_offset(dc_offset);

    // Console
    let config = esp_hal::uart::Config::default().with_baudrate(115200);
    let mut uart = Uart::new(peripherals.UART1, config)?
        .with_rx(peripherals.GPIO17)
        .with_tx(peripherals.GPIO8);

    let strip_config = StripConfig::octave(BAND_COUNT, LED_COUNT as u16);
    let mut visualizer = Visualizer::<_, _, BAND_COUNT, LED_COUNT>::new(&strip_config, analyzer, bus)?;

    log::info!("[main] Visualizer running");

    loop {
        let mut read_buffer = [0u8; 16];
        if uart.read_ready() {
            if let Ok(n_read) = uart.read(&mut read_buffer) {
                for &received in &read_buffer[..n_read] {
                    visualizer.handle_command(received as char);
                }
            }
        }

        if visualizer.take_calibration_request() {
            match load_or_calibrate(&mut store, BUILD_TAG, true, || {
                visualizer.analyzer_mut().measure_dc_offset()
            }) {
                Ok(dc_offset) => visualizer.analyzer_mut().set_dc_offset(dc_offset),
                Err(e) => log::error!("{e:?}"),
            }
        }

        visualizer.tick(Instant::now().as_micros());

        embassy_futures::yield_now().await;
    }
}
