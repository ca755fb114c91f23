#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull, WakeEvent};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rtc_cntl::Rtc;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use speleo_core::config::MonitorConfig;
use speleo_core::display::GraphicsDisplay;
use speleo_core::framebuffer::PanelBuffer;
use speleo_core::{Monitor, Scd4x};
use speleo_firmware::battery::AdcBattery;
use speleo_firmware::board::EspBoard;
use speleo_firmware::buzzer::Buzzer;
use speleo_firmware::ticker::{self, MILLIS};

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_hal::main]
fn main() -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // The 320x240 framebuffer lives in PSRAM.
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    ticker::start(timg0.timer0).expect("Failed to start millisecond timer");

    // Sensor bus
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .expect("Failed to initialize I2C")
    .with_sda(peripherals.GPIO12)
    .with_scl(peripherals.GPIO11);

    // Button, active low; also the light-sleep wake source.
    let mut button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );
    button
        .wakeup_enable(true, WakeEvent::LowLevel)
        .expect("Failed to arm button wake-up");

    // Configure and initialize the display

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, SpiConfig::default())
        .expect("Failed to initialize SPI")
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO37);

    // 2. Create a dummy CS pin (we don't use hardware CS for this display)
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());

    // 3. Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to create SPI device");

    // 4. Set up DC (Data/Command) pin
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    // 5. Create a buffer for SPI batching (larger = faster, uses more RAM)
    let mut spi_buffer = [0u8; 64];

    // 6. Create display interface
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    // 7. Build and initialize the display driver
    let panel = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut Delay::new())
        .expect("Failed to initialize display");
    let backlight = Output::new(peripherals.GPIO38, Level::Low, OutputConfig::default());

    info!("Peripherals initialized");

    let board = EspBoard::new(
        &MILLIS,
        GraphicsDisplay::new(PanelBuffer::new(), backlight),
        panel,
        Buzzer::new(peripherals.LEDC, peripherals.GPIO2.into()),
        AdcBattery::new(peripherals.ADC1, peripherals.GPIO1),
        Rtc::new(peripherals.LPWR),
    );
    let mut monitor = Monitor::new(
        Scd4x::new(i2c, Delay::new()),
        board,
        button,
        MonitorConfig::default(),
    );

    match monitor.boot() {
        Ok(variant) => info!("Monitoring with {}", variant.name()),
        Err(e) => {
            error!("Startup failed: {}", e);
            monitor.board_mut().present();
            monitor.halt();
        }
    }

    loop {
        monitor.step();
        monitor.board_mut().present();
    }
}
