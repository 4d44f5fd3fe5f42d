#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer, with_timeout};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Flex, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{debug, error, info, warn};

use weather_core::sensors::{Ds18b20, Sht40Sensor};
use weather_core::{Clock, WeatherStation};
use weather_firmware::clock::EmbassyClock;
use weather_firmware::http::StackHttpClient;
use weather_firmware::panel::OledPanel;
use weather_firmware::{secrets, wifi};

/// How long the startup screen waits for an address before the loop
/// starts anyway.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

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
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let station_config = secrets::station_config();
    let timing = station_config.timing;

    // Indoor SHT40 on I2C0 (async)
    let indoor_i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9)
    .into_async();
    let indoor = Sht40Sensor::new(indoor_i2c);

    // Outdoor DS18B20 on a 1-Wire bus, open drain with pull-up
    let mut one_wire = Flex::new(peripherals.GPIO4);
    one_wire.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    one_wire.set_high();
    one_wire.set_input_enable(true);
    one_wire.set_output_enable(true);
    let mut outdoor = Ds18b20::new(one_wire, Delay::new());
    match outdoor.discover() {
        Ok(0) => warn!("No DS18B20 found; falling back to Skip ROM"),
        Ok(count) => info!("Outdoor probes ready ({})", count),
        Err(e) => warn!("DS18B20 search failed: {}", e),
    }

    // SSD1306 on I2C1 (blocking)
    let display_i2c = I2c::new(
        peripherals.I2C1,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO2)
    .with_scl(peripherals.GPIO1);
    let panel = OledPanel::new(display_i2c).expect("Failed to initialize display");

    info!("Display initialized");

    let stack = wifi::start(
        spawner,
        peripherals.WIFI,
        station_config.internet.ssid,
        station_config.internet.password,
    );
    let net = StackHttpClient::new(stack, Duration::from_millis(timing.http_timeout.into()));

    let clock = EmbassyClock;
    let mut station = WeatherStation::new(
        &station_config,
        indoor,
        outdoor,
        net,
        panel,
        clock.now_ms(),
    );

    if let Err(e) = station_config.validate_schedule() {
        error!("Invalid station timing: {}", e);
        station.show_status("Config error");
        loop {
            Timer::after(Duration::from_secs(1)).await;
        }
    }
    if let Err(e) = station_config.validate_credentials() {
        warn!("{}; running without forecast and telemetry", e);
        station.disable_network();
    }

    station.show_status("Connecting...");
    match with_timeout(CONNECT_TIMEOUT, stack.wait_config_up()).await {
        Ok(()) => {
            if let Some(v4) = stack.config_v4() {
                info!("Got address {}", v4.address);
            }
            station.show_status("Connected!");
            Timer::after(Duration::from_secs(1)).await;
        }
        Err(_) => warn!("No network yet; starting offline"),
    }

    let tick = Duration::from_millis(timing.tick.into());
    loop {
        let report = station.tick(clock.now_ms()).await;
        if report.upload.attempted() {
            debug!("Tick: {:?}", report);
        }
        Timer::after(tick).await;
    }
}
