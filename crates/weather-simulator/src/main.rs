//! Desktop simulator for the weather station control loop.
//!
//! Runs the real `weather-core` station against synthetic sensors, a canned
//! weather service and a recording telemetry sink, on a virtual clock, so an
//! hour of station time takes a few seconds. Every frame the station
//! presents is written to `frames/` as a PNG.
//!
//! # Usage
//!
//! ```text
//! weather-simulator [config.json]
//! ```
//!
//! | Variable      | Meaning                              |
//! |---------------|--------------------------------------|
//! | `SIM_MINUTES` | Station time to simulate (default 15) |
//! | `RUST_LOG`    | Log filter (default `info`)          |

use std::cell::Cell;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettings, OutputSettingsBuilder, SimulatorDisplay,
};
use log::{error, info, warn};

use weather_core::config::{InternetConfig, TelemetryConfig, WeatherServiceConfig};
use weather_core::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayView, Panel};
use weather_core::net::{HttpClient, HttpResponse, NetError};
use weather_core::sampler::LatestReadings;
use weather_core::sensors::{IndoorMeasurement, IndoorSensor, OutdoorProbe, SensorError};
use weather_core::{Clock, ForecastOutcome, Millis, StationConfig, TimingConfig, WeatherStation};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const FRAMES_DIR: &str = "frames";

/// PNG pixel scale.
const FRAME_SCALE: u32 = 2;

const DEFAULT_MINUTES: u32 = 15;

/// Virtual time before the simulated Wi-Fi link comes up.
const LINK_UP_AFTER_MS: Millis = 3_000;

/// Every Nth indoor read returns NaN to exercise the invalid-reading path.
const INDOOR_GLITCH_EVERY: u32 = 25;

/// Eight three-hour slots covering every icon category.
const FORECAST_BODY: &str = r#"{
    "cod": "200",
    "cnt": 8,
    "list": [
        {"main": {"temp": 284.6}, "weather": [{"id": 800}], "dt_txt": "2024-06-01 12:00:00"},
        {"main": {"temp": 285.9}, "weather": [{"id": 801}], "dt_txt": "2024-06-01 15:00:00"},
        {"main": {"temp": 283.1}, "weather": [{"id": 802}], "dt_txt": "2024-06-01 18:00:00"},
        {"main": {"temp": 280.4}, "weather": [{"id": 804}], "dt_txt": "2024-06-01 21:00:00"},
        {"main": {"temp": 279.0}, "weather": [{"id": 310}], "dt_txt": "2024-06-02 00:00:00"},
        {"main": {"temp": 278.2}, "weather": [{"id": 211}], "dt_txt": "2024-06-02 03:00:00"},
        {"main": {"temp": 272.5}, "weather": [{"id": 601}], "dt_txt": "2024-06-02 06:00:00"},
        {"main": {"temp": 276.8}, "weather": [{"id": 741}], "dt_txt": "2024-06-02 09:00:00"}
    ],
    "city": {"name": "Helsinki", "country": "FI"}
}"#;

// ---------------------------------------------------------------------------
// Virtual clock
// ---------------------------------------------------------------------------

/// Shared millisecond counter advanced by the simulation loop.
#[derive(Clone, Default)]
struct VirtualClock(Rc<Cell<Millis>>);

impl VirtualClock {
    fn advance(&self, ms: Millis) {
        self.0.set(self.0.get().wrapping_add(ms));
    }

    fn seconds(&self) -> f64 {
        f64::from(self.now_ms()) / 1000.0
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> Millis {
        self.0.get()
    }
}

// ---------------------------------------------------------------------------
// Synthetic sensors
// ---------------------------------------------------------------------------

struct SimIndoor {
    clock: VirtualClock,
    reads: u32,
}

impl IndoorSensor for SimIndoor {
    async fn measure(&mut self) -> Result<IndoorMeasurement, SensorError> {
        self.reads += 1;
        let t = self.clock.seconds();

        // 20–23 °C with a slow drift, 40–50 % humidity
        let mut temperature = 21.5 + 1.5 * (t / 600.0).sin();
        let humidity = 45.0 + 5.0 * (t / 900.0).sin() + 0.5 * (t / 37.0).cos();

        if self.reads % INDOOR_GLITCH_EVERY == 0 {
            temperature = f64::NAN;
        }

        Ok(IndoorMeasurement {
            temperature_celsius: temperature as f32,
            humidity_percent: humidity as f32,
        })
    }
}

struct SimProbe {
    clock: VirtualClock,
    converting: bool,
}

impl OutdoorProbe for SimProbe {
    async fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.converting = true;
        Ok(())
    }

    async fn read_celsius(&mut self, probe_index: u8) -> Result<f32, SensorError> {
        if probe_index != 0 {
            return Err(SensorError::NoDevice { sensor: "sim-probe" });
        }
        if !std::mem::take(&mut self.converting) {
            return Err(SensorError::ReadFailed {
                sensor: "sim-probe",
                details: "no conversion pending",
            });
        }
        let t = self.clock.seconds();
        Ok((-3.0 + 4.0 * (t / 1200.0).sin()) as f32)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Serves the canned forecast and records telemetry updates.
struct SimNet {
    clock: VirtualClock,
    uploads: Vec<String>,
}

impl HttpClient for SimNet {
    fn is_connected(&self) -> bool {
        self.clock.now_ms() >= LINK_UP_AFTER_MS
    }

    async fn get(&mut self, url: &str) -> Result<HttpResponse, NetError> {
        if !self.is_connected() {
            return Err(NetError::Disconnected);
        }

        let (status, body) = if url.contains("/forecast?") {
            (200, FORECAST_BODY.as_bytes().to_vec())
        } else if url.contains("/update?") {
            self.uploads.push(url.to_string());
            (200, self.uploads.len().to_string().into_bytes())
        } else {
            (404, Vec::new())
        };

        Ok(HttpResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Frame output
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum FrameError {
    /// Writing the PNG failed; the cause is logged when it happens.
    Save,
}

/// Panel that writes each presented frame to disk.
struct FramePanel {
    display: SimulatorDisplay<BinaryColor>,
    output: OutputSettings,
    dir: PathBuf,
    clock: VirtualClock,
    frames: usize,
}

impl FramePanel {
    fn new(dir: PathBuf, clock: VirtualClock) -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
            output: OutputSettingsBuilder::new()
                .theme(BinaryColorTheme::OledBlue)
                .scale(FRAME_SCALE)
                .build(),
            dir,
            clock,
            frames: 0,
        }
    }
}

impl OriginDimensions for FramePanel {
    fn size(&self) -> Size {
        self.display.size()
    }
}

impl DrawTarget for FramePanel {
    type Color = BinaryColor;
    type Error = FrameError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display.draw_iter(pixels).map_err(|e| match e {})
    }
}

impl Panel for FramePanel {
    fn present(&mut self) -> Result<(), Self::Error> {
        let path = self
            .dir
            .join(format!("frame_{:05}_{:08}ms.png", self.frames, self.clock.now_ms()));
        self.display
            .to_rgb_output_image(&self.output)
            .save_png(&path)
            .map_err(|e| {
                error!("Cannot write {}: {}", path.display(), e);
                FrameError::Save
            })?;
        self.frames += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_config() -> StationConfig<'static> {
    StationConfig {
        internet: InternetConfig {
            ssid: "simulated",
            password: "",
        },
        weather: WeatherServiceConfig {
            api_key: "simulated-weather-key",
            ..WeatherServiceConfig::default()
        },
        telemetry: TelemetryConfig {
            api_key: "simulated-telemetry-key",
            ..TelemetryConfig::default()
        },
        timing: TimingConfig::default(),
    }
}

fn simulated_minutes() -> u32 {
    match env::var("SIM_MINUTES") {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring SIM_MINUTES={:?}", value);
            DEFAULT_MINUTES
        }),
        Err(_) => DEFAULT_MINUTES,
    }
}

// ---------------------------------------------------------------------------
// Simulation run
// ---------------------------------------------------------------------------

struct RunSummary {
    frames: usize,
    uploads: Vec<String>,
    latest: LatestReadings,
    last_view: DisplayView,
}

/// Drive the station for `minutes` of virtual time, one `tick` per step.
fn simulate(
    config: &StationConfig<'_>,
    offline: bool,
    minutes: u32,
    frames_dir: PathBuf,
) -> RunSummary {
    let clock = VirtualClock::default();
    let mut station = WeatherStation::new(
        config,
        SimIndoor {
            clock: clock.clone(),
            reads: 0,
        },
        SimProbe {
            clock: clock.clone(),
            converting: false,
        },
        SimNet {
            clock: clock.clone(),
            uploads: Vec::new(),
        },
        FramePanel::new(frames_dir, clock.clone()),
        clock.now_ms(),
    );

    if offline {
        station.disable_network();
    }

    station.show_status("Connecting...");
    let mut announced = false;

    let end = minutes.saturating_mul(60_000);
    while clock.now_ms() < end {
        if !announced && station.net().is_connected() {
            announced = true;
            station.show_status("Connected!");
        }

        let report = block_on(station.tick(clock.now_ms()));
        if let ForecastOutcome::Updated { slots } = report.forecast {
            info!("[{:>7} ms] forecast refreshed ({} slots)", clock.now_ms(), slots);
        }
        if report.upload.attempted() {
            info!("[{:>7} ms] upload {:?}", clock.now_ms(), report.upload);
        }

        clock.advance(config.timing.tick);
    }

    let frames = station.panel_mut().frames;
    RunSummary {
        frames,
        uploads: station.net().uploads.clone(),
        latest: *station.latest(),
        last_view: station.current_view(),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_text = match env::args().nth(1) {
        Some(path) => match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Cannot read {}: {}", path, e);
                process::exit(1);
            }
        },
        None => None,
    };

    let config = match config_text.as_deref() {
        Some(text) => match serde_json::from_str::<StationConfig<'_>>(text) {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid configuration file: {}", e);
                process::exit(1);
            }
        },
        None => default_config(),
    };

    if let Err(e) = config.validate_schedule() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    let offline = match config.validate_credentials() {
        Ok(()) => false,
        Err(e) => {
            warn!("{}; simulating without forecast and telemetry", e);
            true
        }
    };

    let frames_dir = PathBuf::from(FRAMES_DIR);
    if let Err(e) = fs::create_dir_all(&frames_dir) {
        error!("Cannot create {}: {}", frames_dir.display(), e);
        process::exit(1);
    }

    let minutes = simulated_minutes();
    info!("Starting weather station simulator");
    info!(
        "Simulating {} min for {},{} (tick {} ms)",
        minutes, config.weather.city, config.weather.country_code, config.timing.tick
    );

    let summary = simulate(&config, offline, minutes, frames_dir.clone());

    info!(
        "Done: {} frames in {}, {} uploads, last view {:?}",
        summary.frames,
        frames_dir.display(),
        summary.uploads.len(),
        summary.last_view
    );
    let latest = summary.latest;
    info!(
        "Latest: indoor {:?} C, humidity {:?} %, outdoor {:?} C",
        latest.indoor_temperature, latest.humidity, latest.outdoor_temperature
    );
    for url in &summary.uploads {
        info!("  {}", url);
    }
}
