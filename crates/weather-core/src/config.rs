//! Station configuration
//!
//! All strings are borrowed so the firmware can build its configuration
//! from `&'static str` constants baked in at compile time, while the
//! simulator deserializes one from a JSON file it keeps alive.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::forecast::MAX_FORECAST_SLOTS;
use crate::timer::Millis;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct StationConfig<'a> {
    pub internet: InternetConfig<'a>,
    pub weather: WeatherServiceConfig<'a>,
    pub telemetry: TelemetryConfig<'a>,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeatherServiceConfig<'a> {
    #[serde(default = "default_weather_url")]
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub city: &'a str,
    pub country_code: &'a str,
    /// Number of three-hour forecast slots to request and display.
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
}

impl Default for WeatherServiceConfig<'_> {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            api_key: "",
            city: "Helsinki",
            country_code: "FI",
            slot_count: default_slot_count(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TelemetryConfig<'a> {
    #[serde(default = "default_telemetry_url")]
    pub base_url: &'a str,
    pub api_key: &'a str,
}

impl Default for TelemetryConfig<'_> {
    fn default() -> Self {
        Self {
            base_url: default_telemetry_url(),
            api_key: "",
        }
    }
}

fn default_weather_url() -> &'static str {
    "http://api.openweathermap.org/data/2.5"
}

fn default_telemetry_url() -> &'static str {
    "http://api.thingspeak.com"
}

fn default_slot_count() -> usize {
    3
}

/// Cadences and dwell times, all in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Minimum spacing between indoor sensor reads
    pub indoor_period: Millis,
    /// Spacing between outdoor conversion requests
    pub outdoor_period: Millis,
    /// Time the outdoor probe needs between request and read-back
    pub outdoor_conversion: Millis,
    pub indoor_dwell: Millis,
    pub outdoor_dwell: Millis,
    /// Dwell per forecast slot view
    pub forecast_dwell: Millis,
    pub forecast_period: Millis,
    pub upload_period: Millis,
    /// Upper bound on any single HTTP request
    pub http_timeout: Millis,
    /// Pause between main loop ticks
    pub tick: Millis,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            indoor_period: 2_000,
            outdoor_period: 1_000,
            outdoor_conversion: 750,
            indoor_dwell: 5_000,
            outdoor_dwell: 5_000,
            forecast_dwell: 2_000,
            forecast_period: 600_000,
            upload_period: 300_000,
            http_timeout: 10_000,
            tick: 50,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("slot count {requested} exceeds maximum of {max}")]
    SlotCount { requested: usize, max: usize },
    #[error("{field} must be greater than zero")]
    ZeroPeriod { field: &'static str },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}

impl StationConfig<'_> {
    /// Schedule first, then credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_schedule()?;
        self.validate_credentials()
    }

    /// Slot count and every period, dwell and the loop tick.
    ///
    /// A config failing this cannot drive the loop: a zero tick never lets
    /// time advance between iterations.
    pub fn validate_schedule(&self) -> Result<(), ConfigError> {
        if self.weather.slot_count > MAX_FORECAST_SLOTS {
            return Err(ConfigError::SlotCount {
                requested: self.weather.slot_count,
                max: MAX_FORECAST_SLOTS,
            });
        }

        let t = &self.timing;
        let periods = [
            ("timing.indoor_period", t.indoor_period),
            ("timing.outdoor_period", t.outdoor_period),
            ("timing.indoor_dwell", t.indoor_dwell),
            ("timing.outdoor_dwell", t.outdoor_dwell),
            ("timing.forecast_dwell", t.forecast_dwell),
            ("timing.forecast_period", t.forecast_period),
            ("timing.upload_period", t.upload_period),
            ("timing.http_timeout", t.http_timeout),
            ("timing.tick", t.tick),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ConfigError::ZeroPeriod { field });
            }
        }

        Ok(())
    }

    /// Location and API keys. Only the network step needs these; sampling
    /// and the display run without them.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        let strings = [
            ("weather.city", self.weather.city),
            ("weather.country_code", self.weather.country_code),
            ("weather.api_key", self.weather.api_key),
            ("telemetry.api_key", self.telemetry.api_key),
        ];
        for (field, value) in strings {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { field });
            }
        }

        Ok(())
    }
}
