//! Credentials and station settings injected by `build.rs` from `.env`.

use weather_core::config::{
    InternetConfig, StationConfig, TelemetryConfig, TimingConfig, WeatherServiceConfig,
};

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const WEATHER_API_KEY: &str = env!("WEATHER_API_KEY");
pub const WEATHER_CITY: &str = env!("WEATHER_CITY");
pub const WEATHER_COUNTRY: &str = env!("WEATHER_COUNTRY");
pub const TELEMETRY_API_KEY: &str = env!("TELEMETRY_API_KEY");

/// Station configuration from the baked-in secrets and default timing.
///
/// An empty city or country falls back to the default location.
pub fn station_config() -> StationConfig<'static> {
    let defaults = WeatherServiceConfig::default();
    let pick = |value: &'static str, fallback: &'static str| {
        if value.is_empty() { fallback } else { value }
    };

    StationConfig {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        weather: WeatherServiceConfig {
            api_key: WEATHER_API_KEY,
            city: pick(WEATHER_CITY, defaults.city),
            country_code: pick(WEATHER_COUNTRY, defaults.country_code),
            ..defaults
        },
        telemetry: TelemetryConfig {
            api_key: TELEMETRY_API_KEY,
            ..TelemetryConfig::default()
        },
        timing: TimingConfig::default(),
    }
}
