//! Forecast retrieval from the weather service
//!
//! One fetch issues a single `GET /forecast?q={city},{country}&cnt={n}` and
//! turns the JSON body into up to [`MAX_FORECAST_SLOTS`] forecast slots. A
//! fetch is all-or-nothing: if any requested slot fails to parse, the whole
//! result is discarded and the caller keeps its previous forecast.
//!
//! Two conversions are kept deliberately simple because the display was
//! built around them:
//!
//! - the time label is the fixed five-character window at offset 11 of the
//!   service's `YYYY-MM-DD HH:MM:SS` timestamp, i.e. `HH:MM`;
//! - Celsius is the integer Kelvin value minus 273 (not 273.15), truncated.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use heapless::String as FixedString;
use log::debug;
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::net::{HttpClient, NetError, push_query_value};
use crate::weather::{WeatherIconCategory, classify};

/// Upper bound on slots held in memory; `slot_count` is validated against it.
pub const MAX_FORECAST_SLOTS: usize = 8;

/// Length of the `HH:MM` label.
pub const TIME_LABEL_LEN: usize = 5;

/// Offset of the hour digits in a `YYYY-MM-DD HH:MM:SS` timestamp.
const TIME_LABEL_OFFSET: usize = 11;

/// Integer Kelvin-to-Celsius offset.
pub const KELVIN_OFFSET: i32 = 273;

/// Highest Kelvin value accepted from the service.
pub const MAX_PLAUSIBLE_KELVIN: f64 = 400.0;

pub type TimeLabel = FixedString<TIME_LABEL_LEN>;

/// One forecast entry for a future three-hour interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSlot {
    pub time_label: TimeLabel,
    pub weather_code: i32,
    pub temperature_celsius: i32,
}

impl ForecastSlot {
    pub fn icon(&self) -> WeatherIconCategory {
        classify(self.weather_code)
    }
}

/// A complete forecast, replaced wholesale on every successful fetch.
pub type Forecast = heapless::Vec<ForecastSlot, MAX_FORECAST_SLOTS>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("body is not the expected JSON structure")]
    Json,
    #[error("response carries no forecast list")]
    MissingData,
    #[error("expected {expected} forecast entries, found {found}")]
    TooFewSlots { expected: usize, found: usize },
    #[error("requested more slots than can be held")]
    TooManySlots,
    #[error("timestamp shorter than HH:MM window")]
    TimestampTooShort,
    #[error("entry has no weather code")]
    MissingWeatherCode,
    #[error("temperature outside the plausible Kelvin range")]
    TemperatureOutOfRange,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(NetError),
    #[error("parse failure: {0}")]
    Parse(ParseError),
}

impl From<NetError> for FetchError {
    fn from(value: NetError) -> Self {
        Self::Transport(value)
    }
}

impl From<ParseError> for FetchError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "'de: 'a"))]
struct ForecastPayload<'a> {
    #[serde(default)]
    list: Option<Vec<ForecastEntry<'a>>>,
}

#[derive(Deserialize)]
struct ForecastEntry<'a> {
    dt_txt: &'a str,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
    main: MainBlock,
}

#[derive(Deserialize)]
struct WeatherCondition {
    id: i32,
}

#[derive(Deserialize)]
struct MainBlock {
    /// Kelvin
    temp: f64,
}

/// Cut the `HH:MM` window out of a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn time_label(timestamp: &str) -> Result<TimeLabel, ParseError> {
    let window = timestamp
        .get(TIME_LABEL_OFFSET..TIME_LABEL_OFFSET + TIME_LABEL_LEN)
        .ok_or(ParseError::TimestampTooShort)?;

    let mut label = TimeLabel::new();
    label
        .push_str(window)
        .map_err(|_| ParseError::TimestampTooShort)?;
    Ok(label)
}

/// Truncating integer conversion; 300 K becomes 27 °C.
pub const fn kelvin_to_celsius(kelvin: i32) -> i32 {
    kelvin.saturating_sub(KELVIN_OFFSET)
}

/// Whole-degree Celsius from a reported Kelvin value.
///
/// Anything negative, non-finite or above [`MAX_PLAUSIBLE_KELVIN`] is
/// rejected before the integer cast.
fn reported_celsius(kelvin: f64) -> Result<i32, ParseError> {
    if !(0.0..=MAX_PLAUSIBLE_KELVIN).contains(&kelvin) {
        return Err(ParseError::TemperatureOutOfRange);
    }
    Ok(kelvin_to_celsius(kelvin as i32))
}

/// Parse the first `slot_count` entries of a forecast body.
pub fn parse_forecast(body: &[u8], slot_count: usize) -> Result<Forecast, ParseError> {
    if slot_count > MAX_FORECAST_SLOTS {
        return Err(ParseError::TooManySlots);
    }

    let payload: ForecastPayload<'_> =
        serde_json::from_slice(body).map_err(|_| ParseError::Json)?;
    let entries = payload.list.ok_or(ParseError::MissingData)?;

    if entries.len() < slot_count {
        return Err(ParseError::TooFewSlots {
            expected: slot_count,
            found: entries.len(),
        });
    }

    let mut forecast = Forecast::new();
    for entry in entries.iter().take(slot_count) {
        let weather_code = entry
            .weather
            .first()
            .map(|condition| condition.id)
            .ok_or(ParseError::MissingWeatherCode)?;

        let slot = ForecastSlot {
            time_label: time_label(entry.dt_txt)?,
            weather_code,
            temperature_celsius: reported_celsius(entry.main.temp)?,
        };

        forecast
            .push(slot)
            .map_err(|_| ParseError::TooManySlots)?;
    }

    Ok(forecast)
}

/// Build the forecast request URL.
pub fn forecast_url(
    base_url: &str,
    city: &str,
    country_code: &str,
    slot_count: usize,
    api_key: &str,
) -> String {
    let mut url = String::with_capacity(base_url.len() + 96);
    url.push_str(base_url.trim_end_matches('/'));
    url.push_str("/forecast?q=");
    push_query_value(&mut url, city);
    url.push(',');
    push_query_value(&mut url, country_code);
    let _ = write!(url, "&cnt={}&APPID=", slot_count);
    push_query_value(&mut url, api_key);
    url
}

/// Issues forecast requests against one weather service account.
#[derive(Debug, Clone, Copy)]
pub struct ForecastFetcher<'a> {
    base_url: &'a str,
    api_key: &'a str,
}

impl<'a> ForecastFetcher<'a> {
    pub const fn new(base_url: &'a str, api_key: &'a str) -> Self {
        Self { base_url, api_key }
    }

    /// Fetch and parse `slot_count` forecast slots for a city.
    ///
    /// Transport failures and non-success status codes become
    /// [`FetchError::Transport`]; anything wrong with the body becomes
    /// [`FetchError::Parse`].
    pub async fn fetch<N: HttpClient>(
        &self,
        net: &mut N,
        city: &str,
        country_code: &str,
        slot_count: usize,
    ) -> Result<Forecast, FetchError> {
        if slot_count > MAX_FORECAST_SLOTS {
            return Err(ParseError::TooManySlots.into());
        }

        let url = forecast_url(self.base_url, city, country_code, slot_count, self.api_key);
        debug!("Requesting {} forecast slots for {},{}", slot_count, city, country_code);

        let response = net.get(&url).await?;
        if !response.is_success() {
            debug!("Weather service answered HTTP {}", response.status);
            return Err(FetchError::Transport(NetError::Status(response.status)));
        }

        Ok(parse_forecast(&response.body, slot_count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedNet;
    use alloc::format;
    use embassy_futures::block_on;

    const THREE_SLOTS: &str = r#"{
        "cod": "200",
        "cnt": 3,
        "list": [
            {"dt": 1, "main": {"temp": 300.0, "humidity": 70}, "weather": [{"id": 800, "main": "Clear"}], "dt_txt": "2024-01-01 15:30:00"},
            {"dt": 2, "main": {"temp": 272.9}, "weather": [{"id": 501}], "dt_txt": "2024-01-01 18:00:00"},
            {"dt": 3, "main": {"temp": 280.15}, "weather": [{"id": 211}, {"id": 300}], "dt_txt": "2024-01-01 21:00:00"}
        ],
        "city": {"name": "Helsinki"}
    }"#;

    #[test]
    fn test_time_label_window() {
        assert_eq!(time_label("2024-01-01 15:30:00").unwrap(), "15:30");
        assert_eq!(time_label("2024-01-01 09:05").unwrap(), "09:05");
    }

    #[test]
    fn test_time_label_too_short() {
        assert_eq!(
            time_label("2024-01-01 15:3"),
            Err(ParseError::TimestampTooShort)
        );
        assert_eq!(time_label(""), Err(ParseError::TimestampTooShort));
    }

    #[test]
    fn test_kelvin_truncation() {
        assert_eq!(kelvin_to_celsius(300), 27);
        assert_eq!(kelvin_to_celsius(273), 0);
        assert_eq!(kelvin_to_celsius(250), -23);
        assert_eq!(kelvin_to_celsius(i32::MIN), i32::MIN);
    }

    #[test]
    fn test_parse_rejects_implausible_temperature() {
        let entry = |temp: &str| {
            format!(
                r#"{{"list":[{{"main":{{"temp":{}}},"weather":[{{"id":800}}],"dt_txt":"2024-01-01 12:00:00"}}]}}"#,
                temp
            )
        };

        for temp in ["-1e12", "-0.5", "1e12"] {
            assert_eq!(
                parse_forecast(entry(temp).as_bytes(), 1),
                Err(ParseError::TemperatureOutOfRange),
                "temp {}",
                temp
            );
        }

        let forecast = parse_forecast(entry("0").as_bytes(), 1).unwrap();
        assert_eq!(forecast[0].temperature_celsius, -273);
    }

    #[test]
    fn test_parse_three_slots() {
        let forecast = parse_forecast(THREE_SLOTS.as_bytes(), 3).unwrap();
        assert_eq!(forecast.len(), 3);

        assert_eq!(forecast[0].time_label, "15:30");
        assert_eq!(forecast[0].weather_code, 800);
        assert_eq!(forecast[0].temperature_celsius, 27);
        assert_eq!(forecast[0].icon(), WeatherIconCategory::ClearSky);

        // 272.9 truncates to 272 before the offset
        assert_eq!(forecast[1].temperature_celsius, -1);
        assert_eq!(forecast[1].icon(), WeatherIconCategory::Drizzle);

        // only the first weather condition counts
        assert_eq!(forecast[2].weather_code, 211);
        assert_eq!(forecast[2].temperature_celsius, 7);
    }

    #[test]
    fn test_parse_takes_only_requested_slots() {
        let forecast = parse_forecast(THREE_SLOTS.as_bytes(), 2).unwrap();
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[1].time_label, "18:00");
    }

    #[test]
    fn test_parse_rejects_missing_list() {
        let body = br#"{"cod":"404","message":"city not found"}"#;
        assert_eq!(parse_forecast(body, 3), Err(ParseError::MissingData));

        let body = br#"{"cod":"200","list":null}"#;
        assert_eq!(parse_forecast(body, 3), Err(ParseError::MissingData));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert_eq!(parse_forecast(b"{}garbage", 3), Err(ParseError::Json));
        assert_eq!(parse_forecast(b"", 3), Err(ParseError::Json));
    }

    #[test]
    fn test_one_bad_slot_fails_whole_fetch() {
        let body = br#"{"list":[
            {"main":{"temp":280.0},"weather":[{"id":800}],"dt_txt":"2024-01-01 12:00:00"},
            {"main":{"temp":280.0},"weather":[{"id":800}],"dt_txt":"2024-01-01"},
            {"main":{"temp":280.0},"weather":[{"id":800}],"dt_txt":"2024-01-01 18:00:00"}
        ]}"#;
        assert_eq!(parse_forecast(body, 3), Err(ParseError::TimestampTooShort));

        let body = br#"{"list":[
            {"main":{"temp":280.0},"weather":[],"dt_txt":"2024-01-01 12:00:00"}
        ]}"#;
        assert_eq!(parse_forecast(body, 1), Err(ParseError::MissingWeatherCode));
    }

    #[test]
    fn test_parse_rejects_short_list() {
        assert_eq!(
            parse_forecast(THREE_SLOTS.as_bytes(), 5),
            Err(ParseError::TooFewSlots {
                expected: 5,
                found: 3
            })
        );
    }

    #[test]
    fn test_zero_slots_is_empty_forecast() {
        let forecast = parse_forecast(THREE_SLOTS.as_bytes(), 0).unwrap();
        assert!(forecast.is_empty());
    }

    #[test]
    fn test_forecast_url() {
        let url = forecast_url(
            "http://api.openweathermap.org/data/2.5/",
            "Helsinki",
            "FI",
            3,
            "abc123",
        );
        assert_eq!(
            url,
            "http://api.openweathermap.org/data/2.5/forecast?q=Helsinki,FI&cnt=3&APPID=abc123"
        );
    }

    #[test]
    fn test_fetch_success() {
        let mut net = ScriptedNet::connected();
        net.respond(200, THREE_SLOTS);

        let fetcher = ForecastFetcher::new("http://weather.test", "key");
        let forecast = block_on(fetcher.fetch(&mut net, "Helsinki", "FI", 3)).unwrap();

        assert_eq!(forecast.len(), 3);
        assert_eq!(
            net.requests[0],
            "http://weather.test/forecast?q=Helsinki,FI&cnt=3&APPID=key"
        );
    }

    #[test]
    fn test_fetch_maps_failures() {
        let fetcher = ForecastFetcher::new("http://weather.test", "key");

        let mut net = ScriptedNet::connected();
        net.fail(NetError::Timeout);
        assert_eq!(
            block_on(fetcher.fetch(&mut net, "Helsinki", "FI", 3)),
            Err(FetchError::Transport(NetError::Timeout))
        );

        let mut net = ScriptedNet::connected();
        net.respond(401, r#"{"cod":401,"message":"Invalid API key"}"#);
        assert_eq!(
            block_on(fetcher.fetch(&mut net, "Helsinki", "FI", 3)),
            Err(FetchError::Transport(NetError::Status(401)))
        );

        let mut net = ScriptedNet::connected();
        net.respond(200, "not json");
        assert_eq!(
            block_on(fetcher.fetch(&mut net, "Helsinki", "FI", 3)),
            Err(FetchError::Parse(ParseError::Json))
        );
    }
}
