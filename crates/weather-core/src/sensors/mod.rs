//! Sensor collaborators and the readings they produce
//!
//! The station polls two physical sensors at independent cadences:
//!
//! - an indoor temperature/humidity sensor ([`IndoorSensor`]), which must
//!   not be polled faster than about once every two seconds;
//! - an outdoor temperature probe ([`OutdoorProbe`]) whose 12-bit conversion
//!   takes about 750 ms between request and read-back.
//!
//! Drivers report failures as [`SensorError`]; a driver that can only signal
//! a bad reading with NaN is also handled, since the sampler treats a NaN
//! value exactly like an error.

#[cfg(feature = "sensor-ds18b20")]
pub mod ds18b20;
#[cfg(feature = "sensor-sht40")]
mod sht40;

use thiserror_no_std::Error;

#[cfg(feature = "sensor-ds18b20")]
pub use ds18b20::Ds18b20;
#[cfg(feature = "sensor-sht40")]
pub use sht40::Sht40Sensor;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: read failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: reading is not a number")]
    NotANumber { sensor: &'static str },
    #[error("{sensor}: CRC mismatch")]
    CrcMismatch { sensor: &'static str },
    #[error("{sensor}: no device responded")]
    NoDevice { sensor: &'static str },
}

/// Which sensor a [`Reading`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingKind {
    Indoor,
    Outdoor,
}

impl ReadingKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Indoor => "indoor",
            Self::Outdoor => "outdoor",
        }
    }
}

/// One sampling attempt.
///
/// Readings are ephemeral: the sampler hands them to the aggregator and the
/// display state immediately and never stores them individually.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub kind: ReadingKind,
    pub temperature: f32,
    pub humidity: Option<f32>,
    pub valid: bool,
}

impl Reading {
    /// An indoor reading; invalid if either value is NaN.
    pub fn indoor(temperature: f32, humidity: f32) -> Self {
        Self {
            kind: ReadingKind::Indoor,
            temperature,
            humidity: Some(humidity),
            valid: !temperature.is_nan() && !humidity.is_nan(),
        }
    }

    /// An outdoor reading; invalid if the value is NaN.
    pub fn outdoor(temperature: f32) -> Self {
        Self {
            kind: ReadingKind::Outdoor,
            temperature,
            humidity: None,
            valid: !temperature.is_nan(),
        }
    }

    /// A failed attempt. Values are NaN so nothing can mistake them for data.
    pub fn invalid(kind: ReadingKind) -> Self {
        Self {
            kind,
            temperature: f32::NAN,
            humidity: None,
            valid: false,
        }
    }
}

/// Temperature and humidity from one indoor measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndoorMeasurement {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

/// Indoor temperature/humidity sensor.
pub trait IndoorSensor {
    /// Measure temperature and relative humidity together.
    fn measure(&mut self) -> impl Future<Output = Result<IndoorMeasurement, SensorError>>;
}

/// Outdoor temperature probe with a separate conversion step.
pub trait OutdoorProbe {
    /// Start a temperature conversion on every probe on the bus.
    fn request_conversion(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Read back the converted temperature of the probe at `probe_index`.
    ///
    /// Only meaningful once the conversion time has passed since
    /// [`OutdoorProbe::request_conversion`].
    fn read_celsius(&mut self, probe_index: u8) -> impl Future<Output = Result<f32, SensorError>>;
}
