//! Hardware-independent core library for the weather station
//!
//! This crate contains every piece of station logic that does not touch a
//! peripheral: the elapsed-time primitives, the multi-rate sensor sampler,
//! the rolling aggregator, forecast retrieval and weather classification,
//! the display multiplexer and its views, telemetry upload, and the
//! cooperative tick loop that composes them.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both the
//! ESP32-S3 firmware and desktop hosts (for the simulator and tests).
//! Hardware is reached only through the collaborator traits in
//! [`sensors`], [`display`] and [`net`].

#![no_std]

extern crate alloc;

pub mod aggregator;
pub mod config;
pub mod display;
pub mod forecast;
pub mod net;
pub mod sampler;
pub mod sensors;
pub mod station;
pub mod timer;
pub mod uploader;
pub mod weather;

#[cfg(test)]
pub(crate) mod mocks;

pub use aggregator::{AggregateMeans, Aggregator};
pub use config::{StationConfig, TimingConfig};
pub use station::{ForecastOutcome, TickReport, WeatherStation};
pub use uploader::UploadOutcome;
pub use timer::{Clock, ElapsedTimer, Millis};
