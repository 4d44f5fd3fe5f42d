//! ESP32-S3 firmware-specific modules for the weather station
//!
//! This crate contains the code that cannot compile on desktop targets:
//! Wi-Fi bring-up, the embassy-net HTTP client, the SSD1306 panel adapter,
//! the embassy-backed clock and the secrets baked in at build time.

#![no_std]

extern crate alloc;

pub mod clock;
pub mod http;
pub mod panel;
pub mod secrets;
pub mod wifi;
