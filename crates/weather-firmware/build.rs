//! Bakes station secrets from `.env` into the firmware image.
//!
//! Each key is exported as a compile-time environment variable read with
//! `env!` in `secrets.rs`. Missing keys become empty strings, which the
//! station configuration check rejects at boot.

const KEYS: [&str; 6] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "WEATHER_API_KEY",
    "WEATHER_CITY",
    "WEATHER_COUNTRY",
    "TELEMETRY_API_KEY",
];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=.env");

    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=no .env loaded ({e}); secrets will be empty");
    }

    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_default();
        println!("cargo:rustc-env={key}={value}");
    }
}
