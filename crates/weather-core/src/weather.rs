//! Weather classification codes to icon categories
//!
//! The weather service identifies conditions with numeric codes grouped by
//! hundreds (2xx thunderstorm, 3xx drizzle, 5xx rain, 6xx snow, 7xx
//! atmosphere, 800 clear, 80x clouds). The station has icons for a subset.

/// Icon category for a weather classification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIconCategory {
    Thunderstorm,
    Drizzle,
    Snow,
    ClearSky,
    CloudsLight,
    CloudsModerate,
    CloudsHeavy,
    Unknown,
}

impl WeatherIconCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Thunderstorm => "Thunderstorm",
            Self::Drizzle => "Drizzle",
            Self::Snow => "Snow",
            Self::ClearSky => "Clear",
            Self::CloudsLight => "Few clouds",
            Self::CloudsModerate => "Clouds",
            Self::CloudsHeavy => "Overcast",
            Self::Unknown => "Unknown",
        }
    }
}

/// Map a weather code to its icon category.
///
/// The drizzle icon covers 300..=501, which also takes the two lightest
/// rain codes (500 and 501); the remaining rain codes 502..=599 have no icon
/// and fall through to `Unknown`.
pub const fn classify(code: i32) -> WeatherIconCategory {
    match code {
        200..=299 => WeatherIconCategory::Thunderstorm,
        300..=501 => WeatherIconCategory::Drizzle,
        600..=699 => WeatherIconCategory::Snow,
        800 => WeatherIconCategory::ClearSky,
        801 => WeatherIconCategory::CloudsLight,
        802 => WeatherIconCategory::CloudsModerate,
        803 | 804 => WeatherIconCategory::CloudsHeavy,
        _ => WeatherIconCategory::Unknown,
    }
}
