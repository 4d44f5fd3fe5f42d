//! Display surface, views and the view multiplexer
//!
//! The station drives a 128x64 monochrome panel. Everything is drawn with
//! `embedded-graphics` into the panel's buffer and then pushed to the
//! hardware in one [`Panel::present`] call, so a half-drawn view is never
//! visible.

pub mod icons;
pub mod multiplexer;
pub mod views;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;

use crate::forecast::ForecastSlot;
use crate::sampler::LatestReadings;

pub use multiplexer::{DisplayMultiplexer, RenderOutcome};

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// A buffered monochrome display.
///
/// Drawing goes to an off-screen buffer; [`Panel::present`] flushes the
/// whole buffer to the hardware.
pub trait Panel: DrawTarget<Color = BinaryColor> {
    fn present(&mut self) -> Result<(), Self::Error>;
}

/// The screens the multiplexer rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayView {
    Indoor,
    Outdoor,
    /// Forecast slot by index into the current forecast
    Forecast(usize),
}

impl DisplayView {
    /// The view after this one in the fixed round-robin order.
    ///
    /// Forecast views exist only for slots the current forecast holds, so
    /// with an empty forecast the rotation is just indoor and outdoor.
    pub fn next(self, forecast_len: usize) -> Self {
        match self {
            Self::Indoor => Self::Outdoor,
            Self::Outdoor if forecast_len > 0 => Self::Forecast(0),
            Self::Forecast(i) if i + 1 < forecast_len => Self::Forecast(i + 1),
            Self::Outdoor | Self::Forecast(_) => Self::Indoor,
        }
    }
}

/// Exactly what a view shows; two equal contents draw identical frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewContent {
    Indoor {
        temperature: Option<f32>,
        humidity: Option<f32>,
    },
    Outdoor {
        temperature: Option<f32>,
    },
    Forecast(ForecastSlot),
}

impl ViewContent {
    /// Content for `view`, or `None` if it names a slot the forecast lacks.
    pub fn for_view(
        view: DisplayView,
        latest: &LatestReadings,
        forecast: &[ForecastSlot],
    ) -> Option<Self> {
        match view {
            DisplayView::Indoor => Some(Self::Indoor {
                temperature: latest.indoor_temperature,
                humidity: latest.humidity,
            }),
            DisplayView::Outdoor => Some(Self::Outdoor {
                temperature: latest.outdoor_temperature,
            }),
            DisplayView::Forecast(i) => forecast.get(i).cloned().map(Self::Forecast),
        }
    }
}
