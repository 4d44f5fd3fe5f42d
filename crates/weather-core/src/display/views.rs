//! Rendering of individual views
//!
//! Each view is a function of its [`ViewContent`]; the multiplexer decides
//! when to call [`render`]. Frames are built as clear, draw, present.

use core::fmt::Write;

use embedded_graphics::mono_font::{
    MonoFont, MonoTextStyle,
    ascii::{FONT_6X10, FONT_10X20},
};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use heapless::String;

use super::icons;
use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, Panel, ViewContent};
use crate::forecast::ForecastSlot;

/// Shown in place of a value that has never been read successfully.
pub const MISSING_VALUE: &str = "--.-";

type ValueText = String<16>;

fn value_text(value: Option<f32>) -> ValueText {
    let mut text = ValueText::new();
    match value {
        Some(v) => {
            let _ = write!(text, "{:.1}", v);
        }
        None => {
            let _ = text.push_str(MISSING_VALUE);
        }
    }
    text
}

fn draw_text<D>(
    target: &mut D,
    text: &str,
    position: Point,
    font: &'static MonoFont<'static>,
) -> Result<Point, D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(font, BinaryColor::On);
    Text::with_baseline(text, position, style, Baseline::Top).draw(target)
}

/// Large value with a small degree mark and unit suffix, e.g. `21.5°C`.
fn draw_temperature<D>(
    target: &mut D,
    value: Option<f32>,
    position: Point,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let end = draw_text(target, &value_text(value), position, &FONT_10X20)?;
    let unit = draw_text(target, "o", Point::new(end.x + 1, position.y), &FONT_6X10)?;
    draw_text(target, "C", Point::new(unit.x + 1, position.y), &FONT_10X20)?;
    Ok(())
}

/// Draw one complete frame for `content` and present it.
pub fn render<P: Panel>(content: &ViewContent, panel: &mut P) -> Result<(), P::Error> {
    panel.clear(BinaryColor::Off)?;
    match content {
        ViewContent::Indoor {
            temperature,
            humidity,
        } => draw_indoor(panel, *temperature, *humidity)?,
        ViewContent::Outdoor { temperature } => draw_outdoor(panel, *temperature)?,
        ViewContent::Forecast(slot) => draw_forecast(panel, slot)?,
    }
    panel.present()
}

fn draw_indoor<D>(
    target: &mut D,
    temperature: Option<f32>,
    humidity: Option<f32>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    icons::thermometer(target, Point::new(2, 0))?;
    draw_text(target, "in", Point::new(18, 20), &FONT_6X10)?;
    draw_temperature(target, temperature, Point::new(36, 4))?;

    icons::droplet(target, Point::new(2, 40))?;
    let end = draw_text(target, &value_text(humidity), Point::new(36, 40), &FONT_10X20)?;
    draw_text(target, "%", Point::new(end.x + 4, 40), &FONT_10X20)?;
    Ok(())
}

fn draw_outdoor<D>(target: &mut D, temperature: Option<f32>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    icons::thermometer(target, Point::new(2, 16))?;
    draw_text(target, "out", Point::new(18, 36), &FONT_6X10)?;
    draw_temperature(target, temperature, Point::new(42, 22))
}

fn draw_forecast<D>(target: &mut D, slot: &ForecastSlot) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_text(target, &slot.time_label, Point::new(0, 0), &FONT_10X20)?;

    let mut temperature = ValueText::new();
    let _ = write!(temperature, "{}", slot.temperature_celsius);
    let end = draw_text(target, &temperature, Point::new(0, 32), &FONT_10X20)?;
    let unit = draw_text(target, "o", Point::new(end.x + 1, 32), &FONT_6X10)?;
    draw_text(target, "C", Point::new(unit.x + 1, 32), &FONT_10X20)?;

    let icon_origin = Point::new(
        (DISPLAY_WIDTH_PX - icons::WEATHER_ICON_SIZE) as i32 - 4,
        (DISPLAY_HEIGHT_PX - icons::WEATHER_ICON_SIZE) as i32 / 2,
    );
    icons::draw_weather_icon(target, slot.icon(), icon_origin)
}

/// Full-screen status message with a Wi-Fi glyph, used while connecting.
pub fn render_status<P: Panel>(panel: &mut P, message: &str) -> Result<(), P::Error> {
    panel.clear(BinaryColor::Off)?;
    icons::wifi(panel, Point::new((DISPLAY_WIDTH_PX as i32 - 32) / 2, 4))?;

    let character_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(
        message,
        Point::new(DISPLAY_WIDTH_PX as i32 / 2, 44),
        character_style,
        text_style,
    )
    .draw(panel)?;

    panel.present()
}
