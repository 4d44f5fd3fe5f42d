//! Monochrome icons drawn from primitives
//!
//! Weather icons fit a 48x48 box anchored at its top-left corner; the
//! thermometer and droplet are small glyphs placed next to readings.

use embedded_graphics::geometry::AngleUnit;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Arc, Circle, Line, Polyline, PrimitiveStyle, Rectangle, Triangle,
};
use embedded_graphics::text::{Baseline, Text};

use crate::weather::WeatherIconCategory;

/// Edge length of the square weather icon box.
pub const WEATHER_ICON_SIZE: u32 = 48;

fn fill() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::On)
}

fn stroke(width: u32) -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_stroke(BinaryColor::On, width)
}

fn erase() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::Off)
}

/// Draw the icon for `category` in the 48x48 box at `origin`.
///
/// `Unknown` draws a question mark so the slot is never blank.
pub fn draw_weather_icon<D>(
    target: &mut D,
    category: WeatherIconCategory,
    origin: Point,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    match category {
        WeatherIconCategory::ClearSky => sun(target, origin + Point::new(24, 24), 20),
        WeatherIconCategory::CloudsLight => {
            sun(target, origin + Point::new(32, 14), 12)?;
            cloud(target, origin + Point::new(0, 14), false)
        }
        WeatherIconCategory::CloudsModerate => cloud(target, origin + Point::new(4, 10), false),
        WeatherIconCategory::CloudsHeavy => {
            cloud(target, origin + Point::new(10, 2), false)?;
            cloud(target, origin + Point::new(2, 14), true)
        }
        WeatherIconCategory::Drizzle => {
            cloud(target, origin + Point::new(4, 0), false)?;
            for x in [12, 22, 32] {
                let top = origin + Point::new(x, 34);
                Line::new(top, top + Point::new(-3, 8))
                    .into_styled(stroke(1))
                    .draw(target)?;
            }
            Ok(())
        }
        WeatherIconCategory::Thunderstorm => {
            cloud(target, origin + Point::new(4, 0), true)?;
            let bolt = [
                origin + Point::new(26, 30),
                origin + Point::new(18, 40),
                origin + Point::new(26, 40),
                origin + Point::new(20, 48),
            ];
            Polyline::new(&bolt).into_styled(stroke(2)).draw(target)
        }
        WeatherIconCategory::Snow => {
            cloud(target, origin + Point::new(4, 0), false)?;
            for center in [Point::new(12, 38), Point::new(24, 44), Point::new(36, 38)] {
                snowflake(target, origin + center)?;
            }
            Ok(())
        }
        WeatherIconCategory::Unknown => {
            let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
            Text::with_baseline("?", origin + Point::new(19, 14), style, Baseline::Top)
                .draw(target)?;
            Ok(())
        }
    }
}

/// Sun whose rays reach `reach` pixels from `center`; the disc radius is
/// half of that.
fn sun<D>(target: &mut D, center: Point, reach: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let disc_diameter = reach as u32;
    Circle::with_center(center, disc_diameter)
        .into_styled(fill())
        .draw(target)?;

    // eight rays from just outside the disc out to `reach`
    const DIRECTIONS: [(i32, i32); 8] = [
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
    ];
    let inner = reach * 2 / 3;
    for (dx, dy) in DIRECTIONS {
        let scale = if dx != 0 && dy != 0 { 7 } else { 10 };
        let start = center + Point::new(dx * inner * scale / 10, dy * inner * scale / 10);
        let end = center + Point::new(dx * reach * scale / 10, dy * reach * scale / 10);
        Line::new(start, end).into_styled(stroke(2)).draw(target)?;
    }
    Ok(())
}

/// A 40x26 cloud whose top-left is `origin`.
fn cloud<D>(target: &mut D, origin: Point, filled: bool) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let puffs = [
        Circle::new(origin + Point::new(0, 10), 16),
        Circle::new(origin + Point::new(8, 0), 22),
        Circle::new(origin + Point::new(22, 6), 18),
    ];
    let base = Rectangle::new(origin + Point::new(8, 14), Size::new(24, 12));

    // solid silhouette first, then hollow it out for the outline variant
    for puff in puffs {
        puff.into_styled(fill()).draw(target)?;
    }
    base.into_styled(fill()).draw(target)?;

    if !filled {
        for puff in puffs {
            puff.offset(-2).into_styled(erase()).draw(target)?;
        }
        base.offset(-2).into_styled(erase()).draw(target)?;
    }
    Ok(())
}

fn snowflake<D>(target: &mut D, center: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Line::new(center + Point::new(-3, 0), center + Point::new(3, 0))
        .into_styled(stroke(1))
        .draw(target)?;
    Line::new(center + Point::new(0, -3), center + Point::new(0, 3))
        .into_styled(stroke(1))
        .draw(target)?;
    Line::new(center + Point::new(-2, -2), center + Point::new(2, 2))
        .into_styled(stroke(1))
        .draw(target)?;
    Line::new(center + Point::new(-2, 2), center + Point::new(2, -2))
        .into_styled(stroke(1))
        .draw(target)
}

/// A 12x30 thermometer at `origin`.
pub fn thermometer<D>(target: &mut D, origin: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(origin + Point::new(3, 0), Size::new(6, 22))
        .into_styled(stroke(1))
        .draw(target)?;
    Rectangle::new(origin + Point::new(5, 8), Size::new(2, 14))
        .into_styled(fill())
        .draw(target)?;
    Circle::new(origin + Point::new(0, 18), 12)
        .into_styled(fill())
        .draw(target)
}

/// A 12x16 water droplet at `origin`.
pub fn droplet<D>(target: &mut D, origin: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Triangle::new(
        origin + Point::new(6, 0),
        origin + Point::new(1, 8),
        origin + Point::new(11, 8),
    )
    .into_styled(fill())
    .draw(target)?;
    Circle::new(origin + Point::new(1, 4), 11)
        .into_styled(fill())
        .draw(target)
}

/// Wi-Fi signal arcs in a 32x24 box at `origin`.
pub fn wifi<D>(target: &mut D, origin: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let center = origin + Point::new(16, 22);
    for diameter in [14, 28, 42] {
        Arc::with_center(center, diameter, 225.0.deg(), 90.0.deg())
            .into_styled(stroke(2))
            .draw(target)?;
    }
    Circle::with_center(center, 4).into_styled(fill()).draw(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DISPLAY_HEIGHT_PX;
    use crate::mocks::TestPanel;

    #[test]
    fn test_sun_disc_is_half_the_ray_reach() {
        let mut panel = TestPanel::new();
        draw_weather_icon(&mut panel, WeatherIconCategory::ClearSky, Point::zero()).unwrap();

        // center (24, 24), rays reach 20 px, disc radius 10 px
        assert!(panel.is_lit(Point::new(24, 24)));
        assert!(panel.is_lit(Point::new(24, 16)));
        assert!(!panel.is_lit(Point::new(24, 13)));
        assert!(panel.is_lit(Point::new(24, 9)));
    }

    #[test]
    fn test_every_category_draws_inside_its_box() {
        for category in [
            WeatherIconCategory::Thunderstorm,
            WeatherIconCategory::Drizzle,
            WeatherIconCategory::Snow,
            WeatherIconCategory::ClearSky,
            WeatherIconCategory::CloudsLight,
            WeatherIconCategory::CloudsModerate,
            WeatherIconCategory::CloudsHeavy,
            WeatherIconCategory::Unknown,
        ] {
            let mut panel = TestPanel::new();
            draw_weather_icon(&mut panel, category, Point::new(60, 0)).unwrap();
            assert!(panel.lit_pixels() > 0, "{:?} drew nothing", category);
            for x in 0..60 {
                for y in 0..DISPLAY_HEIGHT_PX as i32 {
                    assert!(!panel.is_lit(Point::new(x, y)), "{:?} spilled left", category);
                }
            }
        }
    }
}
