//! SSD1306 128x64 OLED as a station [`Panel`]

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use esp_hal::Blocking;
use esp_hal::i2c::master::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};
use weather_core::display::Panel;

type Oled<'a> = Ssd1306<
    I2CInterface<I2c<'a, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

pub type PanelError<'a> = <Oled<'a> as DrawTarget>::Error;

/// Buffered OLED; drawing fills the RAM buffer and `present` flushes it
/// over I2C in one transfer.
pub struct OledPanel<'a> {
    display: Oled<'a>,
}

impl<'a> OledPanel<'a> {
    pub fn new(i2c: I2c<'a, Blocking>) -> Result<Self, PanelError<'a>> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display.init()?;
        Ok(Self { display })
    }
}

impl OriginDimensions for OledPanel<'_> {
    fn size(&self) -> Size {
        OriginDimensions::size(&self.display)
    }
}

impl<'a> DrawTarget for OledPanel<'a> {
    type Color = BinaryColor;
    type Error = PanelError<'a>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        DrawTarget::draw_iter(&mut self.display, pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        DrawTarget::clear(&mut self.display, color)
    }
}

impl Panel for OledPanel<'_> {
    fn present(&mut self) -> Result<(), Self::Error> {
        self.display.flush()
    }
}
