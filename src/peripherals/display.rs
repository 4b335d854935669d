//! Display control module for PineTime

use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_18, P0_25, P0_26},
    spim::{self, Spim},
};
use embassy_time::Delay;

use display_interface_spi::SPIInterface;
use embedded_graphics::geometry::Size;
use mipidsi::{models::ST7789, Builder, Orientation};

use wikiface::ui::Compositor;

const LCD_W: u16 = 240;
const LCD_H: u16 = 240;

type Lcd<'a, SPI> = mipidsi::Display<
    SPIInterface<Spim<'a, SPI>, Output<'a, P0_18>, Output<'a, P0_25>>,
    ST7789,
    Output<'a, P0_26>,
>;

/// ST7789 LCD driven over SPI
pub struct Display<SPI>
where
    SPI: spim::Instance,
{
    lcd: Lcd<'static, SPI>,
}

impl<SPI> Display<SPI>
where
    SPI: spim::Instance,
{
    /// Configure display settings on boot
    pub fn init(
        spim: Spim<'static, SPI>,
        cs_pin: Output<'static, P0_25>,
        dc_pin: Output<'static, P0_18>,
        rst_pin: Output<'static, P0_26>,
        delay: &mut Delay,
    ) -> Result<Self, Error> {
        let lcd = Builder::st7789(SPIInterface::new(spim, dc_pin, cs_pin))
            .with_display_size(LCD_W, LCD_H)
            .with_orientation(Orientation::Portrait(false))
            .init(delay, Some(rst_pin))
            .map_err(|_| Error::Init)?;

        Ok(Self { lcd })
    }

    /// Screen size in pixels
    pub const fn size() -> Size {
        Size::new(LCD_W as u32, LCD_H as u32)
    }

    /// Render the compositor's top window
    pub fn draw(&mut self, compositor: &mut Compositor) -> Result<(), Error> {
        compositor.draw(&mut self.lcd).map_err(|_| Error::Draw)
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    /// Controller did not come up
    Init,
    /// SPI transfer failed while drawing
    Draw,
}
