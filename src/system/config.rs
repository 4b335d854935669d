//! General system configuration

use embedded_graphics::{
    geometry::{Point, Size},
    primitives::Rectangle,
};

use crate::message::{INBOX_SIZE, OUTBOX_SIZE};

/// Vertical placement of a full-width text layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub top: i32,
    pub height: u32,
}

impl Band {
    /// Frame spanning the width of `bounds`
    pub fn frame(&self, bounds: Rectangle) -> Rectangle {
        Rectangle::new(
            Point::new(bounds.top_left.x, bounds.top_left.y + self.top),
            Size::new(bounds.size.width, self.height),
        )
    }
}

/// Watch face settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchfaceConfig {
    /// Default 12/24 hour preference reported by the platform
    pub clock_24h: bool,
    /// Offset of local time from UTC
    pub utc_offset_secs: i32,
    pub inbox_size: usize,
    pub outbox_size: usize,
    /// Article text shown until the first message arrives
    pub placeholder: &'static str,
    pub clock_band: Band,
    pub article_band: Band,
}

impl WatchfaceConfig {
    pub const fn new() -> Self {
        Self {
            clock_24h: true,
            utc_offset_secs: 0,
            inbox_size: INBOX_SIZE,
            outbox_size: OUTBOX_SIZE,
            placeholder: "...",
            clock_band: Band {
                top: 40,
                height: 50,
            },
            article_band: Band {
                top: 100,
                height: 120,
            },
        }
    }
}

impl Default for WatchfaceConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_span_window_width() {
        let config = WatchfaceConfig::default();
        let bounds = Rectangle::new(Point::zero(), Size::new(240, 240));

        let clock = config.clock_band.frame(bounds);
        assert_eq!(clock, Rectangle::new(Point::new(0, 40), Size::new(240, 50)));

        let article = config.article_band.frame(bounds);
        assert_eq!(article.size.width, 240);
        assert!(article.top_left.y >= clock.top_left.y + clock.size.height as i32);
        assert!(article.top_left.y + article.size.height as i32 <= 240);
    }
}
