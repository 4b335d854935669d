//! UI definitions module

use core::fmt;

use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_10X20, MonoFont},
    pixelcolor::{Rgb565, RgbColor},
};
use embedded_text::alignment::HorizontalAlignment;
use profont::PROFONT_24_POINT;

use crate::system::time::ClockText;

pub mod compositor;

pub use compositor::Compositor;

/// Size of the article text buffer: 255 bytes of text plus room for a terminator.
pub const ARTICLE_TEXT_LEN: usize = 256;

/// Article title as shown on screen
pub type ArticleText = Label<ARTICLE_TEXT_LEN>;

/// Fixed capacity text buffer
///
/// Holds at most `N - 1` bytes, like a C string buffer of size `N`.
/// Longer text is cut at the last character boundary that fits.
#[derive(Clone, Copy)]
pub struct Label<const N: usize> {
    str_buf: [u8; N],
    len: usize,
}

impl<const N: usize> Label<N> {
    /// Create new, empty label
    pub const fn new() -> Self {
        Self {
            str_buf: [0; N],
            len: 0,
        }
    }

    /// Maximum number of bytes the label keeps
    pub const fn capacity() -> usize {
        N.saturating_sub(1)
    }

    /// Replace the label text, truncating silently. Returns whether the
    /// text was cut.
    pub fn set(&mut self, text: &str) -> bool {
        let kept = truncate(text, Self::capacity());
        self.str_buf[..kept.len()].copy_from_slice(kept.as_bytes());
        self.len = kept.len();
        kept.len() < text.len()
    }

    /// Replace the label text with formatted output. Fails without
    /// touching the label if the output does not fit.
    pub fn set_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), fmt::Error> {
        let mut buf = [0u8; N];
        let cap = Self::capacity();
        let len = format_no_std::show(&mut buf[..cap], args)?.len();
        self.str_buf[..len].copy_from_slice(&buf[..len]);
        self.len = len;
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.str_buf[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for Label<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Label holding `text`, truncated to fit
impl<const N: usize> From<&str> for Label<N> {
    fn from(text: &str) -> Self {
        let mut label = Self::new();
        label.set(text);
        label
    }
}

impl<const N: usize> PartialEq for Label<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize> Eq for Label<N> {}

impl<const N: usize> fmt::Debug for Label<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Text currently shown by the watch face
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub(crate) clock_text: ClockText,
    pub(crate) article_text: ArticleText,
}

impl DisplayState {
    pub fn new(placeholder: &str) -> Self {
        Self {
            clock_text: ClockText::new(),
            article_text: ArticleText::from(placeholder),
        }
    }

    pub fn clock_text(&self) -> &str {
        self.clock_text.as_str()
    }

    pub fn article_text(&self) -> &str {
        self.article_text.as_str()
    }
}

/// System fonts available to text layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Font {
    /// Large digits for the time
    Clock,
    /// Body text
    Body,
}

impl Font {
    pub fn mono_font(&self) -> &'static MonoFont<'static> {
        match self {
            Self::Clock => &PROFONT_24_POINT,
            Self::Body => &FONT_10X20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl From<TextAlignment> for HorizontalAlignment {
    fn from(alignment: TextAlignment) -> Self {
        match alignment {
            TextAlignment::Left => HorizontalAlignment::Left,
            TextAlignment::Center => HorizontalAlignment::Center,
            TextAlignment::Right => HorizontalAlignment::Right,
        }
    }
}

/// Styling for a text layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub font: Font,
    pub text_color: Rgb565,
    /// `None` leaves the window background visible
    pub background: Option<Rgb565>,
    pub alignment: TextAlignment,
}

impl TextStyle {
    /// Black text on a clear background, centered
    pub const fn centered(font: Font) -> Self {
        Self {
            font,
            text_color: Rgb565::BLACK,
            background: None,
            alignment: TextAlignment::Center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_truncates_to_capacity() {
        let long = "x".repeat(300);
        let mut label = ArticleText::new();
        assert!(label.set(&long));
        assert_eq!(label.len(), 255);
        assert_eq!(label.as_str(), &long[..255]);

        assert!(!label.set("Eiffel Tower"));
        assert_eq!(label.as_str(), "Eiffel Tower");
    }

    #[test]
    fn label_never_splits_characters() {
        // 127 two-byte characters take 254 bytes, the 128th would end at 256
        let text = "é".repeat(128);
        let label = ArticleText::from(text.as_str());
        assert_eq!(label.len(), 254);
        assert!(label.as_str().chars().all(|c| c == 'é'));
    }

    #[test]
    fn label_fmt_rejects_overflow() {
        let mut label = Label::<4>::from("abc");
        assert!(label.set_fmt(format_args!("{}", 12345)).is_err());
        assert_eq!(label.as_str(), "abc");
        label.set_fmt(format_args!("{}", 42)).unwrap();
        assert_eq!(label.as_str(), "42");
    }

    #[test]
    fn label_equality_ignores_stale_bytes() {
        let mut label = Label::<8>::from("12:00");
        label.set("9:59");
        assert_eq!(label, Label::<8>::from("9:59"));
    }

    #[test]
    fn display_state_starts_with_placeholder() {
        let state = DisplayState::new("...");
        assert_eq!(state.article_text(), "...");
        assert_eq!(state.clock_text(), "");
    }
}
