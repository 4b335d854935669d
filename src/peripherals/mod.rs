pub(crate) mod backlight;
pub(crate) mod display;
