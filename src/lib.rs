//! Nearest-article watch face
//!
//! Shows the time and the title of the nearest unillustrated Wikipedia
//! article, as pushed by a companion app over the inbox channel. All
//! hardware lives behind [`platform::Platform`], so everything in here runs
//! on the host as well as on the watch.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod companion;
pub mod message;
pub mod platform;
pub mod system;
pub mod ui;

pub use app::{Lifecycle, Watchface};
pub use platform::{Event, EventLoop, Platform};
