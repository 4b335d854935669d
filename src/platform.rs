//! Host platform abstraction
//!
//! The window, text layers, clock and message transport belong to the host.
//! The watch face only ever sees opaque handles and events.

use core::fmt;

use chrono::NaiveDateTime;
use embedded_graphics::primitives::Rectangle;

use crate::message::{AppMessageResult, Inbox};
use crate::ui::TextStyle;

/// Opaque handle to a host window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowHandle(u8);

/// Opaque handle to a host text layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerHandle(u8);

impl WindowHandle {
    /// Wrap a platform specific window id
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl LayerHandle {
    /// Wrap a platform specific layer id
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Tick granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

/// Event sources the watch face can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subscription {
    Tick(TimeUnit),
    InboxReceived,
    InboxDropped,
    OutboxFailed,
    OutboxSent,
}

impl Subscription {
    fn bit(&self) -> u8 {
        match self {
            Self::Tick(TimeUnit::Second) => 1 << 0,
            Self::Tick(TimeUnit::Minute) => 1 << 1,
            Self::Tick(TimeUnit::Hour) => 1 << 2,
            Self::InboxReceived => 1 << 3,
            Self::InboxDropped => 1 << 4,
            Self::OutboxFailed => 1 << 5,
            Self::OutboxSent => 1 << 6,
        }
    }
}

/// Set of active subscriptions, for platforms that filter events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subscriptions(u8);

impl Subscriptions {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a subscription. Returns `false` if it was already present.
    pub fn insert(&mut self, subscription: Subscription) -> bool {
        let bit = subscription.bit();
        let added = self.0 & bit == 0;
        self.0 |= bit;
        added
    }

    pub fn contains(&self, subscription: Subscription) -> bool {
        self.0 & subscription.bit() != 0
    }

    /// Whether `event` should be delivered
    pub fn accepts(&self, event: &Event) -> bool {
        self.contains(event.subscription())
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Event delivered by the host event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A tick boundary was crossed
    Tick(TimeUnit),
    /// A message arrived on the inbox channel
    InboxReceived(Inbox),
    /// An inbound message was lost before delivery
    InboxDropped(AppMessageResult),
    /// An outbound message could not be sent
    OutboxFailed(AppMessageResult),
    /// An outbound message was acknowledged
    OutboxSent,
}

impl Event {
    pub fn subscription(&self) -> Subscription {
        match self {
            Self::Tick(unit) => Subscription::Tick(*unit),
            Self::InboxReceived(_) => Subscription::InboxReceived,
            Self::InboxDropped(_) => Subscription::InboxDropped,
            Self::OutboxFailed(_) => Subscription::OutboxFailed,
            Self::OutboxSent => Subscription::OutboxSent,
        }
    }
}

/// Services the host provides to the watch face
pub trait Platform {
    /// Allocate a new, empty window
    fn create_window(&mut self) -> Result<WindowHandle, Error>;

    /// Release a window. Its layers are detached, not destroyed.
    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), Error>;

    /// Bounds of the window's root layer
    fn window_bounds(&self, window: WindowHandle) -> Result<Rectangle, Error>;

    /// Show a window on top of the window stack
    fn push_window(&mut self, window: WindowHandle, animated: bool) -> Result<(), Error>;

    /// Allocate a text layer covering `frame`
    fn create_text_layer(&mut self, frame: Rectangle, style: TextStyle)
        -> Result<LayerHandle, Error>;

    /// Release a text layer, detaching it from its window
    fn destroy_text_layer(&mut self, layer: LayerHandle) -> Result<(), Error>;

    /// Attach a layer to a window's root layer
    fn add_child(&mut self, window: WindowHandle, layer: LayerHandle) -> Result<(), Error>;

    /// Replace the text of a layer
    fn set_text(&mut self, layer: LayerHandle, text: &str) -> Result<(), Error>;

    /// User's 12/24 hour preference
    fn clock_is_24h(&self) -> bool;

    /// Current local time, `None` while the clock is unknown
    fn local_time(&self) -> Option<NaiveDateTime>;

    /// Start delivering events of the given kind
    fn subscribe(&mut self, subscription: Subscription) -> Result<(), Error>;

    /// Open the inbox and outbox channels with the given capacities in bytes
    fn open_messaging(&mut self, inbox_size: usize, outbox_size: usize) -> Result<(), Error>;
}

/// Blocking event source
pub trait EventLoop {
    /// Wait for the next event. `None` means the host is shutting down.
    fn next_event(&mut self) -> Option<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Handle does not refer to a live object
    InvalidHandle,
    /// No free slot for another window or layer
    OutOfResources,
    /// The message transport refused the request
    Messaging(AppMessageResult),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => f.write_str("invalid handle"),
            Self::OutOfResources => f.write_str("out of resources"),
            Self::Messaging(reason) => write!(f, "messaging error: {}", reason),
        }
    }
}
