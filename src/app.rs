//! Watch face lifecycle and event handlers

use core::fmt;

use crate::message::{AppMessageResult, FieldError, Inbox, IncomingMessage};
use crate::platform::{
    self, Event, EventLoop, LayerHandle, Platform, Subscription, TimeUnit, WindowHandle,
};
use crate::system::config::WatchfaceConfig;
use crate::system::time::{format_clock, ClockStyle};
use crate::ui::{DisplayState, Font, TextStyle};

/// Lifecycle state of the watch face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    Uninitialized,
    Running,
    TornDown,
}

/// Host objects making up the screen
#[derive(Debug, Clone, Copy)]
struct Screen {
    window: WindowHandle,
    time_layer: LayerHandle,
    article_layer: LayerHandle,
}

/// Watch face context, handed to every handler
pub struct Watchface {
    config: WatchfaceConfig,
    lifecycle: Lifecycle,
    display: DisplayState,
    screen: Option<Screen>,
}

impl Watchface {
    pub fn new(config: WatchfaceConfig) -> Self {
        Self {
            display: DisplayState::new(config.placeholder),
            config,
            lifecycle: Lifecycle::Uninitialized,
            screen: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Build the screen, subscribe to events and open messaging.
    ///
    /// On failure every host object created so far is released and the
    /// watch face stays `Uninitialized`.
    pub fn init<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return Err(Error::InvalidState(self.lifecycle));
        }
        info!("Initializing watch face");

        // Create main window and show it
        let window = platform.create_window()?;
        let screen = match self.load(platform, window) {
            Ok(screen) => screen,
            Err(e) => {
                if platform.destroy_window(window).is_err() {
                    warn!("Could not release window");
                }
                return Err(e);
            }
        };
        self.screen = Some(screen);

        if let Err(e) = self.start(platform, window) {
            warn!("Initialization failed: {}", e);
            self.screen = None;
            if release(platform, screen).is_err() {
                warn!("Could not release screen");
            }
            return Err(e);
        }

        self.lifecycle = Lifecycle::Running;
        info!("Initialization finished");
        Ok(())
    }

    /// Create and attach the text layers of the main window
    fn load<P: Platform>(&mut self, platform: &mut P, window: WindowHandle) -> Result<Screen, Error> {
        let bounds = platform.window_bounds(window)?;

        let time_layer = platform.create_text_layer(
            self.config.clock_band.frame(bounds),
            TextStyle::centered(Font::Clock),
        )?;
        let article_layer = match platform.create_text_layer(
            self.config.article_band.frame(bounds),
            TextStyle::centered(Font::Body),
        ) {
            Ok(layer) => layer,
            Err(e) => {
                if platform.destroy_text_layer(time_layer).is_err() {
                    warn!("Could not release clock layer");
                }
                return Err(e.into());
            }
        };

        let screen = Screen {
            window,
            time_layer,
            article_layer,
        };
        if let Err(e) = self.attach(platform, screen) {
            if unload(platform, screen).is_err() {
                warn!("Could not release text layers");
            }
            return Err(e.into());
        }
        Ok(screen)
    }

    fn attach<P: Platform>(&self, platform: &mut P, screen: Screen) -> Result<(), platform::Error> {
        platform.add_child(screen.window, screen.time_layer)?;
        platform.set_text(screen.article_layer, self.display.article_text())?;
        platform.add_child(screen.window, screen.article_layer)
    }

    /// Show the window and register with the tick service and the
    /// message transport
    fn start<P: Platform>(&mut self, platform: &mut P, window: WindowHandle) -> Result<(), Error> {
        platform.push_window(window, true)?;
        self.update_time(platform)?;

        platform.subscribe(Subscription::Tick(TimeUnit::Minute))?;
        platform.subscribe(Subscription::InboxReceived)?;
        platform.subscribe(Subscription::InboxDropped)?;
        platform.subscribe(Subscription::OutboxFailed)?;
        platform.subscribe(Subscription::OutboxSent)?;

        platform.open_messaging(self.config.inbox_size, self.config.outbox_size)?;
        Ok(())
    }

    /// Route an event to its handler
    pub fn dispatch<P: Platform>(&mut self, platform: &mut P, event: Event) -> Result<(), Error> {
        if self.lifecycle != Lifecycle::Running {
            return Err(Error::InvalidState(self.lifecycle));
        }

        match event {
            Event::Tick(unit) => self.on_tick(platform, unit),
            Event::InboxReceived(inbox) => self.on_inbox_received(platform, &inbox),
            Event::InboxDropped(reason) => {
                self.on_inbox_dropped(reason);
                Ok(())
            }
            Event::OutboxFailed(reason) => {
                self.on_outbox_failed(reason);
                Ok(())
            }
            Event::OutboxSent => {
                self.on_outbox_sent();
                Ok(())
            }
        }
    }

    pub fn on_tick<P: Platform>(&mut self, platform: &mut P, unit: TimeUnit) -> Result<(), Error> {
        trace!("Tick: {:?}", unit);
        self.update_time(platform)
    }

    /// Show the article title carried by `inbox`, if there is one
    pub fn on_inbox_received<P: Platform>(
        &mut self,
        platform: &mut P,
        inbox: &Inbox,
    ) -> Result<(), Error> {
        info!("Message received ({} bytes)", inbox.len());

        match IncomingMessage::parse(inbox.as_bytes()) {
            Ok(message) => match message.article_title() {
                Ok(title) => {
                    if self.display.article_text.set(title) {
                        debug!("Article title truncated");
                    }
                    let layer = self.screen()?.article_layer;
                    platform.set_text(layer, self.display.article_text())?;
                }
                Err(FieldError::Missing) => info!("Message has no article title"),
                Err(e) => warn!("Ignoring article title: {}", e),
            },
            Err(e) => warn!("Ignoring malformed message: {}", e),
        }

        info!("Message handled");
        Ok(())
    }

    pub fn on_inbox_dropped(&mut self, reason: AppMessageResult) {
        error!("Message dropped: {}", reason);
    }

    pub fn on_outbox_failed(&mut self, reason: AppMessageResult) {
        error!("Outbox send failed: {}", reason);
    }

    pub fn on_outbox_sent(&mut self) {
        info!("Outbox send success");
    }

    /// Format the current time into the clock layer
    fn update_time<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        let Some(now) = platform.local_time() else {
            warn!("Time unavailable, keeping \"{}\"", self.display.clock_text());
            return Ok(());
        };

        let style = ClockStyle::from_24h(platform.clock_is_24h());
        let text = match format_clock(&now, style) {
            Ok(text) => text,
            Err(_) => {
                warn!("Could not format time");
                return Ok(());
            }
        };

        if text != self.display.clock_text {
            self.display.clock_text = text;
            let layer = self.screen()?.time_layer;
            platform.set_text(layer, self.display.clock_text())?;
            debug!("Clock updated: {}", self.display.clock_text());
        }
        Ok(())
    }

    /// Release the screen
    pub fn deinit<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        if self.lifecycle != Lifecycle::Running {
            return Err(Error::InvalidState(self.lifecycle));
        }
        info!("Tearing down watch face");

        let screen = self.screen()?;
        self.screen = None;
        self.lifecycle = Lifecycle::TornDown;

        release(platform, screen)
    }

    /// Initialize, process events until the host shuts down, then tear down
    pub fn run<P: Platform + EventLoop>(&mut self, platform: &mut P) -> Result<(), Error> {
        self.init(platform)?;

        while let Some(event) = platform.next_event() {
            if let Err(e) = self.dispatch(platform, event) {
                warn!("Event handling failed: {}", e);
            }
        }

        self.deinit(platform)
    }

    fn screen(&self) -> Result<Screen, Error> {
        self.screen.ok_or(Error::InvalidState(self.lifecycle))
    }
}

/// Destroy both text layers of `screen`
fn unload<P: Platform>(platform: &mut P, screen: Screen) -> Result<(), platform::Error> {
    let time = platform.destroy_text_layer(screen.time_layer);
    let article = platform.destroy_text_layer(screen.article_layer);
    time.and(article)
}

/// Destroy the text layers, then the window
fn release<P: Platform>(platform: &mut P, screen: Screen) -> Result<(), Error> {
    let layers = unload(platform, screen);
    platform.destroy_window(screen.window)?;
    Ok(layers?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Operation not allowed in this lifecycle state
    InvalidState(Lifecycle),
    Platform(platform::Error),
}

impl From<platform::Error> for Error {
    fn from(e: platform::Error) -> Self {
        Self::Platform(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState(state) => write!(f, "not allowed while {:?}", state),
            Self::Platform(e) => write!(f, "platform error: {}", e),
        }
    }
}
