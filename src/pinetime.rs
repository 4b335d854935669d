//! Watch face platform backed by the PineTime hardware

use core::cell::RefCell;

use chrono::NaiveDateTime;
use embassy_nrf::peripherals::SPI2;
use embassy_sync::blocking_mutex::{raw::ThreadModeRawMutex, Mutex};
use embassy_time::Instant;
use embedded_graphics::primitives::Rectangle;

use wikiface::{
    message::{AppMessageResult, INBOX_SIZE, OUTBOX_SIZE},
    platform::{self, Event, LayerHandle, Platform, Subscription, Subscriptions, WindowHandle},
    system::time::TimeManager,
    ui::{Compositor, TextStyle},
};

use crate::peripherals::{backlight::Backlight, display::Display};

/// Wall clock shared by the platform, the minute ticker and the time service
pub static CLOCK: Mutex<ThreadModeRawMutex, RefCell<TimeManager>> =
    Mutex::new(RefCell::new(TimeManager::new(0)));

/// Seconds since boot
pub fn uptime_secs() -> u64 {
    Instant::now().as_secs()
}

pub struct PineTime {
    compositor: Compositor,
    display: Display<SPI2>,
    _backlight: Backlight<'static>,
    clock_24h: bool,
    subscriptions: Subscriptions,
    messaging_open: bool,
}

impl PineTime {
    pub fn new(display: Display<SPI2>, backlight: Backlight<'static>, clock_24h: bool) -> Self {
        Self {
            compositor: Compositor::new(Display::<SPI2>::size()),
            display,
            _backlight: backlight,
            clock_24h,
            subscriptions: Subscriptions::new(),
            messaging_open: false,
        }
    }

    /// Whether `event` should reach the watch face
    pub fn accepts(&self, event: &Event) -> bool {
        let needs_messaging = !matches!(event, Event::Tick(_));
        self.subscriptions.accepts(event) && (self.messaging_open || !needs_messaging)
    }

    /// Push pending changes to the LCD
    pub fn flush(&mut self) {
        if !self.compositor.is_dirty() {
            return;
        }
        if let Err(e) = self.display.draw(&mut self.compositor) {
            defmt::error!("Display update failed: {}", e);
        }
    }
}

impl Platform for PineTime {
    fn create_window(&mut self) -> Result<WindowHandle, platform::Error> {
        self.compositor.create_window()
    }

    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), platform::Error> {
        self.compositor.destroy_window(window)
    }

    fn window_bounds(&self, _window: WindowHandle) -> Result<Rectangle, platform::Error> {
        Ok(self.compositor.bounds())
    }

    fn push_window(&mut self, window: WindowHandle, _animated: bool) -> Result<(), platform::Error> {
        self.compositor.push_window(window)
    }

    fn create_text_layer(
        &mut self,
        frame: Rectangle,
        style: TextStyle,
    ) -> Result<LayerHandle, platform::Error> {
        self.compositor.create_text_layer(frame, style)
    }

    fn destroy_text_layer(&mut self, layer: LayerHandle) -> Result<(), platform::Error> {
        self.compositor.destroy_text_layer(layer)
    }

    fn add_child(&mut self, window: WindowHandle, layer: LayerHandle) -> Result<(), platform::Error> {
        self.compositor.add_child(window, layer)
    }

    fn set_text(&mut self, layer: LayerHandle, text: &str) -> Result<(), platform::Error> {
        self.compositor.set_text(layer, text)
    }

    fn clock_is_24h(&self) -> bool {
        self.clock_24h
    }

    fn local_time(&self) -> Option<NaiveDateTime> {
        CLOCK.lock(|clock| clock.borrow().local_now(uptime_secs()))
    }

    fn subscribe(&mut self, subscription: Subscription) -> Result<(), platform::Error> {
        if !self.subscriptions.insert(subscription) {
            defmt::debug!("Already subscribed to {}", subscription);
        }
        Ok(())
    }

    fn open_messaging(&mut self, inbox_size: usize, outbox_size: usize) -> Result<(), platform::Error> {
        // The GATT characteristics are sized at compile time
        if inbox_size > INBOX_SIZE || outbox_size > OUTBOX_SIZE {
            return Err(platform::Error::Messaging(AppMessageResult::BufferOverflow));
        }
        self.messaging_open = true;
        Ok(())
    }
}
