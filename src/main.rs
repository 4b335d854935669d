#![no_std]
#![no_main]

mod bluetooth;
mod peripherals;
mod pinetime;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Core
use core::sync::atomic::{AtomicU32, Ordering};

// Device
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    config::{Config, Debug, HfclkSource, LfclkSource},
    gpio::{Level, Output, OutputDrive},
    interrupt::{self, InterruptExt, Priority},
    peripherals::SPI2,
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{with_timeout, Delay, Duration, Timer};
use nrf_softdevice::{
    ble::{gatt_server, peripheral},
    Softdevice,
};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use bluetooth::{
    CurrentTimeServiceEvent, MessageServiceEvent, Server, ServerEvent, ADV_DATA, SCAN_DATA,
};
use peripherals::{backlight::Backlight, display::Display};
use pinetime::{uptime_secs, PineTime, CLOCK};
use wikiface::{
    message::{AppMessageResult, Inbox},
    platform::{Event, TimeUnit},
    system::{config::WatchfaceConfig, time::TimeReference},
    Watchface,
};

// Include UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

const CONFIG: WatchfaceConfig = WatchfaceConfig {
    utc_offset_secs: 1 * 3_600,
    ..WatchfaceConfig::new()
};

// Communication channels
static EVENTS: Channel<ThreadModeRawMutex, Event, 4> = Channel::new();
/// Raised whenever the wall clock is set
static CLOCK_SET: Signal<ThreadModeRawMutex, ()> = Signal::new();

// Inbound messages lost before reaching the watch face
static DROPPED_BUSY: AtomicU32 = AtomicU32::new(0);
static DROPPED_OVERSIZED: AtomicU32 = AtomicU32::new(0);

static SERVER: StaticCell<Server> = StaticCell::new();

/// nRF52832 setup for the PineTime with the SoftDevice enabled
fn board_config() -> Config {
    let mut config = Config::default();

    // 32 MHz and 32.768 kHz crystals are both fitted
    config.hfclk_source = HfclkSource::ExternalXtal;
    config.lfclk_source = LfclkSource::ExternalXtal;
    config.dcdc.reg1 = true;

    // Priorities 0, 1 and 4 belong to the SoftDevice
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;

    config.debug = Debug::Allowed;
    config
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Emit a tick at every minute boundary of the wall clock, and right
/// after the clock is set.
#[embassy_executor::task(pool_size = 1)]
async fn minute_ticker() {
    loop {
        let wait = CLOCK.lock(|clock| clock.borrow().secs_to_next_minute(uptime_secs()));
        if with_timeout(Duration::from_secs(wait), CLOCK_SET.wait())
            .await
            .is_ok()
        {
            defmt::debug!("Clock set, re-arming ticker");
        }

        EVENTS.send(Event::Tick(TimeUnit::Minute)).await;
    }
}

/// Hand an inbox write to the watch face, or count it as dropped.
fn deliver(bytes: &[u8]) {
    let Ok(inbox) = Inbox::from_bytes(bytes) else {
        DROPPED_OVERSIZED.fetch_add(1, Ordering::Relaxed);
        return;
    };
    if EVENTS.try_send(Event::InboxReceived(inbox)).is_err() {
        DROPPED_BUSY.fetch_add(1, Ordering::Relaxed);
    }
}

/// Report inbox drops counted since the last call to the watch face.
fn report_drops(face: &mut Watchface, platform: &mut PineTime) {
    for (counter, reason) in [
        (&DROPPED_BUSY, AppMessageResult::Busy),
        (&DROPPED_OVERSIZED, AppMessageResult::BufferOverflow),
    ] {
        let dropped = counter.swap(0, Ordering::Relaxed);
        if dropped == 0 {
            continue;
        }
        defmt::warn!("{} inbox messages lost: {}", dropped, reason);

        let event = Event::InboxDropped(reason);
        if platform.accepts(&event) {
            if let Err(e) = face.dispatch(platform, event) {
                defmt::warn!("Event handling failed: {}", e);
            }
        }
    }
}

/// Set the wall clock from a Current Time Service write.
fn set_time(bytes: &[u8]) {
    match TimeReference::from_cts_bytes(bytes, uptime_secs()) {
        Ok(reference) => {
            CLOCK.lock(|clock| clock.borrow_mut().set_time(reference));
            defmt::info!("Clock set by peer");
            CLOCK_SET.signal(());
        }
        Err(e) => defmt::warn!("Ignoring time update: {}", e),
    }
}

/// Advertise, then serve the GATT server until the peer disconnects.
#[embassy_executor::task(pool_size = 1)]
async fn ble_task(sd: &'static Softdevice, server: &'static Server) {
    let config = peripheral::Config::default();
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                defmt::warn!("Advertising failed: {:?}", e);
                Timer::after_secs(1).await;
                continue;
            }
        };
        defmt::info!("Peer connected");

        let reason = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Messages(MessageServiceEvent::InboxWrite(bytes)) => deliver(&bytes),
            ServerEvent::Messages(MessageServiceEvent::OutboxCccdWrite { notifications }) => {
                defmt::debug!("Outbox notifications: {}", notifications)
            }
            ServerEvent::Time(CurrentTimeServiceEvent::CurrentTimeWrite(bytes)) => set_time(&bytes),
        })
        .await;

        defmt::info!("Peer disconnected: {:?}", reason);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(board_config());
    defmt::info!("Initializing");

    // Initialize clock from build time
    let reference = unwrap!(TimeReference::from_timestamp(UTC_EPOCH, uptime_secs()));
    CLOCK.lock(|clock| {
        let mut clock = clock.borrow_mut();
        clock.set_time(reference);
        clock.set_utc_offset(CONFIG.utc_offset_secs);
    });

    // Initialize Backlight
    let backlight = unwrap!(Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
        2,
    ));

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    // Priorities 0, 1 and 4 belong to the SoftDevice
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);
    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
        &mut Delay,
    ));

    // Initialize Bluetooth
    let sd = Softdevice::enable(&bluetooth::generate_config());
    let server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // Build the watch face
    let mut platform = PineTime::new(display, backlight, CONFIG.clock_24h);
    let mut face = Watchface::new(CONFIG);
    unwrap!(face.init(&mut platform));
    platform.flush();

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(minute_ticker()));
    unwrap!(spawner.spawn(ble_task(sd, server)));

    // Event loop
    loop {
        let event = EVENTS.receive().await;
        if platform.accepts(&event) {
            if let Err(e) = face.dispatch(&mut platform, event) {
                defmt::warn!("Event handling failed: {}", e);
            }
        }

        report_drops(&mut face, &mut platform);

        platform.flush();
    }
}
