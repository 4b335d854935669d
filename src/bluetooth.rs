//! Bluetooth module

// Core
use core::mem;

// BLE
use nrf_softdevice::{
    self,
    ble::advertisement_builder::{Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload},
    raw, Config,
};

use wikiface::message::{INBOX_SIZE, OUTBOX_SIZE};

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .full_name("WikiFace")
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new().build();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub messages: MessageService,
    pub time: CurrentTimeService,
}

/// Inbox/outbox channel to the companion app
#[nrf_softdevice::gatt_service(uuid = "6e400001-b5a3-f393-e0a9-77696b696661")]
pub struct MessageService {
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-77696b696661", write)]
    pub inbox: heapless::Vec<u8, INBOX_SIZE>,
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-77696b696661", read, notify)]
    pub outbox: heapless::Vec<u8, OUTBOX_SIZE>,
}

/// Current Time Service, lets the phone set the clock
#[nrf_softdevice::gatt_service(uuid = "1805")]
pub struct CurrentTimeService {
    #[characteristic(uuid = "2a2b", read, write)]
    pub current_time: [u8; 10],
}

pub fn generate_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        // Room for a full inbox write in one ATT packet
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"WikiFace" as *const u8 as _,
            current_len: 8,
            max_len: 8,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}
