//! Time keeping and clock formatting

use core::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::ui::Label;

/// Size of the clock text buffer, room for at most 7 visible characters.
pub const CLOCK_TEXT_LEN: usize = 8;

/// Formatted clock string, `"HH:MM"` or `"H:MM"`.
pub type ClockText = Label<CLOCK_TEXT_LEN>;

/// Hour display preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockStyle {
    /// `1:05` ... `12:59`
    TwelveHour,
    /// `00:00` ... `23:59`
    TwentyFourHour,
}

impl ClockStyle {
    pub fn from_24h(is_24h: bool) -> Self {
        if is_24h {
            Self::TwentyFourHour
        } else {
            Self::TwelveHour
        }
    }
}

/// Format hours and minutes of `time` for the clock layer.
///
/// The 24 hour style always zero-pads the hour. The 12 hour style drops the
/// leading zero and maps midnight and noon to `12`.
pub fn format_clock<T: Timelike>(time: &T, style: ClockStyle) -> Result<ClockText, fmt::Error> {
    let mut text = ClockText::new();
    match style {
        ClockStyle::TwentyFourHour => {
            text.set_fmt(format_args!("{:02}:{:02}", time.hour(), time.minute()))?
        }
        ClockStyle::TwelveHour => {
            let (_, hour) = time.hour12();
            text.set_fmt(format_args!("{}:{:02}", hour, time.minute()))?
        }
    }
    Ok(text)
}

/// Wall clock time anchored to a point in system uptime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    /// Clock time (UTC)
    time: NaiveDateTime,
    /// Related system uptime
    uptime_secs: u64,
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime, uptime_secs: u64) -> Self {
        Self { time, uptime_secs }
    }

    /// Create new time reference from seconds since the Unix epoch
    pub fn from_timestamp(secs: i64, uptime_secs: u64) -> Result<Self, Error> {
        let time = DateTime::from_timestamp(secs, 0)
            .ok_or(Error::InvalidDate)?
            .naive_utc();
        Ok(Self { time, uptime_secs })
    }

    /// Create new time reference from Current Time Service data
    ///
    /// Layout: year (u16 LE), month, day, hours, minutes, seconds,
    /// day of week, fractions of 1/256 s, adjust reason.
    pub fn from_cts_bytes(bytes: &[u8], uptime_secs: u64) -> Result<Self, Error> {
        if bytes.len() < 10 {
            return Err(Error::InvalidLength(bytes.len()));
        }

        let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
        let month = bytes[2] as u32;
        let day = bytes[3] as u32;
        let hour = bytes[4] as u32;
        let min = bytes[5] as u32;
        let sec = bytes[6] as u32;
        // let day_of_week = bytes[7] as u32;
        let milli = bytes[8] as u32 * 1000 / 256; // Convert fractions_256 to milliseconds

        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
            .ok_or(Error::InvalidDate)?;

        Ok(Self { time, uptime_secs })
    }
}

/// Keeps track of wall clock time between references
#[derive(Debug, Clone, Copy)]
pub struct TimeManager {
    reference: Option<TimeReference>,
    /// Offset of local time from UTC
    utc_offset_secs: i32,
}

impl TimeManager {
    /// Initialize time measurement on boot, without a known time
    pub const fn new(utc_offset_secs: i32) -> Self {
        Self {
            reference: None,
            utc_offset_secs,
        }
    }

    /// Update time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        self.reference = Some(reference);
    }

    pub fn set_utc_offset(&mut self, utc_offset_secs: i32) {
        self.utc_offset_secs = utc_offset_secs;
    }

    /// Current UTC time, if a reference has been set
    pub fn utc_now(&self, uptime_secs: u64) -> Option<NaiveDateTime> {
        let reference = self.reference?;
        let elapsed = uptime_secs.saturating_sub(reference.uptime_secs);
        let elapsed = TimeDelta::try_seconds(i64::try_from(elapsed).ok()?)?;
        reference.time.checked_add_signed(elapsed)
    }

    /// Current local time, if a reference has been set
    pub fn local_now(&self, uptime_secs: u64) -> Option<NaiveDateTime> {
        let offset = TimeDelta::try_seconds(self.utc_offset_secs as i64)?;
        self.utc_now(uptime_secs)?.checked_add_signed(offset)
    }

    /// Seconds from `uptime_secs` until the next minute boundary
    pub fn secs_to_next_minute(&self, uptime_secs: u64) -> u64 {
        match self.utc_now(uptime_secs) {
            Some(now) => 60 - now.second() as u64,
            None => 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Current Time Service payload too short
    InvalidLength(usize),
    /// Fields do not form a valid date and time
    InvalidDate,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => write!(f, "expected 10 bytes of time data, got {}", len),
            Self::InvalidDate => f.write_str("invalid date or time"),
        }
    }
}
