//! Companion side of the article protocol
//!
//! The phone looks up unillustrated articles around the user, picks the
//! nearest one and sends it to the watch. These helpers cover the parts of
//! that flow that do not need a network: distances, selection and encoding.

use core::fmt;

use libm::{atan2, cos, sin, sqrt};

use crate::message::{dict, DictionaryWriter, MessageKey};

/// Position on the earth's surface in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Kilometre,
    Mile,
    Metre,
}

impl DistanceUnit {
    /// Mean earth radius in this unit
    pub const fn earth_radius(&self) -> f64 {
        match self {
            Self::Kilometre => 6371.0,
            Self::Mile => 3960.0,
            Self::Metre => 6_371_000.0,
        }
    }
}

/// Great-circle distance between two points
pub fn haversine(start: Coordinates, end: Coordinates, unit: DistanceUnit) -> f64 {
    let d_lat = (end.latitude - start.latitude).to_radians();
    let d_lon = (end.longitude - start.longitude).to_radians();
    let lat1 = start.latitude.to_radians();
    let lat2 = end.latitude.to_radians();

    let a = sin(d_lat / 2.0) * sin(d_lat / 2.0)
        + sin(d_lon / 2.0) * sin(d_lon / 2.0) * cos(lat1) * cos(lat2);
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));

    unit.earth_radius() * c
}

/// Article candidate returned by the lookup service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Article<'a> {
    pub title: &'a str,
    pub position: Coordinates,
}

/// Result of [`nearest`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    pub article: &'a Article<'a>,
    pub distance_km: f64,
}

/// Nearest article to `origin`. On equal distances the later article wins.
pub fn nearest<'a>(origin: Coordinates, articles: &'a [Article<'a>]) -> Option<Nearest<'a>> {
    let mut best: Option<Nearest<'a>> = None;
    for article in articles {
        let distance_km = haversine(origin, article.position, DistanceUnit::Kilometre);
        match best {
            Some(ref current) if distance_km > current.distance_km => {}
            _ => {
                best = Some(Nearest {
                    article,
                    distance_km,
                })
            }
        }
    }
    best
}

/// Encode the message announcing an article to the watch. Returns the
/// number of bytes written to `buf`.
pub fn encode_article(
    title: &str,
    is_new: bool,
    distance_km: f64,
    buf: &mut [u8],
) -> Result<usize, Error> {
    let mut distance_buf = [0u8; 32];
    let distance = format_no_std::show(&mut distance_buf, format_args!("{:.1}", distance_km))
        .map_err(|_| Error::Format)?;

    let mut writer = DictionaryWriter::new(buf)?;
    writer.write_cstring(MessageKey::Article.into(), title)?;
    writer.write_u8(MessageKey::IsNew.into(), is_new as u8)?;
    writer.write_cstring(MessageKey::Distance.into(), distance)?;
    Ok(writer.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Encode(dict::Error),
    /// Distance does not fit its text field
    Format,
}

impl From<dict::Error> for Error {
    fn from(e: dict::Error) -> Self {
        Self::Encode(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "encoding failed: {}", e),
            Self::Format => f.write_str("distance out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{IncomingMessage, Value, OUTBOX_SIZE};

    const PARIS: Coordinates = Coordinates::new(48.8566, 2.3522);
    const LONDON: Coordinates = Coordinates::new(51.5074, -0.1278);

    #[test]
    fn haversine_paris_london() {
        let km = haversine(PARIS, LONDON, DistanceUnit::Kilometre);
        assert!((km - 343.5).abs() < 1.0, "{}", km);

        let m = haversine(PARIS, LONDON, DistanceUnit::Metre);
        assert!((m / 1000.0 - km).abs() < 1e-6);

        let miles = haversine(PARIS, LONDON, DistanceUnit::Mile);
        assert!((miles - km * 3960.0 / 6371.0).abs() < 1e-6);

        assert_eq!(haversine(PARIS, PARIS, DistanceUnit::Kilometre), 0.0);
    }

    #[test]
    fn nearest_picks_smallest_distance() {
        let articles = [
            Article {
                title: "Far",
                position: Coordinates::new(48.90, 2.35),
            },
            Article {
                title: "Near",
                position: Coordinates::new(48.857, 2.352),
            },
            Article {
                title: "Middle",
                position: Coordinates::new(48.87, 2.35),
            },
        ];
        let nearest = nearest(PARIS, &articles).unwrap();
        assert_eq!(nearest.article.title, "Near");
        assert!(nearest.distance_km < 0.1);
    }

    #[test]
    fn nearest_prefers_later_on_tie() {
        let position = Coordinates::new(48.86, 2.35);
        let articles = [
            Article {
                title: "First",
                position,
            },
            Article {
                title: "Second",
                position,
            },
        ];
        assert_eq!(nearest(PARIS, &articles).unwrap().article.title, "Second");
        assert_eq!(nearest(PARIS, &[]), None);
    }

    #[test]
    fn encoded_article_is_readable_by_the_watch() {
        let mut buf = [0u8; OUTBOX_SIZE];
        let len = encode_article("Eiffel Tower", true, 0.449, &mut buf).unwrap();

        let message = IncomingMessage::parse(&buf[..len]).unwrap();
        assert_eq!(message.article_title(), Ok("Eiffel Tower"));
        let dict = message.dictionary();
        assert_eq!(dict.find(1).unwrap().value, Value::Uint(1));
        assert_eq!(dict.find(2).unwrap().value, Value::CString(b"0.4\0"));
    }

    #[test]
    fn encoding_fails_when_title_does_not_fit() {
        let title = "x".repeat(OUTBOX_SIZE);
        let mut buf = [0u8; OUTBOX_SIZE];
        assert_eq!(
            encode_article(&title, false, 1.0, &mut buf),
            Err(Error::Encode(dict::Error::BufferFull))
        );
    }
}
