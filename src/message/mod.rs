//! Inbox messages from the companion app

use core::fmt;

pub mod dict;

pub use dict::{Dictionary, DictionaryWriter, Tuple, TupleType, Value};

/// Inbox channel capacity in bytes
pub const INBOX_SIZE: usize = 128;
/// Outbox channel capacity in bytes
pub const OUTBOX_SIZE: usize = 128;
/// Longest article title taken from a message
pub const ARTICLE_TITLE_MAX: usize = 255;

/// Keys understood by both sides of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum MessageKey {
    /// Title of the nearest article (C string)
    Article = 0,
    /// Whether the article has not been shown before (u8). Not read by the watch.
    IsNew = 1,
    /// Distance to the article in km, one decimal (C string). Not read by the watch.
    Distance = 2,
}

impl From<MessageKey> for u32 {
    fn from(key: MessageKey) -> Self {
        key as u32
    }
}

/// Transport result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppMessageResult {
    /// The peer did not acknowledge in time
    SendTimeout,
    /// The peer rejected the message
    SendRejected,
    /// No peer connected
    NotConnected,
    /// Messaging has not been opened
    Closed,
    /// A message is already in flight, or the inbox is still being processed
    Busy,
    /// The message does not fit the channel
    BufferOverflow,
    /// The transport failed internally
    InternalError,
}

impl fmt::Display for AppMessageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SendTimeout => "send timeout",
            Self::SendRejected => "send rejected",
            Self::NotConnected => "not connected",
            Self::Closed => "closed",
            Self::Busy => "busy",
            Self::BufferOverflow => "buffer overflow",
            Self::InternalError => "internal error",
        })
    }
}

/// One delivered inbox payload
#[derive(Clone, PartialEq, Eq)]
pub struct Inbox {
    buf: [u8; INBOX_SIZE],
    len: usize,
}

impl Inbox {
    /// Copy a raw payload. Payloads larger than the inbox are refused.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppMessageResult> {
        if bytes.len() > INBOX_SIZE {
            return Err(AppMessageResult::BufferOverflow);
        }
        let mut buf = [0; INBOX_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            buf,
            len: bytes.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox").field("len", &self.len).finish()
    }
}

/// Decoded inbox message
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    dict: Dictionary<'a>,
}

impl<'a> IncomingMessage<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, dict::Error> {
        Ok(Self {
            dict: Dictionary::parse(bytes)?,
        })
    }

    pub fn dictionary(&self) -> &Dictionary<'a> {
        &self.dict
    }

    /// The article title, checked for presence before it is read.
    ///
    /// The value is read like a C string: it ends at the first NUL, is cut
    /// to [`ARTICLE_TITLE_MAX`] bytes and keeps only its valid UTF-8 prefix.
    pub fn article_title(&self) -> Result<&'a str, FieldError> {
        let tuple = self
            .dict
            .find(MessageKey::Article.into())
            .ok_or(FieldError::Missing)?;

        match tuple.value {
            Value::CString(bytes) | Value::Bytes(bytes) => Ok(c_str_prefix(bytes)),
            Value::Uint(_) => Err(FieldError::WrongType(TupleType::Uint)),
            Value::Int(_) => Err(FieldError::WrongType(TupleType::Int)),
        }
    }
}

fn c_str_prefix(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end.min(ARTICLE_TITLE_MAX)];
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

/// Why a field could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    Missing,
    WrongType(TupleType),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("field missing"),
            Self::WrongType(ty) => write!(f, "unexpected field type {:?}", ty),
        }
    }
}
