//! Key/value dictionary wire format
//!
//! ```text
//! count: u8
//! count x { key: u32 LE, type: u8, length: u16 LE, value: [u8; length] }
//! ```
//!
//! Integer values are 1, 2 or 4 bytes little endian. C strings carry their
//! terminating NUL inside `length`.

use core::fmt;

const TUPLE_HEADER_LEN: usize = 7;

/// Value type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TupleType {
    ByteArray = 0,
    CString = 1,
    Uint = 2,
    Int = 3,
}

impl TryFrom<u8> for TupleType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ByteArray),
            1 => Ok(Self::CString),
            2 => Ok(Self::Uint),
            3 => Ok(Self::Int),
            other => Err(Error::UnknownType(other)),
        }
    }
}

/// Decoded tuple value, borrowing from the message buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Bytes(&'a [u8]),
    /// Raw C string bytes, including the terminator if the sender wrote one
    CString(&'a [u8]),
    Uint(u32),
    Int(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple<'a> {
    pub key: u32,
    pub value: Value<'a>,
}

/// Validated dictionary
#[derive(Debug, Clone, Copy)]
pub struct Dictionary<'a> {
    count: u8,
    tuples: &'a [u8],
}

impl<'a> Dictionary<'a> {
    /// Validate `bytes` as a complete dictionary
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        let (&count, tuples) = bytes.split_first().ok_or(Error::Truncated)?;

        let mut rest = tuples;
        for _ in 0..count {
            let (_, tail) = read_tuple(rest)?;
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(Error::TrailingBytes(rest.len()));
        }

        Ok(Self { count, tuples })
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> Tuples<'a> {
        Tuples {
            remaining: self.count,
            data: self.tuples,
        }
    }

    /// First tuple with the given key
    pub fn find(&self, key: u32) -> Option<Tuple<'a>> {
        self.iter().find(|tuple| tuple.key == key)
    }
}

impl<'a> IntoIterator for &Dictionary<'a> {
    type Item = Tuple<'a>;
    type IntoIter = Tuples<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the tuples of a [`Dictionary`]
pub struct Tuples<'a> {
    remaining: u8,
    data: &'a [u8],
}

impl<'a> Iterator for Tuples<'a> {
    type Item = Tuple<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Already validated by `Dictionary::parse`
        let (tuple, rest) = read_tuple(self.data).ok()?;
        self.remaining -= 1;
        self.data = rest;
        Some(tuple)
    }
}

fn read_tuple(data: &[u8]) -> Result<(Tuple<'_>, &[u8]), Error> {
    if data.len() < TUPLE_HEADER_LEN {
        return Err(Error::Truncated);
    }
    let key = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let ty = TupleType::try_from(data[4])?;
    let len = u16::from_le_bytes([data[5], data[6]]) as usize;
    let end = TUPLE_HEADER_LEN + len;
    let body = data.get(TUPLE_HEADER_LEN..end).ok_or(Error::Truncated)?;

    let value = match ty {
        TupleType::ByteArray => Value::Bytes(body),
        TupleType::CString => Value::CString(body),
        TupleType::Uint => Value::Uint(match *body {
            [b] => b as u32,
            [b0, b1] => u16::from_le_bytes([b0, b1]) as u32,
            [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
            _ => return Err(Error::InvalidIntegerWidth(len)),
        }),
        TupleType::Int => Value::Int(match *body {
            [b] => b as i8 as i32,
            [b0, b1] => i16::from_le_bytes([b0, b1]) as i32,
            [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
            _ => return Err(Error::InvalidIntegerWidth(len)),
        }),
    };

    Ok((Tuple { key, value }, &data[end..]))
}

/// Writes a dictionary into a caller provided buffer
pub struct DictionaryWriter<'b> {
    buf: &'b mut [u8],
    pos: usize,
    count: u8,
}

impl<'b> DictionaryWriter<'b> {
    pub fn new(buf: &'b mut [u8]) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(Error::BufferFull);
        }
        Ok(Self {
            buf,
            pos: 1,
            count: 0,
        })
    }

    pub fn write_bytes(&mut self, key: u32, value: &[u8]) -> Result<(), Error> {
        self.write_tuple(key, TupleType::ByteArray, &[value])
    }

    /// Write `value` followed by a NUL terminator
    pub fn write_cstring(&mut self, key: u32, value: &str) -> Result<(), Error> {
        self.write_tuple(key, TupleType::CString, &[value.as_bytes(), &[0]])
    }

    pub fn write_u8(&mut self, key: u32, value: u8) -> Result<(), Error> {
        self.write_tuple(key, TupleType::Uint, &[&[value]])
    }

    pub fn write_u32(&mut self, key: u32, value: u32) -> Result<(), Error> {
        self.write_tuple(key, TupleType::Uint, &[&value.to_le_bytes()])
    }

    pub fn write_i32(&mut self, key: u32, value: i32) -> Result<(), Error> {
        self.write_tuple(key, TupleType::Int, &[&value.to_le_bytes()])
    }

    /// Finalize the header and return the encoded length
    pub fn finish(self) -> usize {
        self.buf[0] = self.count;
        self.pos
    }

    fn write_tuple(&mut self, key: u32, ty: TupleType, parts: &[&[u8]]) -> Result<(), Error> {
        let len: usize = parts.iter().map(|part| part.len()).sum();
        let len16 = u16::try_from(len).map_err(|_| Error::BufferFull)?;
        let count = self.count.checked_add(1).ok_or(Error::TooManyTuples)?;
        let end = self.pos + TUPLE_HEADER_LEN + len;
        if end > self.buf.len() {
            return Err(Error::BufferFull);
        }

        let header = &mut self.buf[self.pos..self.pos + TUPLE_HEADER_LEN];
        header[..4].copy_from_slice(&key.to_le_bytes());
        header[4] = ty as u8;
        header[5..].copy_from_slice(&len16.to_le_bytes());

        let mut at = self.pos + TUPLE_HEADER_LEN;
        for part in parts {
            self.buf[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }

        self.pos = end;
        self.count = count;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Input ended inside a header or value
    Truncated,
    UnknownType(u8),
    /// Integer value that is not 1, 2 or 4 bytes long
    InvalidIntegerWidth(usize),
    /// Bytes left over after the last tuple
    TrailingBytes(usize),
    /// Output buffer too small
    BufferFull,
    /// More than 255 tuples
    TooManyTuples,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("dictionary truncated"),
            Self::UnknownType(ty) => write!(f, "unknown tuple type {}", ty),
            Self::InvalidIntegerWidth(len) => write!(f, "invalid integer width {}", len),
            Self::TrailingBytes(len) => write!(f, "{} trailing bytes", len),
            Self::BufferFull => f.write_str("buffer full"),
            Self::TooManyTuples => f.write_str("too many tuples"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hand_written_message() {
        #[rustfmt::skip]
        let bytes = [
            2,
            0, 0, 0, 0,  1,  4, 0,  b'F', b'o', b'o', 0,
            1, 0, 0, 0,  2,  1, 0,  1,
        ];
        let dict = Dictionary::parse(&bytes).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.find(0).unwrap().value, Value::CString(b"Foo\0"));
        assert_eq!(dict.find(1).unwrap().value, Value::Uint(1));
        assert_eq!(dict.find(2), None);
    }

    #[test]
    fn signed_values_are_sign_extended() {
        let bytes = [1, 9, 0, 0, 0, 3, 2, 0, 0xfe, 0xff];
        let dict = Dictionary::parse(&bytes).unwrap();
        assert_eq!(dict.find(9).unwrap().value, Value::Int(-2));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Dictionary::parse(&[]).unwrap_err(), Error::Truncated);
        // Claims one tuple, has none
        assert_eq!(Dictionary::parse(&[1]).unwrap_err(), Error::Truncated);
        // Value shorter than its length
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 1, 9, 0, b'a']).unwrap_err(),
            Error::Truncated
        );
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 7, 0, 0]).unwrap_err(),
            Error::UnknownType(7)
        );
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 2, 3, 0, 1, 2, 3]).unwrap_err(),
            Error::InvalidIntegerWidth(3)
        );
        assert_eq!(
            Dictionary::parse(&[0, 42]).unwrap_err(),
            Error::TrailingBytes(1)
        );
    }

    #[test]
    fn writer_output_parses() {
        let mut buf = [0u8; 64];
        let mut writer = DictionaryWriter::new(&mut buf).unwrap();
        writer.write_cstring(0, "Louvre").unwrap();
        writer.write_i32(2, -40).unwrap();
        writer.write_bytes(5, &[0xaa, 0xbb]).unwrap();
        let len = writer.finish();

        let dict = Dictionary::parse(&buf[..len]).unwrap();
        let keys: Vec<u32> = dict.iter().map(|tuple| tuple.key).collect();
        assert_eq!(keys, [0, 2, 5]);
        assert_eq!(dict.find(0).unwrap().value, Value::CString(b"Louvre\0"));
        assert_eq!(dict.find(2).unwrap().value, Value::Int(-40));
        assert_eq!(dict.find(5).unwrap().value, Value::Bytes(&[0xaa, 0xbb]));
    }

    #[test]
    fn writer_refuses_overflow() {
        let mut buf = [0u8; 12];
        let mut writer = DictionaryWriter::new(&mut buf).unwrap();
        writer.write_u8(1, 1).unwrap();
        assert_eq!(writer.write_cstring(0, "Too long"), Err(Error::BufferFull));
        // A failed write leaves the earlier tuples intact
        let len = writer.finish();
        assert_eq!(len, 9);
        assert_eq!(Dictionary::parse(&buf[..len]).unwrap().len(), 1);

        assert!(DictionaryWriter::new(&mut []).is_err());
    }
}
