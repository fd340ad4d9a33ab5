//! A small, deliberately narrow CBOR-major-type writer/reader.
//!
//! This is not a general-purpose CBOR library: bundles here have a fixed,
//! known shape (arrays of a known length, unsigned integers, byte strings,
//! text strings), so there is no need for the tag/indefinite-length/float
//! machinery a conformant RFC 8949 decoder would carry. Block framing
//! itself is *not* CBOR tagging - see [`crate::PRIMARY_TAG`] /
//! [`crate::CANONICAL_TAG`].

use crate::error::CodecError;

pub mod encode {
    fn write_uint_minor(major: u8, val: u64) -> Vec<u8> {
        if val < 24 {
            vec![(major << 5) | (val as u8)]
        } else if val <= u8::MAX as u64 {
            vec![(major << 5) | 24u8, val as u8]
        } else if val <= u16::MAX as u64 {
            vec![(major << 5) | 25u8, (val >> 8) as u8, val as u8]
        } else if val <= u32::MAX as u64 {
            vec![
                (major << 5) | 26u8,
                (val >> 24) as u8,
                (val >> 16) as u8,
                (val >> 8) as u8,
                val as u8,
            ]
        } else {
            vec![
                (major << 5) | 27u8,
                (val >> 56) as u8,
                (val >> 48) as u8,
                (val >> 40) as u8,
                (val >> 32) as u8,
                (val >> 24) as u8,
                (val >> 16) as u8,
                (val >> 8) as u8,
                val as u8,
            ]
        }
    }

    pub fn uint(val: u64) -> Vec<u8> {
        write_uint_minor(0, val)
    }

    pub fn bytes(data: &[u8]) -> Vec<u8> {
        let mut v = write_uint_minor(2, data.len() as u64);
        v.extend_from_slice(data);
        v
    }

    pub fn text(s: &str) -> Vec<u8> {
        let mut v = write_uint_minor(3, s.len() as u64);
        v.extend_from_slice(s.as_bytes());
        v
    }

    pub fn array(items: &[Vec<u8>]) -> Vec<u8> {
        let mut v = write_uint_minor(4, items.len() as u64);
        for i in items {
            v.extend_from_slice(i);
        }
        v
    }

    /// Writes just an array header for `count` elements, letting a caller
    /// append elements (including ones not yet known in full, such as a
    /// trailing CRC) without re-deriving the count from a slice.
    pub fn array_header(count: usize) -> Vec<u8> {
        write_uint_minor(4, count as u64)
    }
}

pub mod decode {
    use super::*;

    pub enum Value<'a> {
        Uint(u64),
        Bytes(&'a [u8]),
        Text(&'a str),
        /// Array header only; caller reads `count` further values in sequence.
        Array(usize),
    }

    fn read_uint_minor(minor: u8, data: &[u8]) -> Result<(u64, usize), CodecError> {
        match minor {
            24 => data
                .first()
                .map(|b| (*b as u64, 1))
                .ok_or(CodecError::Malformed("truncated uint8")),
            25 => {
                if data.len() < 2 {
                    Err(CodecError::Malformed("truncated uint16"))
                } else {
                    Ok((((data[0] as u64) << 8) | data[1] as u64, 2))
                }
            }
            26 => {
                if data.len() < 4 {
                    Err(CodecError::Malformed("truncated uint32"))
                } else {
                    Ok((
                        ((data[0] as u64) << 24)
                            | ((data[1] as u64) << 16)
                            | ((data[2] as u64) << 8)
                            | data[3] as u64,
                        4,
                    ))
                }
            }
            27 => {
                if data.len() < 8 {
                    Err(CodecError::Malformed("truncated uint64"))
                } else {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(&data[..8]);
                    Ok((u64::from_be_bytes(buf), 8))
                }
            }
            v if v < 24 => Ok((v as u64, 0)),
            v => Err(CodecError::MalformedDetail(format!("bad minor value {v}"))),
        }
    }

    /// Reads one value from the front of `data`. Returns the value and the
    /// number of bytes it (and its header) consumed; for [`Value::Array`]
    /// the consumed length covers only the header, not the elements.
    pub fn read_value(data: &[u8]) -> Result<(Value<'_>, usize), CodecError> {
        let Some(&lead) = data.first() else {
            return Err(CodecError::Malformed("unexpected end of data"));
        };
        let major = lead >> 5;
        let minor = lead & 0x1F;
        match major {
            0 => {
                let (v, o) = read_uint_minor(minor, &data[1..])?;
                Ok((Value::Uint(v), 1 + o))
            }
            2 => {
                let (len, o) = read_uint_minor(minor, &data[1..])?;
                let start = 1 + o;
                let end = start
                    .checked_add(len as usize)
                    .ok_or(CodecError::Malformed("byte string length overflow"))?;
                if end > data.len() {
                    return Err(CodecError::Malformed("truncated byte string"));
                }
                Ok((Value::Bytes(&data[start..end]), end))
            }
            3 => {
                let (len, o) = read_uint_minor(minor, &data[1..])?;
                let start = 1 + o;
                let end = start
                    .checked_add(len as usize)
                    .ok_or(CodecError::Malformed("text string length overflow"))?;
                if end > data.len() {
                    return Err(CodecError::Malformed("truncated text string"));
                }
                let s = std::str::from_utf8(&data[start..end])?;
                Ok((Value::Text(s), end))
            }
            4 => {
                let (len, o) = read_uint_minor(minor, &data[1..])?;
                Ok((Value::Array(len as usize), 1 + o))
            }
            _ => Err(CodecError::Malformed("unsupported major type")),
        }
    }

    pub fn expect_uint(data: &[u8]) -> Result<(u64, usize), CodecError> {
        match read_value(data)? {
            (Value::Uint(v), len) => Ok((v, len)),
            _ => Err(CodecError::Malformed("expected unsigned integer")),
        }
    }

    pub fn expect_bytes(data: &[u8]) -> Result<(&[u8], usize), CodecError> {
        match read_value(data)? {
            (Value::Bytes(v), len) => Ok((v, len)),
            _ => Err(CodecError::Malformed("expected byte string")),
        }
    }

    pub fn expect_text(data: &[u8]) -> Result<(&str, usize), CodecError> {
        match read_value(data)? {
            (Value::Text(v), len) => Ok((v, len)),
            _ => Err(CodecError::Malformed("expected text string")),
        }
    }

    pub fn expect_array(data: &[u8], want: usize) -> Result<usize, CodecError> {
        match read_value(data)? {
            (Value::Array(count), len) if count == want => Ok(len),
            (Value::Array(count), _) => Err(CodecError::MalformedDetail(format!(
                "expected array of {want} elements, found {count}"
            ))),
            _ => Err(CodecError::Malformed("expected array")),
        }
    }
}
