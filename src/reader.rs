use std::str;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::DecodeError;

/// Byte order used by a [ByteReader] for multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// How NUL-terminated strings are turned into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8; invalid sequences are a [DecodeError::InvalidText].
    #[default]
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
    /// Every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            TextEncoding::Utf8 => Ok(str::from_utf8(bytes)?.to_owned()),
            TextEncoding::Utf8Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Cursor over a received buffer.
///
/// Byte order and text encoding are fixed when the reader is built. Every read
/// either consumes exactly the bytes it needs or fails with
/// [DecodeError::BufferExhausted] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    endian: Endian,
    encoding: TextEncoding,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian, encoding: TextEncoding) -> Self {
        ByteReader {
            data,
            offset: 0,
            endian,
            encoding,
        }
    }

    /// Little-endian UTF-8 reader, the layout every A2S packet uses.
    pub fn little(data: &'a [u8]) -> Self {
        Self::new(data, Endian::Little, TextEncoding::Utf8)
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Everything not yet consumed, without moving the cursor.
    pub fn peek(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn take(&mut self, wanted: usize) -> Result<&'a [u8], DecodeError> {
        if wanted > self.remaining() {
            return Err(DecodeError::BufferExhausted {
                offset: self.offset,
                wanted,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + wanted];
        self.offset += wanted;
        Ok(bytes)
    }

    /// Read `n` bytes, or everything left when `n` is `None`.
    pub fn read(&mut self, n: Option<usize>) -> Result<&'a [u8], DecodeError> {
        let wanted = n.unwrap_or_else(|| self.remaining());
        self.take(wanted)
    }

    pub fn read_uint8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_int8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_uint8()? as i8)
    }

    pub fn read_uint16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn read_int16(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i16(bytes),
            Endian::Big => BigEndian::read_i16(bytes),
        })
    }

    pub fn read_uint32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i32(bytes),
            Endian::Big => BigEndian::read_i32(bytes),
        })
    }

    pub fn read_uint64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u64(bytes),
            Endian::Big => BigEndian::read_u64(bytes),
        })
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f32(bytes),
            Endian::Big => BigEndian::read_f32(bytes),
        })
    }

    /// Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_uint8()? != 0)
    }

    /// A single byte interpreted as a Latin-1 character.
    pub fn read_char(&mut self) -> Result<char, DecodeError> {
        Ok(char::from(self.read_uint8()?))
    }

    /// Read up to the next NUL, decode with the reader's encoding and step past the terminator.
    pub fn read_cstring(&mut self) -> Result<String, DecodeError> {
        self.read_cstring_as(self.encoding)
    }

    /// Like [ByteReader::read_cstring], overriding the encoding for this one field.
    pub fn read_cstring_as(&mut self, encoding: TextEncoding) -> Result<String, DecodeError> {
        let start = self.offset;
        let len = self
            .peek()
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString { offset: start })?;
        let text = encoding.decode(&self.data[start..start + len])?;
        self.offset += len + 1;
        Ok(text)
    }
}
