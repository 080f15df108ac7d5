use std::convert::TryFrom;

use crate::error::DecodeError;
use crate::reader::ByteReader;

/// The leading little-endian `i32` of every A2S datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    /// `-1`: the whole response fits in this datagram.
    Single,
    /// `-2`: this datagram is one fragment of a larger response.
    Split,
}

impl TryFrom<i32> for PacketHeader {
    type Error = DecodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PacketHeader::Single),
            -2 => Ok(PacketHeader::Split),
            n => Err(DecodeError::UnknownPacketHeader(n)),
        }
    }
}

impl PacketHeader {
    pub fn to_le_bytes(self) -> [u8; 4] {
        let value: i32 = match self {
            PacketHeader::Single => -1,
            PacketHeader::Split => -2,
        };
        value.to_le_bytes()
    }
}

/// A received datagram split into its header and whatever follows it.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet<'a> {
    pub header: PacketHeader,
    pub body: &'a [u8],
}

impl<'a> Packet<'a> {
    pub fn unpack(datagram: &'a [u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::little(datagram);
        let header = PacketHeader::try_from(reader.read_int32()?)?;
        Ok(Packet {
            header,
            body: reader.read(None)?,
        })
    }
}

/// Frame an outgoing request payload as a single-packet datagram.
pub fn pack(payload: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(payload.len() + 4);
    datagram.extend_from_slice(&PacketHeader::Single.to_le_bytes());
    datagram.extend_from_slice(payload);
    datagram
}

/// Reassembled split responses usually repeat the single-packet header; drop it if present.
pub fn strip_single_header(payload: &[u8]) -> &[u8] {
    payload
        .strip_prefix(&PacketHeader::Single.to_le_bytes()[..])
        .unwrap_or(payload)
}
