//! Headers of split responses.
//!
//! A split datagram is `-2` (see [crate::packet::PacketHeader]) followed by an
//! engine specific fragment header and a slice of the response. GoldSrc servers
//! pack the fragment index and count into a single byte; Source servers spell
//! them out, advertise the MTU and may bzip2-compress the payload.

use std::io::Read;

use bzip2::read::BzDecoder;
use log::trace;

use crate::error::DecodeError;
use crate::reader::ByteReader;

/// Set in a Source `message_id` when the payload is bzip2-compressed.
pub const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// Largest decompressed fragment payload we accept, whatever the header claims.
pub const MAX_DECOMPRESSED_SIZE: u32 = 1 << 20;

/// Upper bound on what is reserved up front for a decompressed payload.
const PREALLOCATE_LIMIT: usize = 65_535;

/// One decoded fragment of a split response.
pub trait ResponseFragment: Sized {
    /// Decode the bytes following the `-2` packet header.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError>;

    /// Shared by every fragment of one response.
    fn message_id(&self) -> u32;
    fn fragment_count(&self) -> u8;
    /// Zero-based position of this fragment in the response.
    fn fragment_id(&self) -> u8;
    fn payload(&self) -> &[u8];
    fn into_payload(self) -> Vec<u8>;
}

/// Which fragment header layout the target server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FragmentFormat {
    #[default]
    GoldSrc,
    Source,
}

fn check_index(fragment_id: u8, fragment_count: u8) -> Result<(), DecodeError> {
    if fragment_id >= fragment_count {
        return Err(DecodeError::InvalidFragment {
            fragment_id,
            fragment_count,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldSrcFragment {
    pub message_id: u32,
    pub fragment_count: u8,
    pub fragment_id: u8,
    pub payload: Vec<u8>,
}

impl ResponseFragment for GoldSrcFragment {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::little(data);
        let message_id = reader.read_uint32()?;
        let packed = reader.read_uint8()?;
        let fragment_count = packed & 0x0F;
        let fragment_id = packed >> 4;
        check_index(fragment_id, fragment_count)?;

        Ok(GoldSrcFragment {
            message_id,
            fragment_count,
            fragment_id,
            payload: reader.read(None)?.to_vec(),
        })
    }

    fn message_id(&self) -> u32 {
        self.message_id
    }

    fn fragment_count(&self) -> u8 {
        self.fragment_count
    }

    fn fragment_id(&self) -> u8 {
        self.fragment_id
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFragment {
    pub message_id: u32,
    pub fragment_count: u8,
    pub fragment_id: u8,
    pub mtu: u16,
    /// Only present when [COMPRESSED_FLAG] is set.
    pub decompressed_size: Option<u32>,
    /// CRC32 of the decompressed payload, only present when compressed.
    pub crc: Option<u32>,
    /// Already decompressed.
    pub payload: Vec<u8>,
}

impl SourceFragment {
    pub fn is_compressed(&self) -> bool {
        self.message_id & COMPRESSED_FLAG != 0
    }
}

fn decompress(compressed: &[u8], expected_size: u32, expected_crc: u32) -> Result<Vec<u8>, DecodeError> {
    // stop one byte past the declared size
    let limit = expected_size.min(MAX_DECOMPRESSED_SIZE);
    let mut payload = Vec::with_capacity((limit as usize).min(PREALLOCATE_LIMIT));
    BzDecoder::new(compressed)
        .take(u64::from(limit) + 1)
        .read_to_end(&mut payload)
        .map_err(DecodeError::Decompress)?;

    if payload.len() != expected_size as usize {
        return Err(DecodeError::DecompressedSize {
            expected: expected_size,
            actual: payload.len(),
        });
    }
    let actual = crc32fast::hash(&payload);
    if actual != expected_crc {
        return Err(DecodeError::Checksum {
            expected: expected_crc,
            actual,
        });
    }

    trace!("decompressed {} bytes into {}", compressed.len(), payload.len());
    Ok(payload)
}

impl ResponseFragment for SourceFragment {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::little(data);
        let message_id = reader.read_uint32()?;
        let fragment_count = reader.read_uint8()?;
        let fragment_id = reader.read_uint8()?;
        let mtu = reader.read_uint16()?;
        check_index(fragment_id, fragment_count)?;

        let mut fragment = SourceFragment {
            message_id,
            fragment_count,
            fragment_id,
            mtu,
            decompressed_size: None,
            crc: None,
            payload: Vec::new(),
        };

        if fragment.is_compressed() {
            let size = reader.read_uint32()?;
            let crc = reader.read_uint32()?;
            fragment.payload = decompress(reader.read(None)?, size, crc)?;
            fragment.decompressed_size = Some(size);
            fragment.crc = Some(crc);
        } else {
            fragment.payload = reader.read(None)?.to_vec();
        }

        Ok(fragment)
    }

    fn message_id(&self) -> u32 {
        self.message_id
    }

    fn fragment_count(&self) -> u8 {
        self.fragment_count
    }

    fn fragment_id(&self) -> u8 {
        self.fragment_id
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
