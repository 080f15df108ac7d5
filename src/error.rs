use std::io;
use std::str::Utf8Error;

use thiserror::Error;

/// The server sent bytes we could not make sense of.
///
/// Raised at the point of failure and never retried by the parsing layer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer exhausted: wanted {wanted} bytes at offset {offset}, {remaining} remaining")]
    BufferExhausted {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },
    #[error("string starting at offset {offset} is not NUL-terminated")]
    UnterminatedString { offset: usize },
    #[error("string is not valid UTF-8: {0}")]
    InvalidText(#[from] Utf8Error),
    #[error("unknown packet header {0}")]
    UnknownPacketHeader(i32),
    #[error("fragment {fragment_id} is out of range for a {fragment_count} fragment message")]
    InvalidFragment { fragment_id: u8, fragment_count: u8 },
    #[error("failed to decompress payload: {0}")]
    Decompress(#[source] io::Error),
    #[error("decompressed payload is {actual} bytes, header declared {expected}")]
    DecompressedSize { expected: u32, actual: usize },
    #[error("payload checksum {actual:#010x} does not match declared {expected:#010x}")]
    Checksum { expected: u32, actual: u32 },
    #[error("unexpected response type {0:#04x}")]
    UnexpectedResponseType(u8),
}

#[derive(Debug, Error)]
pub enum SourceQueryError {
    #[error("failed to bind a local port: {0}")]
    FailedPortBind(#[source] io::Error),
    #[error("host is unreachable: {0}")]
    UnreachableHost(#[source] io::Error),
    #[error("failed to send request: {0}")]
    SendError(#[source] io::Error),
    #[error("failed to receive response: {0}")]
    ReceiveError(#[source] io::Error),
    #[error("timed out waiting for a response")]
    Timeout,
    #[error("server answered with {0} challenges in a row")]
    ChallengeLoop(u8),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SourceQueryError {
    /// The server was unreachable or too slow.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceQueryError::Timeout)
    }

    /// The server answered, but with garbage.
    pub fn is_decode(&self) -> bool {
        matches!(self, SourceQueryError::Decode(_))
    }
}

impl From<tokio::time::error::Elapsed> for SourceQueryError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        SourceQueryError::Timeout
    }
}
