use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::config::QueryOptions;
use crate::error::{DecodeError, SourceQueryError};
use crate::protocol::QueryProtocol;
use crate::query::{request, request_async};
use crate::reader::ByteReader;

/// A2S_PLAYER request header, 'U'.
pub const A2S_PLAYER_REQUEST: u8 = 0x55;
/// A2S_PLAYER response header, 'D'.
pub const A2S_PLAYER_RESPONSE: u8 = 0x44;

/// One entry of an A2S_PLAYER response.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    /// Position of the entry in the chunk. Servers usually send 0 for everyone.
    pub index: u8,
    pub name: String,
    pub score: i32,
    /// Seconds connected.
    pub duration: f32,
}

/// [A2S_PLAYER](https://developer.valvesoftware.com/wiki/Server_queries#A2S_PLAYER)
#[derive(Debug, Clone, Copy, Default)]
pub struct A2sPlayer;

impl QueryProtocol for A2sPlayer {
    type Response = Vec<PlayerInfo>;

    fn validate_response_type(response_type: u8) -> bool {
        response_type == A2S_PLAYER_RESPONSE
    }

    fn serialize_request(challenge: i32) -> Vec<u8> {
        let mut payload = vec![A2S_PLAYER_REQUEST];
        payload.extend_from_slice(&challenge.to_le_bytes());
        payload
    }

    fn deserialize_response(
        reader: &mut ByteReader<'_>,
        _response_type: u8,
        _ping: Duration,
    ) -> Result<Self::Response, DecodeError> {
        let count = reader.read_uint8()?;
        let mut players = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            players.push(PlayerInfo {
                index: reader.read_uint8()?,
                name: reader.read_cstring()?,
                score: reader.read_int32()?,
                duration: reader.read_float()?,
            });
        }
        Ok(players)
    }
}

/// Query `address` for its player list, blocking the current thread.
pub fn players<A: ToSocketAddrs>(address: A, options: &QueryOptions) -> Result<Vec<PlayerInfo>, SourceQueryError> {
    request::<A2sPlayer, _>(address, options)
}

/// Query `address` for its player list.
///
/// ```no_run
/// # async fn run() -> Result<(), a2squery::SourceQueryError> {
/// let options = a2squery::QueryOptions::default();
/// for player in a2squery::players_async("127.0.0.1:27015", &options).await? {
///     println!("{} ({})", player.name, player.score);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn players_async<A: tokio::net::ToSocketAddrs>(
    address: A,
    options: &QueryOptions,
) -> Result<Vec<PlayerInfo>, SourceQueryError> {
    request_async::<A2sPlayer, _>(address, options).await
}

#[cfg(test)]
mod tests {
    use byteorder::{LittleEndian, WriteBytesExt};

    use super::*;

    fn encode(players: &[PlayerInfo]) -> Vec<u8> {
        let mut data = vec![players.len() as u8];
        for player in players {
            data.push(player.index);
            data.extend_from_slice(player.name.as_bytes());
            data.push(0);
            data.write_i32::<LittleEndian>(player.score).unwrap();
            data.write_f32::<LittleEndian>(player.duration).unwrap();
        }
        data
    }

    #[test]
    fn request_embeds_challenge() {
        assert_eq!(A2sPlayer::serialize_request(0), b"\x55\x00\x00\x00\x00");
        assert_eq!(A2sPlayer::serialize_request(-1), b"\x55\xFF\xFF\xFF\xFF");
        assert_eq!(A2sPlayer::serialize_request(0x1234_5678), b"\x55\x78\x56\x34\x12");
    }

    #[test]
    fn only_player_responses_validate() {
        assert!(A2sPlayer::validate_response_type(0x44));
        assert!(!A2sPlayer::validate_response_type(0x41));
        assert!(!A2sPlayer::validate_response_type(0x49));
    }

    #[test]
    fn decodes_every_declared_player() {
        let expected = vec![
            PlayerInfo {
                index: 0,
                name: "Gordon".to_owned(),
                score: 42,
                duration: 1234.5,
            },
            PlayerInfo {
                index: 1,
                name: "Ålyx".to_owned(),
                score: -3,
                duration: 0.25,
            },
            PlayerInfo {
                index: 2,
                name: String::new(),
                score: 0,
                duration: 7.0,
            },
        ];
        let data = encode(&expected);
        let mut reader = ByteReader::little(&data);
        let players = A2sPlayer::deserialize_response(&mut reader, 0x44, Duration::ZERO).unwrap();
        assert_eq!(players, expected);
        assert!(reader.is_empty());
    }

    #[test]
    fn zero_players() {
        let mut reader = ByteReader::little(b"\x00");
        let players = A2sPlayer::deserialize_response(&mut reader, 0x44, Duration::ZERO).unwrap();
        assert!(players.is_empty());
        assert!(reader.is_empty());
    }

    #[test]
    fn missing_players_are_an_error() {
        let mut data = encode(&[PlayerInfo {
            index: 0,
            name: "solo".to_owned(),
            score: 1,
            duration: 1.0,
        }]);
        data[0] = 2;
        let mut reader = ByteReader::little(&data);
        assert!(matches!(
            A2sPlayer::deserialize_response(&mut reader, 0x44, Duration::ZERO),
            Err(DecodeError::BufferExhausted { .. })
        ));
    }
}
