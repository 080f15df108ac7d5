use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::config::QueryOptions;
use crate::error::{DecodeError, SourceQueryError};
use crate::protocol::{QueryProtocol, NO_CHALLENGE};
use crate::query::{request, request_async};
use crate::reader::{ByteReader, TextEncoding};

/// A2S_INFO request header, 'T'.
pub const A2S_INFO_REQUEST: u8 = 0x54;
/// A2S_INFO response header of Source servers, 'I'.
pub const A2S_INFO_RESPONSE: u8 = 0x49;
/// Obsolete GoldSrc A2S_INFO response header, 'm'.
pub const A2S_INFO_RESPONSE_LEGACY: u8 = 0x6D;

const EDF_PORT: u8 = 0x80;
const EDF_STEAM_ID: u8 = 0x10;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_KEYWORDS: u8 = 0x20;
const EDF_GAME_ID: u8 = 0x01;

/// Server information as answered by a Source engine server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    /// A2S_INFO protocol version
    pub protocol: u8,
    /// Server hostname
    pub server_name: String,
    /// Current map
    pub map_name: String,
    /// Location of server files
    pub folder: String,
    /// Name of game
    pub game: String,
    /// Steam app ID of game
    pub app_id: u16,
    /// Current players
    pub player_count: u8,
    /// Max players
    pub max_players: u8,
    /// Current bots
    pub bot_count: u8,
    /// Server type:
    /// - `d`: Dedicated
    /// - `l`: Listen (non-dedicated)
    /// - `p`: SourceTV relay (proxy)
    pub server_type: char,
    /// Server environment:
    /// - `l`: Linux
    /// - `w`: Windows
    /// - `m`: Mac (older servers send `o`, normalized to `m`)
    pub platform: char,
    /// Is the server password protected?
    pub password_protected: bool,
    /// Is the server VAC enabled?
    pub vac_enabled: bool,
    /// Version of the server software
    pub version: String,
    /// Extra data flag; says which of the optional fields below were sent.
    pub edf: u8,
    pub port: Option<u16>,
    pub steam_id: Option<u64>,
    pub stv_port: Option<u16>,
    pub stv_name: Option<String>,
    /// Tags describing the game mode
    pub keywords: Option<String>,
    /// Full 64-bit game ID, for apps whose ID does not fit in `app_id`
    pub game_id: Option<u64>,
    /// Round-trip time measured by the client
    pub ping: Duration,
}

/// Server information as answered by an old GoldSrc server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoldSrcInfo {
    /// IP address and port of the server
    pub address: String,
    pub server_name: String,
    pub map_name: String,
    /// Always decoded as Latin-1, some mods stuff binary data in here.
    pub folder: String,
    pub game: String,
    pub player_count: u8,
    pub max_players: u8,
    pub protocol: u8,
    /// `D` dedicated, `L` listen, `P` HLTV
    pub server_type: char,
    /// `L` Linux, `W` Windows
    pub platform: char,
    pub password_protected: bool,
    /// Running a Half-Life mod rather than the base game
    pub is_mod: bool,
    /// Only sent by mods, and not by all of them.
    pub mod_info: Option<ModInfo>,
    pub vac_enabled: bool,
    pub bot_count: u8,
    pub ping: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModInfo {
    pub website: String,
    pub download: String,
    pub version: u32,
    /// Size of the mod in bytes
    pub size: u32,
    pub multiplayer_only: bool,
    /// Ships its own DLL instead of the Half-Life one
    pub uses_custom_dll: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerInfo {
    Source(SourceInfo),
    GoldSrc(GoldSrcInfo),
}

impl ServerInfo {
    pub fn server_name(&self) -> &str {
        match self {
            ServerInfo::Source(info) => &info.server_name,
            ServerInfo::GoldSrc(info) => &info.server_name,
        }
    }

    pub fn map_name(&self) -> &str {
        match self {
            ServerInfo::Source(info) => &info.map_name,
            ServerInfo::GoldSrc(info) => &info.map_name,
        }
    }

    pub fn player_count(&self) -> u8 {
        match self {
            ServerInfo::Source(info) => info.player_count,
            ServerInfo::GoldSrc(info) => info.player_count,
        }
    }

    pub fn ping(&self) -> Duration {
        match self {
            ServerInfo::Source(info) => info.ping,
            ServerInfo::GoldSrc(info) => info.ping,
        }
    }
}

/// [A2S_INFO](https://developer.valvesoftware.com/wiki/Server_queries#A2S_INFO)
#[derive(Debug, Clone, Copy, Default)]
pub struct A2sInfo;

impl QueryProtocol for A2sInfo {
    type Response = ServerInfo;

    fn validate_response_type(response_type: u8) -> bool {
        matches!(response_type, A2S_INFO_RESPONSE | A2S_INFO_RESPONSE_LEGACY)
    }

    fn serialize_request(challenge: i32) -> Vec<u8> {
        let mut payload = vec![A2S_INFO_REQUEST];
        payload.extend_from_slice(b"Source Engine Query\0");
        if challenge != NO_CHALLENGE {
            payload.extend_from_slice(&challenge.to_le_bytes());
        }
        payload
    }

    fn deserialize_response(
        reader: &mut ByteReader<'_>,
        response_type: u8,
        ping: Duration,
    ) -> Result<Self::Response, DecodeError> {
        match response_type {
            A2S_INFO_RESPONSE => {
                let mut info = parse_source(reader)?;
                info.ping = ping;
                Ok(ServerInfo::Source(info))
            }
            A2S_INFO_RESPONSE_LEGACY => {
                let mut info = parse_goldsrc(reader)?;
                info.ping = ping;
                Ok(ServerInfo::GoldSrc(info))
            }
            n => Err(DecodeError::UnexpectedResponseType(n)),
        }
    }
}

fn parse_source(reader: &mut ByteReader<'_>) -> Result<SourceInfo, DecodeError> {
    let mut info = SourceInfo {
        protocol: reader.read_uint8()?,
        server_name: reader.read_cstring()?,
        map_name: reader.read_cstring()?,
        folder: reader.read_cstring()?,
        game: reader.read_cstring()?,
        app_id: reader.read_uint16()?,
        player_count: reader.read_uint8()?,
        max_players: reader.read_uint8()?,
        bot_count: reader.read_uint8()?,
        server_type: reader.read_char()?.to_ascii_lowercase(),
        platform: reader.read_char()?.to_ascii_lowercase(),
        password_protected: reader.read_bool()?,
        vac_enabled: reader.read_bool()?,
        version: reader.read_cstring()?,
        ..Default::default()
    };
    if info.platform == 'o' {
        info.platform = 'm';
    }

    // older servers stop before the extra data flag
    if reader.is_empty() {
        return Ok(info);
    }
    info.edf = reader.read_uint8()?;

    if info.edf & EDF_PORT != 0 {
        info.port = Some(reader.read_uint16()?);
    }
    if info.edf & EDF_STEAM_ID != 0 {
        info.steam_id = Some(reader.read_uint64()?);
    }
    if info.edf & EDF_SOURCE_TV != 0 {
        info.stv_port = Some(reader.read_uint16()?);
        info.stv_name = Some(reader.read_cstring()?);
    }
    if info.edf & EDF_KEYWORDS != 0 {
        info.keywords = Some(reader.read_cstring()?);
    }
    if info.edf & EDF_GAME_ID != 0 {
        info.game_id = Some(reader.read_uint64()?);
    }

    Ok(info)
}

fn parse_goldsrc(reader: &mut ByteReader<'_>) -> Result<GoldSrcInfo, DecodeError> {
    let mut info = GoldSrcInfo {
        address: reader.read_cstring()?,
        server_name: reader.read_cstring()?,
        map_name: reader.read_cstring()?,
        folder: reader.read_cstring_as(TextEncoding::Latin1)?,
        game: reader.read_cstring()?,
        player_count: reader.read_uint8()?,
        max_players: reader.read_uint8()?,
        protocol: reader.read_uint8()?,
        server_type: reader.read_char()?.to_ascii_uppercase(),
        platform: reader.read_char()?.to_ascii_uppercase(),
        password_protected: reader.read_bool()?,
        is_mod: reader.read_bool()?,
        ..Default::default()
    };

    // some games announce a mod but skip the block
    if info.is_mod && reader.remaining() > 2 {
        let website = reader.read_cstring()?;
        let download = reader.read_cstring()?;
        reader.read(Some(1))?;
        info.mod_info = Some(ModInfo {
            website,
            download,
            version: reader.read_uint32()?,
            size: reader.read_uint32()?,
            multiplayer_only: reader.read_bool()?,
            uses_custom_dll: reader.read_bool()?,
        });
    }
    info.vac_enabled = reader.read_bool()?;
    info.bot_count = reader.read_uint8()?;

    Ok(info)
}

/// Query `address` with A2S_INFO, blocking the current thread.
pub fn info<A: ToSocketAddrs>(address: A, options: &QueryOptions) -> Result<ServerInfo, SourceQueryError> {
    request::<A2sInfo, _>(address, options)
}

/// Query `address` with A2S_INFO.
///
/// Each receive waits at most `options.timeout`; a server that has to
/// challenge us costs one more round trip.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), a2squery::SourceQueryError> {
/// let host: &str = "nyc-1.us.uncletopia.com:27015";
/// let info = a2squery::info_async(host, &a2squery::QueryOptions::default()).await?;
/// println!("{} on {}", info.server_name(), info.map_name());
/// # Ok(())
/// # }
/// ```
pub async fn info_async<A: tokio::net::ToSocketAddrs>(
    address: A,
    options: &QueryOptions,
) -> Result<ServerInfo, SourceQueryError> {
    request_async::<A2sInfo, _>(address, options).await
}
