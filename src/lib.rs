//! Pure Rust implementation of the [Source and GoldSrc server queries](https://developer.valvesoftware.com/wiki/Server_queries)
//! (A2S_INFO, A2S_PLAYER and A2S_RULES), blocking or on tokio.
//!
//! Split responses are reassembled in fragment order whatever order they
//! arrive in, and can be post-processed with a [StreamMutator] for mods that
//! scramble their answers. Pick the fragment layout of the target engine with
//! [FragmentFormat].
pub mod config;
pub mod error;
pub mod fragment;
pub mod info;
pub mod mutator;
pub mod packet;
pub mod player;
pub mod protocol;
pub mod query;
pub mod reader;
pub mod reassembly;
pub mod rules;
pub mod session;

pub use config::QueryOptions;
pub use error::{DecodeError, SourceQueryError};
pub use fragment::{FragmentFormat, GoldSrcFragment, ResponseFragment, SourceFragment};
pub use info::{info, info_async, A2sInfo, GoldSrcInfo, ServerInfo, SourceInfo};
pub use mutator::{GenericMutator, StreamMutator, XorMutator};
pub use player::{players, players_async, A2sPlayer, PlayerInfo};
pub use protocol::QueryProtocol;
pub use query::{request, request_async};
pub use reader::{ByteReader, Endian, TextEncoding};
pub use rules::{rules, rules_async, A2sRules, Rules};
