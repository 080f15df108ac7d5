use std::collections::BTreeMap;
use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::config::QueryOptions;
use crate::error::{DecodeError, SourceQueryError};
use crate::protocol::QueryProtocol;
use crate::query::{request, request_async};
use crate::reader::ByteReader;

/// A2S_RULES request header, 'V'.
pub const A2S_RULES_REQUEST: u8 = 0x56;
/// A2S_RULES response header, 'E'.
pub const A2S_RULES_RESPONSE: u8 = 0x45;

pub type Rules = BTreeMap<String, String>;

/// [A2S_RULES](https://developer.valvesoftware.com/wiki/Server_queries#A2S_RULES)
#[derive(Debug, Clone, Copy, Default)]
pub struct A2sRules;

impl QueryProtocol for A2sRules {
    type Response = Rules;

    fn validate_response_type(response_type: u8) -> bool {
        response_type == A2S_RULES_RESPONSE
    }

    fn serialize_request(challenge: i32) -> Vec<u8> {
        let mut payload = vec![A2S_RULES_REQUEST];
        payload.extend_from_slice(&challenge.to_le_bytes());
        payload
    }

    fn deserialize_response(
        reader: &mut ByteReader<'_>,
        _response_type: u8,
        _ping: Duration,
    ) -> Result<Self::Response, DecodeError> {
        let count = reader.read_uint16()?;
        let mut rules = Rules::new();
        for _ in 0..count {
            let name = reader.read_cstring()?;
            let value = reader.read_cstring()?;
            rules.insert(name, value);
        }
        Ok(rules)
    }
}

/// Query `address` for its console variables, blocking the current thread.
pub fn rules<A: ToSocketAddrs>(address: A, options: &QueryOptions) -> Result<Rules, SourceQueryError> {
    request::<A2sRules, _>(address, options)
}

/// Query `address` for its console variables.
pub async fn rules_async<A: tokio::net::ToSocketAddrs>(
    address: A,
    options: &QueryOptions,
) -> Result<Rules, SourceQueryError> {
    request_async::<A2sRules, _>(address, options).await
}
