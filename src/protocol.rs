use std::time::Duration;

use crate::error::DecodeError;
use crate::reader::ByteReader;

/// S2C_CHALLENGE: the server wants the request repeated with a token.
pub const S2C_CHALLENGE: u8 = 0x41;

/// Challenge sent before the server has issued one.
pub const NO_CHALLENGE: i32 = 0;

/// Request/response shape of one A2S query kind.
///
/// Implementors are stateless unit structs; everything is an associated
/// function so one protocol can serve any number of concurrent requests.
pub trait QueryProtocol {
    type Response;

    /// Whether `response_type` is an answer to this query.
    fn validate_response_type(response_type: u8) -> bool;

    /// Request payload (without the packet header) carrying `challenge`.
    fn serialize_request(challenge: i32) -> Vec<u8>;

    /// Decode the response body that follows the type byte.
    fn deserialize_response(
        reader: &mut ByteReader<'_>,
        response_type: u8,
        ping: Duration,
    ) -> Result<Self::Response, DecodeError>;
}
