//! The request state machine, free of any socket.
//!
//! [QuerySession] is fed datagrams and answers with what to do next. The
//! blocking and async drivers in [crate::query] only move bytes and enforce
//! timeouts; challenge handling, reassembly and decoding all live here.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::config::QueryOptions;
use crate::error::{DecodeError, SourceQueryError};
use crate::fragment::{FragmentFormat, GoldSrcFragment, ResponseFragment, SourceFragment};
use crate::mutator::StreamMutator;
use crate::packet::{self, Packet, PacketHeader};
use crate::protocol::{QueryProtocol, NO_CHALLENGE, S2C_CHALLENGE};
use crate::reader::{ByteReader, Endian, TextEncoding};
use crate::reassembly::FragmentBuffer;

/// What the driver should do after feeding a datagram.
#[derive(Debug, PartialEq)]
pub enum Step<T> {
    /// Send this datagram, then keep receiving.
    Send(Vec<u8>),
    /// Keep receiving.
    Receive,
    /// The request is complete.
    Done(T),
}

pub struct QuerySession<P: QueryProtocol> {
    encoding: TextEncoding,
    fragment: FragmentFormat,
    mutator: Arc<dyn StreamMutator>,
    max_challenges: u8,
    fragments: FragmentBuffer,
    challenges: u8,
    sent_at: Option<Instant>,
    ping: Option<Duration>,
    _protocol: PhantomData<fn() -> P>,
}

impl<P: QueryProtocol> QuerySession<P> {
    pub fn new(options: &QueryOptions) -> Self {
        QuerySession {
            encoding: options.encoding,
            fragment: options.fragment,
            mutator: Arc::clone(&options.mutator),
            max_challenges: options.max_challenges,
            fragments: FragmentBuffer::new(),
            challenges: 0,
            sent_at: None,
            ping: None,
            _protocol: PhantomData,
        }
    }

    /// The first datagram to send.
    pub fn start(&mut self) -> Vec<u8> {
        self.sent_at = Some(Instant::now());
        packet::pack(&P::serialize_request(NO_CHALLENGE))
    }

    /// Time from the first request to the first challenge or answer, once known.
    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }

    /// Handle one received datagram.
    ///
    /// Foreign traffic, malformed fragments and answers to other queries are
    /// dropped and yield [Step::Receive]. Only a broken answer of the expected
    /// type or a challenge loop is an error.
    pub fn feed(&mut self, datagram: &[u8]) -> Result<Step<P::Response>, SourceQueryError> {
        trace!("received {:02x?}", datagram);

        let packet = match Packet::unpack(datagram) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("ignoring datagram: {}", err);
                return Ok(Step::Receive);
            }
        };

        let payload = match packet.header {
            PacketHeader::Single => packet.body.to_vec(),
            PacketHeader::Split => match self.collect(packet.body) {
                Some(payload) => payload,
                None => return Ok(Step::Receive),
            },
        };

        self.respond(payload)
    }

    fn collect(&mut self, body: &[u8]) -> Option<Vec<u8>> {
        let complete = match self.fragment {
            FragmentFormat::GoldSrc => insert(&mut self.fragments, GoldSrcFragment::from_bytes(body)),
            FragmentFormat::Source => insert(&mut self.fragments, SourceFragment::from_bytes(body)),
        }?;
        let complete = self.mutator.mutate(complete);
        Some(packet::strip_single_header(&complete).to_vec())
    }

    fn respond(&mut self, payload: Vec<u8>) -> Result<Step<P::Response>, SourceQueryError> {
        let mut reader = ByteReader::new(&payload, Endian::Little, self.encoding);
        let response_type = match reader.read_uint8() {
            Ok(response_type) => response_type,
            Err(err) => {
                debug!("ignoring empty response: {}", err);
                return Ok(Step::Receive);
            }
        };

        if response_type != S2C_CHALLENGE && !P::validate_response_type(response_type) {
            debug!("ignoring response of type {:#04x}", response_type);
            return Ok(Step::Receive);
        }

        if self.ping.is_none() {
            self.ping = self.sent_at.map(|sent_at| sent_at.elapsed());
        }
        if response_type == S2C_CHALLENGE {
            return self.challenged(&mut reader);
        }

        let ping = self.ping.unwrap_or_default();
        let response = P::deserialize_response(&mut reader, response_type, ping)?;
        debug!("response of type {:#04x} decoded, ping {:?}", response_type, ping);
        Ok(Step::Done(response))
    }

    fn challenged(&mut self, reader: &mut ByteReader<'_>) -> Result<Step<P::Response>, SourceQueryError> {
        self.challenges += 1;
        if self.challenges > self.max_challenges {
            return Err(SourceQueryError::ChallengeLoop(self.challenges));
        }

        let challenge = reader.read_int32()?;
        debug!("challenged with {:#010x}, resending", challenge);
        self.fragments.clear();
        Ok(Step::Send(packet::pack(&P::serialize_request(challenge))))
    }
}

fn insert<F: ResponseFragment>(
    fragments: &mut FragmentBuffer,
    fragment: Result<F, DecodeError>,
) -> Option<Vec<u8>> {
    match fragment {
        Ok(fragment) => fragments.insert(fragment),
        Err(err) => {
            warn!("dropping malformed fragment: {}", err);
            None
        }
    }
}
