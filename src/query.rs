use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket as StdUdpSocket};
use std::time::Instant;

use log::debug;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::config::QueryOptions;
use crate::error::SourceQueryError;
use crate::protocol::QueryProtocol;
use crate::session::{QuerySession, Step};

/// Largest possible UDP payload; nothing a server sends gets truncated.
const RECV_BUFFER_SIZE: usize = 65_535;

fn unresolved() -> SourceQueryError {
    SourceQueryError::UnreachableHost(io::Error::new(
        io::ErrorKind::NotFound,
        "address did not resolve to anything",
    ))
}

/// Wildcard address of the same family as `remote`, on any port.
fn local_addr_for(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Run one query of kind `P` against `address`, blocking the current thread.
///
/// Every receive waits at most `options.timeout`, and the whole request at
/// most `options.max_wait` when set. Datagrams that are not an answer to this
/// query are skipped without resetting the overall deadline.
pub fn request<P, A>(address: A, options: &QueryOptions) -> Result<P::Response, SourceQueryError>
where
    P: QueryProtocol,
    A: ToSocketAddrs,
{
    let remote = address
        .to_socket_addrs()
        .map_err(SourceQueryError::UnreachableHost)?
        .next()
        .ok_or_else(unresolved)?;

    let sock = StdUdpSocket::bind(local_addr_for(&remote)).map_err(SourceQueryError::FailedPortBind)?;
    sock.connect(remote).map_err(SourceQueryError::UnreachableHost)?;

    let deadline = options.deadline(Instant::now());
    let mut session = QuerySession::<P>::new(options);
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    send(&sock, &session.start(), remote)?;
    loop {
        let window = options.receive_window(deadline)?;
        sock.set_read_timeout(Some(window))
            .map_err(SourceQueryError::ReceiveError)?;

        let len = match sock.recv(&mut buf) {
            Ok(len) => len,
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                debug!("no answer from {} within {:?}", remote, window);
                return Err(SourceQueryError::Timeout);
            }
            Err(err) => return Err(SourceQueryError::ReceiveError(err)),
        };

        match session.feed(&buf[..len])? {
            Step::Send(datagram) => send(&sock, &datagram, remote)?,
            Step::Receive => {}
            Step::Done(response) => return Ok(response),
        }
    }
}

fn send(sock: &StdUdpSocket, datagram: &[u8], remote: SocketAddr) -> Result<(), SourceQueryError> {
    debug!("sending {} bytes to {}", datagram.len(), remote);
    sock.send(datagram).map_err(SourceQueryError::SendError)?;
    Ok(())
}

/// Run one query of kind `P` against `address` on the tokio runtime.
///
/// Same state machine and timeout rules as [request]. Dropping the returned
/// future closes the socket and discards any fragments collected so far.
pub async fn request_async<P, A>(address: A, options: &QueryOptions) -> Result<P::Response, SourceQueryError>
where
    P: QueryProtocol,
    A: tokio::net::ToSocketAddrs,
{
    let remote = timeout(options.timeout, tokio::net::lookup_host(address))
        .await?
        .map_err(SourceQueryError::UnreachableHost)?
        .next()
        .ok_or_else(unresolved)?;

    // just arbitrarily bind any port, doesn't matter really
    let sock = UdpSocket::bind(local_addr_for(&remote))
        .await
        .map_err(SourceQueryError::FailedPortBind)?;
    sock.connect(remote)
        .await
        .map_err(SourceQueryError::UnreachableHost)?;

    let deadline = options.deadline(Instant::now());
    let mut session = QuerySession::<P>::new(options);
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    send_async(&sock, &session.start(), remote, options).await?;
    loop {
        let window = options.receive_window(deadline)?;
        let len = timeout(window, sock.recv(&mut buf))
            .await?
            .map_err(SourceQueryError::ReceiveError)?;

        match session.feed(&buf[..len])? {
            Step::Send(datagram) => send_async(&sock, &datagram, remote, options).await?,
            Step::Receive => {}
            Step::Done(response) => return Ok(response),
        }
    }
}

async fn send_async(
    sock: &UdpSocket,
    datagram: &[u8],
    remote: SocketAddr,
    options: &QueryOptions,
) -> Result<(), SourceQueryError> {
    debug!("sending {} bytes to {}", datagram.len(), remote);
    timeout(options.timeout, sock.send(datagram))
        .await?
        .map_err(SourceQueryError::SendError)?;
    Ok(())
}
