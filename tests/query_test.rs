//! End-to-end tests of both drivers against a scripted UDP server on localhost.

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use a2squery::{FragmentFormat, QueryOptions, ServerInfo, XorMutator, StreamMutator};
use byteorder::{LittleEndian, WriteBytesExt};

const TOKEN: i32 = 0x2468_ACE0;

/// Answers each request with whatever `handler` returns, until idle for a while.
fn spawn_server<F>(mut handler: F) -> SocketAddr
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    sock.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
    let addr = sock.local_addr().unwrap();

    thread::spawn(move || {
        let mut buf = [0u8; 2048];
        while let Ok((len, peer)) = sock.recv_from(&mut buf) {
            for datagram in handler(&buf[..len]) {
                sock.send_to(&datagram, peer).unwrap();
            }
        }
    });

    addr
}

fn single(body: &[u8]) -> Vec<u8> {
    let mut datagram = vec![0xFF; 4];
    datagram.extend_from_slice(body);
    datagram
}

fn challenge() -> Vec<u8> {
    let mut body = vec![0x41];
    body.write_i32::<LittleEndian>(TOKEN).unwrap();
    single(&body)
}

fn token_of(request: &[u8]) -> Option<i32> {
    let tail = request.get(request.len().checked_sub(4)?..)?;
    Some(i32::from_le_bytes(tail.try_into().ok()?))
}

fn player_body() -> Vec<u8> {
    let mut body = vec![0x44, 2];
    for (name, score, duration) in [("alice", 10, 61.5f32), ("bob", 3, 5.0)] {
        body.push(0);
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.write_i32::<LittleEndian>(score).unwrap();
        body.write_f32::<LittleEndian>(duration).unwrap();
    }
    body
}

/// Challenges first, then answers requests that carry the token.
fn challenging_player_server() -> SocketAddr {
    spawn_server(|request| {
        assert_eq!(&request[..5], b"\xFF\xFF\xFF\xFF\x55");
        if token_of(request) == Some(TOKEN) {
            vec![single(&player_body())]
        } else {
            vec![challenge()]
        }
    })
}

fn source_info_body() -> Vec<u8> {
    let mut body = vec![0x49, 17];
    for s in ["A very long server name", "ctf_2fort", "tf", "Team Fortress"] {
        body.extend_from_slice(s.as_bytes());
        body.push(0);
    }
    body.write_u16::<LittleEndian>(440).unwrap();
    body.extend_from_slice(&[12, 24, 2, b'd', b'l', 1, 1]);
    body.extend_from_slice(b"1.0.0.0\0");
    body.push(0x20);
    body.extend_from_slice(b"ctf,casual\0");
    body
}

fn source_fragments(message_id: u32, whole: &[u8], pieces: usize) -> Vec<Vec<u8>> {
    let size = (whole.len() + pieces - 1) / pieces;
    whole
        .chunks(size)
        .enumerate()
        .map(|(id, chunk)| {
            let mut datagram = vec![0xFE, 0xFF, 0xFF, 0xFF];
            datagram.write_u32::<LittleEndian>(message_id).unwrap();
            datagram.push(pieces as u8);
            datagram.push(id as u8);
            datagram.write_u16::<LittleEndian>(1248).unwrap();
            datagram.extend_from_slice(chunk);
            datagram
        })
        .collect()
}

fn goldsrc_fragments(message_id: u32, whole: &[u8], pieces: usize) -> Vec<Vec<u8>> {
    let size = (whole.len() + pieces - 1) / pieces;
    whole
        .chunks(size)
        .enumerate()
        .map(|(id, chunk)| {
            let mut datagram = vec![0xFE, 0xFF, 0xFF, 0xFF];
            datagram.write_u32::<LittleEndian>(message_id).unwrap();
            datagram.push((id as u8) << 4 | pieces as u8);
            datagram.extend_from_slice(chunk);
            datagram
        })
        .collect()
}

fn quick() -> QueryOptions {
    QueryOptions::default().with_timeout(Duration::from_secs(2))
}

#[test]
fn players_blocking_with_challenge() {
    let addr = challenging_player_server();
    let players = a2squery::players(addr, &quick()).unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "alice");
    assert_eq!(players[0].duration, 61.5);
    assert_eq!(players[1].score, 3);
}

#[tokio::test]
async fn players_async_with_challenge() {
    let addr = challenging_player_server();
    let players = a2squery::players_async(addr, &quick()).await.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[1].name, "bob");
}

#[tokio::test]
async fn concurrent_requests_share_nothing() {
    let addr = challenging_player_server();
    let options = quick();
    let (a, b) = tokio::join!(
        a2squery::players_async(addr, &options),
        a2squery::players_async(addr, &options)
    );
    assert_eq!(a.unwrap(), b.unwrap());
}

#[test]
fn split_source_info_out_of_order_among_noise() {
    let addr = spawn_server(|request| {
        assert!(request.starts_with(b"\xFF\xFF\xFF\xFFTSource Engine Query\0"));
        let mut whole = vec![0xFF; 4];
        whole.extend_from_slice(&source_info_body());
        let mut fragments = source_fragments(0x10, &whole, 3);
        fragments.rotate_left(1);

        let mut out = vec![
            b"garbage".to_vec(),
            single(b"\x44\x00"),
            fragments[0].clone(),
        ];
        out.extend_from_slice(&fragments[1..]);
        out
    });

    let options = quick().with_fragment_format(FragmentFormat::Source);
    let info = match a2squery::info(addr, &options).unwrap() {
        ServerInfo::Source(info) => info,
        other => panic!("expected source info, got {:?}", other),
    };
    assert_eq!(info.server_name, "A very long server name");
    assert_eq!(info.map_name, "ctf_2fort");
    assert_eq!(info.player_count, 12);
    assert_eq!(info.keywords.as_deref(), Some("ctf,casual"));
}

#[tokio::test]
async fn scrambled_goldsrc_rules() {
    let mutator = XorMutator::new(vec![0x13, 0x37]);
    let scrambler = mutator.clone();
    let addr = spawn_server(move |request| {
        if token_of(request) != Some(TOKEN) {
            return vec![challenge()];
        }
        let mut whole = vec![0xFF; 4];
        whole.extend_from_slice(b"\x45\x02\x00sv_cheats\x000\x00mp_friendlyfire\x001\x00");
        let mut fragments = goldsrc_fragments(7, &scrambler.mutate(whole), 2);
        fragments.reverse();
        fragments
    });

    let options = quick().with_mutator(mutator);
    let rules = a2squery::rules_async(addr, &options).await.unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules["sv_cheats"], "0");
    assert_eq!(rules["mp_friendlyfire"], "1");
}

#[test]
fn silent_server_times_out() {
    let addr = spawn_server(|_| Vec::new());
    let options = QueryOptions::default().with_timeout(Duration::from_millis(200));
    let err = a2squery::players(addr, &options).unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
}

#[tokio::test]
async fn silent_server_times_out_async() {
    let addr = spawn_server(|_| Vec::new());
    let options = QueryOptions::default().with_timeout(Duration::from_millis(200));
    let err = a2squery::info_async(addr, &options).await.unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
}

#[tokio::test]
async fn max_wait_bounds_the_whole_request() {
    let addr = spawn_server(|_| vec![single(b"\x49junk"), b"noise".to_vec()]);
    let options = QueryOptions::default()
        .with_timeout(Duration::from_secs(2))
        .with_max_wait(Duration::from_millis(300));

    let started = Instant::now();
    let err = a2squery::players_async(addr, &options).await.unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn garbage_of_the_right_type_is_a_decode_error() {
    let addr = spawn_server(|_| vec![single(b"\x44\x05\x00cut")]);
    let err = a2squery::players(addr, &quick()).unwrap_err();
    assert!(err.is_decode(), "{:?}", err);
}

#[tokio::test]
async fn cancelled_request_leaves_runtime_usable() {
    let silent = spawn_server(|_| Vec::new());
    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        a2squery::players_async(silent, &quick()),
    )
    .await;
    assert!(cancelled.is_err());

    let addr = challenging_player_server();
    let players = a2squery::players_async(addr, &quick()).await.unwrap();
    assert_eq!(players.len(), 2);
}
