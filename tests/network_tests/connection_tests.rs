//! Tests for Connection
//!
//! Requests run against a real TCP listener that plays back scripted bytes:
//! - Replies are matched to the commands that asked for them
//! - A timed-out or malformed reply breaks the connection for good
//! - A late reply is never handed to the next command

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use atlas_reply::network::Connection;
use atlas_reply::node::Node;
use atlas_reply::protocol::{read_value, Command, InfoSection, RawValue, ReadLimits};
use atlas_reply::AtlasError;

// =============================================================================
// Helper Functions
// =============================================================================

/// One scripted answer: wait `delay` after the command arrives, then send `bytes`
struct Step {
    delay: Duration,
    bytes: &'static [u8],
}

fn answer(bytes: &'static [u8]) -> Step {
    Step {
        delay: Duration::ZERO,
        bytes,
    }
}

fn late(delay: Duration, bytes: &'static [u8]) -> Step {
    Step { delay, bytes }
}

/// Accept one client and answer each command it sends with the next step
fn serve(steps: Vec<Step>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        for step in steps {
            if read_value(&mut reader, &ReadLimits::default()).is_err() {
                return;
            }
            thread::sleep(step.delay);
            if writer.write_all(step.bytes).is_err() {
                return;
            }
        }
    });

    (addr, handle)
}

fn connect(addr: SocketAddr) -> Connection {
    Connection::new(TcpStream::connect(addr).unwrap(), ReadLimits::default()).unwrap()
}

const INFO_SERVER: &[u8] = b"$31\r\n# Server\r\nredis_version:7.2.0\r\n\r\n";

// =============================================================================
// Request/Reply Tests
// =============================================================================

#[test]
fn test_replies_follow_commands() {
    let (addr, server) = serve(vec![answer(b"+PONG\r\n"), answer(b":1700000000\r\n")]);
    let mut conn = connect(addr);

    assert_eq!(conn.request(&Command::Ping).unwrap(), RawValue::Simple("PONG".into()));
    assert_eq!(conn.request(&Command::LastSave).unwrap(), RawValue::Integer(1_700_000_000));
    assert!(!conn.is_broken());
    assert_eq!(conn.peer_addr(), Some(addr));

    server.join().unwrap();
}

#[test]
fn test_info_over_tcp() {
    let (addr, server) = serve(vec![answer(INFO_SERVER)]);
    let node = Node::new(connect(addr));

    let info = node.info(InfoSection::Server).unwrap();

    assert_eq!(info.get("redis_version").map(String::as_str), Some("7.2.0"));
    server.join().unwrap();
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_late_reply_is_not_read_as_next_reply() {
    let (addr, server) = serve(vec![
        late(Duration::from_millis(300), b"+PONG\r\n"),
        answer(INFO_SERVER),
    ]);
    let node = Node::new(connect(addr));

    assert!(!node.ping_timeout(Duration::from_millis(50)));

    let err = node.info(InfoSection::Server).unwrap_err();
    assert!(matches!(err, AtlasError::Network(_)));

    server.join().unwrap();
}

#[test]
fn test_malformed_reply_breaks_connection() {
    let (addr, server) = serve(vec![answer(b"!bad\r\n+PONG\r\n"), answer(b"+PONG\r\n")]);
    let mut conn = connect(addr);

    assert!(matches!(conn.request(&Command::Ping).unwrap_err(), AtlasError::Protocol(_)));
    assert!(conn.is_broken());
    assert!(matches!(conn.request(&Command::Ping).unwrap_err(), AtlasError::Network(_)));

    server.join().unwrap();
}

#[test]
fn test_error_reply_keeps_connection_usable() {
    let (addr, server) = serve(vec![answer(b"-ERR unknown\r\n"), answer(b"+PONG\r\n")]);
    let mut conn = connect(addr);

    assert_eq!(
        conn.request(&Command::Save).unwrap(),
        RawValue::Error("ERR unknown".into())
    );
    assert!(!conn.is_broken());
    assert_eq!(conn.request(&Command::Ping).unwrap(), RawValue::Simple("PONG".into()));

    server.join().unwrap();
}
