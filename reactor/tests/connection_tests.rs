//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Connection lifecycle tests over real loopback sockets

use std::io::Read;
use std::net::{TcpListener, TcpStream as StdStream};
use std::sync::Arc;
use vimoir_chat::Encoding;
use vimoir_reactor::{Connection, ConnectionState, ReactorError, ReactorMetrics, TcpStream};

fn connected_pair() -> (Connection, StdStream, Arc<ReactorMetrics>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = StdStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, peer_addr) = listener.accept().unwrap();
    server.set_nonblocking(true).unwrap();
    let metrics = Arc::new(ReactorMetrics::new());
    let conn = Connection::accepted(
        TcpStream::from_std(server),
        peer_addr,
        Encoding::Utf8,
        Arc::clone(&metrics),
    );
    (conn, client, metrics)
}

#[test]
fn test_close_is_idempotent() {
    let (mut conn, _client, metrics) = connected_pair();
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(metrics.active_connections(), 1);

    assert!(conn.close());
    assert!(!conn.close());
    assert_eq!(conn.state(), ConnectionState::Closing);
    assert_eq!(metrics.active_connections(), 0);
}

#[test]
fn test_close_with_pending_output_writes_nothing() {
    let (mut conn, mut client, _metrics) = connected_pair();
    conn.send("0:showBalloon!1 \"pending\"\n").unwrap();
    assert!(conn.wants_write());

    conn.close();
    assert!(!conn.wants_write());
    assert_eq!(conn.on_writable().unwrap(), 0);
    assert!(matches!(conn.send("late\n"), Err(ReactorError::Closed)));

    let mut received = Vec::new();
    client.read_to_end(&mut received).unwrap();
    assert!(received.is_empty());
}

#[test]
fn test_frames_and_accumulator() {
    let (mut conn, mut client, metrics) = connected_pair();
    conn.set_terminator(Some("\n"));
    std::io::Write::write_all(&mut client, b"AUTH changeme\n0:version=0").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));

    conn.on_readable().unwrap();
    assert_eq!(conn.take_frame().as_deref(), Some("AUTH changeme"));
    assert_eq!(conn.take_frame(), None);
    assert_eq!(conn.get_and_clear_buffer(), "0:version=0");
    assert_eq!(conn.get_and_clear_buffer(), "");
    assert_eq!(conn.bytes_received(), 25);
    assert_eq!(metrics.snapshot().frames_received, 1);
}

#[test]
fn test_blank_lines_are_not_frames() {
    let (mut conn, mut client, metrics) = connected_pair();
    conn.set_terminator(Some("\n"));
    std::io::Write::write_all(&mut client, b"\n\nAUTH changeme\n\n0:startupDone=0\n").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));

    conn.on_readable().unwrap();
    assert_eq!(conn.take_frame().as_deref(), Some("AUTH changeme"));
    assert_eq!(conn.take_frame().as_deref(), Some("0:startupDone=0"));
    assert_eq!(conn.take_frame(), None);
    assert_eq!(conn.get_and_clear_buffer(), "");
    assert_eq!(metrics.snapshot().frames_received, 2);
}

#[test]
fn test_end_of_stream_closes() {
    let (mut conn, client, _metrics) = connected_pair();
    drop(client);
    std::thread::sleep(std::time::Duration::from_millis(50));

    let status = conn.on_readable().unwrap();
    assert_eq!(status, vimoir_chat::ReadStatus::Closed);
    assert_eq!(conn.state(), ConnectionState::Closing);
}
