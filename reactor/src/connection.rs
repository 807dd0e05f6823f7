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

//! Framed TCP connection channel

use crate::{Channel, ChannelResult, ConnectionState, Context, ReactorError, ReactorMetrics};
use mio::event::Source;
use mio::net::TcpStream;
use std::collections::VecDeque;
use std::fmt;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};
use vimoir_chat::{ChatSink, Encoding, Framer, ReadStatus};

/// Accumulates framed input until a higher layer drains it.
#[derive(Debug, Default)]
struct Inbound {
    ibuff: String,
    frames: VecDeque<String>,
}

impl ChatSink for Inbound {
    fn collect_incoming_data(&mut self, data: &str) {
        self.ibuff.push_str(data);
    }

    fn found_terminator(&mut self) {
        // Blank lines carry no message.
        if !self.ibuff.is_empty() {
            self.frames.push_back(std::mem::take(&mut self.ibuff));
        }
    }
}

/// A TCP stream wrapped in a chat [`Framer`].
///
/// Incoming data is appended to an accumulator; every terminator moves the
/// accumulated text into a queue of complete frames that higher layers
/// drain with [`Connection::take_frame`]. Outgoing text is queued with
/// [`Connection::send`] and flushed whenever the socket is writable.
pub struct Connection {
    stream: TcpStream,
    state: ConnectionState,
    framer: Framer,
    inbound: Inbound,
    peer_addr: SocketAddr,
    created_at: Instant,
    metrics: Arc<ReactorMetrics>,
    bytes_sent: u64,
    bytes_received: u64,
}

impl Connection {
    /// Wrap a stream accepted by a listener
    #[instrument(skip(stream, metrics))]
    pub fn accepted(
        stream: TcpStream,
        peer_addr: SocketAddr,
        encoding: Encoding,
        metrics: Arc<ReactorMetrics>,
    ) -> Self {
        info!(peer_addr = %peer_addr, "accepted connection");
        metrics.connection_opened();
        Self::with_state(stream, peer_addr, encoding, metrics, ConnectionState::Connected)
    }

    /// Start a non-blocking connect to `addr`
    #[instrument(skip(metrics))]
    pub fn connect(
        addr: SocketAddr,
        encoding: Encoding,
        metrics: Arc<ReactorMetrics>,
    ) -> ChannelResult<Self> {
        let stream = TcpStream::connect(addr)?;
        debug!(peer_addr = %addr, "connecting");
        Ok(Self::with_state(stream, addr, encoding, metrics, ConnectionState::Connecting))
    }

    fn with_state(
        stream: TcpStream,
        peer_addr: SocketAddr,
        encoding: Encoding,
        metrics: Arc<ReactorMetrics>,
        state: ConnectionState,
    ) -> Self {
        Self {
            stream,
            state,
            framer: Framer::new(encoding),
            inbound: Inbound::default(),
            peer_addr,
            created_at: Instant::now(),
            metrics,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state.can_transition_to(next) {
            trace!(peer_addr = %self.peer_addr, from = %self.state, to = %next, "state change");
            self.state = next;
        } else {
            warn!(peer_addr = %self.peer_addr, from = %self.state, to = %next, "illegal state change ignored");
        }
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get bytes sent
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Get bytes received
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Metrics this connection reports to
    pub fn metrics(&self) -> &Arc<ReactorMetrics> {
        &self.metrics
    }

    /// Character encoding of the stream
    pub fn encoding(&self) -> Encoding {
        self.framer.encoding()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Set the frame terminator. `None` delivers raw chunks.
    pub fn set_terminator(&mut self, terminator: Option<&str>) {
        self.framer.set_terminator(terminator);
    }

    /// Queue `text` for sending.
    pub fn send(&mut self, text: &str) -> ChannelResult<()> {
        if self.state.is_closed() {
            return Err(ReactorError::Closed);
        }
        self.framer.send(text)?;
        Ok(())
    }

    /// True while queued output has not been written
    pub fn wants_write(&self) -> bool {
        self.framer.has_pending_output()
    }

    /// Text collected since the last terminator, leaving the accumulator empty
    pub fn get_and_clear_buffer(&mut self) -> String {
        std::mem::take(&mut self.inbound.ibuff)
    }

    /// Next complete frame, oldest first
    pub fn take_frame(&mut self) -> Option<String> {
        self.inbound.frames.pop_front()
    }

    /// Read everything available. End of stream closes the connection.
    pub fn on_readable(&mut self) -> ChannelResult<ReadStatus> {
        if !self.state.is_readable() {
            return Ok(ReadStatus::Open);
        }
        let queued = self.inbound.frames.len();
        let (read, status) = self.framer.on_readable(&mut self.stream, &mut self.inbound)?;
        self.bytes_received += read as u64;
        self.metrics.bytes_received(read as u64);
        self.metrics
            .frames_received(self.inbound.frames.len().saturating_sub(queued) as u64);
        trace!(peer_addr = %self.peer_addr, bytes = read, "read");
        if status == ReadStatus::Closed {
            debug!(peer_addr = %self.peer_addr, "end of stream");
            self.close();
        }
        Ok(status)
    }

    /// Write pending output until done or the socket would block.
    pub fn on_writable(&mut self) -> ChannelResult<usize> {
        if !self.state.is_writable() || !self.framer.has_pending_output() {
            return Ok(0);
        }
        let written = self.framer.on_writable(&mut self.stream)?;
        self.bytes_sent += written as u64;
        self.metrics.bytes_sent(written as u64);
        trace!(peer_addr = %self.peer_addr, bytes = written, "wrote");
        Ok(written)
    }

    /// Complete a pending connect.
    pub fn on_connect(&mut self) -> ChannelResult<()> {
        if let Some(err) = self.stream.take_error()? {
            return Err(err.into());
        }
        match self.stream.peer_addr() {
            Ok(addr) => {
                info!(peer_addr = %addr, "connected");
                self.metrics.connection_opened();
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Close the connection, discarding pending output.
    ///
    /// Returns `false` when the connection was already closed.
    pub fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        let was_open = self.state == ConnectionState::Connected;
        self.set_state(ConnectionState::Closing);
        self.framer.discard_output();
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(peer_addr = %self.peer_addr, error = %err, "shutdown failed");
        }
        if was_open {
            self.metrics.connection_closed(self.created_at.elapsed());
        }
        info!(peer_addr = %self.peer_addr, "disconnecting");
        true
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection {}", self.peer_addr)
    }
}

impl Channel for Connection {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.stream
    }

    fn writable(&self) -> bool {
        self.state.is_writable() && self.framer.has_pending_output()
    }

    fn handle_read(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.on_readable()?;
        self.on_writable()?;
        Ok(())
    }

    fn handle_write(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.on_writable()?;
        Ok(())
    }

    fn handle_connect(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.on_connect()?;
        self.on_writable()?;
        Ok(())
    }

    fn handle_close(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.close();
        Ok(())
    }
}
