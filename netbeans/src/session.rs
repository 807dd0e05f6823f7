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

//! Per-connection session state exposed to client handlers

use crate::quote;
use crate::{BufferRef, BufferSet, NetbeansError, NetbeansResult};
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};
use vimoir_reactor::{Connection, Token};

/// Handshake progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `AUTH`
    Unauthenticated,
    /// Authenticated, waiting for `startupDone`
    AwaitingStartup,
    /// Handshake complete
    Ready,
    /// Connection closed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::AwaitingStartup => "awaiting-startup",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        })
    }
}

/// Kind of outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A command, answered by nothing
    Command,
    /// A function, answered by a reply
    Function,
}

impl RequestKind {
    fn marker(self) -> char {
        match self {
            RequestKind::Command => '!',
            RequestKind::Function => '/',
        }
    }
}

/// A request queued from another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command or function
    pub kind: RequestKind,
    /// Buffer number, `0` for none
    pub buf_id: u32,
    /// Request name
    pub name: String,
    /// Formatted arguments
    pub args: String,
}

/// Thread-safe handle queueing requests into a session.
///
/// Queued requests are sent on the next timer tick of the reactor thread.
#[derive(Debug, Clone)]
pub struct SessionSender {
    tx: UnboundedSender<Request>,
}

impl SessionSender {
    /// Queue a command for buffer `buf_id` (`0` for none)
    pub fn send_cmd(&self, buf_id: u32, name: &str, args: &str) -> NetbeansResult<()> {
        self.push(RequestKind::Command, buf_id, name, args)
    }

    /// Queue a function call for buffer `buf_id` (`0` for none)
    pub fn send_function(&self, buf_id: u32, name: &str, args: &str) -> NetbeansResult<()> {
        self.push(RequestKind::Function, buf_id, name, args)
    }

    fn push(&self, kind: RequestKind, buf_id: u32, name: &str, args: &str) -> NetbeansResult<()> {
        self.tx
            .send(Request {
                kind,
                buf_id,
                name: name.to_string(),
                args: args.to_string(),
            })
            .map_err(|_| NetbeansError::SessionClosed)
    }

    /// Whether the session has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The session side of one editor connection.
///
/// Client handlers receive `&mut Session` to send requests, resolve
/// buffers and stop the server.
pub struct Session {
    conn: Connection,
    buffers: BufferSet,
    state: SessionState,
    seqno: u32,
    last_reply: Option<u32>,
    listener: Token,
    terminate_requested: bool,
    tx: UnboundedSender<Request>,
    rx: UnboundedReceiver<Request>,
}

impl Session {
    /// Create a session on `conn`, accepted by the listener `listener`.
    pub fn new(mut conn: Connection, listener: Token) -> Self {
        conn.set_terminator(Some("\n"));
        let (tx, rx) = unbounded_channel();
        Self {
            conn,
            buffers: BufferSet::new(),
            state: SessionState::Unauthenticated,
            seqno: 0,
            last_reply: None,
            listener,
            terminate_requested: false,
            tx,
            rx,
        }
    }

    /// Handshake state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the handshake has completed and until the session closes
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Address of the editor
    pub fn peer_addr(&self) -> SocketAddr {
        self.conn.peer_addr()
    }

    /// Sequence number of the last request sent
    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    /// The buffers of this session
    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    /// Return the buffer of `pathname`, creating it on first use.
    pub fn get_buffer(&mut self, pathname: &str) -> NetbeansResult<BufferRef> {
        self.buffers.get_or_create(pathname)
    }

    /// Look a buffer up by number
    pub fn buffer(&self, buf_id: u32) -> Option<BufferRef> {
        self.buffers.get(buf_id)
    }

    /// Send a command.
    ///
    /// Requests made before the handshake completes are dropped.
    pub fn send_cmd(&mut self, buffer: Option<&BufferRef>, name: &str, args: &str) {
        let buf_id = buffer.map_or(0, |buffer| buffer.buf_id());
        self.send_request(RequestKind::Command, buf_id, name, args);
    }

    /// Send a function call. The reply is not correlated with the request.
    pub fn send_function(&mut self, buffer: Option<&BufferRef>, name: &str, args: &str) {
        let buf_id = buffer.map_or(0, |buffer| buffer.buf_id());
        self.send_request(RequestKind::Function, buf_id, name, args);
    }

    fn send_request(&mut self, kind: RequestKind, buf_id: u32, name: &str, args: &str) {
        if self.state != SessionState::Ready {
            warn!(peer_addr = %self.peer_addr(), state = %self.state, request = name, "session not ready, dropping request");
            return;
        }
        self.seqno += 1;
        let separator = if args.is_empty() { "" } else { " " };
        let message = format!(
            "{buf_id}:{name}{}{}{separator}{args}\n",
            kind.marker(),
            self.seqno
        );
        debug!(peer_addr = %self.peer_addr(), seqno = self.seqno, request = %message.trim_end(), "sending");
        match self.conn.send(&message) {
            Ok(()) => self.conn.metrics().request_sent(),
            Err(err) => warn!(peer_addr = %self.peer_addr(), error = %err, request = name, "request not sent"),
        }
    }

    /// Quote a string and escape its special characters
    pub fn quote(&self, text: &str) -> String {
        quote::quote(text)
    }

    /// Inverse of [`Session::quote`]
    pub fn unquote(&self, text: &str) -> String {
        quote::unquote(text)
    }

    /// Split a string on whitespace keeping quoted runs together
    pub fn split_quoted_string(&self, text: &str) -> Vec<String> {
        quote::split_quoted_string(text)
    }

    /// Stop accepting new editors. The current sessions stay open.
    pub fn terminate_server(&mut self) {
        info!(peer_addr = %self.peer_addr(), "terminate server requested");
        self.terminate_requested = true;
    }

    /// A handle other threads can use to queue requests
    pub fn sender(&self) -> SessionSender {
        SessionSender {
            tx: self.tx.clone(),
        }
    }

    /// Close the connection
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.conn.close();
    }

    /// True once the session or its connection has closed
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed || self.conn.state().is_closed()
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        debug!(peer_addr = %self.peer_addr(), from = %self.state, to = %state, "session state");
        self.state = state;
    }

    pub(crate) fn take_terminate_request(&mut self) -> Option<Token> {
        std::mem::take(&mut self.terminate_requested).then_some(self.listener)
    }

    /// Remember a reply's sequence number; false for a duplicate.
    pub(crate) fn accept_reply(&mut self, seqno: u32) -> bool {
        if self.last_reply == Some(seqno) {
            return false;
        }
        self.last_reply = Some(seqno);
        true
    }

    /// Send every request queued through a [`SessionSender`]
    pub(crate) fn drain_requests(&mut self) {
        while let Ok(request) = self.rx.try_recv() {
            self.send_request(request.kind, request.buf_id, &request.name, &request.args);
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer_addr", &self.peer_addr())
            .field("state", &self.state)
            .field("seqno", &self.seqno)
            .field("buffers", &self.buffers.len())
            .finish()
    }
}
