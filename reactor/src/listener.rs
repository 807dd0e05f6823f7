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

//! Listening socket channel

use crate::{Channel, ChannelResult, ConnectionState, Context};
use mio::Token;
use mio::event::Source;
use mio::net::{TcpListener, TcpStream};
use std::fmt;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use tracing::{debug, info, instrument, warn};

/// Builds the channel that serves a freshly accepted peer.
pub trait SessionFactory {
    /// Create a session for `stream`.
    ///
    /// `ctx` belongs to the listener; [`Context::token`] identifies it so the
    /// session can later ask for it to be closed.
    fn create(
        &mut self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        ctx: &mut Context<'_>,
    ) -> ChannelResult<Box<dyn Channel>>;
}

/// A bound socket accepting peers and registering a session for each.
///
/// With `single_session` set, a peer arriving while the previous session is
/// still registered is closed immediately without building a session.
pub struct Listener<F> {
    socket: TcpListener,
    state: ConnectionState,
    local_addr: SocketAddr,
    factory: F,
    single_session: bool,
    session: Option<Token>,
}

impl<F: SessionFactory> Listener<F> {
    /// Bind a listening socket to `addr`
    #[instrument(skip(factory))]
    pub fn bind(addr: SocketAddr, factory: F, single_session: bool) -> io::Result<Self> {
        let socket = TcpListener::bind(addr)?;
        let local_addr = socket.local_addr()?;
        info!(local_addr = %local_addr, "listening");
        Ok(Self {
            socket,
            state: ConnectionState::Accepting,
            local_addr,
            factory,
            single_session,
            session: None,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting peers. Sessions already registered are unaffected.
    pub fn terminate(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        self.state = ConnectionState::Closing;
        info!(local_addr = %self.local_addr, "listener terminated");
        true
    }

    fn admit(
        &mut self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        ctx: &mut Context<'_>,
    ) -> ChannelResult<()> {
        if self.single_session && self.session.is_some_and(|token| ctx.is_registered(token)) {
            info!(peer_addr = %peer_addr, "rejecting connection, a session is already active");
            ctx.metrics().connection_rejected();
            drop(stream);
            return Ok(());
        }

        match self.factory.create(stream, peer_addr, ctx) {
            Ok(session) => {
                let token = ctx.register(session);
                debug!(peer_addr = %peer_addr, token = ?token, "session created");
                self.session = Some(token);
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(peer_addr = %peer_addr, error = %err, "failed to create session");
                Ok(())
            }
        }
    }
}

impl<F> fmt::Display for Listener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener {}", self.local_addr)
    }
}

impl<F: SessionFactory> Channel for Listener<F> {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.socket
    }

    fn handle_accept(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()> {
        loop {
            match self.socket.accept() {
                Ok((stream, peer_addr)) => self.admit(stream, peer_addr, ctx)?,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                    ) =>
                {
                    debug!(local_addr = %self.local_addr, error = %err, "accept interrupted");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn handle_close(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.terminate();
        Ok(())
    }
}
