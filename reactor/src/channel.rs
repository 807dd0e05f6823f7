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

//! Channel capability interface

use crate::reactor::Slot;
use crate::{ChannelResult, ConnectionState, ReactorMetrics};
use mio::Token;
use mio::event::Source;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A socket driven by the [`Reactor`](crate::Reactor).
///
/// Before every poll the reactor consults the four readiness predicates to
/// compute the channel's interest; the defaults derive them from
/// [`Channel::state`]. When an event arrives the handlers are invoked in the
/// order read, write, accept, connect, skipping any whose predicate no longer
/// holds. Returning a non-fatal error from a handler closes the channel.
pub trait Channel: fmt::Display {
    /// Current lifecycle state
    fn state(&self) -> ConnectionState;

    /// The OS handle registered with the poll instance
    fn source(&mut self) -> &mut dyn Source;

    /// Interested in incoming data
    fn readable(&self) -> bool {
        self.state().is_readable()
    }

    /// Interested in flushing outgoing data
    fn writable(&self) -> bool {
        self.state().is_writable()
    }

    /// Interested in incoming peers
    fn acceptable(&self) -> bool {
        self.state().is_acceptable()
    }

    /// Waiting for an outgoing connect to complete
    fn connectable(&self) -> bool {
        self.state().is_connectable()
    }

    /// The socket has data to read
    fn handle_read(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        Ok(())
    }

    /// The socket can accept more output
    fn handle_write(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        Ok(())
    }

    /// A peer is waiting to be accepted
    fn handle_accept(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        Ok(())
    }

    /// An outgoing connect has completed or failed
    fn handle_connect(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        Ok(())
    }

    /// Periodic timer sweep
    fn handle_tick(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
        Ok(())
    }

    /// Close the channel. Must be idempotent and leave [`Channel::state`]
    /// reporting [`ConnectionState::Closing`].
    fn handle_close(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()>;
}

/// View of the reactor handed to a channel while one of its handlers runs.
///
/// Registrations and close requests made through the context are applied
/// by the reactor as soon as the handler returns.
pub struct Context<'a> {
    token: Token,
    slots: &'a HashMap<Token, Slot>,
    pending: &'a mut Vec<(Token, Box<dyn Channel>)>,
    closing: &'a mut Vec<Token>,
    next_token: &'a mut usize,
    metrics: &'a Arc<ReactorMetrics>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        token: Token,
        slots: &'a HashMap<Token, Slot>,
        pending: &'a mut Vec<(Token, Box<dyn Channel>)>,
        closing: &'a mut Vec<Token>,
        next_token: &'a mut usize,
        metrics: &'a Arc<ReactorMetrics>,
    ) -> Self {
        Self {
            token,
            slots,
            pending,
            closing,
            next_token,
            metrics,
        }
    }

    /// Token of the channel being serviced
    pub fn token(&self) -> Token {
        self.token
    }

    /// Shared reactor metrics
    pub fn metrics(&self) -> &Arc<ReactorMetrics> {
        self.metrics
    }

    /// Register a new channel with the reactor.
    pub fn register(&mut self, channel: Box<dyn Channel>) -> Token {
        let token = Token(*self.next_token);
        *self.next_token += 1;
        self.pending.push((token, channel));
        token
    }

    /// Ask the reactor to close another channel.
    pub fn close(&mut self, token: Token) {
        if !self.closing.contains(&token) {
            self.closing.push(token);
        }
    }

    /// Whether `token` names a channel that is registered and still open.
    pub fn is_registered(&self, token: Token) -> bool {
        if self.closing.contains(&token) {
            return false;
        }
        if self.pending.iter().any(|(pending, _)| *pending == token) {
            return true;
        }
        // The serviced channel is out of its slot while its handler runs.
        self.slots.get(&token).is_some_and(|slot| {
            slot.channel
                .as_ref()
                .is_none_or(|channel| !channel.state().is_closed())
        })
    }
}
