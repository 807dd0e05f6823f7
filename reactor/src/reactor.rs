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

//! Readiness-driven event loop

use crate::{Channel, ChannelResult, Context, ReactorConfig, ReactorError, ReactorMetrics, ReactorResult};
use mio::{Events, Interest, Poll, Token};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

/// Registration record of one channel.
pub(crate) struct Slot {
    /// `None` while the channel's handler is running
    pub(crate) channel: Option<Box<dyn Channel>>,
    /// Interest currently registered with the poll instance
    interest: Option<Interest>,
}

impl Slot {
    fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel: Some(channel),
            interest: None,
        }
    }
}

/// Handler selected for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Read,
    Write,
    Accept,
    Connect,
    Tick,
    Close,
}

impl Op {
    fn apply(self, channel: &mut dyn Channel, ctx: &mut Context<'_>) -> ChannelResult<()> {
        match self {
            Op::Read if channel.readable() => channel.handle_read(ctx),
            Op::Write if channel.writable() => channel.handle_write(ctx),
            Op::Accept if channel.acceptable() => channel.handle_accept(ctx),
            Op::Connect if channel.connectable() => channel.handle_connect(ctx),
            Op::Tick => channel.handle_tick(ctx),
            Op::Close => channel.handle_close(ctx),
            _ => Ok(()),
        }
    }
}

/// Readiness reported for one token by a poll.
#[derive(Debug, Clone, Copy)]
struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
}

/// Interest implied by a channel's readiness predicates.
fn interest_of(channel: &dyn Channel) -> Option<Interest> {
    let read = channel.readable() || channel.acceptable();
    let write = channel.writable() || channel.connectable();
    match (read, write) {
        (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
        (true, false) => Some(Interest::READABLE),
        (false, true) => Some(Interest::WRITABLE),
        (false, false) => None,
    }
}

/// Single-threaded reactor multiplexing a dynamic set of channels.
///
/// [`Reactor::run`] loops until no channel remains registered. Every
/// iteration recomputes each channel's interest, waits at most
/// `poll_timeout` for readiness, dispatches the events and, once
/// `tick_interval` has elapsed, runs a timer sweep over all channels.
pub struct Reactor {
    poll: Poll,
    events: Events,
    slots: HashMap<Token, Slot>,
    pending: Vec<(Token, Box<dyn Channel>)>,
    closing: Vec<Token>,
    next_token: usize,
    config: ReactorConfig,
    metrics: Arc<ReactorMetrics>,
    last_tick: Instant,
}

impl Reactor {
    /// Create a reactor with its own poll instance
    pub fn new(config: ReactorConfig) -> ReactorResult<Self> {
        config.validate().map_err(ReactorError::Config)?;
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(config.events_capacity),
            slots: HashMap::new(),
            pending: Vec::new(),
            closing: Vec::new(),
            next_token: 1,
            config,
            metrics: Arc::new(ReactorMetrics::new()),
            last_tick: Instant::now(),
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Metrics shared with every channel
    pub fn metrics(&self) -> Arc<ReactorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no channel is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `token` names a registered channel
    pub fn contains(&self, token: Token) -> bool {
        self.slots.contains_key(&token)
    }

    /// Add a channel to the reactor.
    ///
    /// The channel starts with no registered interest; it is bound to the
    /// poll instance at the start of the next iteration.
    pub fn register(&mut self, channel: Box<dyn Channel>) -> ReactorResult<Token> {
        if channel.state().is_closed() {
            return Err(ReactorError::Closed);
        }
        let token = Token(self.next_token);
        self.next_token += 1;
        debug!(token = ?token, channel = %channel, "registered channel");
        self.slots.insert(token, Slot::new(channel));
        Ok(token)
    }

    /// Remove a channel and its OS registration.
    ///
    /// Returns the channel, or `None` when `token` is not registered.
    pub fn unregister(&mut self, token: Token) -> Option<Box<dyn Channel>> {
        let mut slot = self.slots.remove(&token)?;
        if let (Some(_), Some(channel)) = (slot.interest, slot.channel.as_mut()) {
            if let Err(err) = self.poll.registry().deregister(channel.source()) {
                debug!(token = ?token, error = %err, "deregister failed");
            }
        }
        trace!(token = ?token, "unregistered channel");
        slot.channel
    }

    /// Run until every channel has been closed.
    ///
    /// Returns `Err` when the poll call fails or a handler raises a fatal
    /// error; per-channel errors only close the affected channel.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> ReactorResult<()> {
        info!(channels = self.slots.len(), "reactor started");
        self.last_tick = Instant::now();
        while !self.slots.is_empty() {
            self.turn()?;
        }
        info!("reactor stopped");
        Ok(())
    }

    /// Run a single loop iteration.
    pub fn turn(&mut self) -> ReactorResult<()> {
        self.sync_interests()?;
        self.poll_once()?;
        if self.last_tick.elapsed() >= self.config.tick_interval {
            self.tick()?;
            self.last_tick = Instant::now();
        }
        Ok(())
    }

    fn sync_interests(&mut self) -> ReactorResult<()> {
        let registry = self.poll.registry();
        let mut failed = Vec::new();
        for (token, slot) in &mut self.slots {
            let Some(channel) = slot.channel.as_mut() else {
                continue;
            };
            if channel.state().is_closed() {
                continue;
            }
            let wanted = interest_of(&**channel);
            if wanted == slot.interest {
                continue;
            }
            let result = match (slot.interest, wanted) {
                (None, Some(interest)) => registry.register(channel.source(), *token, interest),
                (Some(_), Some(interest)) => registry.reregister(channel.source(), *token, interest),
                (Some(_), None) => registry.deregister(channel.source()),
                (None, None) => Ok(()),
            };
            if wanted.is_none() {
                error!(token = ?token, channel = %channel, state = %channel.state(), "channel has no readiness interest");
            }
            match result {
                Ok(()) => slot.interest = wanted,
                Err(err) => {
                    warn!(token = ?token, channel = %channel, error = %err, "registration failed");
                    failed.push(*token);
                }
            }
        }
        for token in failed {
            self.invoke(token, Op::Close)?;
        }
        self.settle()
    }

    fn poll_once(&mut self) -> ReactorResult<()> {
        match self.poll.poll(&mut self.events, Some(self.config.poll_timeout)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(()),
            Err(err) => {
                error!(error = %err, "poll failed");
                return Err(err.into());
            }
        }

        let ready: Vec<Readiness> = self
            .events
            .iter()
            .map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable() || event.is_read_closed() || event.is_error(),
                writable: event.is_writable() || event.is_write_closed() || event.is_error(),
            })
            .collect();

        for readiness in ready {
            self.dispatch(readiness)?;
        }
        Ok(())
    }

    /// Run the handlers of one readiness event in read, write, accept,
    /// connect order. Each handler re-checks the channel's predicates, so a
    /// channel closed by an earlier handler sees no further calls.
    fn dispatch(&mut self, readiness: Readiness) -> ReactorResult<()> {
        trace!(token = ?readiness.token, readable = readiness.readable, writable = readiness.writable, "readiness");
        for op in [Op::Read, Op::Write, Op::Accept, Op::Connect] {
            let fired = match op {
                Op::Read | Op::Accept => readiness.readable,
                _ => readiness.writable,
            };
            if fired {
                self.invoke(readiness.token, op)?;
            }
        }
        self.settle()
    }

    fn tick(&mut self) -> ReactorResult<()> {
        let tokens: Vec<Token> = self.slots.keys().copied().collect();
        for token in tokens {
            self.invoke(token, Op::Tick)?;
        }
        self.settle()
    }

    /// Run one handler of the channel registered under `token`.
    ///
    /// Closed channels are skipped. A non-fatal error closes the channel;
    /// a fatal error is logged and returned.
    fn invoke(&mut self, token: Token, op: Op) -> ReactorResult<()> {
        let Some(mut channel) = self.slots.get_mut(&token).and_then(|slot| slot.channel.take()) else {
            return Ok(());
        };

        let result = if channel.state().is_closed() {
            Ok(())
        } else {
            let mut ctx = Context::new(
                token,
                &self.slots,
                &mut self.pending,
                &mut self.closing,
                &mut self.next_token,
                &self.metrics,
            );
            match op.apply(channel.as_mut(), &mut ctx) {
                Err(err) if !err.is_fatal() => {
                    warn!(token = ?token, channel = %channel, op = ?op, error = %err, "closing channel after error");
                    self.metrics.channel_error();
                    match channel.handle_close(&mut ctx) {
                        Err(err) if !err.is_fatal() => {
                            debug!(token = ?token, error = %err, "error while closing");
                            Ok(())
                        }
                        other => other,
                    }
                }
                other => other,
            }
        };

        if let Err(err) = &result {
            error!(token = ?token, channel = %channel, op = ?op, error = %err, "fatal channel error");
        }
        if let Some(slot) = self.slots.get_mut(&token) {
            slot.channel = Some(channel);
        }
        result
    }

    /// Apply close requests and registrations made by handlers, then drop
    /// channels that have closed.
    fn settle(&mut self) -> ReactorResult<()> {
        while !self.closing.is_empty() || !self.pending.is_empty() {
            while let Some(token) = self.closing.pop() {
                self.invoke(token, Op::Close)?;
            }
            for (token, channel) in std::mem::take(&mut self.pending) {
                debug!(token = ?token, channel = %channel, "registered channel");
                self.slots.insert(token, Slot::new(channel));
            }
        }
        self.reap();
        Ok(())
    }

    fn reap(&mut self) {
        let closed: Vec<Token> = self
            .slots
            .iter()
            .filter(|(_, slot)| {
                slot.channel
                    .as_ref()
                    .is_some_and(|channel| channel.state().is_closed())
            })
            .map(|(token, _)| *token)
            .collect();
        for token in closed {
            if let Some(channel) = self.unregister(token) {
                debug!(token = ?token, channel = %channel, "reaped closed channel");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionState;
    use mio::event::Source;
    use mio::net::TcpListener;
    use std::cell::{Cell, RefCell};
    use std::fmt;
    use std::rc::Rc;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct Ticker {
        socket: TcpListener,
        state: ConnectionState,
        ticks: Rc<Cell<usize>>,
        limit: usize,
    }

    impl Ticker {
        fn new(ticks: Rc<Cell<usize>>, limit: usize) -> Self {
            Self {
                socket: TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap(),
                state: ConnectionState::Accepting,
                ticks,
                limit,
            }
        }
    }

    impl fmt::Display for Ticker {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ticker")
        }
    }

    impl Channel for Ticker {
        fn state(&self) -> ConnectionState {
            self.state
        }

        fn source(&mut self) -> &mut dyn Source {
            &mut self.socket
        }

        fn handle_tick(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.ticks.set(self.ticks.get() + 1);
            if self.ticks.get() == self.limit {
                self.state = ConnectionState::Closing;
            }
            Ok(())
        }

        fn handle_close(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.state = ConnectionState::Closing;
            Ok(())
        }
    }

    fn fast_config() -> ReactorConfig {
        ReactorConfig::default()
            .with_tick_interval(Duration::from_millis(1))
            .with_poll_timeout(Duration::from_millis(1))
    }

    #[test]
    #[traced_test]
    fn test_run_until_empty() {
        let ticks = Rc::new(Cell::new(0));
        let mut reactor = Reactor::new(fast_config()).unwrap();
        reactor.register(Box::new(Ticker::new(Rc::clone(&ticks), 3))).unwrap();
        assert_eq!(reactor.len(), 1);

        reactor.run().unwrap();
        assert_eq!(ticks.get(), 3);
        assert!(reactor.is_empty());
        assert!(logs_contain("reaped closed channel"));
        assert!(logs_contain("reactor stopped"));
    }

    #[test]
    fn test_register_closed_channel_fails() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let mut ticker = Ticker::new(Rc::new(Cell::new(0)), 1);
        ticker.state = ConnectionState::Closing;
        assert!(matches!(
            reactor.register(Box::new(ticker)),
            Err(ReactorError::Closed)
        ));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let token = reactor
            .register(Box::new(Ticker::new(Rc::new(Cell::new(0)), 10)))
            .unwrap();
        reactor.turn().unwrap();
        assert!(reactor.contains(token));
        assert!(reactor.unregister(token).is_some());
        assert!(reactor.unregister(token).is_none());
        assert!(reactor.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReactorConfig::default().with_events_capacity(0);
        assert!(matches!(Reactor::new(config), Err(ReactorError::Config(_))));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Script {
        Quiet,
        CloseOnRead,
        FailOnRead,
        FatalOnRead,
    }

    /// Channel ready for everything that records the handlers it receives.
    struct Scripted {
        socket: TcpListener,
        state: ConnectionState,
        script: Script,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Scripted {
        fn new(script: Script) -> (Self, Rc<RefCell<Vec<&'static str>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let channel = Self {
                socket: TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap(),
                state: ConnectionState::Connected,
                script,
                calls: Rc::clone(&calls),
            };
            (channel, calls)
        }

        fn record(&self, call: &'static str) {
            self.calls.borrow_mut().push(call);
        }

        fn open(&self) -> bool {
            !self.state.is_closed()
        }
    }

    impl fmt::Display for Scripted {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "scripted {:?}", self.script)
        }
    }

    impl Channel for Scripted {
        fn state(&self) -> ConnectionState {
            self.state
        }

        fn source(&mut self) -> &mut dyn Source {
            &mut self.socket
        }

        fn readable(&self) -> bool {
            self.open()
        }

        fn writable(&self) -> bool {
            self.open()
        }

        fn acceptable(&self) -> bool {
            self.open()
        }

        fn connectable(&self) -> bool {
            self.open()
        }

        fn handle_read(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("read");
            match self.script {
                Script::Quiet => Ok(()),
                Script::CloseOnRead => {
                    self.state = ConnectionState::Closing;
                    Ok(())
                }
                Script::FailOnRead => Err(ReactorError::Io(std::io::Error::other("reset"))),
                Script::FatalOnRead => Err(ReactorError::fatal("handler bug")),
            }
        }

        fn handle_write(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("write");
            Ok(())
        }

        fn handle_accept(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("accept");
            Ok(())
        }

        fn handle_connect(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("connect");
            Ok(())
        }

        fn handle_tick(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("tick");
            Ok(())
        }

        fn handle_close(&mut self, _ctx: &mut Context<'_>) -> ChannelResult<()> {
            self.record("close");
            self.state = ConnectionState::Closing;
            Ok(())
        }
    }

    fn ready(token: Token) -> Readiness {
        Readiness {
            token,
            readable: true,
            writable: true,
        }
    }

    #[test]
    fn test_dispatch_order() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (channel, calls) = Scripted::new(Script::Quiet);
        let token = reactor.register(Box::new(channel)).unwrap();

        reactor.dispatch(ready(token)).unwrap();

        assert_eq!(*calls.borrow(), vec!["read", "write", "accept", "connect"]);
        assert!(reactor.contains(token));
    }

    #[test]
    fn test_dispatch_only_fired_directions() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (channel, calls) = Scripted::new(Script::Quiet);
        let token = reactor.register(Box::new(channel)).unwrap();

        reactor
            .dispatch(Readiness {
                token,
                readable: false,
                writable: true,
            })
            .unwrap();

        assert_eq!(*calls.borrow(), vec!["write", "connect"]);
    }

    #[test]
    fn test_closed_in_read_skips_later_handlers() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (channel, calls) = Scripted::new(Script::CloseOnRead);
        let token = reactor.register(Box::new(channel)).unwrap();

        reactor.dispatch(ready(token)).unwrap();

        assert_eq!(*calls.borrow(), vec!["read"]);
        assert!(!reactor.contains(token));
    }

    #[test]
    fn test_error_closes_only_failing_channel() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (failing, failing_calls) = Scripted::new(Script::FailOnRead);
        let (healthy, healthy_calls) = Scripted::new(Script::Quiet);
        let failing = reactor.register(Box::new(failing)).unwrap();
        let healthy = reactor.register(Box::new(healthy)).unwrap();

        reactor.dispatch(ready(failing)).unwrap();
        reactor.dispatch(ready(healthy)).unwrap();

        assert_eq!(*failing_calls.borrow(), vec!["read", "close"]);
        assert_eq!(
            *healthy_calls.borrow(),
            vec!["read", "write", "accept", "connect"]
        );
        assert!(!reactor.contains(failing));
        assert!(reactor.contains(healthy));
        assert_eq!(reactor.metrics().snapshot().channel_errors, 1);

        reactor.tick().unwrap();
        assert_eq!(healthy_calls.borrow().last(), Some(&"tick"));
    }

    #[test]
    fn test_fatal_error_ends_run() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (channel, calls) = Scripted::new(Script::FatalOnRead);
        let token = reactor.register(Box::new(channel)).unwrap();

        let err = reactor.dispatch(ready(token)).unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(*calls.borrow(), vec!["read"]);
        assert!(reactor.contains(token));
    }

    #[test]
    fn test_run_returns_fatal_error() {
        let mut reactor = Reactor::new(fast_config()).unwrap();
        let (channel, calls) = Scripted::new(Script::FatalOnRead);
        let addr = channel.socket.local_addr().unwrap();
        reactor.register(Box::new(channel)).unwrap();
        let _peer = std::net::TcpStream::connect(addr).unwrap();

        let err = reactor.run().unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(calls.borrow().first(), Some(&"read"));
    }
}
