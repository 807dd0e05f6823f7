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

//! Netbeans protocol engine

use crate::message::{Event, Message, parse, parse_auth, parse_lnum_col};
use crate::quote::quote;
use crate::{
    BufferRef, CommandRegistry, ErrorPolicy, HandlerResult, NetbeansClient, NetbeansConfig,
    NetbeansError, NetbeansResult, Session, SessionState,
};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, info, trace, warn};
use vimoir_reactor::{Channel, ChannelResult, ConnectionState, Context, ReactorError, Source};

const NO_NAME_MESSAGE: &str =
    "You cannot use netbeans on a \"[No Name]\" file.\nPlease, edit a file.";

/// Handler of one event name.
type EventFn<C> = fn(&mut Netbeans<C>, &Event) -> ChannelResult<()>;

/// Map an event name to its handler. Unknown events have none.
fn event_handler<C: NetbeansClient>(name: &str) -> Option<EventFn<C>> {
    let handler: EventFn<C> = match name {
        "disconnect" => Netbeans::evt_disconnect,
        "fileOpened" => Netbeans::evt_file_opened,
        "killed" => Netbeans::evt_killed,
        "version" => Netbeans::evt_version,
        "balloonText" => Netbeans::evt_balloon_text,
        "buttonRelease" => Netbeans::evt_button_release,
        "keyCommand" => Netbeans::evt_key_command,
        "keyAtPos" => Netbeans::evt_key_at_pos,
        "newDotAndMark" => Netbeans::evt_new_dot_and_mark,
        "insert" => Netbeans::evt_insert,
        "remove" => Netbeans::evt_remove,
        "save" => Netbeans::evt_save,
        _ => return None,
    };
    Some(handler)
}

/// Protocol engine serving one editor connection.
///
/// The engine authenticates the editor, waits for `startupDone`, then
/// routes events to the [`NetbeansClient`] and `:nbkey` commands to the
/// [`CommandRegistry`].
pub struct Netbeans<C> {
    session: Session,
    client: C,
    commands: Rc<CommandRegistry<C>>,
    config: Rc<NetbeansConfig>,
    disconnected: bool,
}

impl<C: NetbeansClient> Netbeans<C> {
    /// Create an engine for `session`
    pub fn new(
        session: Session,
        client: C,
        commands: Rc<CommandRegistry<C>>,
        config: Rc<NetbeansConfig>,
    ) -> Self {
        Self {
            session,
            client,
            commands,
            config,
            disconnected: false,
        }
    }

    /// The session of this engine
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The client handler
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Process one frame, stripped of its terminator.
    pub fn handle_frame(&mut self, frame: &str) -> ChannelResult<()> {
        debug!(peer_addr = %self.session.peer_addr(), state = %self.session.state(), frame, "received");
        match self.session.state() {
            SessionState::Unauthenticated => self.authenticate(frame),
            SessionState::AwaitingStartup => self.await_startup(frame),
            SessionState::Ready => self.dispatch(frame),
            SessionState::Closed => Ok(()),
        }
    }

    fn call<F>(&mut self, handler: &str, f: F) -> NetbeansResult<()>
    where
        F: FnOnce(&mut C, &mut Session) -> HandlerResult,
    {
        f(&mut self.client, &mut self.session).map_err(|err| {
            error!(peer_addr = %self.session.peer_addr(), handler, error = %err, "handler failed");
            NetbeansError::Handler {
                handler: handler.to_string(),
                message: err.to_string(),
            }
        })
    }

    /// Apply `policy` to a protocol violation.
    fn violation(&mut self, err: NetbeansError, policy: ErrorPolicy) -> ChannelResult<()> {
        let peer_addr = self.session.peer_addr();
        match policy {
            ErrorPolicy::Fatal => {
                error!(peer_addr = %peer_addr, error = %err, "protocol error");
                Err(err.into())
            }
            ErrorPolicy::Close => {
                warn!(peer_addr = %peer_addr, error = %err, "protocol error, closing connection");
                self.session.close();
                Ok(())
            }
            ErrorPolicy::Ignore => {
                error!(peer_addr = %peer_addr, error = %err, "discarding message");
                Ok(())
            }
        }
    }

    fn authenticate(&mut self, frame: &str) -> ChannelResult<()> {
        match parse_auth(frame) {
            Some(password) if password == self.config.password => {
                info!(peer_addr = %self.session.peer_addr(), "editor authenticated");
                self.session.set_state(SessionState::AwaitingStartup);
                Ok(())
            }
            Some(password) => {
                let err = NetbeansError::BadPassword(password.to_string());
                let message = err.to_string();
                self.call("on_error", |client, session| client.on_error(session, &message))?;
                self.session.close();
                self.violation(err, self.config.handshake_policy)
            }
            None => self.violation(
                NetbeansError::Handshake(frame.to_string()),
                self.config.handshake_policy,
            ),
        }
    }

    fn await_startup(&mut self, frame: &str) -> ChannelResult<()> {
        match parse(frame) {
            Ok(Message::Event(event)) if event.name == "version" => {
                self.call("on_version", |client, session| {
                    client.on_version(session, &event.nbstring)
                })?;
                Ok(())
            }
            Ok(Message::Event(event)) if event.name == "startupDone" => {
                self.session.set_state(SessionState::Ready);
                info!(peer_addr = %self.session.peer_addr(), "session ready");
                self.call("on_startup", |client, session| client.on_startup(session))?;
                Ok(())
            }
            _ => self.violation(
                NetbeansError::Handshake(frame.to_string()),
                self.config.handshake_policy,
            ),
        }
    }

    fn dispatch(&mut self, frame: &str) -> ChannelResult<()> {
        let message = match parse(frame) {
            Ok(message) => message,
            Err(err) => return self.violation(err, self.config.parse_error_policy),
        };
        match message {
            Message::Reply(reply) => {
                if self.session.accept_reply(reply.seqno) {
                    debug!(peer_addr = %self.session.peer_addr(), seqno = reply.seqno, "reply");
                } else {
                    debug!(peer_addr = %self.session.peer_addr(), seqno = reply.seqno, "duplicate reply ignored");
                }
                Ok(())
            }
            Message::Event(event) => match event_handler::<C>(&event.name) {
                Some(handler) => handler(self, &event),
                None => {
                    trace!(event = %event.name, "event ignored");
                    Ok(())
                }
            },
        }
    }

    /// The buffer an event refers to; logs unknown numbers.
    fn event_buffer(&self, event: &Event) -> Option<BufferRef> {
        let buffer = self.session.buffer(event.buf_id);
        if buffer.is_none() {
            error!(peer_addr = %self.session.peer_addr(), buf_id = event.buf_id, event = %event.name, "invalid bufId");
        }
        buffer
    }

    fn invalid_args(&self, event: &Event) {
        error!(peer_addr = %self.session.peer_addr(), event = %event.name, args = ?event.args, "invalid arguments");
    }

    /// Run the handler of the command named by the first word of `text`.
    fn dispatch_command(&mut self, buffer: &BufferRef, text: &str) -> NetbeansResult<()> {
        let text = text.trim();
        let (name, args) = match text.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim_start()),
            None => (text, ""),
        };
        if name.is_empty() {
            debug!(peer_addr = %self.session.peer_addr(), "empty command");
            return Ok(());
        }

        debug!(peer_addr = %self.session.peer_addr(), command = name, args, buffer = %buffer, "command");
        let commands = Rc::clone(&self.commands);
        match commands.get(name) {
            Some(command) => self.call(&format!("command {name}"), |client, session| {
                command(client, session, buffer, args)
            }),
            None => self.call("default_command", |client, session| {
                client.default_command(session, buffer, name, args)
            }),
        }
    }

    fn evt_disconnect(&mut self, _event: &Event) -> ChannelResult<()> {
        self.notify_disconnect()?;
        self.session.close();
        Ok(())
    }

    fn evt_file_opened(&mut self, event: &Event) -> ChannelResult<()> {
        let pathname = event.nbstring.as_str();
        if pathname.is_empty() {
            self.call("on_error", |client, session| client.on_error(session, NO_NAME_MESSAGE))?;
            return Ok(());
        }

        let buffer = match self.session.get_buffer(pathname) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!(peer_addr = %self.session.peer_addr(), error = %err, "fileOpened discarded");
                return Ok(());
            }
        };

        if buffer.buf_id() != event.buf_id {
            if event.buf_id != 0 {
                let err = NetbeansError::BufferMismatch {
                    pathname: pathname.to_string(),
                    announced: event.buf_id,
                    expected: buffer.buf_id(),
                };
                return self.violation(err, self.config.buffer_mismatch_policy);
            }
            let name = quote(pathname);
            self.session.send_cmd(Some(&buffer), "putBufferNumber", &name);
            self.session.send_cmd(Some(&buffer), "stopDocumentListen", "");
            buffer.set_registered(true);
        }

        self.call("on_file_opened", |client, session| {
            client.on_file_opened(session, &buffer)
        })?;
        Ok(())
    }

    fn evt_killed(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        buffer.set_registered(false);
        self.call("on_killed", |client, session| client.on_killed(session, &buffer))?;
        Ok(())
    }

    fn evt_version(&mut self, event: &Event) -> ChannelResult<()> {
        self.call("on_version", |client, session| {
            client.on_version(session, &event.nbstring)
        })?;
        Ok(())
    }

    fn evt_balloon_text(&mut self, event: &Event) -> ChannelResult<()> {
        self.call("on_balloon_text", |client, session| {
            client.on_balloon_text(session, &event.nbstring)
        })?;
        Ok(())
    }

    fn evt_button_release(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        let numbers: Option<Vec<u32>> = event.args.iter().map(|arg| arg.parse().ok()).collect();
        let Some([button, lnum, col]) = numbers.as_deref().and_then(|n| <[u32; 3]>::try_from(n).ok())
        else {
            self.invalid_args(event);
            return Ok(());
        };
        buffer.set_cursor(lnum, col);
        self.call("on_button_release", |client, session| {
            client.on_button_release(session, &buffer, button)
        })?;
        Ok(())
    }

    fn evt_key_command(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        self.call("on_key_command", |client, session| {
            client.on_key_command(session, &buffer, &event.nbstring)
        })?;
        self.dispatch_command(&buffer, &event.nbstring)?;
        Ok(())
    }

    fn evt_key_at_pos(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        if event.nbstring.is_empty() {
            debug!(peer_addr = %self.session.peer_addr(), "empty string in keyAtPos");
            return Ok(());
        }
        let [offset, position] = event.args.as_slice() else {
            self.invalid_args(event);
            return Ok(());
        };
        let (Ok(offset), Some((lnum, col))) = (offset.parse::<u64>(), parse_lnum_col(position))
        else {
            self.invalid_args(event);
            return Ok(());
        };
        buffer.set_offset(offset);
        buffer.set_cursor(lnum, col);
        self.dispatch_command(&buffer, &event.nbstring)?;
        Ok(())
    }

    fn evt_new_dot_and_mark(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        let Some(offset) = event.args.first().and_then(|arg| arg.parse::<u64>().ok()) else {
            self.invalid_args(event);
            return Ok(());
        };
        buffer.set_offset(offset);
        self.call("on_cursor_moved", |client, session| {
            client.on_cursor_moved(session, &buffer)
        })?;
        Ok(())
    }

    fn evt_insert(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        let Some(offset) = event.args.first().and_then(|arg| arg.parse::<u64>().ok()) else {
            self.invalid_args(event);
            return Ok(());
        };
        buffer.set_offset(offset);
        self.call("on_insert", |client, session| {
            client.on_insert(session, &buffer, &event.nbstring)
        })?;
        Ok(())
    }

    fn evt_remove(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        let (Some(offset), Some(length)) = (
            event.args.first().and_then(|arg| arg.parse::<u64>().ok()),
            event.args.get(1).and_then(|arg| arg.parse::<u64>().ok()),
        ) else {
            self.invalid_args(event);
            return Ok(());
        };
        buffer.set_offset(offset);
        self.call("on_remove", |client, session| {
            client.on_remove(session, &buffer, length)
        })?;
        Ok(())
    }

    fn evt_save(&mut self, event: &Event) -> ChannelResult<()> {
        let Some(buffer) = self.event_buffer(event) else {
            return Ok(());
        };
        self.call("on_save", |client, session| client.on_save(session, &buffer))?;
        Ok(())
    }

    /// Tell the client the editor is gone, at most once.
    fn notify_disconnect(&mut self) -> NetbeansResult<()> {
        if std::mem::replace(&mut self.disconnected, true) {
            return Ok(());
        }
        info!(peer_addr = %self.session.peer_addr(), "editor disconnected");
        self.call("on_disconnect", |client, session| client.on_disconnect(session))
    }

    fn shutdown(&mut self) -> ChannelResult<()> {
        self.session.close();
        self.notify_disconnect()?;
        Ok(())
    }

    fn read_frames(&mut self) -> ChannelResult<()> {
        self.session.connection_mut().on_readable()?;
        while let Some(frame) = self.session.connection_mut().take_frame() {
            if self.session.state() == SessionState::Closed {
                break;
            }
            self.handle_frame(&frame)?;
        }
        Ok(())
    }

    /// Common tail of every reactor callback.
    fn finish(&mut self, ctx: &mut Context<'_>, result: ChannelResult<()>) -> ChannelResult<()> {
        if let Some(listener) = self.session.take_terminate_request() {
            ctx.close(listener);
        }
        result?;
        if self.session.is_closed() {
            return self.shutdown();
        }
        self.session.connection_mut().on_writable()?;
        Ok(())
    }
}

impl<C> fmt::Display for Netbeans<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "netbeans {}", self.session.peer_addr())
    }
}

impl<C: NetbeansClient> Channel for Netbeans<C> {
    fn state(&self) -> ConnectionState {
        self.session.connection().state()
    }

    fn source(&mut self) -> &mut dyn Source {
        Channel::source(self.session.connection_mut())
    }

    fn writable(&self) -> bool {
        Channel::writable(self.session.connection())
    }

    fn handle_read(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()> {
        let result = self.read_frames();
        self.finish(ctx, result)
    }

    fn handle_write(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()> {
        let result = self.session.connection_mut().on_writable().map(|_| ());
        self.finish(ctx, result)
    }

    fn handle_tick(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()> {
        self.session.drain_requests();
        let result = self
            .call("on_tick", |client, session| client.on_tick(session))
            .map_err(ReactorError::from);
        self.finish(ctx, result)
    }

    fn handle_close(&mut self, ctx: &mut Context<'_>) -> ChannelResult<()> {
        if let Some(listener) = self.session.take_terminate_request() {
            ctx.close(listener);
        }
        self.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{ErrorKind, Read};
    use std::net::{TcpListener, TcpStream as StdStream};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;
    use vimoir_chat::Encoding;
    use vimoir_reactor::{Connection, ReactorMetrics, TcpStream, Token};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        log: Log,
    }

    impl Recorder {
        fn push(&self, entry: String) -> HandlerResult {
            self.log.borrow_mut().push(entry);
            Ok(())
        }
    }

    impl NetbeansClient for Recorder {
        fn on_startup(&mut self, _session: &mut Session) -> HandlerResult {
            self.push("startup".to_string())
        }

        fn on_disconnect(&mut self, _session: &mut Session) -> HandlerResult {
            self.push("disconnect".to_string())
        }

        fn on_file_opened(&mut self, _session: &mut Session, buffer: &BufferRef) -> HandlerResult {
            self.push(format!("opened {}", buffer.pathname()))
        }

        fn on_killed(&mut self, _session: &mut Session, buffer: &BufferRef) -> HandlerResult {
            self.push(format!("killed {}", buffer.pathname()))
        }

        fn on_version(&mut self, _session: &mut Session, version: &str) -> HandlerResult {
            self.push(format!("version {version}"))
        }

        fn on_button_release(
            &mut self,
            _session: &mut Session,
            buffer: &BufferRef,
            button: u32,
        ) -> HandlerResult {
            self.push(format!("button {button} {buffer}"))
        }

        fn on_cursor_moved(&mut self, _session: &mut Session, buffer: &BufferRef) -> HandlerResult {
            self.push(format!("cursor {}", buffer.offset()))
        }

        fn on_insert(
            &mut self,
            _session: &mut Session,
            buffer: &BufferRef,
            text: &str,
        ) -> HandlerResult {
            self.push(format!("insert {} {text}", buffer.offset()))
        }

        fn on_remove(
            &mut self,
            _session: &mut Session,
            buffer: &BufferRef,
            length: u64,
        ) -> HandlerResult {
            self.push(format!("remove {} {length}", buffer.offset()))
        }

        fn on_error(&mut self, _session: &mut Session, message: &str) -> HandlerResult {
            self.push(format!("error {message}"))
        }

        fn default_command(
            &mut self,
            _session: &mut Session,
            buffer: &BufferRef,
            name: &str,
            args: &str,
        ) -> HandlerResult {
            self.push(format!("default {name} [{args}] {buffer}"))
        }
    }

    fn pair() -> (Connection, StdStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let editor = StdStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, peer_addr) = listener.accept().unwrap();
        stream.set_nonblocking(true).unwrap();
        let conn = Connection::accepted(
            TcpStream::from_std(stream),
            peer_addr,
            Encoding::Utf8,
            Arc::new(ReactorMetrics::new()),
        );
        (conn, editor)
    }

    fn engine(
        config: NetbeansConfig,
        commands: CommandRegistry<Recorder>,
    ) -> (Netbeans<Recorder>, StdStream, Log) {
        let (conn, editor) = pair();
        let log = Log::default();
        let client = Recorder {
            log: Rc::clone(&log),
        };
        let session = Session::new(conn, Token(0));
        let netbeans = Netbeans::new(session, client, Rc::new(commands), Rc::new(config));
        (netbeans, editor, log)
    }

    fn ready(commands: CommandRegistry<Recorder>) -> (Netbeans<Recorder>, StdStream, Log) {
        let (mut netbeans, editor, log) = engine(NetbeansConfig::default(), commands);
        netbeans.handle_frame("AUTH changeme").unwrap();
        netbeans.handle_frame("0:version=0 \"2.5\"").unwrap();
        netbeans.handle_frame("0:startupDone=0").unwrap();
        log.borrow_mut().clear();
        (netbeans, editor, log)
    }

    /// Flush the engine and return what the editor received.
    fn sent(netbeans: &mut Netbeans<Recorder>, editor: &mut StdStream) -> String {
        netbeans.session.connection_mut().on_writable().unwrap();
        editor
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match editor.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break;
                }
                Err(err) => panic!("read failed: {err}"),
            }
        }
        String::from_utf8(out).unwrap()
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_handshake_reaches_ready() {
        let (mut netbeans, _editor, log) = engine(NetbeansConfig::default(), CommandRegistry::new());

        netbeans.handle_frame("AUTH changeme").unwrap();
        assert_eq!(netbeans.session().state(), SessionState::AwaitingStartup);
        netbeans.handle_frame("0:version=0 \"2.5\"").unwrap();
        netbeans.handle_frame("0:startupDone=0").unwrap();

        assert!(netbeans.session().is_ready());
        assert_eq!(entries(&log), vec!["version 2.5", "startup"]);
    }

    #[test]
    fn test_event_before_auth_is_fatal() {
        let (mut netbeans, _editor, log) = engine(NetbeansConfig::default(), CommandRegistry::new());

        let err = netbeans.handle_frame("0:startupDone=0").unwrap_err();

        assert!(err.is_fatal());
        assert!(!netbeans.session().is_ready());
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_event_before_auth_closes_with_close_policy() {
        let config = NetbeansConfig::default().with_handshake_policy(ErrorPolicy::Close);
        let (mut netbeans, _editor, _log) = engine(config, CommandRegistry::new());

        netbeans.handle_frame("0:startupDone=0").unwrap();
        netbeans.handle_frame("AUTH changeme").unwrap();

        assert_eq!(netbeans.session().state(), SessionState::Closed);
    }

    #[test]
    fn test_bad_password_reports_and_closes() {
        let config = NetbeansConfig::default().with_handshake_policy(ErrorPolicy::Close);
        let (mut netbeans, _editor, log) = engine(config, CommandRegistry::new());

        netbeans.handle_frame("AUTH secret").unwrap();

        assert!(netbeans.session().is_closed());
        let log = entries(&log);
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("error "));
    }

    #[test]
    fn test_startup_without_version() {
        let (mut netbeans, _editor, log) = engine(NetbeansConfig::default(), CommandRegistry::new());

        netbeans.handle_frame("AUTH changeme").unwrap();
        netbeans.handle_frame("0:startupDone=0").unwrap();

        assert!(netbeans.session().is_ready());
        assert_eq!(entries(&log), vec!["startup"]);
    }

    #[test]
    fn test_requests_before_ready_are_dropped() {
        let (mut netbeans, mut editor, _log) =
            engine(NetbeansConfig::default(), CommandRegistry::new());

        netbeans.session.send_cmd(None, "raise", "");

        assert_eq!(netbeans.session().seqno(), 0);
        assert_eq!(sent(&mut netbeans, &mut editor), "");
    }

    #[test]
    fn test_file_opened_registers_buffer_once() {
        let (mut netbeans, mut editor, log) = ready(CommandRegistry::new());

        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();

        assert_eq!(
            sent(&mut netbeans, &mut editor),
            "1:putBufferNumber!1 \"/tmp/a.c\"\n1:stopDocumentListen!2\n"
        );
        assert_eq!(entries(&log), vec!["opened /tmp/a.c"]);
        let buffer = netbeans.session().buffer(1).unwrap();
        assert!(buffer.is_registered());

        netbeans
            .handle_frame("1:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();

        assert_eq!(sent(&mut netbeans, &mut editor), "");
        assert_eq!(entries(&log), vec!["opened /tmp/a.c", "opened /tmp/a.c"]);
    }

    #[test]
    fn test_file_opened_without_name() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());

        netbeans.handle_frame("0:fileOpened=0 \"\" T F").unwrap();

        assert_eq!(entries(&log), vec![format!("error {NO_NAME_MESSAGE}")]);
        assert!(netbeans.session().buffers().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_file_opened_relative_path_is_discarded() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());

        netbeans.handle_frame("0:fileOpened=0 \"a.c\" T F").unwrap();

        assert!(entries(&log).is_empty());
        assert!(netbeans.session().buffers().is_empty());
        assert!(logs_contain("is not an absolute path"));
    }

    #[test]
    fn test_buffer_mismatch_policy() {
        let (mut netbeans, mut editor, log) = ready(CommandRegistry::new());

        netbeans
            .handle_frame("5:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();
        assert!(entries(&log).is_empty());
        assert_eq!(sent(&mut netbeans, &mut editor), "");

        let config = NetbeansConfig::default().with_buffer_mismatch_policy(ErrorPolicy::Fatal);
        netbeans.config = Rc::new(config);
        let err = netbeans
            .handle_frame("5:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_killed_unregisters_buffer() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());
        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();

        netbeans.handle_frame("1:killed=2").unwrap();
        netbeans.handle_frame("7:killed=3").unwrap();

        assert_eq!(entries(&log), vec!["opened /tmp/a.c", "killed /tmp/a.c"]);
        assert!(!netbeans.session().buffer(1).unwrap().is_registered());
    }

    #[test]
    fn test_key_at_pos_dispatches_registered_command() {
        let commands = CommandRegistry::new().register(
            "speak",
            |client: &mut Recorder, _session: &mut Session, buffer: &BufferRef, args: &str| {
                client.push(format!("speak [{args}] {buffer} @{}", buffer.offset()))
            },
        );
        let (mut netbeans, _editor, log) = ready(commands);
        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();

        netbeans
            .handle_frame("1:keyAtPos=3 \"speak  hello world \" 20 10/2")
            .unwrap();
        netbeans
            .handle_frame("1:keyAtPos=4 \"shout it\" 21 10/3")
            .unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "opened /tmp/a.c",
                "speak [hello world] a.c:10/2 @20",
                "default shout [it] a.c:10/3",
            ]
        );
    }

    #[test]
    #[traced_test]
    fn test_key_at_pos_ignores_malformed_input() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());
        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();
        log.borrow_mut().clear();

        netbeans.handle_frame("1:keyAtPos=3 \"\" 20 10/2").unwrap();
        netbeans.handle_frame("1:keyAtPos=4 \"run\" 20").unwrap();
        netbeans.handle_frame("1:keyAtPos=5 \"run\" 20 ten/2").unwrap();

        assert!(entries(&log).is_empty());
        assert_eq!(netbeans.session().buffer(1).unwrap().lnum(), 1);
        assert!(logs_contain("empty string in keyAtPos"));
        assert!(logs_contain("invalid arguments"));
    }

    #[test]
    fn test_edit_events_track_offset() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());
        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();
        log.borrow_mut().clear();

        netbeans.handle_frame("1:newDotAndMark=3 12 12").unwrap();
        netbeans.handle_frame("1:insert=4 12 \"abc\"").unwrap();
        netbeans.handle_frame("1:remove=5 14 1").unwrap();
        netbeans.handle_frame("1:buttonRelease=6 1 4 7").unwrap();

        assert_eq!(
            entries(&log),
            vec!["cursor 12", "insert 12 abc", "remove 14 1", "button 1 a.c:4/7"]
        );
    }

    #[test]
    fn test_parse_error_policy() {
        let (mut netbeans, _editor, _log) = ready(CommandRegistry::new());

        let err = netbeans.handle_frame("garbage").unwrap_err();
        assert!(err.is_fatal());

        let config = NetbeansConfig::default().with_parse_error_policy(ErrorPolicy::Ignore);
        netbeans.config = Rc::new(config);
        netbeans.handle_frame("garbage").unwrap();
        assert!(netbeans.session().is_ready());
    }

    #[test]
    fn test_replies_and_unknown_events_are_accepted() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());

        netbeans.handle_frame("3 \"text\"").unwrap();
        netbeans.handle_frame("3 \"text\"").unwrap();
        netbeans.handle_frame("0:geometry=4 80 24 0 0").unwrap();

        assert!(entries(&log).is_empty());
        assert!(netbeans.session().is_ready());
    }

    #[test]
    fn test_handler_error_is_fatal() {
        let commands = CommandRegistry::new().register(
            "boom",
            |_client: &mut Recorder, _session: &mut Session, _buffer: &BufferRef, _args: &str| {
                Err("exploded".into())
            },
        );
        let (mut netbeans, _editor, _log) = ready(commands);
        netbeans
            .handle_frame("0:fileOpened=0 \"/tmp/a.c\" T F")
            .unwrap();

        let err = netbeans.handle_frame("1:keyCommand=3 \"boom\"").unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn test_disconnect_notifies_once() {
        let (mut netbeans, _editor, log) = ready(CommandRegistry::new());

        netbeans.handle_frame("0:disconnect=3").unwrap();
        netbeans.shutdown().unwrap();

        assert!(netbeans.session().is_closed());
        assert_eq!(entries(&log), vec!["disconnect"]);
    }

    #[test]
    fn test_queued_requests_are_sent_on_drain() {
        let (mut netbeans, mut editor, _log) = ready(CommandRegistry::new());
        let sender = netbeans.session().sender();

        sender.send_cmd(0, "raise", "").unwrap();
        sender.send_function(0, "getCursor", "").unwrap();
        netbeans.session.drain_requests();

        assert_eq!(
            sent(&mut netbeans, &mut editor),
            "0:raise!1\n0:getCursor/2\n"
        );
    }
}
