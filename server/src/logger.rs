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

//! Client handler logging every editor event

use tracing::{debug, info, warn};
use vimoir_netbeans::{BufferRef, CommandRegistry, HandlerResult, NetbeansClient, Session};

/// Logs every event and answers `:nbkey echo <text>` with a balloon.
#[derive(Debug, Default)]
pub struct LogClient {
    events: u64,
}

impl LogClient {
    /// Commands understood by the client
    pub fn commands() -> CommandRegistry<Self> {
        CommandRegistry::new().register("echo", Self::echo)
    }

    fn echo(&mut self, session: &mut Session, buffer: &BufferRef, args: &str) -> HandlerResult {
        let text = session.quote(args);
        session.send_cmd(Some(buffer), "showBalloon", &text);
        Ok(())
    }

    fn count(&mut self) -> HandlerResult {
        self.events += 1;
        Ok(())
    }
}

impl NetbeansClient for LogClient {
    fn on_startup(&mut self, session: &mut Session) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), "editor ready");
        self.count()
    }

    fn on_disconnect(&mut self, session: &mut Session) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), events = self.events, "editor gone");
        self.count()
    }

    fn on_file_opened(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), pathname = buffer.pathname(), buf_id = buffer.buf_id(), "file opened");
        self.count()
    }

    fn on_killed(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), pathname = buffer.pathname(), "buffer killed");
        self.count()
    }

    fn on_version(&mut self, session: &mut Session, version: &str) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), version, "editor version");
        self.count()
    }

    fn on_balloon_text(&mut self, session: &mut Session, text: &str) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), text, "balloon text");
        self.count()
    }

    fn on_button_release(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        button: u32,
    ) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), button, buffer = %buffer, "button released");
        self.count()
    }

    fn on_key_command(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        name: &str,
    ) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), key = name, buffer = %buffer, "key command");
        self.count()
    }

    fn on_cursor_moved(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        debug!(peer_addr = %session.peer_addr(), offset = buffer.offset(), buffer = %buffer, "cursor moved");
        self.count()
    }

    fn on_insert(&mut self, session: &mut Session, buffer: &BufferRef, text: &str) -> HandlerResult {
        debug!(peer_addr = %session.peer_addr(), offset = buffer.offset(), text, buffer = %buffer, "text inserted");
        self.count()
    }

    fn on_remove(&mut self, session: &mut Session, buffer: &BufferRef, length: u64) -> HandlerResult {
        debug!(peer_addr = %session.peer_addr(), offset = buffer.offset(), length, buffer = %buffer, "text removed");
        self.count()
    }

    fn on_save(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), pathname = buffer.pathname(), "buffer saved");
        self.count()
    }

    fn on_error(&mut self, session: &mut Session, message: &str) -> HandlerResult {
        warn!(peer_addr = %session.peer_addr(), message, "editor error");
        self.count()
    }

    fn default_command(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        name: &str,
        args: &str,
    ) -> HandlerResult {
        info!(peer_addr = %session.peer_addr(), command = name, args, buffer = %buffer, "unknown command");
        self.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        let commands = LogClient::commands();
        assert!(commands.contains("echo"));
        assert!(!commands.contains("quit"));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_events_are_counted() {
        let mut client = LogClient::default();
        assert_eq!(client.events, 0);
        client.count().unwrap();
        client.count().unwrap();
        assert_eq!(client.events, 2);
    }
}
