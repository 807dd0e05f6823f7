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

//! Client handler interface

use crate::{BufferRef, Session};
use std::collections::HashMap;
use std::fmt;

/// Boxed error returned by client handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type of client handlers
pub type HandlerResult = Result<(), BoxError>;

/// Behavior plugged into a Netbeans session.
///
/// Every method has a default that does nothing, so a client implements
/// only the events it cares about. Handlers run on the reactor thread and
/// must return quickly; blocking work belongs on another thread, which can
/// reach back into the session through a
/// [`SessionSender`](crate::SessionSender).
///
/// An error returned by any handler is fatal and stops the server.
#[allow(unused_variables)]
pub trait NetbeansClient {
    /// The handshake completed
    fn on_startup(&mut self, session: &mut Session) -> HandlerResult {
        Ok(())
    }

    /// The editor went away; called once per session
    fn on_disconnect(&mut self, session: &mut Session) -> HandlerResult {
        Ok(())
    }

    /// A file was opened in the editor
    fn on_file_opened(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        Ok(())
    }

    /// A buffer was deleted or wiped out
    fn on_killed(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        Ok(())
    }

    /// The editor reported its protocol version
    fn on_version(&mut self, session: &mut Session, version: &str) -> HandlerResult {
        Ok(())
    }

    /// Text under the mouse pointer
    fn on_balloon_text(&mut self, session: &mut Session, text: &str) -> HandlerResult {
        Ok(())
    }

    /// A mouse button was released in a buffer
    fn on_button_release(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        button: u32,
    ) -> HandlerResult {
        Ok(())
    }

    /// A special key was pressed; command dispatch follows
    fn on_key_command(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        name: &str,
    ) -> HandlerResult {
        Ok(())
    }

    /// The cursor moved
    fn on_cursor_moved(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        Ok(())
    }

    /// Text was inserted at the buffer offset
    fn on_insert(&mut self, session: &mut Session, buffer: &BufferRef, text: &str) -> HandlerResult {
        Ok(())
    }

    /// `length` bytes were removed at the buffer offset
    fn on_remove(&mut self, session: &mut Session, buffer: &BufferRef, length: u64) -> HandlerResult {
        Ok(())
    }

    /// The buffer was saved
    fn on_save(&mut self, session: &mut Session, buffer: &BufferRef) -> HandlerResult {
        Ok(())
    }

    /// Periodic timer
    fn on_tick(&mut self, session: &mut Session) -> HandlerResult {
        Ok(())
    }

    /// A condition the user should know about
    fn on_error(&mut self, session: &mut Session, message: &str) -> HandlerResult {
        Ok(())
    }

    /// A command with no registered handler
    fn default_command(
        &mut self,
        session: &mut Session,
        buffer: &BufferRef,
        name: &str,
        args: &str,
    ) -> HandlerResult {
        Ok(())
    }
}

/// Handler of one `:nbkey` command: `(client, session, buffer, args)`.
pub type CommandFn<C> = Box<dyn Fn(&mut C, &mut Session, &BufferRef, &str) -> HandlerResult>;

/// Commands of a client, keyed by the first word of the `:nbkey` argument.
///
/// # Example
///
/// ```
/// use vimoir_netbeans::{CommandRegistry, NetbeansClient};
///
/// struct Echo;
/// impl NetbeansClient for Echo {}
///
/// let commands = CommandRegistry::new().register("echo", |_client: &mut Echo, session, _buffer, args| {
///     let text = session.quote(args);
///     session.send_cmd(None, "showBalloon", &text);
///     Ok(())
/// });
/// assert!(commands.contains("echo"));
/// ```
pub struct CommandRegistry<C> {
    commands: HashMap<String, CommandFn<C>>,
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }
}

impl<C> CommandRegistry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler of command `name`, replacing any previous one
    pub fn register<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut C, &mut Session, &BufferRef, &str) -> HandlerResult + 'static,
    {
        self.commands.insert(name.into(), Box::new(handler));
        self
    }

    /// Handler of command `name`
    pub fn get(&self, name: &str) -> Option<&CommandFn<C>> {
        self.commands.get(name)
    }

    /// Whether command `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no command is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<C> fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}
