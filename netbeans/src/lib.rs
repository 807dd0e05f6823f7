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

//! # Vimoir Netbeans
//!
//! A server side implementation of the Vim Netbeans protocol. Vim connects
//! with `:nbstart` and the server drives it through a [`NetbeansClient`].
//!
//! ## Core Components
//!
//! ### [`NetbeansServer`]
//!
//! Binds a listener on a [`vimoir_reactor::Reactor`] and builds a
//! [`Netbeans`] engine for every editor that connects.
//!
//! ### [`Netbeans`]
//!
//! The protocol engine of one connection. It checks the password of the
//! `AUTH` message, waits for `startupDone`, then parses every line and
//! dispatches events to the client. `:nbkey` commands are routed through a
//! [`CommandRegistry`] with [`NetbeansClient::default_command`] as fallback.
//!
//! ### [`Session`]
//!
//! The facade handed to client handlers. It sends commands and function
//! calls with increasing sequence numbers, tracks the editor's
//! [`NetbeansBuffer`]s and can stop the server.
//!
//! ## Usage Example
//!
//! ```no_run
//! use vimoir_netbeans::{
//!     BufferRef, CommandRegistry, HandlerResult, NetbeansClient, NetbeansConfig,
//!     NetbeansServer, Session,
//! };
//!
//! struct Greeter;
//!
//! impl NetbeansClient for Greeter {
//!     fn on_startup(&mut self, session: &mut Session) -> HandlerResult {
//!         let text = session.quote("hello");
//!         session.send_cmd(None, "showBalloon", &text);
//!         Ok(())
//!     }
//! }
//!
//! let commands = CommandRegistry::new().register(
//!     "quit",
//!     |_: &mut Greeter, session: &mut Session, _: &BufferRef, _: &str| {
//!         session.terminate_server();
//!         Ok(())
//!     },
//! );
//! let server = NetbeansServer::bind(NetbeansConfig::default(), commands, || Greeter)?;
//! server.run()?;
//! # Ok::<(), vimoir_netbeans::NetbeansError>(())
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod buffer;
mod client;
mod config;
mod engine;
mod error;
mod message;
mod quote;
mod server;
mod session;

pub use self::buffer::{BufferRef, BufferSet, NetbeansBuffer};
pub use self::client::{BoxError, CommandFn, CommandRegistry, HandlerResult, NetbeansClient};
pub use self::config::{ENV_PREFIX, ErrorPolicy, NetbeansConfig};
pub use self::engine::Netbeans;
pub use self::error::{NetbeansError, NetbeansResult};
pub use self::message::{Event, Message, Reply, parse, parse_auth, parse_lnum_col};
pub use self::quote::{quote, split_quoted_string, unescape, unquote};
pub use self::server::NetbeansServer;
pub use self::session::{Request, RequestKind, SessionSender, SessionState, Session};
