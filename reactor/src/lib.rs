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

//! # Vimoir Reactor
//!
//! A single-threaded, readiness-driven connection multiplexer built on
//! `mio`.
//!
//! ## Core Components
//!
//! ### [`Reactor`]
//!
//! Owns the poll instance and every registered [`Channel`]. Each iteration
//! derives the interest of every channel from its readiness predicates,
//! waits for events with a bounded timeout, dispatches read, write, accept
//! and connect handlers in that order, and periodically runs a timer sweep.
//!
//! ### [`Connection`]
//!
//! A TCP stream driven through a [`vimoir_chat::Framer`], exposing an
//! accumulator of framed input and a bounded outbound queue.
//!
//! ### [`Listener`]
//!
//! A listening socket that hands every accepted peer to a
//! [`SessionFactory`] and registers the resulting channel, optionally
//! allowing only one session at a time.
//!
//! ## Errors
//!
//! Handlers return [`ChannelResult`]. Any error other than
//! [`ReactorError::Fatal`] closes only the channel that raised it; a fatal
//! error stops the reactor and is returned from [`Reactor::run`].

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

mod channel;
mod config;
mod connection;
mod error;
mod listener;
mod metrics;
mod reactor;
mod state;

pub use self::channel::{Channel, Context};
pub use self::config::ReactorConfig;
pub use self::connection::Connection;
pub use self::error::{ChannelResult, ReactorError, ReactorResult};
pub use self::listener::{Listener, SessionFactory};
pub use self::metrics::{MetricsSnapshot, ReactorMetrics};
pub use self::reactor::Reactor;
pub use self::state::ConnectionState;
pub use mio::Token;
pub use mio::event::Source;
pub use mio::net::{TcpListener, TcpStream};
