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

//! Error types for the reactor

use thiserror::Error;
use vimoir_chat::ChatError;

/// Result type for reactor operations
pub type ReactorResult<T> = Result<T, ReactorError>;

/// Result type returned by channel handlers
pub type ChannelResult<T> = Result<T, ReactorError>;

/// Reactor error types
///
/// A handler returning any error other than [`ReactorError::Fatal`] closes
/// only the channel it was invoked on. A fatal error stops the reactor and is
/// returned from [`Reactor::run`](crate::Reactor::run).
#[derive(Debug, Error)]
pub enum ReactorError {
    /// I/O error from a socket or the poll handle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error from the chat layer
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Unrecoverable condition raised by a channel handler
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Operation on a channel that has already been closed
    #[error("Channel closed")]
    Closed,

    /// Invalid reactor configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReactorError {
    /// Build a fatal error from a message
    pub fn fatal(message: impl Into<String>) -> Self {
        ReactorError::Fatal(message.into())
    }

    /// Check if the error must stop the reactor
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReactorError::Fatal(_))
    }

    /// Check if the error came from the transport
    pub fn is_transport(&self) -> bool {
        match self {
            ReactorError::Io(_) | ReactorError::Closed => true,
            ReactorError::Chat(err) => err.is_transport(),
            _ => false,
        }
    }
}
