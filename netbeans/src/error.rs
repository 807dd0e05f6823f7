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

//! Error types for the Netbeans engine

use thiserror::Error;
use vimoir_reactor::ReactorError;

/// Result type for Netbeans operations
pub type NetbeansResult<T> = Result<T, NetbeansError>;

/// Netbeans engine error types
#[derive(Debug, Error)]
pub enum NetbeansError {
    /// A buffer was requested for a relative pathname
    #[error("'{0}' is not an absolute path")]
    InvalidPathname(String),

    /// The editor authenticated with the wrong password
    #[error("invalid password: \"{0}\"")]
    BadPassword(String),

    /// A message arrived that the handshake does not allow
    #[error("received unexpected message: \"{0}\"")]
    Handshake(String),

    /// A frame matches neither the event nor the reply grammar
    #[error("invalid netbeans message: \"{0}\"")]
    Parse(String),

    /// A client handler returned an error
    #[error("{handler} failed: {message}")]
    Handler {
        /// Handler that failed
        handler: String,
        /// Error reported by the handler
        message: String,
    },

    /// `fileOpened` named a buffer number other than the one assigned
    #[error("got fileOpened with wrong bufId {announced} for \"{pathname}\", expected {expected}")]
    BufferMismatch {
        /// Pathname of the buffer
        pathname: String,
        /// Buffer number sent by the editor
        announced: u32,
        /// Buffer number assigned by this session
        expected: u32,
    },

    /// Every buffer number has been handed out
    #[error("buffer numbers exhausted")]
    BufferLimit,

    /// The session behind a [`SessionSender`](crate::SessionSender) is gone
    #[error("session closed")]
    SessionClosed,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// I/O error while setting up the server
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reactor stopped with an error
    #[error("reactor error: {0}")]
    Reactor(#[from] ReactorError),
}

impl NetbeansError {
    /// Check if the error is a protocol violation by the editor
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            NetbeansError::BadPassword(_)
                | NetbeansError::Handshake(_)
                | NetbeansError::Parse(_)
                | NetbeansError::BufferMismatch { .. }
        )
    }
}

impl From<NetbeansError> for ReactorError {
    fn from(err: NetbeansError) -> Self {
        match err {
            NetbeansError::Reactor(err) => err,
            NetbeansError::Io(err) => ReactorError::Io(err),
            other => ReactorError::fatal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NetbeansError::InvalidPathname("foo/bar.c".to_string());
        assert_eq!(err.to_string(), "'foo/bar.c' is not an absolute path");

        let err = NetbeansError::BufferMismatch {
            pathname: "/tmp/a.c".to_string(),
            announced: 3,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "got fileOpened with wrong bufId 3 for \"/tmp/a.c\", expected 1"
        );
    }

    #[test]
    fn test_into_reactor_error() {
        let err: ReactorError = NetbeansError::Parse("garbage".to_string()).into();
        assert!(err.is_fatal());

        let err: ReactorError = NetbeansError::Reactor(ReactorError::Closed).into();
        assert!(matches!(err, ReactorError::Closed));
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(NetbeansError::Handshake("x".to_string()).is_protocol_error());
        assert!(!NetbeansError::SessionClosed.is_protocol_error());

        let err: ReactorError = NetbeansError::BufferLimit.into();
        assert!(err.is_fatal());
    }
}
