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

//! Connection lifecycle states

use std::fmt;

/// Lifecycle stage of a socket registered with the reactor.
///
/// The readiness predicates consulted before every poll are pure functions
/// of this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet bound to a socket
    #[default]
    None,
    /// Listening socket waiting for peers
    Accepting,
    /// Outgoing connection in progress
    Connecting,
    /// Established stream
    Connected,
    /// Closed or closing; terminal
    Closing,
}

impl ConnectionState {
    /// Incoming data may be read
    pub fn is_readable(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Outgoing data may be written
    pub fn is_writable(self) -> bool {
        self == ConnectionState::Connected
    }

    /// New peers may be accepted
    pub fn is_acceptable(self) -> bool {
        self == ConnectionState::Accepting
    }

    /// A pending connect may complete
    pub fn is_connectable(self) -> bool {
        self == ConnectionState::Connecting
    }

    /// The channel has reached its terminal state
    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closing
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `None` may become any of the open states, `Connecting` may complete to
    /// `Connected`, and every state may move to `Closing`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::{Accepting, Closing, Connected, Connecting, None};
        match (self, next) {
            (_, Closing) => true,
            (None, Accepting | Connecting | Connected) => true,
            (Connecting, Connected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::None => "none",
            ConnectionState::Accepting => "accepting",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Connected.is_readable());
        assert!(ConnectionState::Connected.is_writable());
        assert!(!ConnectionState::Connected.is_acceptable());
        assert!(ConnectionState::Accepting.is_acceptable());
        assert!(!ConnectionState::Accepting.is_readable());
        assert!(ConnectionState::Connecting.is_connectable());
        assert!(!ConnectionState::Connecting.is_writable());
        assert!(ConnectionState::Closing.is_closed());
        assert!(!ConnectionState::None.is_readable());
    }

    #[test]
    fn test_transitions() {
        use ConnectionState::*;
        assert!(None.can_transition_to(Accepting));
        assert!(None.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closing));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Closing.can_transition_to(Connected));
        assert!(!Accepting.can_transition_to(Connected));
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Accepting.to_string(), "accepting");
        assert_eq!(ConnectionState::default().to_string(), "none");
    }
}
