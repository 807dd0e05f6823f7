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

//! Error types for chat framing

use crate::Encoding;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors raised while framing or serializing a chat stream.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// An I/O error occurred on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Received bytes are not valid in the connection encoding
    #[error("invalid {encoding} byte sequence at offset {offset}")]
    Decode {
        /// Encoding in use on the connection
        encoding: Encoding,
        /// Offset of the first invalid byte within the decoded segment
        offset: usize,
    },

    /// An outgoing character has no representation in the connection encoding
    #[error("character {character:?} cannot be encoded as {encoding}")]
    Unmappable {
        /// Encoding in use on the connection
        encoding: Encoding,
        /// The offending character
        character: char,
    },

    /// The encoding name is not supported
    #[error("unsupported encoding: {0}")]
    UnknownEncoding(String),
}

impl ChatError {
    /// Check if the error came from the transport rather than the data
    pub fn is_transport(&self) -> bool {
        matches!(self, ChatError::Io(_))
    }
}
