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

//! Terminator scanning codec

use crate::{ChatError, ChatResult, Encoding};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// A unit produced by the [`ChatCodec`] decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFrame {
    /// Decoded text that is not (yet) followed by a terminator
    Data(String),
    /// The terminator was found; all data since the previous terminator forms a frame
    Terminator,
}

/// Codec splitting a byte stream on a configurable terminator.
///
/// Decoding yields [`ChatFrame::Data`] for every non-empty run of text and
/// [`ChatFrame::Terminator`] for every terminator found. Without a terminator
/// every decodable chunk is delivered as data. Bytes that may still turn into
/// a terminator or a complete character are kept in the source buffer until
/// more input arrives, so the frame sequence does not depend on how the
/// stream was split into reads.
#[derive(Debug, Clone)]
pub struct ChatCodec {
    encoding: Encoding,
    terminator: Option<Vec<u8>>,
    pending_terminator: bool,
}

impl ChatCodec {
    /// Create a codec with no terminator
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            terminator: None,
            pending_terminator: false,
        }
    }

    /// Builder style terminator setup
    pub fn with_terminator(mut self, terminator: &str) -> Self {
        self.set_terminator(Some(terminator));
        self
    }

    /// Configure the frame delimiter. `None` or an empty string disables framing.
    pub fn set_terminator(&mut self, terminator: Option<&str>) {
        self.terminator = terminator
            .filter(|t| !t.is_empty())
            .map(|t| t.as_bytes().to_vec());
    }

    /// The configured terminator bytes
    pub fn terminator(&self) -> Option<&[u8]> {
        self.terminator.as_deref()
    }

    /// The encoding used by this codec
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn decode_partial(&self, src: &mut BytesMut, keep: usize) -> ChatResult<Option<ChatFrame>> {
        let available = src.len().saturating_sub(keep);
        let (text, consumed) = self.encoding.decode_prefix(&src[..available])?;
        if consumed == 0 {
            return Ok(None);
        }
        src.advance(consumed);
        trace!(len = consumed, "partial chat data");
        Ok(Some(ChatFrame::Data(text)))
    }
}

impl Default for ChatCodec {
    fn default() -> Self {
        Self::new(Encoding::default()).with_terminator("\n")
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Length of the longest proper prefix of `needle` that ends `haystack`.
fn partial_suffix(haystack: &[u8], needle: &[u8]) -> usize {
    let longest = needle.len().saturating_sub(1).min(haystack.len());
    (1..=longest)
        .rev()
        .find(|&n| haystack[haystack.len() - n..] == needle[..n])
        .unwrap_or(0)
}

impl Decoder for ChatCodec {
    type Item = ChatFrame;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ChatFrame>, ChatError> {
        if self.pending_terminator {
            self.pending_terminator = false;
            return Ok(Some(ChatFrame::Terminator));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let Some(terminator) = self.terminator.as_deref() else {
            return self.decode_partial(src, 0);
        };

        match find(&src[..], terminator) {
            Some(index) => {
                let termlen = terminator.len();
                let segment = src.split_to(index);
                src.advance(termlen);
                // An empty segment before a terminator is not reported.
                if segment.is_empty() {
                    return Ok(Some(ChatFrame::Terminator));
                }
                let text = self.encoding.decode(&segment)?;
                self.pending_terminator = true;
                Ok(Some(ChatFrame::Data(text)))
            }
            None => {
                let keep = partial_suffix(&src[..], terminator);
                self.decode_partial(src, keep)
            }
        }
    }
}

impl Encoder<&str> for ChatCodec {
    type Error = ChatError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), ChatError> {
        self.encoding.encode(item, dst)
    }
}

impl Encoder<String> for ChatCodec {
    type Error = ChatError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), ChatError> {
        self.encoding.encode(&item, dst)
    }
}
