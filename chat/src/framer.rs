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

//! Chat framing over a non-blocking byte stream

use crate::{ChatCodec, ChatFrame, ChatResult, Encoding, OutboundQueue};
use bytes::BytesMut;
use std::io::{self, ErrorKind, Read, Write};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// Size of the input chunk and of the output buffer.
pub const BUFFER_SIZE: usize = 4096;

/// Receiver of framed input.
pub trait ChatSink {
    /// Decoded text that belongs to the current frame
    fn collect_incoming_data(&mut self, data: &str);
    /// The terminator has been seen; the current frame is complete
    fn found_terminator(&mut self);
}

/// Outcome of draining a readable stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The stream would block; more data may come later
    Open,
    /// The peer closed its side of the stream
    Closed,
}

/// Chat framer: splits inbound bytes into frames and buffers outbound text.
#[derive(Debug)]
pub struct Framer {
    codec: ChatCodec,
    inbound: BytesMut,
    outbound: OutboundQueue,
}

impl Framer {
    /// Create a framer using the given encoding and no terminator
    pub fn new(encoding: Encoding) -> Self {
        Self {
            codec: ChatCodec::new(encoding),
            inbound: BytesMut::with_capacity(BUFFER_SIZE),
            outbound: OutboundQueue::new(BUFFER_SIZE),
        }
    }

    /// Set the frame terminator. `None` or an empty string disables framing.
    pub fn set_terminator(&mut self, terminator: Option<&str>) {
        self.codec.set_terminator(terminator);
    }

    /// Current terminator bytes
    pub fn terminator(&self) -> Option<&[u8]> {
        self.codec.terminator()
    }

    /// Encoding of this framer
    pub fn encoding(&self) -> Encoding {
        self.codec.encoding()
    }

    /// Encode `text` and queue it for sending.
    pub fn send(&mut self, text: &str) -> ChatResult<()> {
        let mut fragment = BytesMut::with_capacity(text.len());
        self.codec.encode(text, &mut fragment)?;
        trace!(len = fragment.len(), "queued outbound fragment");
        self.outbound.push(fragment.freeze());
        Ok(())
    }

    /// True while outbound data is queued or buffered
    pub fn has_pending_output(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Drop all pending outbound data
    pub fn discard_output(&mut self) {
        self.outbound.clear();
    }

    /// Deliver every complete frame unit currently buffered to `sink`.
    fn dispatch<S: ChatSink>(&mut self, sink: &mut S) -> ChatResult<()> {
        while let Some(frame) = self.codec.decode(&mut self.inbound)? {
            match frame {
                ChatFrame::Data(text) => sink.collect_incoming_data(&text),
                ChatFrame::Terminator => sink.found_terminator(),
            }
        }
        Ok(())
    }

    /// Read from `reader` until it would block, feeding frames to `sink`.
    ///
    /// Returns the number of bytes read and whether the peer closed the stream.
    pub fn on_readable<R: Read, S: ChatSink>(
        &mut self,
        reader: &mut R,
        sink: &mut S,
    ) -> ChatResult<(usize, ReadStatus)> {
        let mut chunk = [0u8; BUFFER_SIZE];
        let mut total = 0;
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    self.dispatch(sink)?;
                    if !self.inbound.is_empty() {
                        debug!(len = self.inbound.len(), "discarding undecodable tail");
                        self.inbound.clear();
                    }
                    return Ok((total, ReadStatus::Closed));
                }
                Ok(n) => {
                    total += n;
                    self.inbound.extend_from_slice(&chunk[..n]);
                    self.dispatch(sink)?;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok((total, ReadStatus::Open)),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Flush pending output to `writer` until done or it would block.
    pub fn on_writable<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        self.outbound.write_to(writer)
    }
}
