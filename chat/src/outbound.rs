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

//! Bounded outbound buffering

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Write};

/// Queue of encoded fragments drained through a fixed-size output buffer.
///
/// Fragments wait in the queue until they fit in the remaining capacity of
/// the output buffer; the buffer itself never holds more than `capacity`
/// bytes. A fragment larger than the whole buffer is streamed through it in
/// capacity-sized slices once the buffer has been emptied.
#[derive(Debug)]
pub struct OutboundQueue {
    fragments: VecDeque<Bytes>,
    buffer: BytesMut,
    capacity: usize,
}

impl OutboundQueue {
    /// Create a queue backed by an output buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            fragments: VecDeque::new(),
            buffer: BytesMut::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append an encoded fragment to the queue
    pub fn push(&mut self, fragment: Bytes) {
        if !fragment.is_empty() {
            self.fragments.push_back(fragment);
        }
    }

    /// Move queued fragments into the output buffer.
    ///
    /// Returns `true` when every queued fragment has been admitted, `false`
    /// when some fragment must wait for the buffer to drain.
    pub fn refill(&mut self) -> bool {
        while let Some(fragment) = self.fragments.front_mut() {
            let room = self.capacity - self.buffer.len();
            if fragment.len() <= room {
                self.buffer.extend_from_slice(fragment);
                self.fragments.pop_front();
            } else if self.buffer.is_empty() {
                let slice = fragment.split_to(self.capacity);
                self.buffer.extend_from_slice(&slice);
                return false;
            } else {
                return false;
            }
        }
        true
    }

    /// Write as much buffered data as `writer` accepts.
    ///
    /// Stops when everything has been written or the writer would block, and
    /// returns the number of bytes written.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        let mut written = 0;
        loop {
            self.refill();
            if self.buffer.is_empty() {
                break;
            }
            match writer.write(&self.buffer) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => {
                    self.buffer.advance(n);
                    written += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    /// True when nothing is queued or buffered
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.buffer.is_empty()
    }

    /// Number of bytes in the output buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of fragments still waiting in the queue
    pub fn queued(&self) -> usize {
        self.fragments.len()
    }

    /// Capacity of the output buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything pending
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer accepting at most `limit` bytes per call, then blocking.
    struct Throttled {
        data: Vec<u8>,
        limit: usize,
        calls: usize,
        max_calls: usize,
    }

    impl Write for Throttled {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.calls == self.max_calls {
                return Err(ErrorKind::WouldBlock.into());
            }
            self.calls += 1;
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fragment_waits_for_room() {
        let mut queue = OutboundQueue::new(8);
        queue.push(Bytes::from_static(b"12345"));
        queue.push(Bytes::from_static(b"6789"));
        assert!(!queue.refill());
        assert_eq!(queue.buffered(), 5);
        assert_eq!(queue.queued(), 1);
    }

    #[test]
    fn test_oversized_fragment_is_sliced() {
        let mut queue = OutboundQueue::new(4);
        queue.push(Bytes::from_static(b"abcdefghij"));
        assert!(!queue.refill());
        assert_eq!(queue.buffered(), 4);

        let mut out = Vec::new();
        queue.write_to(&mut out).unwrap();
        assert_eq!(out, b"abcdefghij");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_partial_write_keeps_remainder() {
        let mut queue = OutboundQueue::new(16);
        queue.push(Bytes::from_static(b"0:version=0\n"));
        let mut writer = Throttled {
            data: Vec::new(),
            limit: 5,
            calls: 0,
            max_calls: 1,
        };
        assert_eq!(queue.write_to(&mut writer).unwrap(), 5);
        assert_eq!(writer.data, b"0:ver");
        assert_eq!(queue.buffered(), 7);

        writer.max_calls = usize::MAX;
        queue.write_to(&mut writer).unwrap();
        assert_eq!(writer.data, b"0:version=0\n");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let mut queue = OutboundQueue::new(6);
        for part in ["ab", "cdef", "g", "hijklmn"] {
            queue.push(Bytes::copy_from_slice(part.as_bytes()));
        }
        let mut out = Vec::new();
        queue.write_to(&mut out).unwrap();
        assert_eq!(out, b"abcdefghijklmn");
    }
}
