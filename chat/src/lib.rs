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

//! # Vimoir Chat Framing
//!
//! Terminator-driven framing for line oriented protocols spoken over
//! non-blocking sockets.
//!
//! ## Core Components
//!
//! ### [`ChatCodec`]
//!
//! A `tokio_util::codec` [`Decoder`](tokio_util::codec::Decoder) and
//! [`Encoder`](tokio_util::codec::Encoder) that splits a byte stream on a
//! configurable terminator and converts between bytes and text in one of the
//! supported [`Encoding`]s. Decoding yields [`ChatFrame::Data`] for text and
//! [`ChatFrame::Terminator`] whenever a frame is complete.
//!
//! ### [`Framer`]
//!
//! Drives a codec over a readable/writable stream: reads in fixed size
//! chunks until the stream would block and delivers the frames to a
//! [`ChatSink`], and drains an [`OutboundQueue`] of encoded fragments.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::io::Cursor;
//! use vimoir_chat::{ChatSink, Encoding, Framer, ReadStatus};
//!
//! #[derive(Default)]
//! struct Lines(String, Vec<String>);
//!
//! impl ChatSink for Lines {
//!     fn collect_incoming_data(&mut self, data: &str) {
//!         self.0.push_str(data);
//!     }
//!     fn found_terminator(&mut self) {
//!         self.1.push(std::mem::take(&mut self.0));
//!     }
//! }
//!
//! let mut framer = Framer::new(Encoding::Utf8);
//! framer.set_terminator(Some("\n"));
//! let mut lines = Lines::default();
//! let mut input = Cursor::new(b"AUTH changeme\n".to_vec());
//! let (_, status) = framer.on_readable(&mut input, &mut lines).unwrap();
//! assert_eq!(status, ReadStatus::Closed);
//! assert_eq!(lines.1, vec!["AUTH changeme"]);
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

mod codec;
mod encoding;
mod framer;
mod outbound;
mod result;

pub use self::codec::{ChatCodec, ChatFrame};
pub use self::encoding::Encoding;
pub use self::framer::{BUFFER_SIZE, ChatSink, Framer, ReadStatus};
pub use self::outbound::OutboundQueue;
pub use self::result::{ChatError, ChatResult};
