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

//! Character encodings supported on a chat connection

use crate::{ChatError, ChatResult};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Character encoding used to turn wire bytes into text and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// UTF-8, the default
    #[default]
    Utf8,
    /// 7-bit US-ASCII
    Ascii,
    /// ISO-8859-1, one byte per character
    Latin1,
}

impl Encoding {
    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Ascii => "US-ASCII",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode a complete segment.
    ///
    /// Fails when the segment holds an invalid or truncated sequence.
    pub fn decode(&self, bytes: &[u8]) -> ChatResult<String> {
        let (text, consumed) = self.decode_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(ChatError::Decode {
                encoding: *self,
                offset: consumed,
            });
        }
        Ok(text)
    }

    /// Decode the longest prefix of `bytes` that forms complete characters.
    ///
    /// Returns the decoded text and the number of bytes consumed. A truncated
    /// multi-byte sequence at the end of `bytes` is left unconsumed so that it
    /// can be completed by the next read.
    pub fn decode_prefix(&self, bytes: &[u8]) -> ChatResult<(String, usize)> {
        match self {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(text) => Ok((text.to_owned(), bytes.len())),
                Err(err) if err.error_len().is_none() => {
                    let valid = err.valid_up_to();
                    // The prefix was just validated.
                    let text = String::from_utf8_lossy(&bytes[..valid]).into_owned();
                    Ok((text, valid))
                }
                Err(err) => Err(ChatError::Decode {
                    encoding: *self,
                    offset: err.valid_up_to(),
                }),
            },
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(ChatError::Decode {
                    encoding: *self,
                    offset,
                }),
                None => Ok((bytes.iter().map(|&b| b as char).collect(), bytes.len())),
            },
            Encoding::Latin1 => Ok((bytes.iter().map(|&b| b as char).collect(), bytes.len())),
        }
    }

    /// Append the encoded form of `text` to `dst`.
    pub fn encode(&self, text: &str, dst: &mut BytesMut) -> ChatResult<()> {
        match self {
            Encoding::Utf8 => {
                dst.reserve(text.len());
                dst.put_slice(text.as_bytes());
            }
            Encoding::Ascii | Encoding::Latin1 => {
                let limit = if *self == Encoding::Ascii { 0x7F } else { 0xFF };
                dst.reserve(text.len());
                for character in text.chars() {
                    if character as u32 > limit {
                        return Err(ChatError::Unmappable {
                            encoding: *self,
                            character,
                        });
                    }
                    dst.put_u8(character as u8);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = ChatError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Ok(Encoding::Utf8),
            "US-ASCII" | "ASCII" => Ok(Encoding::Ascii),
            "ISO-8859-1" | "LATIN1" | "LATIN-1" => Ok(Encoding::Latin1),
            _ => Err(ChatError::UnknownEncoding(name.to_string())),
        }
    }
}
