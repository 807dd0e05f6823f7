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

//! Netbeans message grammar
//!
//! ```text
//! event:  <bufId>:<name>=<seqno> [<args>]
//! reply:  <seqno> [<args>]
//! auth:   AUTH <password>
//! ```
//!
//! The arguments may start with a netbeans string, a double quoted run
//! ending at the last double quote; the remaining text is split on
//! whitespace.

use crate::quote::unescape;
use crate::{NetbeansError, NetbeansResult};

/// An event sent by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Buffer number, `0` when the event concerns no buffer
    pub buf_id: u32,
    /// Event name
    pub name: String,
    /// Sequence number
    pub seqno: u32,
    /// Netbeans string argument, empty when absent
    pub nbstring: String,
    /// Remaining whitespace separated arguments
    pub args: Vec<String>,
}

/// A reply to a function request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence number of the request
    pub seqno: u32,
    /// Netbeans string argument, empty when absent
    pub nbstring: String,
    /// Remaining whitespace separated arguments
    pub args: Vec<String>,
}

/// A parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// An event
    Event(Event),
    /// A function reply
    Reply(Reply),
}

/// Events whose string payload has already been escaped once by the editor.
fn is_raw_string_event(name: &str) -> bool {
    matches!(name, "keyAtPos" | "keyCommand" | "insert")
}

/// Split a leading run of ASCII digits off `text`.
fn split_digits(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    (end > 0).then(|| text.split_at(end))
}

fn parse_number(digits: &str, frame: &str) -> NetbeansResult<u32> {
    digits
        .parse()
        .map_err(|_| NetbeansError::Parse(frame.to_string()))
}

/// Parse the password of an `AUTH` message.
pub fn parse_auth(frame: &str) -> Option<&str> {
    let password = frame.trim().strip_prefix("AUTH")?.trim_start();
    (!password.is_empty() && !password.contains(char::is_whitespace)).then_some(password)
}

/// Parse one frame, stripped of its terminator.
pub fn parse(frame: &str) -> NetbeansResult<Message> {
    if let Some(event) = parse_event(frame)? {
        return Ok(Message::Event(event));
    }

    let (digits, rest) =
        split_digits(frame.trim_start()).ok_or_else(|| NetbeansError::Parse(frame.to_string()))?;
    let seqno = parse_number(digits, frame)?;
    let (nbstring, args) = split_args(rest.trim(), false);
    Ok(Message::Reply(Reply {
        seqno,
        nbstring,
        args,
    }))
}

fn parse_event(frame: &str) -> NetbeansResult<Option<Event>> {
    let text = frame.trim_start();
    let Some((buf_digits, rest)) = split_digits(text) else {
        return Ok(None);
    };
    let Some(rest) = rest.strip_prefix(':') else {
        return Ok(None);
    };

    // The name extends to the last '=' of the first word that is followed
    // by a sequence number.
    let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let word = &rest[..word_end];
    let Some((name, seqno_digits, tail)) = word
        .match_indices('=')
        .rev()
        .filter(|(index, _)| *index > 0)
        .find_map(|(index, _)| {
            split_digits(&rest[index + 1..]).map(|(digits, tail)| (&rest[..index], digits, tail))
        })
    else {
        return Ok(None);
    };

    let buf_id = parse_number(buf_digits, frame)?;
    let seqno = parse_number(seqno_digits, frame)?;
    let raw = is_raw_string_event(name);
    let (nbstring, args) = if name == "insert" {
        split_insert_args(tail.trim())
    } else {
        split_args(tail.trim(), raw)
    };

    Ok(Some(Event {
        buf_id,
        name: name.to_string(),
        seqno,
        nbstring,
        args,
    }))
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Split arguments starting with an optional netbeans string.
fn split_args(args: &str, raw: bool) -> (String, Vec<String>) {
    let Some(inner) = args.strip_prefix('"') else {
        return (String::new(), tokens(args));
    };
    match inner.rfind('"') {
        Some(end) => {
            let content = &inner[..end];
            let nbstring = if raw {
                content.to_string()
            } else {
                unescape(content)
            };
            (nbstring, tokens(&inner[end + 1..]))
        }
        None => (String::new(), tokens(args)),
    }
}

/// `insert` carries its offset before the string: `<off> "<text>"`.
fn split_insert_args(args: &str) -> (String, Vec<String>) {
    match (args.find('"'), args.rfind('"')) {
        (Some(start), Some(end)) if end > start => (
            args[start + 1..end].to_string(),
            tokens(&args[..start]),
        ),
        _ => (String::new(), tokens(args)),
    }
}

/// Parse a `<lnum>/<col>` cursor position.
pub fn parse_lnum_col(text: &str) -> Option<(u32, u32)> {
    let (lnum, rest) = split_digits(text)?;
    let (col, _) = split_digits(rest.strip_prefix('/')?)?;
    Some((lnum.parse().ok()?, col.parse().ok()?))
}
