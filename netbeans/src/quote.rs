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

//! Netbeans string escaping
//!
//! The characters `"`, newline, tab, carriage return and backslash travel as
//! the two character escapes `\"`, `\n`, `\t`, `\r` and `\\`.

/// Escape special characters and wrap the result in double quotes.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for character in text.chars() {
        match character {
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Remove the escapes from the content of a netbeans string.
///
/// Backslashes that do not start a known escape are kept.
pub fn unescape(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(character) = chars.next() {
        if character != '\\' {
            plain.push(character);
            continue;
        }
        let replacement = match chars.peek() {
            Some('"') => '"',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            _ => {
                plain.push('\\');
                continue;
            }
        };
        chars.next();
        plain.push(replacement);
    }
    plain
}

/// Inverse of [`quote`]: strip the surrounding quotes, if any, and unescape.
pub fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text);
    unescape(inner)
}

/// Split `text` on whitespace, keeping double quoted runs as single tokens.
///
/// Escaped quotes inside a quoted run do not end it, and the escapes of a
/// quoted run are removed.
pub fn split_quoted_string(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut started = false;
    let mut quoted = false;
    let mut chars = text.chars();

    while let Some(character) = chars.next() {
        if quoted {
            match character {
                '\\' => {
                    let escaped = chars.next().map(|next| {
                        let mut pair = String::from('\\');
                        pair.push(next);
                        unescape(&pair)
                    });
                    token.push_str(escaped.as_deref().unwrap_or("\\"));
                }
                '"' => quoted = false,
                other => token.push(other),
            }
        } else if character == '"' {
            quoted = true;
            started = true;
        } else if character.is_whitespace() {
            if started {
                tokens.push(std::mem::take(&mut token));
                started = false;
            }
        } else {
            token.push(character);
            started = true;
        }
    }
    if started {
        tokens.push(token);
    }
    tokens
}
