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

//! Editor buffers known to a session

use crate::{NetbeansError, NetbeansResult};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Shared handle to a buffer; identity is preserved across lookups.
pub type BufferRef = Rc<NetbeansBuffer>;

/// An editor buffer identified by its absolute pathname.
///
/// The cursor fields are updated by the engine as cursor related events
/// arrive.
#[derive(Debug)]
pub struct NetbeansBuffer {
    pathname: String,
    buf_id: u32,
    lnum: Cell<u32>,
    col: Cell<u32>,
    offset: Cell<u64>,
    registered: Cell<bool>,
}

impl NetbeansBuffer {
    /// Create a buffer. Fails when `pathname` is not absolute.
    pub fn new(pathname: &str, buf_id: u32) -> NetbeansResult<Self> {
        if !Path::new(pathname).is_absolute() {
            return Err(NetbeansError::InvalidPathname(pathname.to_string()));
        }
        Ok(Self {
            pathname: pathname.to_string(),
            buf_id,
            lnum: Cell::new(1),
            col: Cell::new(0),
            offset: Cell::new(0),
            registered: Cell::new(false),
        })
    }

    /// Full pathname
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Last component of the pathname
    pub fn basename(&self) -> &str {
        Path::new(&self.pathname)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.pathname)
    }

    /// Buffer number, starting at one
    pub fn buf_id(&self) -> u32 {
        self.buf_id
    }

    /// Cursor line, starting at one
    pub fn lnum(&self) -> u32 {
        self.lnum.get()
    }

    /// Cursor column in bytes, starting at zero
    pub fn col(&self) -> u32 {
        self.col.get()
    }

    /// Cursor position as a byte offset
    pub fn offset(&self) -> u64 {
        self.offset.get()
    }

    /// Whether the editor knows this buffer by its number
    pub fn is_registered(&self) -> bool {
        self.registered.get()
    }

    pub(crate) fn set_cursor(&self, lnum: u32, col: u32) {
        self.lnum.set(lnum);
        self.col.set(col);
    }

    pub(crate) fn set_offset(&self, offset: u64) {
        self.offset.set(offset);
    }

    pub(crate) fn set_registered(&self, registered: bool) {
        self.registered.set(registered);
    }
}

impl fmt::Display for NetbeansBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.basename(), self.lnum(), self.col())
    }
}

/// The buffers of one session, by pathname and by number.
///
/// Numbers are assigned in creation order starting at one; buffers are
/// never removed.
#[derive(Debug, Default)]
pub struct BufferSet {
    by_path: HashMap<String, BufferRef>,
    by_id: Vec<BufferRef>,
}

impl BufferSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the buffer for `pathname`, creating it on first use.
    pub fn get_or_create(&mut self, pathname: &str) -> NetbeansResult<BufferRef> {
        if let Some(buffer) = self.by_path.get(pathname) {
            return Ok(Rc::clone(buffer));
        }
        let buf_id = next_buf_id(self.by_id.len())?;
        let buffer = Rc::new(NetbeansBuffer::new(pathname, buf_id)?);
        self.by_path.insert(pathname.to_string(), Rc::clone(&buffer));
        self.by_id.push(Rc::clone(&buffer));
        Ok(buffer)
    }

    /// Look a buffer up by number
    pub fn get(&self, buf_id: u32) -> Option<BufferRef> {
        let index = usize::try_from(buf_id).ok()?.checked_sub(1)?;
        self.by_id.get(index).cloned()
    }

    /// Look a buffer up by pathname
    pub fn find(&self, pathname: &str) -> Option<BufferRef> {
        self.by_path.get(pathname).cloned()
    }

    /// Number of buffers
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no buffer exists yet
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All buffers in number order
    pub fn iter(&self) -> impl Iterator<Item = &BufferRef> {
        self.by_id.iter()
    }
}

/// Number for the buffer created after `count` others
fn next_buf_id(count: usize) -> NetbeansResult<u32> {
    count
        .checked_add(1)
        .and_then(|next| u32::try_from(next).ok())
        .ok_or(NetbeansError::BufferLimit)
}
