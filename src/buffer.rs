// Concurrent execution engine for asynchronous I/O.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr. Maxim Orlovsky <orlovsky@ubideco.org>
//     Alexis Sellier <alexis@cloudhead.io>
//
// Copyright 2022-2025 UBIDECO Labs, InDCS, Lugano, Switzerland. All Rights reserved.
// Copyright 2021-2023 Alexis Sellier <alexis@cloudhead.io>. All Rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::io;

/// Size of buffers created with [`BufSpan::default`].
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum BufferError {
    /// offset {0} is beyond the end of the {1}-byte buffer.
    Overflow(usize, usize),
}

/// Owned contiguous byte region with a cursor.
///
/// The offset separates the filled part of the buffer (bytes already read into it or already
/// written out of it) from the unfilled part. It never exceeds the buffer size: operations which
/// would move it past the end fail and leave the buffer unchanged.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct BufSpan {
    data: Box<[u8]>,
    offset: usize,
}

impl Default for BufSpan {
    fn default() -> Self { BufSpan::new(DEFAULT_BUFFER_SIZE) }
}

impl From<Vec<u8>> for BufSpan {
    fn from(data: Vec<u8>) -> Self {
        BufSpan {
            data: data.into_boxed_slice(),
            offset: 0,
        }
    }
}

impl BufSpan {
    /// Allocates a zero-filled buffer of `size` bytes.
    pub fn new(size: usize) -> Self { BufSpan::from(vec![0u8; size]) }

    pub fn size(&self) -> usize { self.data.len() }

    pub fn offset(&self) -> usize { self.offset }

    /// Number of bytes between the offset and the end of the buffer.
    pub fn remaining(&self) -> usize { self.size() - self.offset }

    pub fn is_full(&self) -> bool { self.offset == self.size() }

    /// Moves the offset `len` bytes forward.
    pub fn advance(&mut self, len: usize) -> Result<(), BufferError> {
        let offset = self.offset.saturating_add(len);
        self.set_offset(offset)
    }

    pub fn set_offset(&mut self, offset: usize) -> Result<(), BufferError> {
        if offset > self.size() {
            return Err(BufferError::Overflow(offset, self.size()));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn rewind(&mut self) { self.offset = 0 }

    /// Bytes before the offset.
    pub fn filled(&self) -> &[u8] { &self.data[..self.offset] }

    /// Bytes from the offset to the end of the buffer.
    pub fn unfilled_mut(&mut self) -> &mut [u8] { &mut self.data[self.offset..] }

    pub fn as_slice(&self) -> &[u8] { &self.data }

    pub fn as_mut_slice(&mut self) -> &mut [u8] { &mut self.data }

    pub fn into_vec(self) -> Vec<u8> { self.data.into_vec() }
}

/// Writes at the offset, never past the end of the buffer. A full buffer accepts zero bytes.
impl io::Write for BufSpan {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(self.remaining());
        self.unfilled_mut()[..len].copy_from_slice(&buf[..len]);
        self.offset += len;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
