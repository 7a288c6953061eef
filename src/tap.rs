// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Byte taps: cursors over contiguous byte regions that the binary codec
//! reads from and writes to.
//!
//! A [`ReadTap`] borrows an immutable byte slice and advances a position as
//! values are consumed; running past the end of the region is reported as a
//! truncation error from the operation that needed the missing bytes, so a
//! logically atomic sequence of reads fails at its first short read. A
//! [`WriteTap`] owns a growable buffer that starts with a small per-call
//! reserve and doubles as needed.

use crate::AvroResult;
use crate::error::Details;
use crate::util::safe_len;

/// The initial capacity of a [`WriteTap`] buffer.
const WRITE_RESERVE: usize = 1024;

/// A reading cursor over an encoded byte region.
#[derive(Debug, Clone)]
pub struct ReadTap<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadTap<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The current position within the region.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> AvroResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(Details::UnexpectedEof {
                needed: n - self.remaining(),
                remaining: self.remaining(),
            }
            .into());
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read one byte as a boolean. Anything but 0 or 1 is a decode error.
    pub fn read_boolean(&mut self) -> AvroResult<bool> {
        match self.take(1)? {
            [0] => Ok(false),
            [1] => Ok(true),
            [b] => Err(Details::BoolValue(*b).into()),
            _ => unreachable!("take(1) yields one byte"),
        }
    }

    /// Read a zig-zag encoded variable-length long.
    pub fn read_long(&mut self) -> AvroResult<i64> {
        let z = self.read_variable()?;
        Ok(if z & 0x1 == 0 {
            (z >> 1) as i64
        } else {
            !(z >> 1) as i64
        })
    }

    /// Read a zig-zag encoded variable-length int.
    ///
    /// Magnitudes beyond the int range are a decode error even though they
    /// fit the wire form.
    pub fn read_int(&mut self) -> AvroResult<i32> {
        let n = self.read_long()?;
        i32::try_from(n).map_err(|e| Details::ZagI32(e, n).into())
    }

    pub fn read_float(&mut self) -> AvroResult<f32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("take(4) yields four bytes");
        Ok(f32::from_le_bytes(bytes))
    }

    pub fn read_double(&mut self) -> AvroResult<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("take(8) yields eight bytes");
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> AvroResult<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> AvroResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Details::ConvertToUtf8(e).into())
    }

    /// Read exactly `n` raw bytes, as used by `fixed` data.
    pub fn read_fixed(&mut self, n: usize) -> AvroResult<&'a [u8]> {
        self.take(n)
    }

    /// Advance past one variable-length integer without decoding it.
    pub fn skip_long(&mut self) -> AvroResult<()> {
        self.read_variable().map(|_| ())
    }

    /// Advance past a length-prefixed byte string.
    pub fn skip_bytes(&mut self) -> AvroResult<()> {
        let len = self.read_len()?;
        self.skip_fixed(len)
    }

    /// Advance the position by `n` raw bytes.
    pub fn skip_fixed(&mut self, n: usize) -> AvroResult<()> {
        self.take(n).map(|_| ())
    }

    fn read_len(&mut self) -> AvroResult<usize> {
        let len = self.read_long()?;
        let len = usize::try_from(len).map_err(|_| Details::NegativeLength(len))?;
        safe_len(len)
    }

    fn read_variable(&mut self) -> AvroResult<u64> {
        let mut i = 0u64;
        let mut j = 0;
        loop {
            if j > 9 {
                // if j * 7 > 64
                return Err(Details::IntegerOverflow.into());
            }
            let byte = self.take(1)?[0];
            i |= u64::from(byte & 0x7F) << (j * 7);
            if (byte >> 7) == 0 {
                break;
            } else {
                j += 1;
            }
        }
        Ok(i)
    }
}

/// A writing cursor that accumulates one encoded value.
#[derive(Debug, Default)]
pub struct WriteTap {
    buf: Vec<u8>,
}

impl WriteTap {
    /// Create a tap with the standard per-call reserve.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(WRITE_RESERVE),
        }
    }

    /// The number of bytes written so far.
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Consume the tap, returning the written bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_boolean(&mut self, b: bool) {
        self.buf.push(u8::from(b));
    }

    pub fn write_int(&mut self, n: i32) {
        self.write_long(n as i64);
    }

    /// Write a long as a zig-zag varint, at most 10 bytes.
    pub fn write_long(&mut self, n: i64) {
        let mut z = ((n << 1) ^ (n >> 63)) as u64;
        loop {
            if z <= 0x7F {
                self.buf.push((z & 0x7F) as u8);
                break;
            } else {
                self.buf.push((0x80 | (z & 0x7F)) as u8);
                z >>= 7;
            }
        }
    }

    pub fn write_float(&mut self, x: f32) {
        self.buf.extend_from_slice(&x.to_le_bytes());
    }

    pub fn write_double(&mut self, x: f64) {
        self.buf.extend_from_slice(&x.to_le_bytes());
    }

    /// Write a byte string preceded by its zig-zag encoded length.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_long(bytes.len() as i64);
        self.buf.extend_from_slice(bytes);
    }

    /// Write a string as UTF-8 preceded by its byte length.
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Write raw bytes with no length prefix, as used by `fixed` data.
    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
