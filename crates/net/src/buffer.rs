//! Big-endian packet buffers.
//!
//! All multi-byte integers are written in network byte order. Strings are an
//! `i32` byte length followed by UTF-8 bytes.

use blockcmd_core::BlockPos;
use thiserror::Error;

/// Maximum encoded length of a single string (bytes).
pub const MAX_STRING_LEN: usize = 32767;

/// Errors produced while reading a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before a field was complete.
    #[error("unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the field required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// A length or count prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),
    /// A string exceeded [`MAX_STRING_LEN`].
    #[error("string of {len} bytes exceeds limit of {max}")]
    StringTooLong {
        /// Declared length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// String bytes were not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    /// A collection count exceeded its limit.
    #[error("{what} count {count} exceeds limit of {max}")]
    TooMany {
        /// What was being counted.
        what: &'static str,
        /// Declared count.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// Unknown typed-value tag.
    #[error("unknown value tag: {0}")]
    UnknownValueTag(u8),
    /// The same parameter key appeared twice.
    #[error("duplicate parameter key: {0:?}")]
    DuplicateKey(String),
    /// A command message carried an empty command name.
    #[error("command name is empty")]
    EmptyCommand,
    /// A command name exceeded the protocol limit.
    #[error("command name of {len} bytes exceeds limit of {max}")]
    CommandTooLong {
        /// Name length in bytes.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// Bytes were left over after a complete message.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Growable packet writer.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a boolean as one byte (1 or 0).
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian IEEE-754 `f64`.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a length-prefixed UTF-8 string.
    ///
    /// Callers are expected to respect [`MAX_STRING_LEN`]; longer strings are
    /// written anyway and rejected by the reading side.
    pub fn write_string(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a block position as three `i32`s.
    pub fn write_pos(&mut self, pos: BlockPos) {
        self.write_i32(pos.x);
        self.write_i32(pos.y);
        self.write_i32(pos.z);
    }

    /// Write a collection length/count prefix.
    pub fn write_len(&mut self, len: usize) {
        let len = i32::try_from(len).unwrap_or(i32::MAX);
        self.write_i32(len);
    }
}

/// Fail if a collection of `count` items exceeds the `max` a reader accepts.
pub(crate) fn check_count(what: &'static str, count: usize, max: usize) -> Result<(), WireError> {
    if count > max {
        return Err(WireError::TooMany { what, count, max });
    }
    Ok(())
}

/// Fail if a string of `len` bytes exceeds [`MAX_STRING_LEN`].
pub(crate) fn check_string_len(len: usize) -> Result<(), WireError> {
    if len > MAX_STRING_LEN {
        return Err(WireError::StringTooLong {
            len,
            max: MAX_STRING_LEN,
        });
    }
    Ok(())
}

/// Cursor over a received packet.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail with [`WireError::TrailingBytes`] if anything is left unread.
    pub fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(WireError::UnexpectedEof { needed, remaining });
        }
        let slice = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    /// Read a big-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Read a length prefix, rejecting negative values and values above `max`.
    pub fn read_len(&mut self, what: &'static str, max: usize) -> Result<usize, WireError> {
        let raw = self.read_i32()?;
        let len = usize::try_from(raw).map_err(|_| WireError::NegativeLength(raw))?;
        check_count(what, len, max)?;
        Ok(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let raw = self.read_i32()?;
        let len = usize::try_from(raw).map_err(|_| WireError::NegativeLength(raw))?;
        check_string_len(len)?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    /// Read a block position.
    pub fn read_pos(&mut self) -> Result<BlockPos, WireError> {
        let x = self.read_i32()?;
        let y = self.read_i32()?;
        let z = self.read_i32()?;
        Ok(BlockPos::new(x, y, z))
    }
}
