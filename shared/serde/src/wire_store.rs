use crate::{error::SerdeErr, serde::Serde};

/// Capacity used by [`WireStore::default`], one comfortable UDP payload
pub const DEFAULT_STORE_CAPACITY: usize = 1_400;

/// Placeholder for a 2-byte size field, returned by [`WireStore::start_mark`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a mark must be closed with end_mark"]
pub struct Mark {
    index: usize,
}

/// Placeholder for a 4-byte size field, returned by [`WireStore::start_big_mark`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a big mark must be closed with end_big_mark"]
pub struct BigMark {
    index: usize,
}

/// Append-only byte buffer with a hard capacity.
///
/// Multi-byte values go out in network byte order. The first write that
/// would exceed the capacity chokes the store: that write and every later
/// one (even of zero bytes) fails with [`SerdeErr::BufferBoundary`], so a
/// message is never sent with a hole in the middle.
pub struct WireStore {
    buffer: Vec<u8>,
    capacity: usize,
    choked: bool,
}

impl Default for WireStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl WireStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            choked: false,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        if self.choked {
            return 0;
        }
        self.capacity - self.buffer.len()
    }

    pub fn is_choked(&self) -> bool {
        self.choked
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Empties the store and lifts a choke, so it can carry a new message
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.choked = false;
    }

    /// Drops everything written after `len`, used to take back a message
    /// that could not be completed. A choke is not lifted.
    pub fn rewind(&mut self, len: usize) {
        if len <= self.buffer.len() {
            self.buffer.truncate(len);
        }
    }

    fn reserve(&mut self, requested: usize) -> Result<(), SerdeErr> {
        if self.choked {
            return Err(SerdeErr::BufferBoundary {
                requested,
                available: 0,
            });
        }
        let available = self.capacity - self.buffer.len();
        if requested > available {
            self.choked = true;
            return Err(SerdeErr::BufferBoundary {
                requested,
                available,
            });
        }
        Ok(())
    }

    /// Appends raw bytes, without any length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerdeErr> {
        self.reserve(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Packs any [`Serde`] value
    pub fn pack<T: Serde>(&mut self, value: &T) -> Result<(), SerdeErr> {
        value.ser(self)
    }

    /// Packs a string slice as `u32 length` + raw bytes
    pub fn pack_str(&mut self, value: &str) -> Result<(), SerdeErr> {
        let length = u32::try_from(value.len()).map_err(|_| SerdeErr::InvalidValue {
            reason: "string longer than u32::MAX bytes",
        })?;
        self.reserve(4 + value.len())?;
        self.buffer.extend_from_slice(&length.to_be_bytes());
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Reserves a 2-byte size field, back-filled by [`WireStore::end_mark`]
    pub fn start_mark(&mut self) -> Result<Mark, SerdeErr> {
        self.reserve(2)?;
        let index = self.buffer.len();
        self.buffer.extend_from_slice(&[0, 0]);
        Ok(Mark { index })
    }

    /// Writes `(end - mark - 2)` into the field reserved by `mark`
    pub fn end_mark(&mut self, mark: Mark) -> Result<(), SerdeErr> {
        self.reserve(0)?;
        let size = self.buffer.len() - mark.index - 2;
        let size = u16::try_from(size).map_err(|_| SerdeErr::MarkOverflow {
            size,
            limit: u16::MAX as usize,
        })?;
        self.buffer[mark.index..mark.index + 2].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }

    /// Reserves a 4-byte size field, back-filled by [`WireStore::end_big_mark`]
    pub fn start_big_mark(&mut self) -> Result<BigMark, SerdeErr> {
        self.reserve(4)?;
        let index = self.buffer.len();
        self.buffer.extend_from_slice(&[0, 0, 0, 0]);
        Ok(BigMark { index })
    }

    pub fn end_big_mark(&mut self, mark: BigMark) -> Result<(), SerdeErr> {
        self.reserve(0)?;
        let size = self.buffer.len() - mark.index - 4;
        let size = u32::try_from(size).map_err(|_| SerdeErr::MarkOverflow {
            size,
            limit: u32::MAX as usize,
        })?;
        self.buffer[mark.index..mark.index + 4].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }
}
