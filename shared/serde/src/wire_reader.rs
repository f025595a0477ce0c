use crate::{error::SerdeErr, serde::Serde};

/// Reading side of the wire contract, mirroring [`WireStore`](crate::WireStore).
///
/// Once a read asks for more bytes than remain the reader is exhausted and
/// every later read fails as well.
pub struct WireReader<'b> {
    buffer: &'b [u8],
    index: usize,
    exhausted: bool,
}

impl<'b> WireReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            index: 0,
            exhausted: false,
        }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        if self.exhausted {
            return 0;
        }
        self.buffer.len() - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn read_bytes(&mut self, requested: usize) -> Result<&'b [u8], SerdeErr> {
        let remaining = self.remaining();
        if self.exhausted || requested > remaining {
            self.exhausted = true;
            return Err(SerdeErr::BufferExhausted {
                requested,
                remaining,
            });
        }
        let bytes = &self.buffer[self.index..self.index + requested];
        self.index += requested;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let bytes = self.read_bytes(N)?;
        let mut output = [0u8; N];
        output.copy_from_slice(bytes);
        Ok(output)
    }

    pub fn unpack<T: Serde>(&mut self) -> Result<T, SerdeErr> {
        T::de(self)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), SerdeErr> {
        self.read_bytes(count).map(|_| ())
    }

    /// Reads the size written by [`WireStore::end_mark`](crate::WireStore::end_mark)
    pub fn read_mark(&mut self) -> Result<usize, SerdeErr> {
        Ok(u16::from_be_bytes(self.read_array()?) as usize)
    }

    /// Reads the size written by [`WireStore::end_big_mark`](crate::WireStore::end_big_mark)
    pub fn read_big_mark(&mut self) -> Result<usize, SerdeErr> {
        Ok(u32::from_be_bytes(self.read_array()?) as usize)
    }

    /// Splits off the next `count` bytes as an independent reader, used to
    /// decode a marked payload without overrunning into the next message.
    pub fn sub_reader(&mut self, count: usize) -> Result<WireReader<'b>, SerdeErr> {
        Ok(WireReader::new(self.read_bytes(count)?))
    }
}
