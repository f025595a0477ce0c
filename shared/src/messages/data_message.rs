use tandem_serde::{ConstByteLength, Serde, SerdeErr, WireReader, WireStore};

use crate::types::EntryId;

/// Kind byte of a data message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataMessageKind {
    /// Sequence, time and the complete record
    FullData = 1,
    /// Sequence, base sequence, time and the difference to the base record
    DiffData = 2,
    /// Explicit discontinuity in stream data
    TimeJump = 3,
    /// Receiver lost the base of a difference and asks for a full record
    FullDataReq = 4,
}

impl Serde for DataMessageKind {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        (*self as u8).ser(store)
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        match reader.unpack::<u8>()? {
            1 => Ok(Self::FullData),
            2 => Ok(Self::DiffData),
            3 => Ok(Self::TimeJump),
            4 => Ok(Self::FullDataReq),
            _ => Err(SerdeErr::InvalidValue {
                reason: "unknown data message kind",
            }),
        }
    }

    fn byte_length(&self) -> usize {
        1
    }
}

/// Leads every data message, followed by a 2-byte mark around the body so
/// receivers can skip messages for entries they do not know
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataHeader {
    pub kind: DataMessageKind,
    pub entry: EntryId,
}

impl Serde for DataHeader {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.kind.ser(store)?;
        self.entry.ser(store)
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            kind: reader.unpack()?,
            entry: reader.unpack()?,
        })
    }

    fn byte_length(&self) -> usize {
        Self::const_byte_length()
    }
}

impl ConstByteLength for DataHeader {
    fn const_byte_length() -> usize {
        3
    }
}
