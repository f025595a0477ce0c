use tandem_serde::{ConstByteLength, Serde, SerdeErr, WireReader, WireStore};

use crate::types::TimeTick;

/// Minimum amount of data an entry log keeps for time-indexed readers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retention {
    /// Time span, counted back from the newest record, that stays readable
    pub span: TimeTick,
    /// Number of newest records that stay readable, at least one is always kept
    pub depth: u32,
}

impl Default for Retention {
    fn default() -> Self {
        Self { span: 0, depth: 1 }
    }
}

/// Whether data is held back until promised readers have attached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveupMode {
    /// Normal pruning
    None,
    /// Pruning resumes at the next write
    TryRemove,
    /// Nothing is pruned
    Active,
}

impl Serde for Retention {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.span.ser(store)?;
        self.depth.ser(store)
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let span = reader.unpack()?;
        let depth = reader.unpack()?;
        Ok(Self { span, depth })
    }

    fn byte_length(&self) -> usize {
        Self::const_byte_length()
    }
}

impl ConstByteLength for Retention {
    fn const_byte_length() -> usize {
        8
    }
}
