use tandem_serde::{Serde, SerdeErr, WireReader, WireStore};

use crate::types::EntryId;

/// Which of the compatible entries a read token attaches to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntrySelector {
    ById(EntryId),
    ByLabel(String),
    Any,
}

impl EntrySelector {
    pub fn matches(&self, entry: EntryId, label: &str) -> bool {
        match self {
            EntrySelector::ById(id) => *id == entry,
            EntrySelector::ByLabel(wanted) => wanted == label,
            EntrySelector::Any => true,
        }
    }
}

impl Serde for EntrySelector {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        match self {
            EntrySelector::ById(id) => {
                0u8.ser(store)?;
                id.ser(store)
            }
            EntrySelector::ByLabel(label) => {
                1u8.ser(store)?;
                store.pack_str(label)
            }
            EntrySelector::Any => 2u8.ser(store),
        }
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        match reader.unpack::<u8>()? {
            0 => Ok(EntrySelector::ById(reader.unpack()?)),
            1 => Ok(EntrySelector::ByLabel(reader.unpack()?)),
            2 => Ok(EntrySelector::Any),
            _ => Err(SerdeErr::InvalidValue {
                reason: "unknown entry selector",
            }),
        }
    }

    fn byte_length(&self) -> usize {
        match self {
            EntrySelector::ById(_) => 3,
            EntrySelector::ByLabel(label) => 5 + label.len(),
            EntrySelector::Any => 1,
        }
    }
}

/// How a read token walks the data of an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Every record exactly once, in write order, gaps reported explicitly
    Sequential,
    /// The record valid at the requested time, no data inside a gap
    TimeIndexed,
}

/// Contains options used to configure a read token
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Entries the token attaches to
    pub selector: EntrySelector,
    pub mode: ReadMode,
    /// Whether this reader counts towards the save-up reservations of the
    /// entries it matches
    pub reserve: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            selector: EntrySelector::Any,
            mode: ReadMode::TimeIndexed,
            reserve: false,
        }
    }
}
