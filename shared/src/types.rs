use tandem_serde::{ConstByteLength, Serde, SerdeErr, WireReader, WireStore};

pub type EntryId = u16;
pub type EndId = u16;
pub type CreationId = u32;
pub type SequenceId = u32;
pub type ClientId = u32;
pub type TimeTick = u32;

/// Reads as "the most recent data", whatever its time
pub const MAX_TIMETICK: TimeTick = TimeTick::MAX;

/// Temporal nature of the records in an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeAspect {
    /// Single time stamp per record, several records may share one
    Event,
    /// Contiguous validity interval per record
    Stream,
}

impl TimeAspect {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            TimeAspect::Event => 0,
            TimeAspect::Stream => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Result<Self, SerdeErr> {
        match value {
            0 => Ok(TimeAspect::Event),
            1 => Ok(TimeAspect::Stream),
            _ => Err(SerdeErr::InvalidValue {
                reason: "unknown time aspect",
            }),
        }
    }
}

/// Validity of a record: `[start, end)` for stream data, `start == end`
/// for events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeSpec {
    pub start: TimeTick,
    pub end: TimeTick,
}

impl TimeSpec {
    pub fn event(tick: TimeTick) -> Self {
        Self {
            start: tick,
            end: tick,
        }
    }

    pub fn span(start: TimeTick, end: TimeTick) -> Self {
        Self { start, end }
    }

    pub fn is_event(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> TimeTick {
        self.end.saturating_sub(self.start)
    }
}

impl Serde for TimeSpec {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.start.ser(store)?;
        self.end.ser(store)
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let start = reader.unpack()?;
        let end = reader.unpack()?;
        Ok(Self { start, end })
    }

    fn byte_length(&self) -> usize {
        Self::const_byte_length()
    }
}

impl ConstByteLength for TimeSpec {
    fn const_byte_length() -> usize {
        8
    }
}
