use crate::{entry_log::Retention, types::TimeAspect};

/// Priority category deciding which transports forward an entry's updates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportClass {
    /// Latency sensitive data, packed first
    Urgent,
    #[default]
    Regular,
    /// Large or infrequent data that may wait for spare bandwidth
    Bulk,
}

/// How records are encoded for remote ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PackingMode {
    /// Every record is sent complete
    #[default]
    Full,
    /// Records are sent as differences to the previous one, with a full
    /// record at a fixed interval or on request
    Differential,
}

/// Contains options used to configure the entry behind a write token
#[derive(Clone, Debug)]
pub struct EntryOptions {
    /// Free-form name readers can select the entry by
    pub label: String,
    pub time_aspect: TimeAspect,
    /// Retention for time-indexed readers. `None` uses the channel default.
    pub retention: Option<Retention>,
    /// Number of reserving readers that must attach before data is pruned
    pub reservations: u32,
    pub transport: TransportClass,
    pub packing: PackingMode,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            label: String::new(),
            time_aspect: TimeAspect::Event,
            retention: None,
            reservations: 0,
            transport: TransportClass::default(),
            packing: PackingMode::default(),
        }
    }
}
