use crate::entry_log::Retention;

/// How many live entries a channel accepts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelArity {
    /// A single writer owns the channel
    OnlyOneEntry,
    #[default]
    ZeroOrMoreEntries,
}

/// Contains Config properties which will be used by a Channel
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Name the channel is known by on every end
    pub name: String,
    pub arity: ChannelArity,
    /// Retention of entries whose writer does not choose one
    pub retention: Retention,
    /// Maximum number of differences packed in a row before a full record
    /// is sent again
    pub full_pack_interval: u32,
    /// Number of recycled nodes each of the channel's queues keeps around
    pub queue_spares: usize,
    /// Capacity of the store configuration messages are encoded into
    pub config_store_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            arity: ChannelArity::default(),
            retention: Retention::default(),
            full_pack_interval: 16,
            queue_spares: 64,
            config_store_capacity: 4_096,
        }
    }
}
