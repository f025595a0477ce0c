use crate::types::{ClientId, EndId, EntryId};

/// Topology change of a channel, reported to monitors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    EntryAdded {
        entry: EntryId,
        origin: EndId,
        class_name: String,
        label: String,
    },
    EntryRemoved {
        entry: EntryId,
    },
    ClientAttached {
        client: ClientId,
        entry: EntryId,
    },
    ClientDetached {
        client: ClientId,
        entry: EntryId,
    },
}

/// Receives the topology changes of a channel.
///
/// Called with the channel's watcher lock held, so implementations must not
/// call back into the channel.
pub trait ChannelWatcher: Send {
    fn on_event(&mut self, channel: &str, event: &ChannelEvent);
}
