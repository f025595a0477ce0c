use std::sync::Arc;

use crate::types::{ClientId, EntryId, SequenceId};

/// Invoked on every write to an entry a reader with a trigger is attached to
pub trait EntryTrigger: Send + Sync {
    fn fire(&self, entry: EntryId, sequence: SequenceId);
}

/// Downstream packer told that an entry has data ready for it
pub trait TransportNotifier: Send + Sync {
    fn notify(&self, entry: EntryId, sequence: SequenceId, transport: usize);
}

/// Authoritative list, edited by the channel under its entries lock
#[derive(Default)]
pub(crate) struct EntryTargets {
    pub(crate) triggers: Vec<(ClientId, Arc<dyn EntryTrigger>)>,
    pub(crate) transports: Vec<(usize, Arc<dyn TransportNotifier>)>,
}

/// Writer-side copy, refreshed only when the target version moves. The
/// lists are shared so a writer can take them and call out without holding
/// the cache lock.
#[derive(Default)]
pub(crate) struct CachedTargets {
    pub(crate) version: u32,
    pub(crate) triggers: Arc<Vec<Arc<dyn EntryTrigger>>>,
    pub(crate) transports: Arc<Vec<(usize, Arc<dyn TransportNotifier>)>>,
}

impl CachedTargets {
    pub(crate) fn refresh(&mut self, version: u32, targets: &EntryTargets) {
        self.version = version;
        self.triggers = Arc::new(
            targets
                .triggers
                .iter()
                .map(|(_, trigger)| trigger.clone())
                .collect(),
        );
        self.transports = Arc::new(targets.transports.clone());
    }
}
