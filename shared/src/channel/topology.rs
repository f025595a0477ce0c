use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    channel::read_options::EntrySelector,
    entry::{Entry, EntryOptions, EntryTrigger, TransportClass, TransportNotifier},
    records::record_kinds::RecordKinds,
    types::{ClientId, CreationId, EntryId},
};

pub(crate) type ValidityCallback = Box<dyn FnOnce(EntryId) + Send>;

pub(crate) struct ClientRecord {
    pub(crate) class_name: String,
    pub(crate) selector: EntrySelector,
    pub(crate) trigger: Option<Arc<dyn EntryTrigger>>,
}

impl ClientRecord {
    pub(crate) fn matches(&self, kinds: &RecordKinds, entry: &Entry) -> bool {
        kinds.is_compatible(entry.class_name(), &self.class_name)
            && self.selector.matches(entry.id(), entry.label())
    }
}

pub(crate) struct WriterRecord {
    pub(crate) class_name: &'static str,
    pub(crate) options: EntryOptions,
    pub(crate) entry: Option<Arc<Entry>>,
    pub(crate) on_valid: Option<ValidityCallback>,
    /// Token dropped before its entry was confirmed
    pub(crate) abandoned: bool,
    /// The master turned the entry request down
    pub(crate) refused: bool,
}

pub(crate) struct TransportSlot {
    pub(crate) class: TransportClass,
    pub(crate) notifier: Arc<dyn TransportNotifier>,
}

/// Everything guarded by the channel's entries lock
#[derive(Default)]
pub(crate) struct Topology {
    entries: Vec<Option<Arc<Entry>>>,
    by_class: HashMap<String, Vec<EntryId>>,
    pub(crate) clients: HashMap<ClientId, ClientRecord>,
    pub(crate) writers: HashMap<CreationId, WriterRecord>,
    pub(crate) transports: Vec<TransportSlot>,
    pub(crate) confirmed_cleanups: HashSet<EntryId>,
}

impl Topology {
    pub(crate) fn entry(&self, id: EntryId) -> Option<&Arc<Entry>> {
        self.entries.get(id as usize).and_then(Option::as_ref)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.entries.iter().flatten()
    }

    pub(crate) fn insert_entry(&mut self, entry: Arc<Entry>) {
        let index = entry.id() as usize;
        if self.entries.len() <= index {
            self.entries.resize(index + 1, None);
        }
        self.by_class
            .entry(entry.class_name().to_string())
            .or_default()
            .push(entry.id());
        self.entries[index] = Some(entry);
    }

    /// Takes a retracted entry out of class lookups, it stays addressable by id
    pub(crate) fn unlink_class(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let class_name = entry.class_name().to_string();
        if let Some(ids) = self.by_class.get_mut(&class_name) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_class.remove(&class_name);
            }
        }
    }

    pub(crate) fn remove_entry(&mut self, id: EntryId) -> Option<Arc<Entry>> {
        self.unlink_class(id);
        let entry = self.entries.get_mut(id as usize)?.take();
        while matches!(self.entries.last(), Some(None)) {
            self.entries.pop();
        }
        entry
    }

    /// Valid entries a client of `class_name` with `selector` attaches to,
    /// ordered by id
    pub(crate) fn matching_entries(
        &self,
        kinds: &RecordKinds,
        class_name: &str,
        selector: &EntrySelector,
    ) -> Vec<Arc<Entry>> {
        let mut matching: Vec<Arc<Entry>> = self
            .by_class
            .iter()
            .filter(|(entry_class, _)| kinds.is_compatible(entry_class, class_name))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.entry(*id))
            .filter(|entry| entry.is_valid() && selector.matches(entry.id(), entry.label()))
            .cloned()
            .collect();
        matching.sort_by_key(|entry| entry.id());
        matching
    }
}
