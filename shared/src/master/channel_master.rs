use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use log::{debug, info};

use crate::{
    channel::{ChannelArity, EntrySelector},
    entry_log::Retention,
    master::{entry_id_generator::EntryIdGenerator, error::ConfigurationError},
    messages::ChannelCommand,
    records::record_kinds::RecordKinds,
    types::{ClientId, CreationId, EndId, EntryId, TimeAspect},
};

struct MasterEntry {
    origin: EndId,
    creation: CreationId,
    class_name: String,
    label: String,
    time_aspect: TimeAspect,
    retention: Retention,
    valid: bool,
    saveup: bool,
    reservations_left: u32,
    reserved_by: HashSet<(EndId, ClientId)>,
}

impl MasterEntry {
    fn confirmation(&self, entry: EntryId) -> ChannelCommand {
        ChannelCommand::NewEntryConf {
            entry,
            end: self.origin,
            creation: self.creation,
            class_name: self.class_name.clone(),
            label: self.label.clone(),
            time_aspect: self.time_aspect,
            retention: self.retention,
            saveup: self.saveup,
        }
    }

    /// Counts one reserving reader, returns true when that met the last
    /// outstanding reservation
    fn reserve(&mut self, end: EndId, client: ClientId) -> bool {
        if !self.valid || self.reservations_left == 0 {
            return false;
        }
        if !self.reserved_by.insert((end, client)) {
            return false;
        }
        self.reservations_left -= 1;
        self.reservations_left == 0
    }
}

struct ReservingClient {
    end: EndId,
    client: ClientId,
    class_name: String,
    selector: EntrySelector,
}

struct PendingCleanup {
    entry: EntryId,
    round: u32,
    confirmed: BTreeSet<EndId>,
}

/// Configuration authority of one channel, living on exactly one end.
///
/// Requests are applied in arrival order; every accepted request yields the
/// commands to broadcast to all ends, the master's own end included.
pub struct ChannelMaster {
    arity: ChannelArity,
    kinds: RecordKinds,
    ids: EntryIdGenerator,
    ends: BTreeSet<EndId>,
    entries: BTreeMap<EntryId, MasterEntry>,
    clients: Vec<ReservingClient>,
    cleanup: VecDeque<PendingCleanup>,
}

impl ChannelMaster {
    pub fn new(own_end: EndId, arity: ChannelArity, kinds: RecordKinds) -> Self {
        let mut ends = BTreeSet::new();
        ends.insert(own_end);
        Self {
            arity,
            kinds,
            ids: EntryIdGenerator::new(),
            ends,
            entries: BTreeMap::new(),
            clients: Vec::new(),
            cleanup: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, request: ChannelCommand) -> Result<Vec<ChannelCommand>, ConfigurationError> {
        match request {
            ChannelCommand::NewEntryReq {
                end,
                creation,
                class_name,
                magic,
                label,
                time_aspect,
                retention,
                reservations,
            } => {
                let expected = self
                    .kinds
                    .magic(&class_name)
                    .map_err(|_| ConfigurationError::UnknownClass {
                        class_name: class_name.clone(),
                    })?;
                if expected != magic {
                    return Err(ConfigurationError::MagicMismatch {
                        class_name,
                        expected,
                        found: magic,
                    });
                }
                if self.arity == ChannelArity::OnlyOneEntry {
                    if let Some((existing, _)) = self.entries.iter().find(|(_, entry)| entry.valid) {
                        return Err(ConfigurationError::ArityExceeded {
                            existing: *existing,
                        });
                    }
                }

                let id = self.ids.generate()?;
                let mut entry = MasterEntry {
                    origin: end,
                    creation,
                    class_name,
                    label,
                    time_aspect,
                    retention,
                    valid: true,
                    saveup: reservations > 0,
                    reservations_left: reservations,
                    reserved_by: HashSet::new(),
                };
                info!(
                    "entry {} created for end {} ({:?}, {} reservations)",
                    id, end, entry.class_name, reservations
                );

                let mut output = vec![entry.confirmation(id)];
                let mut met = false;
                for client in &self.clients {
                    if Self::matches(&self.kinds, client, id, &entry) {
                        met |= entry.reserve(client.end, client.client);
                    }
                }
                if met {
                    output.push(ChannelCommand::RemoveSaveupCmd { entry: id });
                }
                self.entries.insert(id, entry);
                Ok(output)
            }
            ChannelCommand::DeleteEntryReq { entry } => {
                let record = self
                    .entries
                    .get_mut(&entry)
                    .ok_or(ConfigurationError::UnknownEntry { entry })?;
                if !record.valid {
                    return Err(ConfigurationError::AlreadyInvalidated { entry });
                }
                record.valid = false;
                self.cleanup.push_back(PendingCleanup {
                    entry,
                    round: 0,
                    confirmed: BTreeSet::new(),
                });
                info!("entry {} invalidated, cleanup queued", entry);
                Ok(vec![ChannelCommand::InvalidateEntryCmd { entry }])
            }
            ChannelCommand::CleanEntryConf { entry, end } => {
                let pending = self
                    .cleanup
                    .iter_mut()
                    .find(|pending| pending.entry == entry)
                    .ok_or(ConfigurationError::UnknownCleanup { entry })?;
                if !pending.confirmed.insert(end) {
                    return Err(ConfigurationError::DuplicateConfirmation { entry, end });
                }
                debug!("end {} confirmed cleanup of entry {}", end, entry);
                Ok(Vec::new())
            }
            ChannelCommand::NewEndJoins { end } => {
                if self.ends.insert(end) {
                    info!("end {} joined, {} ends in total", end, self.ends.len());
                }
                let mut output = vec![ChannelCommand::Welcome { end }];
                output.extend(
                    self.entries
                        .iter()
                        .filter(|(_, entry)| entry.valid)
                        .map(|(id, entry)| entry.confirmation(*id)),
                );
                Ok(output)
            }
            ChannelCommand::NewClientNotif {
                end,
                client,
                class_name,
                selector,
                reserve,
            } => {
                if !self.kinds.contains(&class_name) {
                    return Err(ConfigurationError::UnknownClass { class_name });
                }
                if !reserve {
                    return Ok(Vec::new());
                }

                let reserving = ReservingClient {
                    end,
                    client,
                    class_name,
                    selector,
                };
                let mut output = Vec::new();
                for (id, entry) in self.entries.iter_mut() {
                    if Self::matches(&self.kinds, &reserving, *id, entry)
                        && entry.reserve(end, client)
                    {
                        info!("all reservations of entry {} met", id);
                        output.push(ChannelCommand::RemoveSaveupCmd { entry: *id });
                    }
                }
                self.clients
                    .retain(|other| (other.end, other.client) != (end, client));
                self.clients.push(reserving);
                Ok(output)
            }
            ChannelCommand::LeaveClientNotif { end, client } => {
                self.clients
                    .retain(|other| (other.end, other.client) != (end, client));
                Ok(Vec::new())
            }
            other => Err(ConfigurationError::UnexpectedCommand {
                kind: other.command_type(),
            }),
        }
    }

    fn matches(kinds: &RecordKinds, client: &ReservingClient, id: EntryId, entry: &MasterEntry) -> bool {
        kinds.is_compatible(&entry.class_name, &client.class_name)
            && client.selector.matches(id, &entry.label)
    }

    /// Advances the cleanup of the oldest retracted entry by one round.
    /// Deletes it once every end has confirmed, otherwise asks again.
    pub fn sweep(&mut self) -> Vec<ChannelCommand> {
        let Some(pending) = self.cleanup.front_mut() else {
            return Vec::new();
        };

        if self.ends.iter().all(|end| pending.confirmed.contains(end)) {
            let entry = pending.entry;
            self.cleanup.pop_front();
            self.entries.remove(&entry);
            self.ids.recycle(entry);
            info!("entry {} deleted", entry);
            return vec![ChannelCommand::DeleteEntryCmd { entry }];
        }

        pending.round += 1;
        debug!(
            "cleanup round {} of entry {}, {}/{} ends confirmed",
            pending.round,
            pending.entry,
            pending.confirmed.len(),
            self.ends.len()
        );
        vec![ChannelCommand::CleanEntryCmd {
            entry: pending.entry,
            round: pending.round,
        }]
    }

    pub fn end_count(&self) -> usize {
        self.ends.len()
    }

    /// Entries known to the master, retracted ones still awaiting cleanup included
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn pending_cleanups(&self) -> usize {
        self.cleanup.len()
    }

    pub fn reservations_left(&self, entry: EntryId) -> Option<u32> {
        self.entries.get(&entry).map(|entry| entry.reservations_left)
    }
}
