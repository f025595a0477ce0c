use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use log::{debug, warn};
use parking_lot::Mutex;
use tandem_serde::{Serde, SerdeErr, WireReader, WireStore};

use crate::{
    entry::{
        error::EntryError,
        options::{PackingMode, TransportClass},
        pack_state::{PackReport, PackState, RemoteFeed, RemoteUpdate},
        targets::{CachedTargets, EntryTargets, EntryTrigger, TransportNotifier},
    },
    entry_log::{
        DataAccess, EntryLog, Retention, SaveupMode, SequentialCursor, SequentialRead,
    },
    messages::{DataHeader, DataMessageKind},
    records::record::Record,
    types::{
        ClientId, CreationId, EndId, EntryId, SequenceId, TimeAspect, TimeSpec, TimeTick,
        MAX_TIMETICK,
    },
};

/// Everything needed to set up an entry once its id is confirmed
#[derive(Clone, Debug)]
pub struct EntryDescription {
    pub id: EntryId,
    pub creation: CreationId,
    pub origin: EndId,
    pub class_name: String,
    pub label: String,
    pub time_aspect: TimeAspect,
    pub retention: Retention,
    pub saveup: bool,
    pub local_writer: bool,
    pub transport: TransportClass,
    pub packing: PackingMode,
}

/// One independently writable data stream of a channel
pub struct Entry {
    description: EntryDescription,
    valid: AtomicBool,
    log: EntryLog<Box<dyn Record>>,
    readers: AtomicU32,
    targets: Mutex<EntryTargets>,
    targets_version: AtomicU32,
    cached_targets: Mutex<CachedTargets>,
    pack_states: Mutex<HashMap<usize, PackState>>,
    remote: Mutex<RemoteFeed>,
}

impl Entry {
    pub fn new(description: EntryDescription) -> Result<Self, EntryError> {
        let saveup = if description.saveup {
            SaveupMode::Active
        } else {
            SaveupMode::None
        };
        let log = EntryLog::new(description.time_aspect, description.retention, saveup)?;

        Ok(Self {
            description,
            valid: AtomicBool::new(true),
            log,
            readers: AtomicU32::new(0),
            targets: Mutex::new(EntryTargets::default()),
            targets_version: AtomicU32::new(0),
            cached_targets: Mutex::new(CachedTargets::default()),
            pack_states: Mutex::new(HashMap::new()),
            remote: Mutex::new(RemoteFeed::default()),
        })
    }

    pub fn id(&self) -> EntryId {
        self.description.id
    }

    pub fn creation(&self) -> CreationId {
        self.description.creation
    }

    /// End the writer of this entry lives on
    pub fn origin(&self) -> EndId {
        self.description.origin
    }

    pub fn class_name(&self) -> &str {
        &self.description.class_name
    }

    pub fn label(&self) -> &str {
        &self.description.label
    }

    pub fn time_aspect(&self) -> TimeAspect {
        self.description.time_aspect
    }

    pub fn transport_class(&self) -> TransportClass {
        self.description.transport
    }

    pub fn is_local_writer(&self) -> bool {
        self.description.local_writer
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    // Writing

    /// Appends a record written by the local writer
    pub fn write(&self, record: Box<dyn Record>, time: TimeSpec) -> Result<SequenceId, EntryError> {
        if record.class_name() != self.class_name() {
            return Err(EntryError::ClassMismatch {
                entry: self.id(),
                expected: self.class_name().to_string(),
                found: record.class_name().to_string(),
            });
        }
        self.commit(record, time)
    }

    fn commit(&self, record: Box<dyn Record>, time: TimeSpec) -> Result<SequenceId, EntryError> {
        if !self.is_valid() {
            return Err(EntryError::Invalid { entry: self.id() });
        }
        let sequence = self.log.append(record, time)?;

        let (transports, triggers) = {
            let mut cached = self.cached_targets.lock();
            let version = self.targets_version.load(Ordering::Acquire);
            if cached.version != version {
                cached.refresh(version, &self.targets.lock());
            }
            (cached.transports.clone(), cached.triggers.clone())
        };
        // targets may write to this entry again
        for (index, transport) in transports.iter() {
            transport.notify(self.id(), sequence, *index);
        }
        for trigger in triggers.iter() {
            trigger.fire(self.id(), sequence);
        }

        Ok(sequence)
    }

    // Reading

    pub fn read_at(&self, tick: TimeTick) -> Option<DataAccess<'_, Box<dyn Record>>> {
        if !self.is_valid() {
            return None;
        }
        self.log.read_at(tick)
    }

    pub fn read_latest(&self) -> Option<DataAccess<'_, Box<dyn Record>>> {
        self.read_at(MAX_TIMETICK)
    }

    pub(crate) fn attach_sequential(&self) -> SequentialCursor {
        self.log.attach_sequential()
    }

    pub(crate) fn detach_sequential(&self, cursor: SequentialCursor) {
        self.log.detach_sequential(cursor);
    }

    pub(crate) fn read_sequential(
        &self,
        cursor: &mut SequentialCursor,
        up_to: TimeTick,
    ) -> SequentialRead<'_, Box<dyn Record>> {
        if !self.is_valid() {
            return SequentialRead::Nothing;
        }
        self.log.read_sequential(cursor, up_to)
    }

    pub(crate) fn reader_attached(&self) {
        self.readers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reader_detached(&self) {
        self.readers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn reader_count(&self) -> u32 {
        self.readers.load(Ordering::Relaxed)
    }

    // Targets

    fn bump_targets(&self) {
        self.targets_version.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn add_trigger(&self, client: ClientId, trigger: Arc<dyn EntryTrigger>) {
        let mut targets = self.targets.lock();
        if targets.triggers.iter().any(|(key, _)| *key == client) {
            return;
        }
        targets.triggers.push((client, trigger));
        self.bump_targets();
    }

    pub(crate) fn remove_trigger(&self, client: ClientId) {
        let mut targets = self.targets.lock();
        let before = targets.triggers.len();
        targets.triggers.retain(|(key, _)| *key != client);
        if targets.triggers.len() != before {
            self.bump_targets();
        }
    }

    /// Registers a transport that forwards this entry, starting from the
    /// oldest retained record
    pub(crate) fn add_transport(&self, index: usize, notifier: Arc<dyn TransportNotifier>) {
        let mut pack_states = self.pack_states.lock();
        if pack_states.contains_key(&index) {
            return;
        }
        pack_states.insert(index, PackState::new(self.log.attach_sequential()));
        self.targets.lock().transports.push((index, notifier));
        self.bump_targets();
    }

    /// Gives up every transport cursor, called once the entry is retracted
    pub(crate) fn detach_transports(&self) {
        let mut pack_states = self.pack_states.lock();
        for (_, state) in pack_states.drain() {
            self.log.detach_sequential(state.cursor);
        }
        self.targets.lock().transports.clear();
        self.bump_targets();
    }

    // Packing

    /// Packs every record not yet sent on `transport`. The report is moved
    /// past each message once it is completely written, a message that
    /// fails halfway on the store boundary is retried on the next call. A
    /// record that can never be written, such as one too large for a size
    /// mark, is taken back out of the store and skipped.
    pub(crate) fn pack(
        &self,
        transport: usize,
        store: &mut WireStore,
        full_interval: u32,
        report: &mut PackReport,
    ) -> Result<(), EntryError> {
        let mut pack_states = self.pack_states.lock();
        let state = pack_states
            .get_mut(&transport)
            .ok_or(EntryError::UnknownTransport {
                entry: self.id(),
                transport,
            })?;

        loop {
            let written = match self.log.peek_sequential(&mut state.cursor, MAX_TIMETICK) {
                SequentialRead::Nothing => break,
                SequentialRead::Gap(time) => {
                    self.write_message(store, DataMessageKind::TimeJump, |store| time.ser(store))
                }
                SequentialRead::Data(access) => {
                    let base = match (&state.reference, self.description.packing) {
                        (Some((base_sequence, base)), PackingMode::Differential)
                            if !state.full_requested && state.since_full < full_interval =>
                        {
                            Some((*base_sequence, base.as_ref()))
                        }
                        _ => None,
                    };

                    let full = base.is_none();
                    let written = match base {
                        Some((base_sequence, base)) => {
                            self.write_message(store, DataMessageKind::DiffData, |store| {
                                access.sequence().ser(store)?;
                                base_sequence.ser(store)?;
                                access.time().ser(store)?;
                                access.ser_difference(base, store)
                            })
                        }
                        None => self.write_message(store, DataMessageKind::FullData, |store| {
                            access.sequence().ser(store)?;
                            access.time().ser(store)?;
                            access.ser(store)
                        }),
                    };
                    if written.is_ok() {
                        if full {
                            state.since_full = 0;
                            state.full_requested = false;
                        } else {
                            state.since_full += 1;
                        }
                        state.reference = Some((access.sequence(), access.clone_record()));
                    }
                    written
                }
            };

            match written {
                Ok(()) => report.messages += 1,
                Err(error @ SerdeErr::BufferBoundary { .. }) => return Err(error.into()),
                Err(error) => {
                    store.rewind(report.complete_len);
                    warn!("entry {}: record skipped, it cannot be packed: {}", self.id(), error);
                    report.skipped += 1;
                }
            }
            self.log.advance_sequential(&mut state.cursor);
            report.complete_len = store.len();
        }

        Ok(())
    }

    fn write_message(
        &self,
        store: &mut WireStore,
        kind: DataMessageKind,
        body: impl FnOnce(&mut WireStore) -> Result<(), SerdeErr>,
    ) -> Result<(), SerdeErr> {
        DataHeader {
            kind,
            entry: self.id(),
        }
        .ser(store)?;
        let mark = store.start_mark()?;
        body(store)?;
        store.end_mark(mark)
    }

    /// The next record on every transport goes out complete
    pub(crate) fn request_full(&self) {
        for state in self.pack_states.lock().values_mut() {
            state.full_requested = true;
        }
    }

    // Remote feed

    pub(crate) fn receive_full(
        &self,
        sequence: SequenceId,
        time: TimeSpec,
        record: Box<dyn Record>,
    ) -> Result<RemoteUpdate, EntryError> {
        let base = record.clone_record();
        self.commit(record, time)?;

        let mut remote = self.remote.lock();
        remote.last = Some((sequence, base));
        remote.awaiting_full = false;
        Ok(RemoteUpdate::Applied)
    }

    pub(crate) fn receive_difference(
        &self,
        sequence: SequenceId,
        base_sequence: SequenceId,
        time: TimeSpec,
        reader: &mut WireReader,
    ) -> Result<RemoteUpdate, EntryError> {
        let mut remote = self.remote.lock();

        let base = match &remote.last {
            Some((last_sequence, last)) if *last_sequence == base_sequence => Some(last.clone_record()),
            _ => None,
        };
        let Some(mut record) = base.filter(|_| !remote.awaiting_full) else {
            if remote.awaiting_full {
                return Ok(RemoteUpdate::Skipped);
            }
            debug!(
                "entry {}: difference on base {} without that base, asking for a full record",
                self.id(),
                base_sequence
            );
            remote.awaiting_full = true;
            return Ok(RemoteUpdate::NeedsFull);
        };

        record.de_difference(reader)?;
        let base = record.clone_record();
        if let Err(error) = self.commit(record, time) {
            warn!("entry {}: dropping received difference: {}", self.id(), error);
            return Err(error);
        }
        remote.last = Some((sequence, base));
        Ok(RemoteUpdate::Applied)
    }

    /// Applies a time jump received from the writer's end
    pub(crate) fn receive_jump(&self, time: TimeSpec) -> Result<(), EntryError> {
        self.log.mark_gap(time.end)?;
        Ok(())
    }

    // Retention

    pub(crate) fn remove_saveup(&self) {
        self.log.set_saveup(SaveupMode::TryRemove);
    }

    pub fn saveup(&self) -> SaveupMode {
        self.log.saveup()
    }

    pub fn set_retention(&self, retention: Retention) {
        self.log.set_retention(retention);
    }

    /// Prunes everything for deletion. True once nothing of the entry is
    /// held anymore.
    pub(crate) fn drain_for_deletion(&self) -> bool {
        self.log.drain_for_deletion()
    }

    // Diagnostics

    pub fn latest_sequence(&self) -> SequenceId {
        self.log.latest_sequence()
    }

    pub fn retained_count(&self) -> u32 {
        self.log.retained_count()
    }

    pub fn live_nodes(&self) -> usize {
        self.log.live_nodes()
    }

    pub fn allocated_nodes(&self) -> usize {
        self.log.allocated_nodes()
    }
}
