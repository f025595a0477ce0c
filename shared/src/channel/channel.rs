use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use tandem_serde::{SerdeErr, WireReader, WireStore};

use crate::{
    async_queue::AsyncQueue,
    channel::{
        config::ChannelConfig,
        error::ChannelError,
        read_options::ReadOptions,
        read_token::ReadToken,
        topology::{ClientRecord, Topology, TransportSlot, WriterRecord},
        watcher::{ChannelEvent, ChannelWatcher},
        write_token::WriteToken,
    },
    entry::{
        Entry, EntryDescription, EntryError, EntryOptions, EntryTrigger, PackReport, RemoteUpdate,
        TransportClass, TransportNotifier,
    },
    master::ChannelMaster,
    messages::{ChannelCommand, DataHeader, DataMessageKind},
    records::{record::RecordClass, record_kinds::RecordKinds},
    service::PeriodicService,
    types::{ClientId, CreationId, EndId, EntryId},
};

/// Whether a channel end hosts the channel's master
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndRole {
    Master,
    Member,
}

/// One end of a distributed channel.
///
/// Configuration only changes when the end applies commands issued by the
/// master, in the order the master issued them, so every end converges on
/// the same set of entries. Data moves separately through registered
/// transports, see [`Channel::pack_data`] and [`Channel::receive_data`].
pub struct Channel {
    config: ChannelConfig,
    kinds: RecordKinds,
    end: EndId,
    role: EndRole,
    version: AtomicU32,
    topology: Mutex<Topology>,
    watchers: Mutex<Vec<Box<dyn ChannelWatcher>>>,
    requests: AsyncQueue<ChannelCommand>,
    changes: AsyncQueue<ChannelCommand>,
    outgoing: AsyncQueue<Vec<u8>>,
    full_requests: AsyncQueue<EntryId>,
    master: Mutex<Option<ChannelMaster>>,
    joined: AtomicBool,
    next_creation: AtomicU32,
    next_client: AtomicU32,
}

impl Channel {
    pub fn new(config: ChannelConfig, kinds: RecordKinds, end: EndId, role: EndRole) -> Arc<Self> {
        let master = match role {
            EndRole::Master => Some(ChannelMaster::new(end, config.arity, kinds.clone())),
            EndRole::Member => None,
        };
        let spares = config.queue_spares;

        Arc::new(Self {
            config,
            kinds,
            end,
            role,
            version: AtomicU32::new(0),
            topology: Mutex::new(Topology::default()),
            watchers: Mutex::new(Vec::new()),
            requests: AsyncQueue::new(spares),
            changes: AsyncQueue::new(spares),
            outgoing: AsyncQueue::new(spares),
            full_requests: AsyncQueue::new(spares),
            master: Mutex::new(master),
            joined: AtomicBool::new(role == EndRole::Master),
            next_creation: AtomicU32::new(1),
            next_client: AtomicU32::new(1),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn end(&self) -> EndId {
        self.end
    }

    pub fn is_master(&self) -> bool {
        self.role == EndRole::Master
    }

    pub fn record_kinds(&self) -> &RecordKinds {
        &self.kinds
    }

    /// Incremented on every entry or client topology change
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn topology(&self) -> &Mutex<Topology> {
        &self.topology
    }

    // Tokens

    /// Creates a writer. Its entry exists once the master confirms it,
    /// see [`WriteToken::is_valid`].
    pub fn add_write_token<R: RecordClass>(
        self: &Arc<Self>,
        options: EntryOptions,
    ) -> Result<WriteToken, ChannelError> {
        self.register_writer::<R>(options, None)
    }

    /// Like [`Channel::add_write_token`], calling `on_valid` once the entry
    /// is confirmed
    pub fn add_write_token_with_callback<R: RecordClass>(
        self: &Arc<Self>,
        options: EntryOptions,
        on_valid: impl FnOnce(EntryId) + Send + 'static,
    ) -> Result<WriteToken, ChannelError> {
        self.register_writer::<R>(options, Some(Box::new(on_valid)))
    }

    fn register_writer<R: RecordClass>(
        self: &Arc<Self>,
        options: EntryOptions,
        on_valid: Option<Box<dyn FnOnce(EntryId) + Send>>,
    ) -> Result<WriteToken, ChannelError> {
        let magic = self.kinds.magic(R::CLASS_NAME)?;
        let creation = self.next_creation.fetch_add(1, Ordering::Relaxed);
        let request = ChannelCommand::NewEntryReq {
            end: self.end,
            creation,
            class_name: R::CLASS_NAME.to_string(),
            magic,
            label: options.label.clone(),
            time_aspect: options.time_aspect,
            retention: options.retention.unwrap_or(self.config.retention),
            reservations: options.reservations,
        };

        self.topology.lock().writers.insert(
            creation,
            WriterRecord {
                class_name: R::CLASS_NAME,
                options,
                entry: None,
                on_valid,
                abandoned: false,
                refused: false,
            },
        );
        self.send_request(request)?;
        debug!("channel {:?}: writer {} requested an entry", self.name(), creation);

        Ok(WriteToken::new(self.clone(), creation, R::CLASS_NAME))
    }

    pub(crate) fn remove_writer(&self, creation: CreationId) {
        let entry = {
            let mut topology = self.topology.lock();
            let Some(writer) = topology.writers.get_mut(&creation) else {
                return;
            };
            match writer.entry.as_ref().map(|entry| entry.id()) {
                Some(entry) => {
                    topology.writers.remove(&creation);
                    entry
                }
                None if writer.refused => {
                    topology.writers.remove(&creation);
                    return;
                }
                None => {
                    writer.abandoned = true;
                    writer.on_valid = None;
                    return;
                }
            }
        };
        if let Err(error) = self.send_request(ChannelCommand::DeleteEntryReq { entry }) {
            warn!("channel {:?}: could not request deletion of entry {}: {}", self.name(), entry, error);
        }
    }

    pub fn add_read_token<R: RecordClass>(
        self: &Arc<Self>,
        options: ReadOptions,
    ) -> Result<ReadToken, ChannelError> {
        self.register_reader(R::CLASS_NAME, options, None)
    }

    /// Like [`Channel::add_read_token`], firing `trigger` on every write to
    /// an entry the token matches
    pub fn add_read_token_with_trigger<R: RecordClass>(
        self: &Arc<Self>,
        options: ReadOptions,
        trigger: Arc<dyn EntryTrigger>,
    ) -> Result<ReadToken, ChannelError> {
        self.register_reader(R::CLASS_NAME, options, Some(trigger))
    }

    /// Reader of a class given by name, for readers that only know the
    /// class at runtime
    pub fn add_read_token_for_class(
        self: &Arc<Self>,
        class_name: &str,
        options: ReadOptions,
        trigger: Option<Arc<dyn EntryTrigger>>,
    ) -> Result<ReadToken, ChannelError> {
        let class_name = self.kinds.kind(class_name)?.name;
        self.register_reader(class_name, options, trigger)
    }

    fn register_reader(
        self: &Arc<Self>,
        class_name: &'static str,
        options: ReadOptions,
        trigger: Option<Arc<dyn EntryTrigger>>,
    ) -> Result<ReadToken, ChannelError> {
        let client = self.next_client.fetch_add(1, Ordering::Relaxed);
        let record = ClientRecord {
            class_name: class_name.to_string(),
            selector: options.selector.clone(),
            trigger,
        };

        {
            let mut topology = self.topology.lock();
            if let Some(trigger) = &record.trigger {
                for entry in topology.entries() {
                    if entry.is_valid() && record.matches(&self.kinds, entry) {
                        entry.add_trigger(client, trigger.clone());
                    }
                }
            }
            topology.clients.insert(client, record);
            self.bump_version();
        }

        self.send_request(ChannelCommand::NewClientNotif {
            end: self.end,
            client,
            class_name: class_name.to_string(),
            selector: options.selector.clone(),
            reserve: options.reserve,
        })?;

        Ok(ReadToken::new(self.clone(), client, class_name, options))
    }

    pub(crate) fn remove_reader(&self, client: ClientId) {
        {
            let mut topology = self.topology.lock();
            if topology.clients.remove(&client).is_none() {
                return;
            }
            for entry in topology.entries() {
                entry.remove_trigger(client);
            }
            self.bump_version();
        }
        if let Err(error) = self.send_request(ChannelCommand::LeaveClientNotif {
            end: self.end,
            client,
        }) {
            warn!("channel {:?}: could not announce leaving reader {}: {}", self.name(), client, error);
        }
    }

    // Watchers

    /// Registers a monitor. It first receives `EntryAdded` for every live
    /// entry, then every later change.
    pub fn add_watcher(&self, mut watcher: Box<dyn ChannelWatcher>) {
        let topology = self.topology.lock();
        let mut watchers = self.watchers.lock();
        for entry in topology.entries().filter(|entry| entry.is_valid()) {
            watcher.on_event(self.name(), &Self::entry_added(entry));
        }
        watchers.push(watcher);
    }

    pub(crate) fn emit(&self, events: Vec<ChannelEvent>) {
        if events.is_empty() {
            return;
        }
        let mut watchers = self.watchers.lock();
        for event in &events {
            for watcher in watchers.iter_mut() {
                watcher.on_event(self.name(), event);
            }
        }
    }

    fn entry_added(entry: &Entry) -> ChannelEvent {
        ChannelEvent::EntryAdded {
            entry: entry.id(),
            origin: entry.origin(),
            class_name: entry.class_name().to_string(),
            label: entry.label().to_string(),
        }
    }

    // Configuration traffic

    fn encode(&self, command: &ChannelCommand) -> Result<Vec<u8>, ChannelError> {
        let mut store = WireStore::new(self.config.config_store_capacity);
        store.pack(command)?;
        Ok(store.to_bytes())
    }

    /// Routes a request to the master, locally or over the wire
    fn send_request(&self, request: ChannelCommand) -> Result<(), ChannelError> {
        if self.is_master() {
            self.requests.push(request);
        } else {
            self.outgoing.push(self.encode(&request)?);
        }
        Ok(())
    }

    /// Sends a master command to every other end and queues it locally
    fn broadcast(&self, command: ChannelCommand) {
        match self.encode(&command) {
            Ok(bytes) => self.outgoing.push(bytes),
            Err(error) => warn!("channel {:?}: could not encode {:?}: {}", self.name(), command, error),
        }
        self.changes.push(command);
    }

    /// Next encoded configuration message for the other ends
    pub fn pop_outgoing(&self) -> Option<Vec<u8>> {
        self.outgoing.pop()
    }

    /// Queues configuration messages received from another end. They are
    /// applied on the next service. A command that cannot be decoded is
    /// logged and the rest of the frame dropped, the commands before it
    /// stay queued. Returns the number of commands accepted.
    pub fn receive_config(&self, bytes: &[u8]) -> usize {
        let mut reader = WireReader::new(bytes);
        let mut received = 0;
        while !reader.is_empty() {
            let command: ChannelCommand = match reader.unpack() {
                Ok(command) => command,
                Err(error) => {
                    warn!(
                        "channel {:?}: malformed configuration frame, {} bytes dropped: {}",
                        self.name(),
                        reader.remaining(),
                        error
                    );
                    break;
                }
            };
            match (self.is_master(), command.is_request()) {
                (true, true) => self.requests.push(command),
                (false, false) => self.changes.push(command),
                _ => trace!("channel {:?}: ignoring {:?}", self.name(), command.command_type()),
            }
            received += 1;
        }
        received
    }

    /// Drains the queues: announces this end to the master once, runs the
    /// master if hosted here, then applies all pending commands
    pub fn service(&self) {
        if !self.joined.swap(true, Ordering::AcqRel) {
            if let Err(error) = self.send_request(ChannelCommand::NewEndJoins { end: self.end }) {
                warn!("channel {:?}: could not announce end {}: {}", self.name(), self.end, error);
            }
        }

        self.run_master();

        while let Some(command) = self.changes.pop() {
            if let Err(error) = self.apply_change(command) {
                warn!("channel {:?}: {}", self.name(), error);
            }
        }
    }

    fn run_master(&self) {
        let mut master = self.master.lock();
        let Some(master) = master.as_mut() else {
            return;
        };

        while let Some(request) = self.requests.pop() {
            let refusal = match &request {
                ChannelCommand::NewEntryReq { end, creation, .. } => {
                    Some(ChannelCommand::NewEntryRefused {
                        end: *end,
                        creation: *creation,
                    })
                }
                _ => None,
            };
            match master.apply(request) {
                Ok(commands) => {
                    for command in commands {
                        self.broadcast(command);
                    }
                }
                Err(error) => {
                    warn!("channel {:?}: request dropped: {}", self.name(), error);
                    if let Some(refusal) = refusal {
                        self.broadcast(refusal);
                    }
                }
            }
        }
        for command in master.sweep() {
            self.broadcast(command);
        }
    }

    /// Read access to the master, on the end hosting it
    pub fn with_master<T>(&self, f: impl FnOnce(&ChannelMaster) -> T) -> Option<T> {
        self.master.lock().as_ref().map(f)
    }

    fn apply_change(&self, command: ChannelCommand) -> Result<(), ChannelError> {
        match command {
            ChannelCommand::NewEntryConf {
                entry,
                end,
                creation,
                class_name,
                label,
                time_aspect,
                retention,
                saveup,
            } => {
                let mut topology = self.topology.lock();
                if topology.entry(entry).is_some() {
                    trace!("channel {:?}: entry {} already known", self.name(), entry);
                    return Ok(());
                }

                let own = end == self.end;
                let (local_writer, transport, packing) =
                    match topology.writers.get(&creation).filter(|_| own) {
                        Some(writer) => (true, writer.options.transport, writer.options.packing),
                        None => (false, TransportClass::default(), Default::default()),
                    };
                let new_entry = Arc::new(Entry::new(EntryDescription {
                    id: entry,
                    creation,
                    origin: end,
                    class_name,
                    label,
                    time_aspect,
                    retention,
                    saveup,
                    local_writer,
                    transport,
                    packing,
                })?);

                for (client, record) in &topology.clients {
                    if let Some(trigger) = &record.trigger {
                        if record.matches(&self.kinds, &new_entry) {
                            new_entry.add_trigger(*client, trigger.clone());
                        }
                    }
                }
                if local_writer {
                    for (index, slot) in topology.transports.iter().enumerate() {
                        if slot.class == transport {
                            new_entry.add_transport(index, slot.notifier.clone());
                        }
                    }
                }
                topology.insert_entry(new_entry.clone());

                let mut abandoned = false;
                let mut on_valid = None;
                if local_writer {
                    if let Some(writer) = topology.writers.get_mut(&creation) {
                        if writer.abandoned {
                            abandoned = true;
                            topology.writers.remove(&creation);
                        } else {
                            writer.entry = Some(new_entry.clone());
                            on_valid = writer.on_valid.take();
                        }
                    }
                }
                self.bump_version();
                drop(topology);

                info!(
                    "channel {:?}: entry {} ({:?}) confirmed",
                    self.name(),
                    entry,
                    new_entry.class_name()
                );
                self.emit(vec![Self::entry_added(&new_entry)]);

                if abandoned {
                    self.send_request(ChannelCommand::DeleteEntryReq { entry })?;
                }
                if let Some(on_valid) = on_valid {
                    on_valid(entry);
                }
            }
            ChannelCommand::InvalidateEntryCmd { entry } => {
                let mut topology = self.topology.lock();
                let known = topology.entry(entry).cloned();
                let Some(known) = known else {
                    return Err(ChannelError::UnknownEntry { entry });
                };
                known.invalidate();
                known.detach_transports();
                topology.unlink_class(entry);
                self.bump_version();
                drop(topology);

                info!("channel {:?}: entry {} invalidated", self.name(), entry);
                self.emit(vec![ChannelEvent::EntryRemoved { entry }]);
            }
            ChannelCommand::CleanEntryCmd { entry, round } => {
                let mut topology = self.topology.lock();
                if topology.confirmed_cleanups.contains(&entry) {
                    return Ok(());
                }
                let drained = match topology.entry(entry) {
                    Some(known) => known.drain_for_deletion(),
                    None => true,
                };
                if !drained {
                    debug!(
                        "channel {:?}: entry {} still held in cleanup round {}",
                        self.name(),
                        entry,
                        round
                    );
                    return Ok(());
                }
                topology.confirmed_cleanups.insert(entry);
                drop(topology);

                self.send_request(ChannelCommand::CleanEntryConf {
                    entry,
                    end: self.end,
                })?;
            }
            ChannelCommand::DeleteEntryCmd { entry } => {
                let mut topology = self.topology.lock();
                topology.confirmed_cleanups.remove(&entry);
                if topology.remove_entry(entry).is_none() {
                    return Err(ChannelError::UnknownEntry { entry });
                }
                self.bump_version();
                drop(topology);

                info!("channel {:?}: entry {} deleted", self.name(), entry);
            }
            ChannelCommand::RemoveSaveupCmd { entry } => {
                let known = self.topology.lock().entry(entry).cloned();
                let Some(known) = known else {
                    return Err(ChannelError::UnknownEntry { entry });
                };
                known.remove_saveup();
                debug!("channel {:?}: entry {} resumes pruning", self.name(), entry);
            }
            ChannelCommand::NewEntryRefused { end, creation } => {
                if end != self.end {
                    return Ok(());
                }
                let mut topology = self.topology.lock();
                let Some(writer) = topology.writers.get_mut(&creation) else {
                    return Ok(());
                };
                warn!(
                    "channel {:?}: master refused the {:?} entry of writer {}",
                    self.name(),
                    writer.class_name,
                    creation
                );
                if writer.abandoned {
                    topology.writers.remove(&creation);
                } else {
                    writer.refused = true;
                    writer.on_valid = None;
                }
            }
            ChannelCommand::Welcome { end } => {
                if end == self.end {
                    info!("channel {:?}: end {} welcomed by master", self.name(), end);
                }
            }
            request => {
                trace!(
                    "channel {:?}: {:?} is for the master only",
                    self.name(),
                    request.command_type()
                );
            }
        }
        Ok(())
    }

    // Data traffic

    /// Registers a transport forwarding the locally written entries of
    /// `class`. Returns the transport index used by [`Channel::pack_data`].
    pub fn add_transport(&self, class: TransportClass, notifier: Arc<dyn TransportNotifier>) -> usize {
        let mut topology = self.topology.lock();
        let index = topology.transports.len();
        for entry in topology.entries() {
            if entry.is_local_writer() && entry.is_valid() && entry.transport_class() == class {
                entry.add_transport(index, notifier.clone());
            }
        }
        topology.transports.push(TransportSlot { class, notifier });
        index
    }

    /// Packs pending full record requests, then every record not yet sent
    /// on `transport`. Only `report.complete_len` bytes of the store may be
    /// sent; whatever did not fit goes out on the next call. Records that
    /// can never be packed are skipped and counted in `report.skipped`.
    pub fn pack_data(&self, transport: usize, store: &mut WireStore) -> Result<PackReport, ChannelError> {
        let entries: Vec<Arc<Entry>> = {
            let topology = self.topology.lock();
            let Some(slot) = topology.transports.get(transport) else {
                return Err(ChannelError::UnknownTransport { transport });
            };
            topology
                .entries()
                .filter(|entry| {
                    entry.is_local_writer() && entry.is_valid() && entry.transport_class() == slot.class
                })
                .cloned()
                .collect()
        };

        let mut report = PackReport {
            complete_len: store.len(),
            ..PackReport::default()
        };

        while let Some(entry) = self.full_requests.pop() {
            match Self::pack_full_request(store, entry) {
                Ok(()) => {
                    report.messages += 1;
                    report.complete_len = store.len();
                }
                Err(SerdeErr::BufferBoundary { .. }) => {
                    self.full_requests.push(entry);
                    report.store_full = true;
                    return Ok(report);
                }
                Err(error) => {
                    store.rewind(report.complete_len);
                    warn!(
                        "channel {:?}: full record request for entry {} dropped: {}",
                        self.name(),
                        entry,
                        error
                    );
                }
            }
        }

        for entry in entries {
            match entry.pack(transport, store, self.config.full_pack_interval, &mut report) {
                Ok(()) => {}
                Err(EntryError::Serde(SerdeErr::BufferBoundary { .. })) => {
                    report.store_full = true;
                    break;
                }
                Err(error) => {
                    store.rewind(report.complete_len);
                    warn!("channel {:?}: entry {} not packed: {}", self.name(), entry.id(), error);
                }
            }
        }

        Ok(report)
    }

    fn pack_full_request(store: &mut WireStore, entry: EntryId) -> Result<(), SerdeErr> {
        store.pack(&DataHeader {
            kind: DataMessageKind::FullDataReq,
            entry,
        })?;
        let mark = store.start_mark()?;
        store.end_mark(mark)
    }

    /// Applies data messages from another end. Messages for unknown entries
    /// and messages that fail to apply are skipped, the rest still apply.
    pub fn receive_data(&self, reader: &mut WireReader) -> Result<u32, ChannelError> {
        let mut applied = 0;
        while !reader.is_empty() {
            let header: DataHeader = reader.unpack()?;
            let size = reader.read_mark()?;
            let mut body = reader.sub_reader(size)?;

            let entry = self.topology.lock().entry(header.entry).cloned();
            let Some(entry) = entry else {
                warn!(
                    "channel {:?}: {:?} for unknown entry {} skipped",
                    self.name(),
                    header.kind,
                    header.entry
                );
                continue;
            };

            match self.apply_data(&entry, header.kind, &mut body) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(error) => warn!(
                    "channel {:?}: {:?} for entry {} dropped: {}",
                    self.name(),
                    header.kind,
                    header.entry,
                    error
                ),
            }
        }
        Ok(applied)
    }

    fn apply_data(
        &self,
        entry: &Entry,
        kind: DataMessageKind,
        body: &mut WireReader,
    ) -> Result<bool, ChannelError> {
        if kind == DataMessageKind::FullDataReq {
            if entry.is_local_writer() {
                entry.request_full();
                return Ok(true);
            }
            return Ok(false);
        }
        if entry.is_local_writer() {
            warn!(
                "channel {:?}: remote data for locally written entry {} ignored",
                self.name(),
                entry.id()
            );
            return Ok(false);
        }

        match kind {
            DataMessageKind::FullData => {
                let sequence = body.unpack()?;
                let time = body.unpack()?;
                let mut record = self.kinds.create(entry.class_name())?;
                record.de_into(body)?;
                entry.receive_full(sequence, time, record)?;
                Ok(true)
            }
            DataMessageKind::DiffData => {
                let sequence = body.unpack()?;
                let base = body.unpack()?;
                let time = body.unpack()?;
                match entry.receive_difference(sequence, base, time, body)? {
                    RemoteUpdate::Applied => Ok(true),
                    RemoteUpdate::Skipped => Ok(false),
                    RemoteUpdate::NeedsFull => {
                        self.full_requests.push(entry.id());
                        Ok(false)
                    }
                }
            }
            DataMessageKind::TimeJump => {
                entry.receive_jump(body.unpack()?)?;
                Ok(true)
            }
            DataMessageKind::FullDataReq => Ok(false),
        }
    }

    // Diagnostics

    pub fn entry(&self, entry: EntryId) -> Option<Arc<Entry>> {
        self.topology.lock().entry(entry).cloned()
    }

    /// Ids of the entries currently valid on this end
    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.topology
            .lock()
            .entries()
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.id())
            .collect()
    }

    pub fn reader_count(&self) -> usize {
        self.topology.lock().clients.len()
    }

    /// Writers registered on this end, including those still waiting for
    /// the master's answer
    pub fn writer_count(&self) -> usize {
        self.topology.lock().writers.len()
    }
}

impl PeriodicService for Channel {
    fn name(&self) -> &str {
        Channel::name(self)
    }

    fn service(&self) {
        Channel::service(self);
    }
}
