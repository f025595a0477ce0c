use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use log::{debug, trace};
use parking_lot::Mutex;

use tandem_shared::{
    Channel, ChannelCommand, ChannelCommandType, ChannelConfig, ChannelError, EndId, EndRole,
    EntryId, RecordKinds, SequenceId, ServiceRegistry, TransportClass, TransportNotifier,
    WireReader, WireStore,
};

/// Counts the data notifications of one end's transport
#[derive(Default)]
pub struct PendingData(AtomicU32);

impl PendingData {
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::AcqRel)
    }
}

impl TransportNotifier for PendingData {
    fn notify(&self, _: EntryId, _: SequenceId, _: usize) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

struct NetworkEnd {
    channel: Arc<Channel>,
    transport: usize,
    pending: Arc<PendingData>,
}

/// In-process network of channel ends sharing one channel.
///
/// End 0 hosts the master, the others are members. Configuration frames
/// are routed the way a real deployment would: requests from members to
/// the master, master commands to every member.
pub struct ChannelNetwork {
    config: ChannelConfig,
    kinds: RecordKinds,
    ends: Vec<NetworkEnd>,
    services: Mutex<ServiceRegistry>,
    data_capacity: usize,
    sent: Mutex<Vec<(EndId, ChannelCommand)>>,
}

impl ChannelNetwork {
    /// Master end plus `members` member ends
    pub fn new(config: ChannelConfig, kinds: RecordKinds, members: usize) -> Self {
        let mut network = Self {
            config,
            kinds,
            ends: Vec::new(),
            services: Mutex::new(ServiceRegistry::new()),
            data_capacity: 1_200,
            sent: Mutex::new(Vec::new()),
        };
        network.add_end_with_role(EndRole::Master);
        for _ in 0..members {
            network.add_end_with_role(EndRole::Member);
        }
        network
    }

    /// Capacity of every store data is packed into
    pub fn with_data_capacity(mut self, capacity: usize) -> Self {
        self.data_capacity = capacity;
        self
    }

    /// Adds a member end, it joins on its next service
    pub fn add_end(&mut self) -> EndId {
        self.add_end_with_role(EndRole::Member)
    }

    fn add_end_with_role(&mut self, role: EndRole) -> EndId {
        let end = self.ends.len() as EndId;
        let channel = Channel::new(self.config.clone(), self.kinds.clone(), end, role);
        let pending = Arc::new(PendingData::default());
        let transport = channel.add_transport(TransportClass::Regular, pending.clone());
        self.services.lock().add(channel.clone());
        self.ends.push(NetworkEnd {
            channel,
            transport,
            pending,
        });
        end
    }

    pub fn end(&self, end: EndId) -> &Arc<Channel> {
        &self.ends[usize::from(end)].channel
    }

    pub fn master(&self) -> &Arc<Channel> {
        self.end(0)
    }

    pub fn end_count(&self) -> usize {
        self.ends.len()
    }

    /// Data notifications an end's transport received since the last call
    pub fn take_pending(&self, end: EndId) -> u32 {
        self.ends[usize::from(end)].pending.take()
    }

    // Configuration

    /// Moves every queued configuration frame to its destinations, returns
    /// the number of frames moved
    pub fn route_config(&self) -> usize {
        let mut moved = 0;
        for (from, source) in self.ends.iter().enumerate() {
            while let Some(bytes) = source.channel.pop_outgoing() {
                moved += 1;
                self.record(from as EndId, &bytes);
                if source.channel.is_master() {
                    for target in self.ends.iter().filter(|end| !end.channel.is_master()) {
                        self.deliver_config(&target.channel, &bytes);
                    }
                } else {
                    self.deliver_config(self.master(), &bytes);
                }
            }
        }
        moved
    }

    fn deliver_config(&self, target: &Channel, bytes: &[u8]) {
        if target.receive_config(bytes) == 0 {
            panic!("end {} accepted nothing from a configuration frame", target.end());
        }
    }

    fn record(&self, from: EndId, bytes: &[u8]) {
        let mut reader = WireReader::new(bytes);
        match reader.unpack::<ChannelCommand>() {
            Ok(command) => {
                debug!("end {} sent {:?}", from, command);
                self.sent.lock().push((from, command));
            }
            Err(error) => trace!("end {} sent an undecodable frame: {}", from, error),
        }
    }

    /// Services every end once, in the order the ends were added
    pub fn service_all(&self) {
        self.services.lock().tick();
    }

    pub fn ticks(&self) -> u64 {
        self.services.lock().ticks()
    }

    /// One service tick on every end followed by routing
    pub fn round(&self) -> usize {
        self.service_all();
        self.route_config()
    }

    pub fn rounds(&self, count: usize) {
        for _ in 0..count {
            self.round();
        }
    }

    /// Runs rounds until no configuration traffic is left, at most `limit`.
    /// Returns the number of rounds run.
    pub fn settle(&self, limit: usize) -> usize {
        for round in 1..=limit {
            if self.round() == 0 {
                return round;
            }
        }
        limit
    }

    /// Every command sent so far, with the end that sent it
    pub fn sent_commands(&self) -> Vec<(EndId, ChannelCommand)> {
        self.sent.lock().clone()
    }

    pub fn count_sent(&self, kind: ChannelCommandType) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|(_, command)| command.command_type() == kind)
            .count()
    }

    // Data

    /// Packs everything `from` has pending for its transport and hands the
    /// same bytes to each end in `targets`. Ends not listed miss the data.
    /// Returns the messages each target applied, in `targets` order.
    pub fn transfer_data(&self, from: EndId, targets: &[EndId]) -> Result<Vec<u32>, ChannelError> {
        let source = &self.ends[usize::from(from)];
        let mut applied = vec![0; targets.len()];
        loop {
            let mut store = WireStore::new(self.data_capacity);
            let report = source.channel.pack_data(source.transport, &mut store)?;
            if report.messages == 0 {
                break;
            }

            let bytes = &store.as_bytes()[..report.complete_len];
            for (index, target) in targets.iter().enumerate() {
                let mut reader = WireReader::new(bytes);
                applied[index] += self.end(*target).receive_data(&mut reader)?;
            }
            if !report.store_full {
                break;
            }
        }
        Ok(applied)
    }

    /// Transfers the data of `from` to every other end
    pub fn broadcast_data(&self, from: EndId) -> Result<Vec<u32>, ChannelError> {
        let targets: Vec<EndId> = (0..self.ends.len() as EndId)
            .filter(|end| *end != from)
            .collect();
        self.transfer_data(from, &targets)
    }
}
