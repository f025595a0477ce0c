use std::sync::Arc;

use crate::{
    channel::{channel::Channel, error::ChannelError},
    entry::Entry,
    records::record::{Record, RecordClass},
    types::{CreationId, EntryId, SequenceId, TimeSpec},
};

/// Writing client of a channel, owning one entry.
///
/// The entry is requested from the master when the token is created and
/// writes fail with [`ChannelError::WriterNotValid`] until it is
/// confirmed. Dropping the token requests the entry's deletion.
pub struct WriteToken {
    channel: Arc<Channel>,
    creation: CreationId,
    class_name: &'static str,
    entry: Option<Arc<Entry>>,
}

impl WriteToken {
    pub(crate) fn new(channel: Arc<Channel>, creation: CreationId, class_name: &'static str) -> Self {
        Self {
            channel,
            creation,
            class_name,
            entry: None,
        }
    }

    pub fn creation(&self) -> CreationId {
        self.creation
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Whether the master turned this writer's entry request down. A refused
    /// writer never becomes valid.
    pub fn is_refused(&self) -> bool {
        self.entry.is_none()
            && self
                .channel
                .topology()
                .lock()
                .writers
                .get(&self.creation)
                .is_some_and(|writer| writer.refused)
    }

    fn confirmed_entry(&self) -> Option<Arc<Entry>> {
        self.channel
            .topology()
            .lock()
            .writers
            .get(&self.creation)
            .and_then(|writer| writer.entry.clone())
    }

    fn resolve(&mut self) -> Result<&Arc<Entry>, ChannelError> {
        if self.entry.is_none() {
            self.entry = self.confirmed_entry();
        }
        if self.entry.is_none() && self.is_refused() {
            return Err(ChannelError::WriterRefused {
                creation: self.creation,
            });
        }
        self.entry.as_ref().ok_or(ChannelError::WriterNotValid {
            creation: self.creation,
        })
    }

    /// Whether the master confirmed this writer's entry
    pub fn is_valid(&self) -> bool {
        self.entry.is_some() || self.confirmed_entry().is_some()
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        match &self.entry {
            Some(entry) => Some(entry.id()),
            None => self.confirmed_entry().map(|entry| entry.id()),
        }
    }

    pub fn write<R: RecordClass>(&mut self, record: R, time: TimeSpec) -> Result<SequenceId, ChannelError> {
        self.write_boxed(Box::new(record), time)
    }

    pub fn write_boxed(&mut self, record: Box<dyn Record>, time: TimeSpec) -> Result<SequenceId, ChannelError> {
        let entry = self.resolve()?;
        Ok(entry.write(record, time)?)
    }
}

impl Drop for WriteToken {
    fn drop(&mut self) {
        self.entry = None;
        self.channel.remove_writer(self.creation);
    }
}
