use std::sync::Arc;

use crate::{
    channel::{
        channel::Channel,
        read_options::{ReadMode, ReadOptions},
        watcher::ChannelEvent,
    },
    entry::Entry,
    entry_log::{DataAccess, SequentialCursor, SequentialRead},
    records::record::Record,
    types::{ClientId, EntryId, SequenceId, TimeSpec, TimeTick, MAX_TIMETICK},
};

struct EntryLink {
    entry: Arc<Entry>,
    /// Present for sequential readers only
    cursor: Option<SequentialCursor>,
}

/// Claimed record handed out by a [`ReadToken`]
pub struct RecordAccess<'a> {
    entry: EntryId,
    access: DataAccess<'a, Box<dyn Record>>,
}

impl RecordAccess<'_> {
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn record(&self) -> &dyn Record {
        self.access.data().as_ref()
    }

    /// The record as its concrete class, `None` for another class
    pub fn get<R: Record>(&self) -> Option<&R> {
        self.record().downcast_ref::<R>()
    }

    pub fn sequence(&self) -> SequenceId {
        self.access.sequence()
    }

    pub fn time(&self) -> TimeSpec {
        self.access.time()
    }
}

pub enum ReadOutcome<'a> {
    Data(RecordAccess<'a>),
    /// Discontinuity in stream data, reported to sequential readers
    Gap(TimeSpec),
    NoData,
}

impl ReadOutcome<'_> {
    pub fn is_data(&self) -> bool {
        matches!(self, ReadOutcome::Data(_))
    }
}

/// Reading client of a channel.
///
/// Attaches lazily to every valid entry of its record class (or a
/// subclass) that its selector matches. Attachments are only re-evaluated
/// when the channel's configuration version moved since the last read.
pub struct ReadToken {
    channel: Arc<Channel>,
    client: ClientId,
    class_name: &'static str,
    options: ReadOptions,
    seen_version: Option<u32>,
    links: Vec<EntryLink>,
    selected: Option<EntryId>,
}

impl ReadToken {
    pub(crate) fn new(
        channel: Arc<Channel>,
        client: ClientId,
        class_name: &'static str,
        options: ReadOptions,
    ) -> Self {
        Self {
            channel,
            client,
            class_name,
            options,
            seen_version: None,
            links: Vec::new(),
            selected: None,
        }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Brings the attachments up to date, returns whether they were
    /// re-evaluated
    pub fn refresh(&mut self) -> bool {
        if self.seen_version == Some(self.channel.version()) {
            return false;
        }

        let mut events = Vec::new();
        {
            let topology = self.channel.topology().lock();
            // topology changes bump the version under this lock
            let version = self.channel.version();
            let matching = topology.matching_entries(
                self.channel.record_kinds(),
                self.class_name,
                &self.options.selector,
            );

            let mut previous = std::mem::take(&mut self.links);
            for entry in matching {
                if let Some(position) = previous
                    .iter()
                    .position(|link| Arc::ptr_eq(&link.entry, &entry))
                {
                    self.links.push(previous.swap_remove(position));
                    continue;
                }

                let cursor = match self.options.mode {
                    ReadMode::Sequential => Some(entry.attach_sequential()),
                    ReadMode::TimeIndexed => None,
                };
                entry.reader_attached();
                events.push(ChannelEvent::ClientAttached {
                    client: self.client,
                    entry: entry.id(),
                });
                self.links.push(EntryLink { entry, cursor });
            }

            for link in previous {
                events.push(ChannelEvent::ClientDetached {
                    client: self.client,
                    entry: link.entry.id(),
                });
                Self::detach(link);
            }

            self.seen_version = Some(version);
        }

        if !self
            .selected
            .is_some_and(|selected| self.links.iter().any(|link| link.entry.id() == selected))
        {
            self.selected = self.links.first().map(|link| link.entry.id());
        }

        self.channel.emit(events);
        true
    }

    fn detach(link: EntryLink) {
        if let Some(cursor) = link.cursor {
            link.entry.detach_sequential(cursor);
        }
        link.entry.reader_detached();
    }

    /// Ids of the entries this token is attached to, ordered by id
    pub fn attached_entries(&mut self) -> Vec<EntryId> {
        self.refresh();
        self.links.iter().map(|link| link.entry.id()).collect()
    }

    pub fn selected_entry(&mut self) -> Option<EntryId> {
        self.refresh();
        self.selected
    }

    pub fn select_first_entry(&mut self) -> Option<EntryId> {
        self.refresh();
        self.selected = self.links.first().map(|link| link.entry.id());
        self.selected
    }

    /// Moves the selection to the attached entry after the current one.
    /// Returns `None`, keeping the selection, when it is the last one.
    pub fn select_next_entry(&mut self) -> Option<EntryId> {
        self.refresh();
        let current = self
            .selected
            .and_then(|selected| self.links.iter().position(|link| link.entry.id() == selected));
        let next = match current {
            Some(position) => self.links.get(position + 1),
            None => self.links.first(),
        }?
        .entry
        .id();
        self.selected = Some(next);
        Some(next)
    }

    /// Reads the selected entry at `tick`.
    ///
    /// Time-indexed readers get the record valid at `tick`. Sequential
    /// readers get the next unread record starting no later than `tick`,
    /// or the next gap.
    pub fn read(&mut self, tick: TimeTick) -> ReadOutcome<'_> {
        self.refresh();
        let Some(selected) = self.selected else {
            return ReadOutcome::NoData;
        };
        let Some(link) = self.links.iter_mut().find(|link| link.entry.id() == selected) else {
            return ReadOutcome::NoData;
        };

        let EntryLink { entry, cursor } = link;
        let entry: &Entry = entry;
        match cursor {
            Some(cursor) => match entry.read_sequential(cursor, tick) {
                SequentialRead::Data(access) => ReadOutcome::Data(RecordAccess { entry: selected, access }),
                SequentialRead::Gap(time) => ReadOutcome::Gap(time),
                SequentialRead::Nothing => ReadOutcome::NoData,
            },
            None => match entry.read_at(tick) {
                Some(access) => ReadOutcome::Data(RecordAccess { entry: selected, access }),
                None => ReadOutcome::NoData,
            },
        }
    }

    /// Most recent record of the selected entry, whatever the read mode.
    /// Does not move a sequential reader.
    pub fn read_latest(&mut self) -> Option<RecordAccess<'_>> {
        self.refresh();
        let selected = self.selected?;
        let link = self.links.iter().find(|link| link.entry.id() == selected)?;
        link.entry
            .read_at(MAX_TIMETICK)
            .map(|access| RecordAccess { entry: selected, access })
    }
}

impl Drop for ReadToken {
    fn drop(&mut self) {
        let events: Vec<ChannelEvent> = self
            .links
            .drain(..)
            .map(|link| {
                let entry = link.entry.id();
                Self::detach(link);
                ChannelEvent::ClientDetached {
                    client: self.client,
                    entry,
                }
            })
            .collect();
        self.channel.remove_reader(self.client);
        self.channel.emit(events);
    }
}
