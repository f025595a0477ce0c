use tandem_serde::{Serde, SerdeErr, WireReader, WireStore};

use crate::{
    channel::EntrySelector,
    entry_log::Retention,
    types::{ClientId, CreationId, EndId, EntryId, TimeAspect},
};

/// Kind byte of a configuration message on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelCommandType {
    // An end asks for a new entry
    NewEntryReq = 1,
    // The master confirms a new entry to every end
    NewEntryConf = 2,
    // A writer gave up its entry
    DeleteEntryReq = 3,
    // Entry is retracted everywhere, its data is no longer served
    InvalidateEntryCmd = 4,
    // The master asks every end to confirm the entry's log is empty
    CleanEntryCmd = 5,
    // An end confirms it holds nothing of the entry anymore
    CleanEntryConf = 6,
    // Entry is gone, its id may be handed out again
    DeleteEntryCmd = 7,
    // A channel end announces itself to the master
    NewEndJoins = 8,
    // The master acknowledges a joining end
    Welcome = 9,
    // A read token was added on some end
    NewClientNotif = 10,
    // A read token was removed on some end
    LeaveClientNotif = 11,
    // All reservations of an entry are met, pruning may resume
    RemoveSaveupCmd = 12,
    // The master turned down an entry request
    NewEntryRefused = 13,
}

impl ChannelCommandType {
    pub fn from_u8(value: u8) -> Result<Self, SerdeErr> {
        let kind = match value {
            1 => Self::NewEntryReq,
            2 => Self::NewEntryConf,
            3 => Self::DeleteEntryReq,
            4 => Self::InvalidateEntryCmd,
            5 => Self::CleanEntryCmd,
            6 => Self::CleanEntryConf,
            7 => Self::DeleteEntryCmd,
            8 => Self::NewEndJoins,
            9 => Self::Welcome,
            10 => Self::NewClientNotif,
            11 => Self::LeaveClientNotif,
            12 => Self::RemoveSaveupCmd,
            13 => Self::NewEntryRefused,
            _ => {
                return Err(SerdeErr::InvalidValue {
                    reason: "unknown channel command type",
                })
            }
        };
        Ok(kind)
    }

    /// Requests travel from any end to the master, everything else is
    /// broadcast by the master to every end
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::NewEntryReq
                | Self::DeleteEntryReq
                | Self::CleanEntryConf
                | Self::NewEndJoins
                | Self::NewClientNotif
                | Self::LeaveClientNotif
        )
    }
}

/// Configuration traffic of a channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelCommand {
    NewEntryReq {
        end: EndId,
        creation: CreationId,
        class_name: String,
        magic: u32,
        label: String,
        time_aspect: TimeAspect,
        retention: Retention,
        reservations: u32,
    },
    NewEntryConf {
        entry: EntryId,
        end: EndId,
        creation: CreationId,
        class_name: String,
        label: String,
        time_aspect: TimeAspect,
        retention: Retention,
        saveup: bool,
    },
    DeleteEntryReq {
        entry: EntryId,
    },
    InvalidateEntryCmd {
        entry: EntryId,
    },
    CleanEntryCmd {
        entry: EntryId,
        round: u32,
    },
    CleanEntryConf {
        entry: EntryId,
        end: EndId,
    },
    DeleteEntryCmd {
        entry: EntryId,
    },
    NewEndJoins {
        end: EndId,
    },
    Welcome {
        end: EndId,
    },
    NewClientNotif {
        end: EndId,
        client: ClientId,
        class_name: String,
        selector: EntrySelector,
        reserve: bool,
    },
    LeaveClientNotif {
        end: EndId,
        client: ClientId,
    },
    RemoveSaveupCmd {
        entry: EntryId,
    },
    /// Answers a `NewEntryReq` the master dropped, so the requesting end
    /// can let go of its writer
    NewEntryRefused {
        end: EndId,
        creation: CreationId,
    },
}

impl ChannelCommand {
    pub fn command_type(&self) -> ChannelCommandType {
        match self {
            Self::NewEntryReq { .. } => ChannelCommandType::NewEntryReq,
            Self::NewEntryConf { .. } => ChannelCommandType::NewEntryConf,
            Self::DeleteEntryReq { .. } => ChannelCommandType::DeleteEntryReq,
            Self::InvalidateEntryCmd { .. } => ChannelCommandType::InvalidateEntryCmd,
            Self::CleanEntryCmd { .. } => ChannelCommandType::CleanEntryCmd,
            Self::CleanEntryConf { .. } => ChannelCommandType::CleanEntryConf,
            Self::DeleteEntryCmd { .. } => ChannelCommandType::DeleteEntryCmd,
            Self::NewEndJoins { .. } => ChannelCommandType::NewEndJoins,
            Self::Welcome { .. } => ChannelCommandType::Welcome,
            Self::NewClientNotif { .. } => ChannelCommandType::NewClientNotif,
            Self::LeaveClientNotif { .. } => ChannelCommandType::LeaveClientNotif,
            Self::RemoveSaveupCmd { .. } => ChannelCommandType::RemoveSaveupCmd,
            Self::NewEntryRefused { .. } => ChannelCommandType::NewEntryRefused,
        }
    }

    pub fn is_request(&self) -> bool {
        self.command_type().is_request()
    }

    /// Entry the command refers to, if any
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            Self::NewEntryConf { entry, .. }
            | Self::DeleteEntryReq { entry }
            | Self::InvalidateEntryCmd { entry }
            | Self::CleanEntryCmd { entry, .. }
            | Self::CleanEntryConf { entry, .. }
            | Self::DeleteEntryCmd { entry }
            | Self::RemoveSaveupCmd { entry } => Some(*entry),
            _ => None,
        }
    }
}

impl Serde for ChannelCommand {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        (self.command_type() as u8).ser(store)?;
        match self {
            Self::NewEntryReq {
                end,
                creation,
                class_name,
                magic,
                label,
                time_aspect,
                retention,
                reservations,
            } => {
                end.ser(store)?;
                creation.ser(store)?;
                store.pack_str(class_name)?;
                magic.ser(store)?;
                store.pack_str(label)?;
                time_aspect.to_u8().ser(store)?;
                retention.ser(store)?;
                reservations.ser(store)
            }
            Self::NewEntryConf {
                entry,
                end,
                creation,
                class_name,
                label,
                time_aspect,
                retention,
                saveup,
            } => {
                entry.ser(store)?;
                end.ser(store)?;
                creation.ser(store)?;
                store.pack_str(class_name)?;
                store.pack_str(label)?;
                time_aspect.to_u8().ser(store)?;
                retention.ser(store)?;
                saveup.ser(store)
            }
            Self::DeleteEntryReq { entry }
            | Self::InvalidateEntryCmd { entry }
            | Self::DeleteEntryCmd { entry }
            | Self::RemoveSaveupCmd { entry } => entry.ser(store),
            Self::CleanEntryCmd { entry, round } => {
                entry.ser(store)?;
                round.ser(store)
            }
            Self::CleanEntryConf { entry, end } => {
                entry.ser(store)?;
                end.ser(store)
            }
            Self::NewEndJoins { end } | Self::Welcome { end } => end.ser(store),
            Self::NewClientNotif {
                end,
                client,
                class_name,
                selector,
                reserve,
            } => {
                end.ser(store)?;
                client.ser(store)?;
                store.pack_str(class_name)?;
                selector.ser(store)?;
                reserve.ser(store)
            }
            Self::LeaveClientNotif { end, client } => {
                end.ser(store)?;
                client.ser(store)
            }
            Self::NewEntryRefused { end, creation } => {
                end.ser(store)?;
                creation.ser(store)
            }
        }
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let command = match ChannelCommandType::from_u8(reader.unpack()?)? {
            ChannelCommandType::NewEntryReq => Self::NewEntryReq {
                end: reader.unpack()?,
                creation: reader.unpack()?,
                class_name: reader.unpack()?,
                magic: reader.unpack()?,
                label: reader.unpack()?,
                time_aspect: TimeAspect::from_u8(reader.unpack()?)?,
                retention: reader.unpack()?,
                reservations: reader.unpack()?,
            },
            ChannelCommandType::NewEntryConf => Self::NewEntryConf {
                entry: reader.unpack()?,
                end: reader.unpack()?,
                creation: reader.unpack()?,
                class_name: reader.unpack()?,
                label: reader.unpack()?,
                time_aspect: TimeAspect::from_u8(reader.unpack()?)?,
                retention: reader.unpack()?,
                saveup: reader.unpack()?,
            },
            ChannelCommandType::DeleteEntryReq => Self::DeleteEntryReq {
                entry: reader.unpack()?,
            },
            ChannelCommandType::InvalidateEntryCmd => Self::InvalidateEntryCmd {
                entry: reader.unpack()?,
            },
            ChannelCommandType::CleanEntryCmd => Self::CleanEntryCmd {
                entry: reader.unpack()?,
                round: reader.unpack()?,
            },
            ChannelCommandType::CleanEntryConf => Self::CleanEntryConf {
                entry: reader.unpack()?,
                end: reader.unpack()?,
            },
            ChannelCommandType::DeleteEntryCmd => Self::DeleteEntryCmd {
                entry: reader.unpack()?,
            },
            ChannelCommandType::NewEndJoins => Self::NewEndJoins {
                end: reader.unpack()?,
            },
            ChannelCommandType::Welcome => Self::Welcome {
                end: reader.unpack()?,
            },
            ChannelCommandType::NewClientNotif => Self::NewClientNotif {
                end: reader.unpack()?,
                client: reader.unpack()?,
                class_name: reader.unpack()?,
                selector: reader.unpack()?,
                reserve: reader.unpack()?,
            },
            ChannelCommandType::LeaveClientNotif => Self::LeaveClientNotif {
                end: reader.unpack()?,
                client: reader.unpack()?,
            },
            ChannelCommandType::RemoveSaveupCmd => Self::RemoveSaveupCmd {
                entry: reader.unpack()?,
            },
            ChannelCommandType::NewEntryRefused => Self::NewEntryRefused {
                end: reader.unpack()?,
                creation: reader.unpack()?,
            },
        };
        Ok(command)
    }

    fn byte_length(&self) -> usize {
        let body = match self {
            Self::NewEntryReq {
                class_name, label, ..
            } => 2 + 4 + (4 + class_name.len()) + 4 + (4 + label.len()) + 1 + 8 + 4,
            Self::NewEntryConf {
                class_name, label, ..
            } => 2 + 2 + 4 + (4 + class_name.len()) + (4 + label.len()) + 1 + 8 + 1,
            Self::DeleteEntryReq { .. }
            | Self::InvalidateEntryCmd { .. }
            | Self::DeleteEntryCmd { .. }
            | Self::RemoveSaveupCmd { .. }
            | Self::NewEndJoins { .. }
            | Self::Welcome { .. } => 2,
            Self::CleanEntryCmd { .. } => 6,
            Self::CleanEntryConf { .. } => 4,
            Self::NewClientNotif {
                class_name,
                selector,
                ..
            } => 2 + 4 + (4 + class_name.len()) + selector.byte_length() + 1,
            Self::LeaveClientNotif { .. } | Self::NewEntryRefused { .. } => 6,
        };
        1 + body
    }
}
