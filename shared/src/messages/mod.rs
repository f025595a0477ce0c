mod channel_command;
mod data_message;

pub use channel_command::{ChannelCommand, ChannelCommandType};
pub use data_message::{DataHeader, DataMessageKind};
