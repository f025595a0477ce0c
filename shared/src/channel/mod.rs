mod channel;
mod config;
mod error;
mod read_options;
mod read_token;
mod topology;
mod watcher;
mod write_token;

pub use channel::{Channel, EndRole};
pub use config::{ChannelArity, ChannelConfig};
pub use error::ChannelError;
pub use read_options::{EntrySelector, ReadMode, ReadOptions};
pub use read_token::{ReadOutcome, ReadToken, RecordAccess};
pub use watcher::{ChannelEvent, ChannelWatcher};
pub use write_token::WriteToken;
