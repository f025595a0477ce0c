mod channel_master;
mod entry_id_generator;
mod error;

pub use channel_master::ChannelMaster;
pub use entry_id_generator::EntryIdGenerator;
pub use error::ConfigurationError;
