mod entry;
mod error;
mod options;
mod pack_state;
mod targets;

pub use entry::{Entry, EntryDescription};
pub use error::EntryError;
pub use options::{EntryOptions, PackingMode, TransportClass};
pub use pack_state::{PackReport, RemoteUpdate};
pub use targets::{EntryTrigger, TransportNotifier};
