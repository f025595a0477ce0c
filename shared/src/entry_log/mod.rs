mod access;
mod data_node;
mod entry_log;
mod error;
mod node_pool;
mod retention;

pub use access::{DataAccess, SequentialCursor, SequentialRead};
pub use data_node::GAP_SEQUENCE;
pub use entry_log::EntryLog;
pub use error::EntryLogError;
pub use node_pool::MAX_NODES;
pub use retention::{Retention, SaveupMode};
