pub mod error;
pub mod record;
pub mod record_kinds;
