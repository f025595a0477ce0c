//! # Tandem Serde
//! The byte-level wire contract every message between tandem channel ends
//! obeys: fixed-width values in network byte order, `u32`-length-prefixed
//! strings, back-filled size marks and a capacity that chokes the store on
//! the first overrun.

mod error;
mod number;
mod serde;
mod string;
mod wire_reader;
mod wire_store;

pub use error::SerdeErr;
pub use serde::{ConstByteLength, Serde};
pub use wire_reader::WireReader;
pub use wire_store::{BigMark, Mark, WireStore, DEFAULT_STORE_CAPACITY};
