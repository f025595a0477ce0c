use crate::{error::SerdeErr, wire_reader::WireReader, wire_store::WireStore};

/// A type that can be packed into a [`WireStore`] and unpacked from a
/// [`WireReader`] with the tandem wire contract
pub trait Serde: Sized {
    /// Packs self into the store
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr>;

    /// Unpacks a new value from the reader
    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr>;

    /// Number of bytes `ser` will write
    fn byte_length(&self) -> usize;
}

/// Implemented by types whose encoding always has the same length
pub trait ConstByteLength {
    fn const_byte_length() -> usize;
}
