use thiserror::Error;

/// Errors raised while packing into a [`WireStore`](crate::WireStore) or
/// unpacking from a [`WireReader`](crate::WireReader)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Writing would exceed the store's capacity. The store is choked from
    /// here on and refuses every further write.
    #[error("Buffer boundary reached: {requested} bytes requested, {available} bytes available. The store is now choked, retry the whole message on a fresh store")]
    BufferBoundary { requested: usize, available: usize },

    /// Reading requested more bytes than remain. The reader is exhausted
    /// from here on.
    #[error("Buffer exhausted: {requested} bytes requested, {remaining} bytes remaining")]
    BufferExhausted { requested: usize, remaining: usize },

    /// The payload between a mark and its end does not fit the mark's size field
    #[error("Marked payload of {size} bytes does not fit a size field limited to {limit} bytes")]
    MarkOverflow { size: usize, limit: usize },

    /// Bytes were read that do not decode into a valid value
    #[error("Invalid value on the wire: {reason}")]
    InvalidValue { reason: &'static str },
}
