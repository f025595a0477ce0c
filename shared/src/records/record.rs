use std::{any::Any, fmt::Debug};

use tandem_serde::{Serde, SerdeErr, WireReader, WireStore};

/// Static description of a record class, used to register it with
/// [`RecordKinds`](crate::RecordKinds)
pub trait RecordClass: Record + Default {
    /// Name under which entries of this class are announced to other ends
    const CLASS_NAME: &'static str;
    /// Hash of the class layout, compared across ends before data is exchanged
    const MAGIC: u32;
    /// Class this one extends, readers of the parent can read this class too
    const PARENT: Option<&'static str> = None;
}

/// A time-stamped unit of data carried by an entry.
///
/// Channel internals only ever see `Box<dyn Record>`, the concrete type is
/// recovered with [`Record::as_any`].
pub trait Record: Send + Sync + Debug + 'static {
    fn class_name(&self) -> &'static str;

    fn magic(&self) -> u32;

    /// Packs the full record
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr>;

    /// Overwrites self with a full record from the reader
    fn de_into(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr>;

    /// Packs the difference between self and `reference`. The default
    /// encoding is a change flag followed by the full record when changed.
    fn ser_difference(&self, reference: &dyn Record, store: &mut WireStore) -> Result<(), SerdeErr> {
        let changed = !self.equals(reference);
        changed.ser(store)?;
        if changed {
            self.ser(store)?;
        }
        Ok(())
    }

    /// Applies a difference written by `ser_difference` to self, where self
    /// starts out as a copy of the reference record
    fn de_difference(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr> {
        if reader.unpack::<bool>()? {
            self.de_into(reader)?;
        }
        Ok(())
    }

    fn clone_record(&self) -> Box<dyn Record>;

    fn equals(&self, other: &dyn Record) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Record {
    pub fn downcast_ref<R: Record>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}

impl Clone for Box<dyn Record> {
    fn clone(&self) -> Self {
        self.clone_record()
    }
}
