use crate::{error::SerdeErr, serde::Serde, wire_reader::WireReader, wire_store::WireStore};

impl Serde for String {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        store.pack_str(self)
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let length = reader.unpack::<u32>()? as usize;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidValue {
            reason: "string is not valid utf-8",
        })
    }

    fn byte_length(&self) -> usize {
        4 + self.len()
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        match self {
            Some(value) => {
                true.ser(store)?;
                value.ser(store)
            }
            None => false.ser(store),
        }
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        if reader.unpack::<bool>()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }

    fn byte_length(&self) -> usize {
        1 + self.as_ref().map_or(0, Serde::byte_length)
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        let count = u32::try_from(self.len()).map_err(|_| SerdeErr::InvalidValue {
            reason: "sequence longer than u32::MAX elements",
        })?;
        count.ser(store)?;
        for item in self {
            item.ser(store)?;
        }
        Ok(())
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let count = reader.unpack::<u32>()? as usize;
        // every element takes at least one byte, so a count beyond the
        // remaining bytes can only come from a corrupt message
        if count > reader.remaining() {
            return Err(SerdeErr::BufferExhausted {
                requested: count,
                remaining: reader.remaining(),
            });
        }
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }

    fn byte_length(&self) -> usize {
        4 + self.iter().map(Serde::byte_length).sum::<usize>()
    }
}
