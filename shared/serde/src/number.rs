use crate::{
    error::SerdeErr, serde::Serde, wire_reader::WireReader, wire_store::WireStore,
    ConstByteLength,
};

// Fixed-width numbers, network byte order

macro_rules! impl_serde_for_number {
    ($($number:ty),*) => {
        $(
            impl Serde for $number {
                fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
                    store.write_bytes(&self.to_be_bytes())
                }

                fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
                    Ok(<$number>::from_be_bytes(reader.read_array()?))
                }

                fn byte_length(&self) -> usize {
                    std::mem::size_of::<$number>()
                }
            }

            impl ConstByteLength for $number {
                fn const_byte_length() -> usize {
                    std::mem::size_of::<$number>()
                }
            }
        )*
    };
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Booleans

const TRUE_BYTE: u8 = 0xFF;
const FALSE_BYTE: u8 = 0x00;

impl Serde for bool {
    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        let byte = if *self { TRUE_BYTE } else { FALSE_BYTE };
        store.write_bytes(&[byte])
    }

    fn de(reader: &mut WireReader) -> Result<Self, SerdeErr> {
        let [byte] = reader.read_array::<1>()?;
        Ok(byte != FALSE_BYTE)
    }

    fn byte_length(&self) -> usize {
        1
    }
}

impl ConstByteLength for bool {
    fn const_byte_length() -> usize {
        1
    }
}
