/// Record classes shared by the scenario tests

use std::any::Any;

use tandem_shared::{Record, RecordClass, RecordKinds, Serde, SerdeErr, WireReader, WireStore};

/// Planar position, packed field by field when differential packing is on
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Record for Position {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn magic(&self) -> u32 {
        Self::MAGIC
    }

    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.x.ser(store)?;
        self.y.ser(store)
    }

    fn de_into(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr> {
        self.x = reader.unpack()?;
        self.y = reader.unpack()?;
        Ok(())
    }

    fn ser_difference(&self, reference: &dyn Record, store: &mut WireStore) -> Result<(), SerdeErr> {
        let Some(reference) = reference.downcast_ref::<Self>() else {
            // unrelated base, send everything
            true.ser(store)?;
            self.x.ser(store)?;
            true.ser(store)?;
            return self.y.ser(store);
        };
        for (value, base) in [(self.x, reference.x), (self.y, reference.y)] {
            let changed = value != base;
            changed.ser(store)?;
            if changed {
                value.ser(store)?;
            }
        }
        Ok(())
    }

    fn de_difference(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr> {
        if reader.unpack::<bool>()? {
            self.x = reader.unpack()?;
        }
        if reader.unpack::<bool>()? {
            self.y = reader.unpack()?;
        }
        Ok(())
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn equals(&self, other: &dyn Record) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RecordClass for Position {
    const CLASS_NAME: &'static str = "Position";
    const MAGIC: u32 = 0x5051_0001;
}

/// Position reported by a named waypoint, readable as a [`Position`] class
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Waypoint {
    pub position: Position,
    pub name: String,
}

impl Record for Waypoint {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn magic(&self) -> u32 {
        Self::MAGIC
    }

    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.position.ser(store)?;
        store.pack_str(&self.name)
    }

    fn de_into(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr> {
        self.position.de_into(reader)?;
        self.name = reader.unpack()?;
        Ok(())
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn equals(&self, other: &dyn Record) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RecordClass for Waypoint {
    const CLASS_NAME: &'static str = "Waypoint";
    const MAGIC: u32 = 0x5051_0002;
    const PARENT: Option<&'static str> = Some(Position::CLASS_NAME);
}

/// Monotonic counter, uses the default difference encoding
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Counter {
    pub value: u64,
}

impl Record for Counter {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn magic(&self) -> u32 {
        Self::MAGIC
    }

    fn ser(&self, store: &mut WireStore) -> Result<(), SerdeErr> {
        self.value.ser(store)
    }

    fn de_into(&mut self, reader: &mut WireReader) -> Result<(), SerdeErr> {
        self.value = reader.unpack()?;
        Ok(())
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn equals(&self, other: &dyn Record) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RecordClass for Counter {
    const CLASS_NAME: &'static str = "Counter";
    const MAGIC: u32 = 0x5051_0003;
}

/// Registry holding every test record class
pub fn record_kinds() -> RecordKinds {
    let mut kinds = RecordKinds::new();
    kinds
        .add_record::<Position>()
        .add_record::<Waypoint>()
        .add_record::<Counter>();
    kinds
}
