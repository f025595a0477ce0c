use std::collections::HashMap;

use crate::records::{
    error::RecordKindsError,
    record::{Record, RecordClass},
};

/// Registration data of one record class
#[derive(Clone)]
pub struct RecordKind {
    pub name: &'static str,
    pub magic: u32,
    pub parent: Option<&'static str>,
    create: fn() -> Box<dyn Record>,
}

impl RecordKind {
    /// Creates an empty record of this class, ready for `de_into`
    pub fn create(&self) -> Box<dyn Record> {
        (self.create)()
    }
}

/// Registry of the record classes a channel end can carry.
///
/// Built once and handed to every channel, so tests can register their
/// own classes without touching process-wide state.
#[derive(Clone, Default)]
pub struct RecordKinds {
    kinds: HashMap<&'static str, RecordKind>,
}

fn create_record<R: RecordClass>() -> Box<dyn Record> {
    Box::new(R::default())
}

impl RecordKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record<R: RecordClass>(&mut self) -> &mut Self {
        self.kinds.insert(
            R::CLASS_NAME,
            RecordKind {
                name: R::CLASS_NAME,
                magic: R::MAGIC,
                parent: R::PARENT,
                create: create_record::<R>,
            },
        );
        self
    }

    pub fn kind(&self, name: &str) -> Result<&RecordKind, RecordKindsError> {
        self.kinds
            .get(name)
            .ok_or_else(|| RecordKindsError::UnknownClass {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn magic(&self, name: &str) -> Result<u32, RecordKindsError> {
        Ok(self.kind(name)?.magic)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Record>, RecordKindsError> {
        Ok(self.kind(name)?.create())
    }

    /// Whether a reader of class `reader_class` may read entries of class
    /// `entry_class`: same class, or `reader_class` is one of its ancestors.
    pub fn is_compatible(&self, entry_class: &str, reader_class: &str) -> bool {
        let mut current = Some(entry_class);
        // a cyclic parent chain cannot be longer than the registry
        let mut steps = self.kinds.len() + 1;
        while let Some(class) = current {
            if class == reader_class {
                return true;
            }
            if steps == 0 {
                return false;
            }
            steps -= 1;
            current = self.kinds.get(class).and_then(|kind| kind.parent);
        }
        false
    }
}
