use std::collections::BTreeSet;

use crate::{master::error::ConfigurationError, types::EntryId};

/// Hands out entry ids, reusing the lowest freed id before taking a fresh one
pub struct EntryIdGenerator {
    recycled: BTreeSet<EntryId>,
    next: u32,
}

impl Default for EntryIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self {
            recycled: BTreeSet::new(),
            next: 0,
        }
    }

    pub fn generate(&mut self) -> Result<EntryId, ConfigurationError> {
        if let Some(id) = self.recycled.pop_first() {
            return Ok(id);
        }
        let id = EntryId::try_from(self.next).map_err(|_| ConfigurationError::IdsExhausted {
            count: EntryId::MAX as usize + 1,
        })?;
        self.next += 1;
        Ok(id)
    }

    pub fn recycle(&mut self, id: EntryId) {
        if u32::from(id) < self.next {
            self.recycled.insert(id);
        }
    }

    pub fn in_use(&self) -> usize {
        self.next as usize - self.recycled.len()
    }
}
