use std::sync::Arc;

use log::trace;

/// Work that is driven once per tick of the owning process, such as a
/// channel draining its configuration queues
pub trait PeriodicService: Send + Sync {
    fn name(&self) -> &str;

    fn service(&self);
}

/// Runs every registered service once per [`ServiceRegistry::tick`], in
/// registration order
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<dyn PeriodicService>>,
    ticks: u64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, service: Arc<dyn PeriodicService>) {
        self.services.push(service);
    }

    /// Removes every service registered under `name`, returns how many
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.services.len();
        self.services.retain(|service| service.name() != name);
        before - self.services.len()
    }

    pub fn tick(&mut self) {
        self.ticks += 1;
        for service in &self.services {
            trace!("tick {}: servicing {:?}", self.ticks, service.name());
            service.service();
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
