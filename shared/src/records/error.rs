use thiserror::Error;

/// Errors that can occur when looking up record classes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordKindsError {
    /// Class name not found in the registry
    #[error("Record class {name:?} not found in registry. The class must be registered via RecordKinds::add_record()")]
    UnknownClass { name: String },
}
