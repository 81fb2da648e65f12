pub mod catalog;
pub mod reconcile;

pub use catalog::{DEFAULT_MODEL, ModelCatalog, ModelMetadata, ReasoningEffort};
pub use reconcile::{Reconciliation, reconcile};
