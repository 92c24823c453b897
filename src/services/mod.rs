// Service exports
pub mod memory;
pub mod model_versions;
pub mod performance;
pub mod registry;
pub mod retraining;
pub mod taxonomy_store;

pub use memory::InMemoryRegistry;
pub use model_versions::{ModelSettings, ModelVersionError, ModelVersionManager, PromotionOutcome};
pub use performance::{PerformanceTracker, TrackerError};
pub use registry::{FeedbackSource, ModelRegistry, RegistryError, TrainingEventLog};
pub use retraining::{RetrainingPolicy, RetrainingTrigger};
pub use taxonomy_store::{
    BuiltinTaxonomySource, JsonFileTaxonomySource, StaticTaxonomySource, TaxonomyError, TaxonomySource,
    TaxonomyStore,
};
