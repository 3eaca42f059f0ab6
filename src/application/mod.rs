pub mod use_cases;

pub use use_cases::evidence::EvidenceRenderer;
pub use use_cases::grouping::FolderPolicy;
pub use use_cases::publish_run::{CycleOptions, PublishRunUseCase, RunSummary};
