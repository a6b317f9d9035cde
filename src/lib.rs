pub mod database;
pub mod duplicates;
pub mod graph;
pub mod guard;
pub mod harness;
pub mod log;
pub mod payload;
pub mod process;
pub mod resolve;
pub mod scheduler;
pub mod settings;
pub mod slots;

pub use database::{AssetDatabase, AssetHandle, GraphBackend, NodeId, NodeKind, TargetKind};
pub use log::ImportLog;
pub use payload::ExportPayload;
pub use scheduler::{AssetKind, ImportJob, Progress, StepOutcome};
pub use settings::ImportSettings;
