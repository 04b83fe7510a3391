pub mod ai;
pub mod analyzer;
pub mod app;
pub mod config;
pub mod files;
pub mod records;
pub mod render;
pub mod validate;

pub use ai::{AiClient, DocKind, GenerationEvent, ParseOutcome, PromptTransport};
pub use app::{App, SaveReport};
pub use config::{AiSettings, ConfigStore, Settings};
pub use records::{GeneratedDoc, ProjectInfo, RuleRecord, WorkflowRecord};
pub use validate::Validation;
