pub mod character;
pub mod emotion;
pub mod entity;
pub mod event;
pub mod location;
pub mod names;
pub mod pipeline;
pub mod progress;
pub mod relation;
pub mod state;
pub mod timeline;

pub use names::NameIndex;
pub use pipeline::{AnalysisPipeline, CancelToken};
pub use progress::{noop_progress, NoopProgressReporter, ProgressReporter};
