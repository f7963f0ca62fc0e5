//! The three stage workers (decision, aging, download), the dispatcher
//! that lets them hand items to one another, and the supervisor that
//! owns their shared shutdown signal.

pub mod aging;
pub mod decision;
pub mod dispatcher;
pub mod download;
mod error;
pub mod policy;
pub mod queue;
pub mod settings;
pub mod supervisor;

pub use aging::AgingStage;
pub use decision::DecisionStage;
pub use dispatcher::Dispatcher;
pub use download::DownloadStage;
pub use error::StageError;
pub use queue::{AgingQueue, ItemQueue};
pub use settings::PipelineSettings;
pub use supervisor::Supervisor;
