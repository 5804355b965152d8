pub mod compiler;
pub mod dsl;
pub mod error;
pub mod nodes;
pub mod runtime;

pub use error::{BpmnError, Result};
pub use nodes::activity::{Activity, ActivityCategory, ActivityKind, ActivityStatus};
pub use runtime::callable::{Callable, Handler, Tier};
pub use runtime::engine::{Engine, EngineState};
pub use runtime::history::Snapshot;
pub use runtime::step::Step;
pub use runtime::worker::{EngineHandle, EngineWorker};
