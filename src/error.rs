use thiserror::Error;

use crate::nodes::activity::ActivityStatus;
use crate::runtime::engine::EngineState;

pub type Result<T> = std::result::Result<T, BpmnError>;

/// Every failure the engine surfaces. None are retried or rolled back.
#[derive(Error, Debug)]
pub enum BpmnError {
    // --- structural build errors ---
    #[error("Process should have exactly one start event")]
    MissingStartEvent,

    #[error("process.startEvent should not be a list")]
    StartEventIsList,

    #[error("Process should have at least one end event")]
    MissingEndEvent,

    #[error("Duplicate activity id: {0}")]
    DuplicateActivity(String),

    #[error("Activity {activity} declares an empty {direction} edge list")]
    EmptyFlowList { activity: String, direction: &'static str },

    // --- lookup errors ---
    #[error("Head activity with id {0} not found")]
    HeadActivityNotFoundById(String),

    #[error("Head activity with name {0} not found")]
    HeadActivityNotFoundByName(String),

    #[error("run([Activity {0}]) not found")]
    RunTargetNotFound(String),

    #[error("{operation}([Activity: {target}]) outgoing activity not found")]
    OutgoingTargetNotFound { operation: &'static str, target: String },

    // --- state errors ---
    #[error("Please initialize the engine with build() and bind() methods")]
    NotInitialized,

    #[error("Current state is {state:?}, workflow only executes activities in the started state")]
    InvalidState { state: EngineState },

    #[error("This workflow is already finished")]
    AlreadyFinished,

    #[error(
        "execute() activity with name {name:?} and id {id} in {status:?} status can't be executed; \
         change its status through the engine's head_activity_by_* accessors"
    )]
    NotEntered {
        id: String,
        name: Option<String>,
        status: Option<ActivityStatus>,
    },

    // --- capability errors ---
    #[error("{operation}([Activity: {target}]) only works on inclusive, exclusive and complex gateways")]
    SelectiveOutgoingUnsupported { operation: &'static str, target: String },

    #[error("{operation}() called on {id}, which is not a gateway")]
    NotAGateway { operation: &'static str, id: String },

    #[error("forward([Activity: {0}]) complex gateways are not fast forwarded")]
    ComplexForward(String),

    #[error("Complex gateway {0} cannot be reached through the shared traversal path")]
    ComplexTraversal(String),

    // --- missing collaborators ---
    #[error("{id} task with name {name:?} does not have a boundary event")]
    MissingBoundaryEvent { id: String, name: Option<String> },

    #[error("take_boundary_event() called on {0}, which is not a task")]
    NotATask(String),

    // --- handler / snapshot ---
    #[error("Handler for activity {activity} failed: {source}")]
    Handler {
        activity: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Snapshot record {id} is inconsistent with the compiled process: {reason}")]
    Snapshot { id: String, reason: String },

    #[error("Engine worker is gone: {0}")]
    WorkerClosed(String),
}
