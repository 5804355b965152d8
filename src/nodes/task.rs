use serde::{Deserialize, Serialize};

use crate::nodes::activity::{ActivityStatus, Lifecycle};
use crate::nodes::event::IntermediateKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Normal,
    User,
    Manual,
    Service,
    Script,
}

/// Side-channel event attached to a task; firing it redirects the flow along
/// its single outgoing edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    pub id: String,
    pub attached_to_ref: String,
    pub outgoing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_kind: Option<IntermediateKind>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl BoundaryEvent {
    pub fn new(id: &str, attached_to_ref: &str, outgoing: &str, trigger: Option<IntermediateKind>) -> Self {
        Self {
            id: id.to_string(),
            attached_to_ref: attached_to_ref.to_string(),
            outgoing: outgoing.to_string(),
            intermediate_kind: Some(trigger.unwrap_or_default()),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn status(&self) -> Option<ActivityStatus> {
        self.lifecycle.status
    }

    pub fn enter(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Entered);
        self
    }

    pub fn start(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Started);
        self
    }

    pub fn pause(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Paused);
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Stopped);
        self
    }

    pub fn finish(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Finished);
        self
    }

    pub fn cancel(&mut self) -> &mut Self {
        self.lifecycle.set(ActivityStatus::Canceled);
        self
    }

    pub fn is_entered(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Entered)
    }

    pub fn is_finished(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Finished)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskActivity {
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_event: Option<BoundaryEvent>,
}

impl TaskActivity {
    pub fn new(kind: TaskKind, boundary_event: Option<BoundaryEvent>) -> Self {
        Self { kind, boundary_event }
    }

    pub fn is_normal(&self) -> bool {
        self.kind == TaskKind::Normal
    }

    pub fn is_user(&self) -> bool {
        self.kind == TaskKind::User
    }

    pub fn is_manual(&self) -> bool {
        self.kind == TaskKind::Manual
    }

    pub fn is_service(&self) -> bool {
        self.kind == TaskKind::Service
    }

    pub fn is_script(&self) -> bool {
        self.kind == TaskKind::Script
    }
}
