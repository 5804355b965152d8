use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dsl::EdgeRefs;
use crate::nodes::event::EventActivity;
use crate::nodes::gateway::GatewayActivity;
use crate::nodes::task::TaskActivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityStatus {
    Entered,
    Started,
    Paused,
    Stopped,
    Finished,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    Task,
    Gateway,
    Event,
}

/// Status plus one timestamp per status ever reached.
///
/// The setters are unguarded: any transition is accepted here and the
/// engine's control loop decides which ones are legal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    pub fn set(&mut self, status: ActivityStatus) {
        let now = Some(Utc::now());
        match status {
            ActivityStatus::Entered => self.entered_at = now,
            ActivityStatus::Started => self.started_at = now,
            ActivityStatus::Paused => self.paused_at = now,
            ActivityStatus::Stopped => self.stopped_at = now,
            ActivityStatus::Finished => self.finished_at = now,
            ActivityStatus::Canceled => self.canceled_at = now,
        }
        self.status = Some(status);
    }

    pub fn is(&self, status: ActivityStatus) -> bool {
        self.status == Some(status)
    }
}

/// Informational lane tag; the member list is not carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneTag {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Category-specific payload. Operations that only make sense for one
/// category live on the payload type, so they cannot be called on the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum ActivityKind {
    Task(TaskActivity),
    Gateway(GatewayActivity),
    Event(EventActivity),
}

/// One flow node instance. Graph definitions and live `head`/`stack` entries
/// share this type; only live instances carry a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming: Option<EdgeRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<EdgeRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<LaneTag>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    #[serde(flatten)]
    pub kind: ActivityKind,
}

impl Activity {
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        incoming: Option<EdgeRefs>,
        outgoing: Option<EdgeRefs>,
        kind: ActivityKind,
    ) -> Self {
        Self {
            id: id.into(),
            name,
            incoming,
            outgoing,
            lane: None,
            lifecycle: Lifecycle::default(),
            kind,
        }
    }

    pub fn with_lane(mut self, lane: Option<LaneTag>) -> Self {
        self.lane = lane;
        self
    }

    /// A fresh live instance of this definition, already entered.
    pub fn instantiate(&self) -> Activity {
        let mut activity = self.clone();
        activity.lifecycle = Lifecycle::default();
        if let ActivityKind::Task(task) = &mut activity.kind {
            if let Some(boundary) = task.boundary_event.as_mut() {
                boundary.lifecycle = Lifecycle::default();
            }
        }
        activity.enter();
        activity
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn category(&self) -> ActivityCategory {
        match self.kind {
            ActivityKind::Task(_) => ActivityCategory::Task,
            ActivityKind::Gateway(_) => ActivityCategory::Gateway,
            ActivityKind::Event(_) => ActivityCategory::Event,
        }
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, ActivityKind::Task(_))
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self.kind, ActivityKind::Gateway(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, ActivityKind::Event(_))
    }

    pub fn as_task(&self) -> Option<&TaskActivity> {
        match &self.kind {
            ActivityKind::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_task_mut(&mut self) -> Option<&mut TaskActivity> {
        match &mut self.kind {
            ActivityKind::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_gateway(&self) -> Option<&GatewayActivity> {
        match &self.kind {
            ActivityKind::Gateway(gateway) => Some(gateway),
            _ => None,
        }
    }

    pub fn as_gateway_mut(&mut self) -> Option<&mut GatewayActivity> {
        match &mut self.kind {
            ActivityKind::Gateway(gateway) => Some(gateway),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventActivity> {
        match &self.kind {
            ActivityKind::Event(event) => Some(event),
            _ => None,
        }
    }

    /// True when every token set has the same scalar/list shape as the edge
    /// refs it was derived from. Non-gateways trivially hold.
    pub fn token_shape_matches(&self) -> bool {
        match &self.kind {
            ActivityKind::Gateway(gateway) => gateway.shape_matches(&self.incoming, &self.outgoing),
            _ => true,
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

    pub fn is_started(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Started)
    }

    pub fn is_paused(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Paused)
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Stopped)
    }

    pub fn is_finished(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Finished)
    }

    pub fn is_canceled(&self) -> bool {
        self.lifecycle.is(ActivityStatus::Canceled)
    }
}
