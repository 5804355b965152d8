use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BpmnError, Result};
use crate::nodes::activity::{Activity, ActivityKind};
use crate::runtime::engine::EngineState;
use crate::runtime::graph::Graph;

/// Serializable picture of an engine: lifecycle plus both history lists.
/// Records carry only activity-owned state, never graph structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: EngineState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_at: Option<DateTime<Utc>>,
    pub head: Vec<Activity>,
    pub stack: Vec<Activity>,
}

/// `head`: live branches, unique by id. `stack`: append-only log of
/// activities that reached a terminal status, in completion order.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub(crate) head: Vec<Activity>,
    pub(crate) stack: Vec<Activity>,
}

impl History {
    pub fn head(&self) -> &[Activity] {
        &self.head
    }

    pub fn stack(&self) -> &[Activity] {
        &self.stack
    }

    pub fn head_by_id(&self, id: &str) -> Option<&Activity> {
        self.head.iter().find(|a| a.id == id)
    }

    pub fn head_by_name(&self, name: &str) -> Option<&Activity> {
        self.head.iter().find(|a| a.has_name(name))
    }

    pub fn head_by_id_mut(&mut self, id: &str) -> Option<&mut Activity> {
        self.head.iter_mut().find(|a| a.id == id)
    }

    pub fn head_by_name_mut(&mut self, name: &str) -> Option<&mut Activity> {
        self.head.iter_mut().find(|a| a.has_name(name))
    }

    /// Most recent completed instance with this id.
    pub fn last_in_stack(&self, id: &str) -> Option<&Activity> {
        self.stack.iter().rev().find(|a| a.id == id)
    }

    /// Logs `activity` on the stack and drops its branch from head.
    pub(crate) fn retire(&mut self, activity: &Activity) {
        self.stack.push(activity.clone());
        self.head.retain(|a| a.id != activity.id);
    }

    /// Appends successors whose id is not already live.
    pub(crate) fn merge(&mut self, successors: Vec<Activity>) {
        for activity in successors {
            if self.head.iter().all(|a| a.id != activity.id) {
                self.head.push(activity);
            }
        }
    }

    /// Places a redirected activity directly on head. An entry with the same
    /// id is replaced so head stays unique.
    pub(crate) fn push_head(&mut self, activity: Activity) {
        match self.head.iter_mut().find(|a| a.id == activity.id) {
            Some(slot) => *slot = activity,
            None => self.head.push(activity),
        }
    }

    /// Rebuilds a history from snapshot records against a freshly compiled
    /// graph. Records without a graph counterpart are dropped.
    pub fn restore(head: Vec<Activity>, stack: Vec<Activity>, graph: &Graph) -> Result<History> {
        let mut history = History::default();
        for record in head {
            if let Some(activity) = reattach(record, graph)? {
                history.head.push(activity);
            }
        }
        for record in stack {
            if let Some(activity) = reattach(record, graph)? {
                history.stack.push(activity);
            }
        }
        Ok(history)
    }
}

/// Structure from the graph definition, state from the record.
fn reattach(record: Activity, graph: &Graph) -> Result<Option<Activity>> {
    let definition = graph.activity_by_id(&record.id).or_else(|| {
        let start = graph.start_event();
        let is_start = record.as_event().is_some_and(|e| e.is_start());
        (is_start && record.name.is_some() && record.name == start.name).then_some(start)
    });
    let Some(definition) = definition else {
        warn!(activity = %record.id, "snapshot record has no counterpart in the process, dropped");
        return Ok(None);
    };

    if definition.category() != record.category() {
        let reason = format!(
            "recorded as {:?}, compiled as {:?}",
            record.category(),
            definition.category()
        );
        return Err(BpmnError::Snapshot { id: record.id, reason });
    }

    let mut live = definition.clone();
    live.lifecycle = record.lifecycle;
    match (&mut live.kind, record.kind) {
        (ActivityKind::Gateway(gateway), ActivityKind::Gateway(recorded)) => {
            gateway.io_incoming = recorded.io_incoming;
            gateway.io_outgoing = recorded.io_outgoing;
        }
        (ActivityKind::Task(task), ActivityKind::Task(recorded)) => {
            if let (Some(boundary), Some(recorded)) = (task.boundary_event.as_mut(), recorded.boundary_event) {
                boundary.lifecycle = recorded.lifecycle;
            }
        }
        _ => {}
    }

    if !live.token_shape_matches() {
        return Err(BpmnError::Snapshot {
            id: live.id,
            reason: "token set does not match the gateway's edges".to_string(),
        });
    }

    Ok(Some(live))
}
