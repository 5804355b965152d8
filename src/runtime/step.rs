use std::ops::{Deref, DerefMut};

use tracing::info;

use crate::error::{BpmnError, Result};
use crate::nodes::activity::Activity;
use crate::nodes::gateway::GatewayActivity;
use crate::runtime::graph::Graph;
use crate::runtime::history::History;

/// What a handler gets to work with: the live activity (through `Deref`) plus
/// the graph-aware operations that need the rest of the process.
pub struct Step<'a> {
    activity: &'a mut Activity,
    graph: &'a Graph,
    history: &'a mut History,
}

impl<'a> Step<'a> {
    pub(crate) fn new(activity: &'a mut Activity, graph: &'a Graph, history: &'a mut History) -> Self {
        Self {
            activity,
            graph,
            history,
        }
    }

    pub fn activity(&self) -> &Activity {
        self.activity
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Other live branches. The entry for this activity is the pre-dispatch copy.
    pub fn head(&self) -> &[Activity] {
        self.history.head()
    }

    pub fn take_outgoing_by_id(&mut self, activity_id: &str) -> Result<&mut Self> {
        const OP: &str = "take_outgoing_by_id";
        let graph = self.graph;
        let target = graph.activity_by_id(activity_id);
        self.gateway_mut(OP)?.take_outgoing(OP, activity_id, target)?;
        Ok(self)
    }

    pub fn take_outgoing_by_name(&mut self, activity_name: &str) -> Result<&mut Self> {
        const OP: &str = "take_outgoing_by_name";
        let graph = self.graph;
        let target = graph.activity_by_name(activity_name);
        self.gateway_mut(OP)?.take_outgoing(OP, activity_name, target)?;
        Ok(self)
    }

    pub fn refresh_all_outgoing(&mut self) -> Result<&mut Self> {
        self.gateway_mut("refresh_all_outgoing")?.refresh_all_outgoing();
        Ok(self)
    }

    fn gateway_mut(&mut self, operation: &'static str) -> Result<&mut GatewayActivity> {
        let id = self.activity.id.clone();
        self.activity
            .as_gateway_mut()
            .ok_or(BpmnError::NotAGateway { operation, id })
    }

    /// Fires the task's boundary event: every activity behind the boundary's
    /// outgoing edge is put straight onto head. A previously completed
    /// instance is reused (gateways get their split reset) before a fresh one
    /// is built.
    pub fn take_boundary_event(&mut self) -> Result<()> {
        let task = self
            .activity
            .as_task()
            .ok_or_else(|| BpmnError::NotATask(self.activity.id.clone()))?;
        let boundary = task
            .boundary_event
            .as_ref()
            .ok_or_else(|| BpmnError::MissingBoundaryEvent {
                id: self.activity.id.clone(),
                name: self.activity.name.clone(),
            })?;
        let boundary_id = boundary.id.clone();
        let boundary_outgoing = boundary.outgoing.clone();

        let graph = self.graph;
        for edge in graph.edges_from(&boundary_id) {
            let Some(definition) = graph.activity_by_id(&edge.target_ref) else {
                continue;
            };

            let next = match self.history.last_in_stack(&definition.id) {
                Some(previous) => {
                    let mut next = previous.clone();
                    next.enter();
                    if let Some(gateway) = next.as_gateway_mut() {
                        gateway.refresh_all_outgoing();
                        gateway.take_incoming(|t| t.edge_id == boundary_outgoing);
                    }
                    next
                }
                None => {
                    let mut next = definition.instantiate();
                    if let Some(gateway) = next.as_gateway_mut() {
                        gateway.take_incoming(|t| t.edge_id == boundary_outgoing);
                    }
                    next
                }
            };

            info!(
                task = %self.activity.id,
                boundary = %boundary_id,
                target = %next.id,
                "boundary event taken"
            );
            self.history.push_head(next);
        }

        if let Some(boundary) = self.activity.as_task_mut().and_then(|t| t.boundary_event.as_mut()) {
            boundary.finish();
        }
        Ok(())
    }

    /// Stops every other live branch.
    pub fn stop_all_except_this(&mut self) {
        let id = self.activity.id.clone();
        for activity in self.history.head.iter_mut().filter(|a| a.id != id) {
            activity.stop();
        }
    }
}

impl Deref for Step<'_> {
    type Target = Activity;

    fn deref(&self) -> &Activity {
        self.activity
    }
}

impl DerefMut for Step<'_> {
    fn deref_mut(&mut self) -> &mut Activity {
        self.activity
    }
}
