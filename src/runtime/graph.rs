use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BpmnError, Result};
use crate::nodes::activity::{Activity, ActivityKind};
use crate::nodes::gateway::GatewayKind;

/// Directed sequence flow, immutable once the graph is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
}

/// The compiled process: one arena of activity definitions plus the edges.
/// Live instances refer back to it by id only.
#[derive(Debug, Clone)]
pub struct Graph {
    activities: Vec<Activity>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    start: usize,
}

impl Graph {
    pub(crate) fn from_parts(activities: Vec<Activity>, edges: Vec<Edge>, index: HashMap<String, usize>, start: usize) -> Self {
        Self {
            activities,
            edges,
            index,
            start,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn start_event(&self) -> &Activity {
        &self.activities[self.start]
    }

    pub fn activity_by_id(&self, id: &str) -> Option<&Activity> {
        self.index.get(id).map(|&slot| &self.activities[slot])
    }

    pub fn activity_by_name(&self, name: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.has_name(name))
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source_ref == source)
    }

    /// Target activity ids of the given edges, in edge order. Unknown edges
    /// are skipped.
    pub fn target_ids(&self, edge_ids: &[String]) -> Vec<String> {
        edge_ids
            .iter()
            .filter_map(|id| self.edge(id))
            .map(|edge| edge.target_ref.clone())
            .collect()
    }

    /// Moves tokens along `routed` edges.
    ///
    /// Targets already resident in `head` are updated in place; the others are
    /// instantiated and returned so the caller can merge them into `head`. A
    /// gateway target consumes one incoming token and is entered when its join
    /// holds, paused otherwise.
    pub fn advance(&self, routed: &[String], head: &mut [Activity]) -> Result<Vec<Activity>> {
        let mut fresh: Vec<Activity> = Vec::new();

        for target_id in self.target_ids(routed) {
            let target = if let Some(pos) = head.iter().position(|a| a.id == target_id) {
                &mut head[pos]
            } else if let Some(pos) = fresh.iter().position(|a| a.id == target_id) {
                &mut fresh[pos]
            } else {
                let Some(definition) = self.activity_by_id(&target_id) else {
                    continue;
                };
                fresh.push(definition.instantiate());
                let last = fresh.len() - 1;
                &mut fresh[last]
            };
            arrive(target, routed)?;
        }

        Ok(fresh)
    }
}

fn arrive(target: &mut Activity, routed: &[String]) -> Result<()> {
    let id = target.id.clone();
    match &mut target.kind {
        ActivityKind::Gateway(gateway) => {
            let on_route = |edge: &str| routed.iter().any(|r| r == edge);
            if !gateway.take_incoming(|t| !t.is_taken && on_route(&t.edge_id)) {
                gateway.take_incoming(|t| on_route(&t.edge_id));
            }
            if gateway.kind == GatewayKind::Complex {
                return Err(BpmnError::ComplexTraversal(id));
            }
            if gateway.join_satisfied() {
                target.enter();
            } else {
                debug!(activity = %id, "gateway waiting for sibling branches");
                target.pause();
            }
        }
        ActivityKind::Task(task) => {
            if let Some(boundary) = task.boundary_event.as_mut() {
                boundary.enter();
            }
            target.enter();
        }
        ActivityKind::Event(_) => {
            target.enter();
        }
    }
    Ok(())
}
