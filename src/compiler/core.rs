use std::collections::HashMap;

use tracing::debug;

use crate::dsl::{ActivityDoc, BoundaryEventDoc, EdgeRefs, LaneDoc, OneOrMany, ProcessDoc};
use crate::error::{BpmnError, Result};
use crate::nodes::activity::{Activity, ActivityKind, LaneTag};
use crate::nodes::event::{EventActivity, EventKind};
use crate::nodes::gateway::{GatewayActivity, GatewayKind};
use crate::nodes::task::{BoundaryEvent, TaskActivity, TaskKind};
use crate::runtime::graph::{Edge, Graph};

/// Compiles decoded process records into the activity/edge arena.
pub struct Compiler {
    id_map: HashMap<String, usize>,
    activities: Vec<Activity>,
    lanes: Vec<LaneDoc>,
    boundaries: Vec<BoundaryEventDoc>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            id_map: HashMap::new(),
            activities: Vec::new(),
            lanes: Vec::new(),
            boundaries: Vec::new(),
        }
    }

    pub fn compile(mut self, process: &ProcessDoc) -> Result<Graph> {
        self.lanes = collect(&process.lanes);
        self.boundaries = collect(&process.boundary_event);

        // 1. Start event, always slot 0
        let start = match &process.start_event {
            None => return Err(BpmnError::MissingStartEvent),
            Some(OneOrMany::Many(_)) => return Err(BpmnError::StartEventIsList),
            Some(OneOrMany::One(doc)) => doc,
        };
        self.push(start, ActivityKind::Event(EventActivity::new(EventKind::Start)))?;

        // 2. Edges
        let edges: Vec<Edge> = collect(&process.sequence_flow)
            .into_iter()
            .map(|f| Edge {
                id: f.id,
                source_ref: f.source_ref,
                target_ref: f.target_ref,
            })
            .collect();

        // 3. Tasks
        for (docs, kind) in [
            (&process.task, TaskKind::Normal),
            (&process.user_task, TaskKind::User),
            (&process.manual_task, TaskKind::Manual),
            (&process.service_task, TaskKind::Service),
            (&process.script_task, TaskKind::Script),
        ] {
            for doc in collect(docs) {
                let boundary = self.boundary_for(&doc.id);
                self.push(&doc, ActivityKind::Task(TaskActivity::new(kind, boundary)))?;
            }
        }

        // 4. Gateways
        for (docs, kind) in [
            (&process.exclusive_gateway, GatewayKind::Exclusive),
            (&process.inclusive_gateway, GatewayKind::Inclusive),
            (&process.parallel_gateway, GatewayKind::Parallel),
            (&process.complex_gateway, GatewayKind::Complex),
        ] {
            for doc in collect(docs) {
                let gateway = GatewayActivity::new(kind, &doc.incoming, &doc.outgoing);
                self.push(&doc, ActivityKind::Gateway(gateway))?;
            }
        }

        // 5. Events
        let ends = process.end_event.as_ref().ok_or(BpmnError::MissingEndEvent)?;
        for doc in ends.iter() {
            self.push(doc, ActivityKind::Event(EventActivity::new(EventKind::End)))?;
        }
        for (docs, kind) in [
            (&process.intermediate_throw_event, EventKind::IntermediateThrow),
            (&process.intermediate_catch_event, EventKind::IntermediateCatch),
        ] {
            for doc in collect(docs) {
                let event = EventActivity::intermediate(kind, doc.intermediate_kind);
                self.push(&doc, ActivityKind::Event(event))?;
            }
        }

        debug!(
            process = %process.id,
            activities = self.activities.len(),
            edges = edges.len(),
            "compiled process"
        );

        Ok(Graph::from_parts(self.activities, edges, self.id_map, 0))
    }

    fn push(&mut self, doc: &ActivityDoc, kind: ActivityKind) -> Result<()> {
        check_refs(&doc.id, "incoming", &doc.incoming)?;
        check_refs(&doc.id, "outgoing", &doc.outgoing)?;

        let slot = self.activities.len();
        if self.id_map.insert(doc.id.clone(), slot).is_some() {
            return Err(BpmnError::DuplicateActivity(doc.id.clone()));
        }

        let activity = Activity::new(
            doc.id.clone(),
            doc.name.clone(),
            doc.incoming.clone(),
            doc.outgoing.clone(),
            kind,
        )
        .with_lane(self.lane_for(&doc.id));
        self.activities.push(activity);
        Ok(())
    }

    fn lane_for(&self, id: &str) -> Option<LaneTag> {
        self.lanes
            .iter()
            .find(|lane| lane.flow_node_refs.iter().any(|member| member == id))
            .map(|lane| LaneTag {
                id: lane.id.clone(),
                name: lane.name.clone(),
            })
    }

    fn boundary_for(&self, task_id: &str) -> Option<BoundaryEvent> {
        self.boundaries
            .iter()
            .find(|b| b.attached_to_ref == task_id)
            .map(|b| BoundaryEvent::new(&b.id, &b.attached_to_ref, &b.outgoing, b.intermediate_kind))
    }
}

fn collect<T: Clone>(docs: &Option<OneOrMany<T>>) -> Vec<T> {
    docs.as_ref().map(|d| d.iter().cloned().collect()).unwrap_or_default()
}

fn check_refs(id: &str, direction: &'static str, refs: &Option<EdgeRefs>) -> Result<()> {
    match refs {
        Some(refs) if refs.is_empty() => Err(BpmnError::EmptyFlowList {
            activity: id.to_string(),
            direction,
        }),
        _ => Ok(()),
    }
}
