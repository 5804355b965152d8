use crate::dsl::{ActivityDoc, BoundaryEventDoc, EdgeRefs, FlowDoc, LaneDoc, OneOrMany, ProcessDoc};
use crate::nodes::event::IntermediateKind;
use crate::nodes::gateway::GatewayKind;
use crate::nodes::task::TaskKind;

/// Which `ProcessDoc` collection a node lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Start,
    End,
    Task(TaskKind),
    Gateway(GatewayKind),
    ThrowEvent,
    CatchEvent,
}

/// Assembles a `ProcessDoc` in code. `incoming`/`outgoing` are derived from
/// the declared flows: one edge gives a scalar, several give a list.
pub struct ProcessBuilder {
    id: String,
    nodes: Vec<(Slot, ActivityDoc)>,
    flows: Vec<FlowDoc>,
    lanes: Vec<LaneDoc>,
    boundaries: Vec<(String, String, Option<IntermediateKind>)>,
}

impl ProcessBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            nodes: Vec::new(),
            flows: Vec::new(),
            lanes: Vec::new(),
            boundaries: Vec::new(),
        }
    }

    fn node(mut self, slot: Slot, id: &str, name: &str) -> Self {
        self.nodes.push((
            slot,
            ActivityDoc {
                id: id.to_string(),
                name: (!name.is_empty()).then(|| name.to_string()),
                ..Default::default()
            },
        ));
        self
    }

    pub fn start(self, id: &str, name: &str) -> Self {
        self.node(Slot::Start, id, name)
    }

    pub fn end(self, id: &str, name: &str) -> Self {
        self.node(Slot::End, id, name)
    }

    pub fn task(self, id: &str, name: &str) -> Self {
        self.node(Slot::Task(TaskKind::Normal), id, name)
    }

    pub fn task_of(self, kind: TaskKind, id: &str, name: &str) -> Self {
        self.node(Slot::Task(kind), id, name)
    }

    pub fn gateway(self, kind: GatewayKind, id: &str, name: &str) -> Self {
        self.node(Slot::Gateway(kind), id, name)
    }

    pub fn throw_event(self, id: &str, name: &str) -> Self {
        self.node(Slot::ThrowEvent, id, name)
    }

    pub fn catch_event(mut self, id: &str, name: &str, kind: IntermediateKind) -> Self {
        self = self.node(Slot::CatchEvent, id, name);
        if let Some((_, doc)) = self.nodes.last_mut() {
            doc.intermediate_kind = Some(kind);
        }
        self
    }

    /// Attaches a boundary event to `task_id`; its outgoing edge is the flow
    /// whose source is `id`.
    pub fn boundary(mut self, id: &str, task_id: &str, kind: Option<IntermediateKind>) -> Self {
        self.boundaries.push((id.to_string(), task_id.to_string(), kind));
        self
    }

    pub fn lane(mut self, id: &str, name: &str, members: &[&str]) -> Self {
        self.lanes.push(LaneDoc {
            id: id.to_string(),
            name: Some(name.to_string()),
            flow_node_refs: members.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    pub fn flow(mut self, id: &str, source: &str, target: &str) -> Self {
        self.flows.push(FlowDoc {
            id: id.to_string(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
        });
        self
    }

    fn refs(&self, pick: impl Fn(&FlowDoc) -> bool) -> Option<EdgeRefs> {
        let mut ids: Vec<String> = self.flows.iter().filter(|f| pick(f)).map(|f| f.id.clone()).collect();
        match ids.len() {
            0 => None,
            1 => ids.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(ids)),
        }
    }

    pub fn build(self) -> ProcessDoc {
        let mut process = ProcessDoc {
            id: self.id.clone(),
            is_executable: true,
            ..Default::default()
        };

        let mut buckets: Vec<(Slot, Vec<ActivityDoc>)> = Vec::new();
        for (slot, doc) in &self.nodes {
            let mut doc = doc.clone();
            doc.incoming = self.refs(|f| f.target_ref == doc.id);
            doc.outgoing = self.refs(|f| f.source_ref == doc.id);
            match buckets.iter_mut().find(|(s, _)| s == slot) {
                Some((_, docs)) => docs.push(doc),
                None => buckets.push((*slot, vec![doc])),
            }
        }

        for (slot, mut docs) in buckets {
            let value = if docs.len() == 1 {
                docs.pop().map(OneOrMany::One)
            } else {
                Some(OneOrMany::Many(docs))
            };
            let field = match slot {
                Slot::Start => &mut process.start_event,
                Slot::End => &mut process.end_event,
                Slot::Task(TaskKind::Normal) => &mut process.task,
                Slot::Task(TaskKind::User) => &mut process.user_task,
                Slot::Task(TaskKind::Manual) => &mut process.manual_task,
                Slot::Task(TaskKind::Service) => &mut process.service_task,
                Slot::Task(TaskKind::Script) => &mut process.script_task,
                Slot::Gateway(GatewayKind::Exclusive) => &mut process.exclusive_gateway,
                Slot::Gateway(GatewayKind::Inclusive) => &mut process.inclusive_gateway,
                Slot::Gateway(GatewayKind::Parallel) => &mut process.parallel_gateway,
                Slot::Gateway(GatewayKind::Complex) => &mut process.complex_gateway,
                Slot::ThrowEvent => &mut process.intermediate_throw_event,
                Slot::CatchEvent => &mut process.intermediate_catch_event,
            };
            *field = value;
        }

        let boundaries: Vec<BoundaryEventDoc> = self
            .boundaries
            .iter()
            .map(|(id, task_id, kind)| BoundaryEventDoc {
                id: id.clone(),
                attached_to_ref: task_id.clone(),
                outgoing: self
                    .flows
                    .iter()
                    .find(|f| &f.source_ref == id)
                    .map(|f| f.id.clone())
                    .unwrap_or_default(),
                intermediate_kind: *kind,
            })
            .collect();
        if !boundaries.is_empty() {
            process.boundary_event = Some(OneOrMany::Many(boundaries));
        }
        if !self.lanes.is_empty() {
            process.lanes = Some(OneOrMany::Many(self.lanes));
        }
        if !self.flows.is_empty() {
            process.sequence_flow = Some(OneOrMany::Many(self.flows));
        }

        process
    }
}
