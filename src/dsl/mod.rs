pub mod builder;

use serde::{Deserialize, Serialize};

use crate::nodes::event::IntermediateKind;

/// A value that the diagram source may give either as a scalar or as a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_mut(item).iter_mut(),
            OneOrMany::Many(items) => items.iter_mut(),
        }
    }

    /// Same shape, every element mapped.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> OneOrMany<U> {
        match self {
            OneOrMany::One(item) => OneOrMany::One(f(item)),
            OneOrMany::Many(items) => OneOrMany::Many(items.iter().map(f).collect()),
        }
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|item| item == value)
    }
}

/// Edge ids attached to an activity, scalar or ordered list.
pub type EdgeRefs = OneOrMany<String>;

/// One decoded flow node (task, gateway or event).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming: Option<EdgeRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<EdgeRefs>,
    /// Only meaningful for intermediate events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_kind: Option<IntermediateKind>,
}

/// A sequence flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlowDoc {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaneDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub flow_node_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryEventDoc {
    pub id: String,
    pub attached_to_ref: String,
    pub outgoing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_kind: Option<IntermediateKind>,
}

/// The decoded process, as handed over by whatever parsed the diagram.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDoc {
    pub id: String,
    #[serde(default)]
    pub is_executable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_event: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_event: Option<OneOrMany<ActivityDoc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<OneOrMany<LaneDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_flow: Option<OneOrMany<FlowDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_event: Option<OneOrMany<BoundaryEventDoc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_task: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_task: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_task: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_task: Option<OneOrMany<ActivityDoc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_gateway: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_gateway: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_gateway: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_gateway: Option<OneOrMany<ActivityDoc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_throw_event: Option<OneOrMany<ActivityDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_catch_event: Option<OneOrMany<ActivityDoc>>,
}
