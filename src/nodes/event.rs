use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    IntermediateThrow,
    IntermediateCatch,
    End,
}

/// Trigger of an intermediate or boundary event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntermediateKind {
    Error,
    Signal,
    Message,
    Timer,
    #[default]
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventActivity {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_kind: Option<IntermediateKind>,
}

impl EventActivity {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            intermediate_kind: None,
        }
    }

    pub fn intermediate(kind: EventKind, trigger: Option<IntermediateKind>) -> Self {
        Self {
            kind,
            intermediate_kind: Some(trigger.unwrap_or_default()),
        }
    }

    pub fn is_start(&self) -> bool {
        self.kind == EventKind::Start
    }

    pub fn is_intermediate_throw(&self) -> bool {
        self.kind == EventKind::IntermediateThrow
    }

    pub fn is_intermediate_catch(&self) -> bool {
        self.kind == EventKind::IntermediateCatch
    }

    pub fn is_end(&self) -> bool {
        self.kind == EventKind::End
    }
}
