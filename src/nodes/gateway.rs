use serde::{Deserialize, Serialize};

use crate::dsl::{EdgeRefs, OneOrMany};
use crate::error::{BpmnError, Result};
use crate::nodes::activity::Activity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayKind {
    Exclusive,
    Inclusive,
    Parallel,
    Complex,
}

/// Join/split ledger entry for one edge reference of a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub edge_id: String,
    pub is_taken: bool,
}

impl Token {
    pub fn new(edge_id: &str) -> Self {
        Self {
            edge_id: edge_id.to_string(),
            is_taken: false,
        }
    }
}

pub type Tokens = OneOrMany<Token>;

/// One untaken token per edge id, in the same scalar/list shape.
pub fn tokens_for(refs: &Option<EdgeRefs>) -> Option<Tokens> {
    refs.as_ref().map(|refs| refs.map(|id| Token::new(id)))
}

pub fn any_taken(tokens: &Option<Tokens>) -> bool {
    tokens.as_ref().is_some_and(|t| t.iter().any(|token| token.is_taken))
}

pub fn all_taken(tokens: &Option<Tokens>) -> bool {
    tokens.as_ref().is_some_and(|t| t.iter().all(|token| token.is_taken))
}

pub fn only_one_taken(tokens: &Option<Tokens>) -> bool {
    tokens
        .as_ref()
        .is_some_and(|t| t.iter().filter(|token| token.is_taken).count() == 1)
}

/// At most one edge: a scalar token set, or none at all.
pub fn is_single(tokens: &Option<Tokens>) -> bool {
    tokens.as_ref().map_or(true, |t| !t.is_many())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayActivity {
    pub kind: GatewayKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_incoming: Option<Tokens>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_outgoing: Option<Tokens>,
}

impl GatewayActivity {
    pub fn new(kind: GatewayKind, incoming: &Option<EdgeRefs>, outgoing: &Option<EdgeRefs>) -> Self {
        Self {
            kind,
            io_incoming: tokens_for(incoming),
            io_outgoing: tokens_for(outgoing),
        }
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind == GatewayKind::Exclusive
    }

    pub fn is_inclusive(&self) -> bool {
        self.kind == GatewayKind::Inclusive
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == GatewayKind::Parallel
    }

    pub fn is_complex(&self) -> bool {
        self.kind == GatewayKind::Complex
    }

    pub(crate) fn shape_matches(&self, incoming: &Option<EdgeRefs>, outgoing: &Option<EdgeRefs>) -> bool {
        fn same(tokens: &Option<Tokens>, refs: &Option<EdgeRefs>) -> bool {
            match (tokens, refs) {
                (None, None) => true,
                (Some(t), Some(r)) => {
                    t.is_many() == r.is_many()
                        && t.len() == r.len()
                        && t.iter().zip(r.iter()).all(|(token, id)| &token.edge_id == id)
                }
                _ => false,
            }
        }
        same(&self.io_incoming, incoming) && same(&self.io_outgoing, outgoing)
    }

    /// Join predicate over the incoming tokens. Complex gateways are not
    /// gated by a join.
    pub fn join_satisfied(&self) -> bool {
        match self.kind {
            GatewayKind::Exclusive => any_taken(&self.io_incoming),
            GatewayKind::Inclusive | GatewayKind::Parallel => all_taken(&self.io_incoming),
            GatewayKind::Complex => true,
        }
    }

    /// Edge ids the split routes along. A scalar outgoing token is marked
    /// taken on the way; parallel gateways route every outgoing edge.
    pub fn split(&mut self) -> Vec<String> {
        let Some(outgoing) = self.io_outgoing.as_mut() else {
            return Vec::new();
        };
        match (self.kind, outgoing) {
            (GatewayKind::Parallel, outgoing) => outgoing.iter().map(|t| t.edge_id.clone()).collect(),
            (_, OneOrMany::One(token)) => {
                token.is_taken = true;
                vec![token.edge_id.clone()]
            }
            (GatewayKind::Exclusive, OneOrMany::Many(tokens)) => tokens
                .iter()
                .find(|t| t.is_taken)
                .map(|t| vec![t.edge_id.clone()])
                .unwrap_or_default(),
            (_, OneOrMany::Many(tokens)) => tokens
                .iter()
                .filter(|t| t.is_taken)
                .map(|t| t.edge_id.clone())
                .collect(),
        }
    }

    /// The gateway's own successor edges: `None` while the join holds back,
    /// otherwise the split.
    pub fn routes(&mut self) -> Option<Vec<String>> {
        if !self.join_satisfied() {
            return None;
        }
        Some(self.split())
    }

    pub fn refresh_all_outgoing(&mut self) -> &mut Self {
        if let Some(outgoing) = self.io_outgoing.as_mut() {
            for token in outgoing.iter_mut() {
                token.is_taken = false;
            }
        }
        self
    }

    /// Marks the first incoming token accepted by `arrived`. Returns whether
    /// one was found.
    pub fn take_incoming(&mut self, arrived: impl Fn(&Token) -> bool) -> bool {
        let Some(incoming) = self.io_incoming.as_mut() else {
            return false;
        };
        match incoming.iter_mut().find(|t| arrived(t)) {
            Some(token) => {
                token.is_taken = true;
                true
            }
            None => false,
        }
    }

    /// Pre-selects the outgoing edge leading into `target`. When `target` is
    /// found but no outgoing edge reaches it, the split is left untouched.
    pub fn take_outgoing(&mut self, operation: &'static str, key: &str, target: Option<&Activity>) -> Result<()> {
        if self.is_parallel() {
            return Err(BpmnError::SelectiveOutgoingUnsupported {
                operation,
                target: key.to_string(),
            });
        }
        let target = target.ok_or_else(|| BpmnError::OutgoingTargetNotFound {
            operation,
            target: key.to_string(),
        })?;
        let Some(target_incoming) = target.incoming.as_ref() else {
            return Ok(());
        };
        if let Some(outgoing) = self.io_outgoing.as_mut() {
            if let Some(token) = outgoing.iter_mut().find(|t| target_incoming.contains(&t.edge_id)) {
                token.is_taken = true;
            }
        }
        Ok(())
    }

    /// Default completion policy used when no handler is registered.
    /// `Ok(true)` finishes, `Ok(false)` pauses.
    pub fn default_completes(&self, id: &str) -> Result<bool> {
        match self.kind {
            GatewayKind::Complex => Err(BpmnError::ComplexForward(id.to_string())),
            GatewayKind::Exclusive => Ok((any_taken(&self.io_incoming) && only_one_taken(&self.io_outgoing))
                || is_single(&self.io_outgoing)),
            GatewayKind::Inclusive => Ok((all_taken(&self.io_incoming) && any_taken(&self.io_outgoing))
                || is_single(&self.io_outgoing)),
            GatewayKind::Parallel => Ok(all_taken(&self.io_incoming)),
        }
    }
}
