use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compiler::core::Compiler;
use crate::dsl::ProcessDoc;
use crate::error::{BpmnError, Result};
use crate::nodes::activity::{Activity, ActivityKind, ActivityStatus};
use crate::runtime::callable::{default_policy, Callable, Handler};
use crate::runtime::graph::Graph;
use crate::runtime::history::{History, Snapshot};
use crate::runtime::step::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    Init,
    Started,
    Paused,
    Stopped,
    Finished,
    Canceled,
}

/// Drives one process instance: owns the compiled graph, the history and the
/// handler table.
///
/// Every operation takes `&mut self`, so one engine never runs two handlers at
/// once. Hosts that share an engine across tasks go through
/// [`crate::runtime::worker::EngineWorker`].
pub struct Engine {
    instance_id: Uuid,
    state: EngineState,
    init_at: Option<DateTime<Utc>>,
    pause_at: Option<DateTime<Utc>>,
    start_at: Option<DateTime<Utc>>,
    stop_at: Option<DateTime<Utc>>,
    finish_at: Option<DateTime<Utc>>,
    cancel_at: Option<DateTime<Utc>>,

    graph: Option<Graph>,
    history: History,
    callable: Option<Callable>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let mut engine = Self {
            instance_id: Uuid::new_v4(),
            state: EngineState::Init,
            init_at: None,
            pause_at: None,
            start_at: None,
            stop_at: None,
            finish_at: None,
            cancel_at: None,
            graph: None,
            history: History::default(),
            callable: None,
        };
        engine.initialize();
        engine
    }

    /// `build` then `bind`.
    pub fn with_process(process: &ProcessDoc, callable: Callable) -> Result<Self> {
        let mut engine = Self::new();
        engine.build(process)?;
        engine.bind(callable);
        Ok(engine)
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Compiles the process and seeds head with the entered start event.
    pub fn build(&mut self, process: &ProcessDoc) -> Result<()> {
        let graph = Compiler::new().compile(process)?;
        self.history = History::default();
        self.history.head.push(graph.start_event().instantiate());
        info!(
            instance_id = %self.instance_id,
            process = %process.id,
            start = %graph.start_event().id,
            "process built"
        );
        self.graph = Some(graph);
        self.start_if_ready();
        Ok(())
    }

    pub fn bind(&mut self, callable: Callable) {
        debug!(instance_id = %self.instance_id, handlers = ?callable, "callable bound");
        self.callable = Some(callable);
        self.start_if_ready();
    }

    fn start_if_ready(&mut self) {
        if self.graph.is_some() && self.callable.is_some() && self.state == EngineState::Init {
            self.set_state(EngineState::Started);
        }
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn head(&self) -> &[Activity] {
        self.history.head()
    }

    pub fn stack(&self) -> &[Activity] {
        self.history.stack()
    }

    pub fn head_activity_by_id(&self, activity_id: &str) -> Result<&Activity> {
        self.history
            .head_by_id(activity_id)
            .ok_or_else(|| BpmnError::HeadActivityNotFoundById(activity_id.to_string()))
    }

    pub fn head_activity_by_name(&self, activity_name: &str) -> Result<&Activity> {
        self.history
            .head_by_name(activity_name)
            .ok_or_else(|| BpmnError::HeadActivityNotFoundByName(activity_name.to_string()))
    }

    /// Mutable access, e.g. to re-enter an activity a handler left started.
    pub fn head_activity_by_id_mut(&mut self, activity_id: &str) -> Result<&mut Activity> {
        self.history
            .head_by_id_mut(activity_id)
            .ok_or_else(|| BpmnError::HeadActivityNotFoundById(activity_id.to_string()))
    }

    pub fn head_activity_by_name_mut(&mut self, activity_name: &str) -> Result<&mut Activity> {
        self.history
            .head_by_name_mut(activity_name)
            .ok_or_else(|| BpmnError::HeadActivityNotFoundByName(activity_name.to_string()))
    }

    /// Runs the head activity named `activity_name` with its manual-tier
    /// handler (falling back to the automatic tier, then default policy).
    pub async fn run(&mut self, activity_name: &str, data: Value) -> Result<Value> {
        if self.is_finished() {
            return Err(BpmnError::AlreadyFinished);
        }
        let id = self
            .history
            .head_by_name(activity_name)
            .map(|a| a.id.clone())
            .ok_or_else(|| BpmnError::RunTargetNotFound(activity_name.to_string()))?;
        let handler = match &self.callable {
            Some(callable) => callable.for_run(activity_name),
            None => default_policy(),
        };
        self.execute(&id, handler, data).await
    }

    /// Dispatches `handler` on a head activity, then auto-advances whatever
    /// can progress unattended. A finished engine ignores the call.
    pub async fn execute(&mut self, activity_id: &str, handler: Arc<dyn Handler>, data: Value) -> Result<Value> {
        if self.is_finished() {
            return Ok(data);
        }
        self.ensure_started()?;
        let data = self.dispatch(activity_id, handler, data).await?;
        self.forward(data).await
    }

    /// Runs the forward pass on its own, e.g. after `deserialize`.
    pub async fn advance(&mut self, data: Value) -> Result<Value> {
        if self.is_finished() {
            return Ok(data);
        }
        self.ensure_started()?;
        self.forward(data).await
    }

    fn ensure_started(&self) -> Result<()> {
        match self.state {
            EngineState::Started => Ok(()),
            EngineState::Init => Err(BpmnError::NotInitialized),
            state => Err(BpmnError::InvalidState { state }),
        }
    }

    async fn dispatch(&mut self, activity_id: &str, handler: Arc<dyn Handler>, data: Value) -> Result<Value> {
        let graph = self.graph.as_ref().ok_or(BpmnError::NotInitialized)?;
        let mut activity = self
            .history
            .head_by_id(activity_id)
            .cloned()
            .ok_or_else(|| BpmnError::HeadActivityNotFoundById(activity_id.to_string()))?;

        if !activity.is_entered() {
            let status = activity.status();
            return Err(BpmnError::NotEntered {
                id: activity.id,
                name: activity.name,
                status,
            });
        }

        activity.start();
        let before = activity.status();
        debug!(
            instance_id = %self.instance_id,
            activity = %activity.id,
            category = ?activity.category(),
            "dispatching handler"
        );

        let outcome = {
            let mut step = Step::new(&mut activity, graph, &mut self.history);
            handler.call(&mut step, data).await
        };

        // The live copy goes back into head even when the handler failed.
        if let Some(slot) = self.history.head_by_id_mut(&activity.id) {
            *slot = activity.clone();
        }
        let data = outcome.map_err(|e| surface(&activity.id, e))?;

        if activity.status() != before {
            match activity.status() {
                Some(ActivityStatus::Canceled) => {
                    info!(activity = %activity.id, "activity canceled, branch ends");
                    self.history.retire(&activity);
                }
                Some(ActivityStatus::Finished) => self.complete(activity)?,
                status => debug!(activity = %activity.id, ?status, "activity stays in head"),
            }
        }

        if self.history.head.is_empty() {
            self.finish();
            info!(instance_id = %self.instance_id, "workflow finished");
        }

        Ok(data)
    }

    /// Moves a finished activity to the stack and merges its successors into
    /// head. A gateway whose join does not hold is paused instead.
    fn complete(&mut self, mut activity: Activity) -> Result<()> {
        let graph = self.graph.as_ref().ok_or(BpmnError::NotInitialized)?;

        let routes = match &mut activity.kind {
            ActivityKind::Gateway(gateway) => gateway.routes(),
            _ => Some(
                activity
                    .outgoing
                    .as_ref()
                    .map(|outgoing| outgoing.iter().cloned().collect())
                    .unwrap_or_default(),
            ),
        };
        let Some(routed) = routes else {
            debug!(activity = %activity.id, "join not satisfied, gateway paused");
            activity.pause();
            if let Some(slot) = self.history.head_by_id_mut(&activity.id) {
                *slot = activity;
            }
            return Ok(());
        };

        info!(activity = %activity.id, routed = ?routed, "activity finished");
        self.history.retire(&activity);
        let successors = graph.advance(&routed, &mut self.history.head)?;
        self.history.merge(successors);
        Ok(())
    }

    /// Drives every head activity that may progress unattended, restarting
    /// from the front of head after each step. Paused and stopped activities
    /// are skipped, as are those only reachable through `run()`.
    async fn forward(&mut self, mut data: Value) -> Result<Value> {
        let mut settled: HashSet<String> = HashSet::new();

        while self.is_started() {
            let Some((id, handler)) = self.next_automatic(&settled) else {
                break;
            };
            data = self.dispatch(&id, handler, data).await?;
            if self.history.head_by_id(&id).is_some_and(|a| a.is_entered()) {
                // handler re-entered its own activity; do not spin on it
                settled.insert(id);
            }
        }

        Ok(data)
    }

    fn next_automatic(&self, settled: &HashSet<String>) -> Option<(String, Arc<dyn Handler>)> {
        let callable = self.callable.as_ref()?;
        self.history
            .head
            .iter()
            .filter(|a| a.is_entered() && !settled.contains(&a.id))
            .find_map(|a| callable.for_forward(a.name()).map(|handler| (a.id.clone(), handler)))
    }

    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            init_at: self.init_at,
            pause_at: self.pause_at,
            start_at: self.start_at,
            stop_at: self.stop_at,
            finish_at: self.finish_at,
            cancel_at: self.cancel_at,
            head: self.history.head.clone(),
            stack: self.history.stack.clone(),
        }
    }

    /// Restores lifecycle and history from a snapshot. The process must
    /// already be built.
    pub fn deserialize(&mut self, snapshot: Snapshot) -> Result<()> {
        let graph = self.graph.as_ref().ok_or(BpmnError::NotInitialized)?;
        self.history = History::restore(snapshot.head, snapshot.stack, graph)?;
        self.state = snapshot.state;
        self.init_at = snapshot.init_at;
        self.pause_at = snapshot.pause_at;
        self.start_at = snapshot.start_at;
        self.stop_at = snapshot.stop_at;
        self.finish_at = snapshot.finish_at;
        self.cancel_at = snapshot.cancel_at;
        info!(
            instance_id = %self.instance_id,
            state = ?self.state,
            head = self.history.head.len(),
            stack = self.history.stack.len(),
            "snapshot restored"
        );
        Ok(())
    }

    // --- lifecycle ---

    fn set_state(&mut self, state: EngineState) {
        let now = Some(Utc::now());
        match state {
            EngineState::Init => self.init_at = now,
            EngineState::Started => self.start_at = now,
            EngineState::Paused => self.pause_at = now,
            EngineState::Stopped => self.stop_at = now,
            EngineState::Finished => self.finish_at = now,
            EngineState::Canceled => self.cancel_at = now,
        }
        debug!(instance_id = %self.instance_id, ?state, "engine state");
        self.state = state;
    }

    fn initialize(&mut self) {
        self.set_state(EngineState::Init);
    }

    /// (Re)starts the engine. Refused until a process is built and a callable bound.
    pub fn start(&mut self) -> Result<()> {
        if self.graph.is_none() || self.callable.is_none() {
            return Err(BpmnError::NotInitialized);
        }
        self.set_state(EngineState::Started);
        Ok(())
    }

    pub fn pause(&mut self) {
        self.set_state(EngineState::Paused);
    }

    pub fn stop(&mut self) {
        self.set_state(EngineState::Stopped);
    }

    pub fn cancel(&mut self) {
        self.set_state(EngineState::Canceled);
    }

    fn finish(&mut self) {
        self.set_state(EngineState::Finished);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == EngineState::Init
    }

    pub fn is_started(&self) -> bool {
        self.state == EngineState::Started
    }

    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    pub fn is_finished(&self) -> bool {
        self.state == EngineState::Finished
    }

    pub fn is_canceled(&self) -> bool {
        self.state == EngineState::Canceled
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.init_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_at
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.pause_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stop_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finish_at
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.cancel_at
    }
}

/// Typed engine errors raised inside a handler come back unchanged.
fn surface(activity_id: &str, error: anyhow::Error) -> BpmnError {
    match error.downcast::<BpmnError>() {
        Ok(error) => error,
        Err(source) => BpmnError::Handler {
            activity: activity_id.to_string(),
            source,
        },
    }
}
