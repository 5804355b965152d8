use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{BpmnError, Result};
use crate::runtime::callable::Handler;
use crate::runtime::engine::{Engine, EngineState};
use crate::runtime::history::Snapshot;

enum Command {
    Run {
        name: String,
        data: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Execute {
        id: String,
        handler: Arc<dyn Handler>,
        data: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Advance {
        data: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    State {
        reply: oneshot::Sender<EngineState>,
    },
}

/// Owns one engine on a tokio task and serializes every call made through its
/// handles, so concurrent callers never interleave inside a handler.
pub struct EngineWorker;

impl EngineWorker {
    /// The join handle yields the engine back once every handle is dropped.
    pub fn spawn(engine: Engine, capacity: usize) -> (EngineHandle, JoinHandle<Engine>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let join = tokio::spawn(Self::run_loop(engine, rx));
        (EngineHandle { sender: tx }, join)
    }

    async fn run_loop(mut engine: Engine, mut rx: mpsc::Receiver<Command>) -> Engine {
        info!(instance_id = %engine.instance_id(), "engine worker started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Run { name, data, reply } => {
                    debug!(activity = %name, "worker: run");
                    let _ = reply.send(engine.run(&name, data).await);
                }
                Command::Execute { id, handler, data, reply } => {
                    debug!(activity = %id, "worker: execute");
                    let _ = reply.send(engine.execute(&id, handler, data).await);
                }
                Command::Advance { data, reply } => {
                    let _ = reply.send(engine.advance(data).await);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(engine.serialize());
                }
                Command::State { reply } => {
                    let _ = reply.send(engine.state());
                }
            }
        }

        info!(instance_id = %engine.instance_id(), state = ?engine.state(), "engine worker stopped");
        engine
    }
}

#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub async fn run(&self, name: &str, data: Value) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Run {
            name: name.to_string(),
            data,
            reply,
        })
        .await?;
        rx.await.map_err(|e| BpmnError::WorkerClosed(e.to_string()))?
    }

    pub async fn execute(&self, id: &str, handler: Arc<dyn Handler>, data: Value) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Execute {
            id: id.to_string(),
            handler,
            data,
            reply,
        })
        .await?;
        rx.await.map_err(|e| BpmnError::WorkerClosed(e.to_string()))?
    }

    pub async fn advance(&self, data: Value) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Advance { data, reply }).await?;
        rx.await.map_err(|e| BpmnError::WorkerClosed(e.to_string()))?
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|e| BpmnError::WorkerClosed(e.to_string()))
    }

    pub async fn state(&self) -> Result<EngineState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::State { reply }).await?;
        rx.await.map_err(|e| BpmnError::WorkerClosed(e.to_string()))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.sender
            .send(command)
            .await
            .map_err(|e| BpmnError::WorkerClosed(format!("Engine channel closed: {}", e)))
    }
}
