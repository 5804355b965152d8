use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::nodes::activity::ActivityKind;
use crate::runtime::step::Step;

/// Handler names starting with this prefix register on the automatic tier.
pub const AUTOMATIC_PREFIX: &str = "_";

/// Registration class of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Only invoked through an explicit `run()`.
    Manual,
    /// Invoked unattended by the forward pass.
    Automatic,
}

/// Caller-supplied activity logic. Receives the live activity and the payload,
/// is expected to transition the activity and return the (possibly updated)
/// payload.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, step: &mut Step<'_>, data: Value) -> Result<Value>;
}

/// Adapts a synchronous closure into a `Handler`.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Step<'_>, Value) -> Result<Value> + Send + Sync,
{
    async fn call(&self, step: &mut Step<'_>, data: Value) -> Result<Value> {
        (self.0)(step, data)
    }
}

/// Completion policy applied when an activity has no handler at all.
pub struct DefaultPolicy;

#[async_trait]
impl Handler for DefaultPolicy {
    async fn call(&self, step: &mut Step<'_>, data: Value) -> Result<Value> {
        let completes = match &step.kind {
            ActivityKind::Gateway(gateway) => gateway.default_completes(&step.id)?,
            ActivityKind::Task(_) | ActivityKind::Event(_) => true,
        };
        if completes {
            step.finish();
        } else {
            step.pause();
        }
        Ok(data)
    }
}

pub(crate) fn default_policy() -> Arc<dyn Handler> {
    Arc::new(DefaultPolicy)
}

#[derive(Clone, Default)]
struct Registration {
    manual: Option<Arc<dyn Handler>>,
    automatic: Option<Arc<dyn Handler>>,
}

/// Handler table keyed by activity name, two tiers per name.
#[derive(Clone, Default)]
pub struct Callable {
    handlers: HashMap<String, Registration>,
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("Callable").field("handlers", &names).finish()
    }
}

impl Callable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, tier: Tier, handler: Arc<dyn Handler>) -> &mut Self {
        let entry = self.handlers.entry(name.to_string()).or_default();
        match tier {
            Tier::Manual => entry.manual = Some(handler),
            Tier::Automatic => entry.automatic = Some(handler),
        }
        self
    }

    /// Registers under a conventional handler name: `_Name` is the automatic
    /// tier of `Name`, anything else the manual tier.
    pub fn register_named(&mut self, handler_name: &str, handler: Arc<dyn Handler>) -> &mut Self {
        match handler_name.strip_prefix(AUTOMATIC_PREFIX) {
            Some(name) if !name.is_empty() => self.register(name, Tier::Automatic, handler),
            _ => self.register(handler_name, Tier::Manual, handler),
        }
    }

    pub fn with_handler(mut self, name: &str, tier: Tier, handler: impl Handler + 'static) -> Self {
        self.register(name, tier, Arc::new(handler));
        self
    }

    pub fn with_manual<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Step<'_>, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.with_handler(name, Tier::Manual, FnHandler(f))
    }

    pub fn with_automatic<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Step<'_>, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.with_handler(name, Tier::Automatic, FnHandler(f))
    }

    pub fn manual(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).and_then(|r| r.manual.clone())
    }

    pub fn automatic(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).and_then(|r| r.automatic.clone())
    }

    /// Handler the forward pass uses: the automatic tier, or the default
    /// policy when nothing is registered. `None` means the activity waits for
    /// an explicit `run()`.
    pub fn for_forward(&self, name: Option<&str>) -> Option<Arc<dyn Handler>> {
        let Some(registration) = name.and_then(|n| self.handlers.get(n)) else {
            return Some(default_policy());
        };
        match (&registration.automatic, &registration.manual) {
            (Some(automatic), _) => Some(automatic.clone()),
            (None, Some(_)) => None,
            (None, None) => Some(default_policy()),
        }
    }

    /// Handler `run()` uses: manual tier, then automatic, then default policy.
    pub fn for_run(&self, name: &str) -> Arc<dyn Handler> {
        self.manual(name)
            .or_else(|| self.automatic(name))
            .unwrap_or_else(default_policy)
    }
}
