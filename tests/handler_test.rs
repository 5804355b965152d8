use async_trait::async_trait;
use bpmnflow::dsl::builder::ProcessBuilder;
use bpmnflow::dsl::ProcessDoc;
use bpmnflow::runtime::callable::FnHandler;
use bpmnflow::{Callable, Engine, Handler, Step, Tier};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn shipping() -> ProcessDoc {
    ProcessBuilder::new("shipping")
        .start("start", "StartEvent")
        .task("quote", "Quote")
        .task("label", "Label")
        .end("end", "End")
        .flow("f0", "start", "quote")
        .flow("f1", "quote", "label")
        .flow("f2", "label", "end")
        .build()
}

/// Calls out to a (simulated) carrier before finishing.
struct CarrierQuote {
    latency: Duration,
}

#[async_trait]
impl Handler for CarrierQuote {
    async fn call(&self, step: &mut Step<'_>, mut data: Value) -> anyhow::Result<Value> {
        tokio::time::sleep(self.latency).await;
        data["quote"] = json!(42);
        step.finish();
        Ok(data)
    }
}

#[tokio::test]
async fn test_async_handler_is_awaited_before_advancing() {
    let callable = Callable::new()
        .with_handler("Quote", Tier::Automatic, CarrierQuote { latency: Duration::from_millis(20) })
        .with_automatic("Label", |step, mut data| {
            let quote = data["quote"].as_i64().unwrap_or_default();
            data["label"] = json!(format!("PRIORITY-{}", quote));
            step.finish();
            Ok(data)
        });
    let mut engine = Engine::with_process(&shipping(), callable).unwrap();

    let data = engine.advance(json!({ "parcel": "p-1" })).await.unwrap();

    assert_eq!(data, json!({ "parcel": "p-1", "quote": 42, "label": "PRIORITY-42" }));
    assert!(engine.is_finished());
}

#[tokio::test]
async fn test_register_named_uses_prefix_for_automatic_tier() {
    let finish: Arc<dyn Handler> = Arc::new(FnHandler(|step: &mut Step<'_>, data: Value| -> anyhow::Result<Value> {
        step.finish();
        Ok(data)
    }));
    let mut callable = Callable::new();
    callable
        .register_named("_Quote", finish.clone())
        .register_named("Label", finish);

    assert!(callable.automatic("Quote").is_some());
    assert!(callable.manual("Quote").is_none());
    assert!(callable.manual("Label").is_some());
    assert!(callable.automatic("Label").is_none());

    let mut engine = Engine::with_process(&shipping(), callable).unwrap();
    engine.advance(json!({})).await.unwrap();

    // Quote advanced unattended, Label waits for an explicit run
    assert!(engine.stack().iter().any(|a| a.id == "quote"));
    assert!(engine.head_activity_by_name("Label").unwrap().is_entered());

    engine.run("Label", json!({})).await.unwrap();
    assert!(engine.is_finished());
}

#[tokio::test]
async fn test_handler_without_transition_is_not_retried() {
    let callable = Callable::new().with_automatic("Quote", |_, data| Ok(data));
    let mut engine = Engine::with_process(&shipping(), callable).unwrap();

    engine.advance(json!({})).await.unwrap();

    let quote = engine.head_activity_by_id("quote").unwrap();
    assert!(quote.is_started());
    assert!(engine.head_activity_by_id("label").is_err());
}
