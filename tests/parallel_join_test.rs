use bpmnflow::dsl::builder::ProcessBuilder;
use bpmnflow::dsl::ProcessDoc;
use bpmnflow::nodes::gateway::GatewayKind;
use bpmnflow::{Activity, BpmnError, Callable, Engine, Step};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Two exclusive gateways feed one parallel join that fans out again.
fn converging() -> ProcessDoc {
    ProcessBuilder::new("converging")
        .start("start", "StartEvent")
        .gateway(GatewayKind::Parallel, "fork", "Fork")
        .gateway(GatewayKind::Exclusive, "gw_a", "GatewayA")
        .gateway(GatewayKind::Exclusive, "gw_b", "GatewayB")
        .gateway(GatewayKind::Parallel, "join", "Join")
        .task("ship", "Ship")
        .task("invoice", "Invoice")
        .end("end_ship", "Shipped")
        .end("end_invoice", "Invoiced")
        .flow("f0", "start", "fork")
        .flow("fa", "fork", "gw_a")
        .flow("fb", "fork", "gw_b")
        .flow("e1", "gw_a", "join")
        .flow("e2", "gw_b", "join")
        .flow("o1", "join", "ship")
        .flow("o2", "join", "invoice")
        .flow("s1", "ship", "end_ship")
        .flow("i1", "invoice", "end_invoice")
        .build()
}

fn callable() -> Callable {
    let finish = |step: &mut Step<'_>, data: Value| -> anyhow::Result<Value> {
        step.finish();
        Ok(data)
    };
    Callable::new()
        .with_manual("GatewayA", finish)
        .with_manual("GatewayB", finish)
        .with_manual("Ship", finish)
        .with_manual("Invoice", finish)
}

fn assert_head_unique(head: &[Activity]) {
    let mut seen = HashSet::new();
    for activity in head {
        assert!(seen.insert(activity.id.clone()), "{} appears twice in head", activity.id);
    }
}

#[tokio::test]
async fn test_parallel_join_waits_for_every_branch() {
    let mut engine = Engine::with_process(&converging(), callable()).unwrap();

    engine.advance(json!({})).await.unwrap();
    assert!(engine.head_activity_by_id("gw_a").unwrap().is_entered());
    assert!(engine.head_activity_by_id("gw_b").unwrap().is_entered());
    assert_head_unique(engine.head());

    // first branch arrives: the join holds back
    engine.run("GatewayA", json!({})).await.unwrap();
    let join = engine.head_activity_by_id("join").expect("join should be resident");
    assert!(join.is_paused());
    assert!(!join.as_gateway().unwrap().join_satisfied());
    assert!(engine.stack().iter().all(|a| a.id != "join"));
    assert_head_unique(engine.head());

    // second branch arrives: the join fires and routes both outgoing edges
    engine.run("GatewayB", json!({})).await.unwrap();
    assert!(engine.head_activity_by_id("join").is_err());
    let join = engine.stack().iter().find(|a| a.id == "join").unwrap();
    assert!(join.is_finished());
    assert!(join.as_gateway().unwrap().join_satisfied());
    assert!(engine.head_activity_by_id("ship").unwrap().is_entered());
    assert!(engine.head_activity_by_id("invoice").unwrap().is_entered());
    assert_head_unique(engine.head());

    engine.run("Ship", json!({})).await.unwrap();
    engine.run("Invoice", json!({})).await.unwrap();
    assert!(engine.is_finished());

    let joins = engine.stack().iter().filter(|a| a.id == "join").count();
    assert_eq!(joins, 1);
}

#[tokio::test]
async fn test_automatic_join_handler_runs_once_join_holds() {
    let callable = callable().with_automatic("Join", |step, data| {
        step.finish();
        Ok(data)
    });
    let mut engine = Engine::with_process(&converging(), callable).unwrap();
    engine.advance(json!({})).await.unwrap();
    engine.run("GatewayA", json!({})).await.unwrap();
    assert!(engine.head_activity_by_id("join").unwrap().is_paused());

    engine.run("GatewayB", json!({})).await.unwrap();
    assert!(engine.stack().iter().any(|a| a.id == "join" && a.is_finished()));
}

#[tokio::test]
async fn test_converging_task_is_merged_not_duplicated() {
    let process = ProcessBuilder::new("diamond")
        .start("start", "StartEvent")
        .gateway(GatewayKind::Parallel, "fork", "Fork")
        .task("left", "Left")
        .task("right", "Right")
        .task("merge", "Merge")
        .end("end", "End")
        .flow("f0", "start", "fork")
        .flow("fl", "fork", "left")
        .flow("fr", "fork", "right")
        .flow("lm", "left", "merge")
        .flow("rm", "right", "merge")
        .flow("me", "merge", "end")
        .build();
    let finish = |step: &mut Step<'_>, data: Value| -> anyhow::Result<Value> {
        step.finish();
        Ok(data)
    };
    let callable = Callable::new()
        .with_manual("Left", finish)
        .with_manual("Right", finish)
        .with_manual("Merge", finish);
    let mut engine = Engine::with_process(&process, callable).unwrap();

    engine.advance(json!({})).await.unwrap();
    engine.run("Left", json!({})).await.unwrap();
    assert_head_unique(engine.head());
    engine.run("Right", json!({})).await.unwrap();
    assert_head_unique(engine.head());

    let merges: Vec<&Activity> = engine.head().iter().filter(|a| a.id == "merge").collect();
    assert_eq!(merges.len(), 1);
    assert!(merges[0].is_entered());

    engine.run("Merge", json!({})).await.unwrap();
    assert!(engine.is_finished());
}

#[tokio::test]
async fn test_selective_outgoing_on_parallel_gateway_fails() {
    let callable = Callable::new().with_automatic("Fork", |step, data| {
        step.take_outgoing_by_name("GatewayA")?;
        step.finish();
        Ok(data)
    });
    let mut engine = Engine::with_process(&converging(), callable).unwrap();

    let err = engine.advance(json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        BpmnError::SelectiveOutgoingUnsupported { operation: "take_outgoing_by_name", .. }
    ));
}
