use bpmnflow::compiler::core::Compiler;
use bpmnflow::dsl::builder::ProcessBuilder;
use bpmnflow::dsl::{ActivityDoc, OneOrMany};
use bpmnflow::nodes::event::{EventKind, IntermediateKind};
use bpmnflow::nodes::gateway::GatewayKind;
use bpmnflow::nodes::task::TaskKind;
use bpmnflow::{ActivityCategory, BpmnError};

fn order_process() -> ProcessBuilder {
    ProcessBuilder::new("order")
        .start("start", "StartEvent")
        .task_of(TaskKind::User, "review", "Review")
        .gateway(GatewayKind::Inclusive, "split", "Split")
        .task_of(TaskKind::Script, "notify", "Notify")
        .catch_event("wait", "WaitPayment", IntermediateKind::Message)
        .throw_event("ping", "Ping")
        .end("end", "End")
        .boundary("timeout", "review", Some(IntermediateKind::Timer))
        .lane("lane_sales", "Sales", &["review", "split"])
        .flow("f0", "start", "review")
        .flow("f1", "review", "split")
        .flow("f2", "split", "notify")
        .flow("f3", "split", "wait")
        .flow("f4", "wait", "ping")
        .flow("f5", "ping", "end")
        .flow("f6", "notify", "end")
        .flow("f_timeout", "timeout", "end")
}

#[test]
fn test_compile_order_process() {
    let graph = Compiler::new().compile(&order_process().build()).expect("Compilation failed");

    assert_eq!(graph.activities().len(), 7);
    assert_eq!(graph.edges().len(), 8);
    assert_eq!(graph.start_event().id, "start");
    assert!(graph.start_event().as_event().unwrap().is_start());

    let review = graph.activity_by_id("review").unwrap();
    let task = review.as_task().unwrap();
    assert!(task.is_user());
    let boundary = task.boundary_event.as_ref().expect("boundary should be attached");
    assert_eq!(boundary.id, "timeout");
    assert_eq!(boundary.outgoing, "f_timeout");
    assert_eq!(boundary.intermediate_kind, Some(IntermediateKind::Timer));
    assert_eq!(review.lane.as_ref().map(|l| l.id.as_str()), Some("lane_sales"));
    // definitions carry no status
    assert_eq!(review.status(), None);

    let split = graph.activity_by_name("Split").unwrap();
    assert_eq!(split.category(), ActivityCategory::Gateway);
    assert!(split.as_gateway().unwrap().is_inclusive());
    assert!(split.token_shape_matches());
    assert!(split.as_gateway().unwrap().io_outgoing.as_ref().unwrap().is_many());

    let wait = graph.activity_by_id("wait").unwrap().as_event().unwrap();
    assert_eq!(wait.kind, EventKind::IntermediateCatch);
    assert_eq!(wait.intermediate_kind, Some(IntermediateKind::Message));
    let ping = graph.activity_by_id("ping").unwrap().as_event().unwrap();
    assert!(ping.is_intermediate_throw());
    assert_eq!(ping.intermediate_kind, Some(IntermediateKind::Normal));

    assert!(graph.activity_by_id("notify").unwrap().as_task().unwrap().is_script());
    assert!(graph.activity_by_id("notify").unwrap().lane.is_none());
    assert!(graph.activity_by_id("end").unwrap().as_event().unwrap().is_end());
}

#[test]
fn test_missing_start_event() {
    let mut process = order_process().build();
    process.start_event = None;
    let err = Compiler::new().compile(&process).unwrap_err();
    assert!(matches!(err, BpmnError::MissingStartEvent));
}

#[test]
fn test_start_event_given_as_list() {
    let mut process = order_process().build();
    let start = match process.start_event.take() {
        Some(OneOrMany::One(doc)) => doc,
        other => panic!("unexpected start events: {other:?}"),
    };
    process.start_event = Some(OneOrMany::Many(vec![start]));
    let err = Compiler::new().compile(&process).unwrap_err();
    assert!(matches!(err, BpmnError::StartEventIsList));
    assert_eq!(err.to_string(), "process.startEvent should not be a list");
}

#[test]
fn test_missing_end_event() {
    let mut process = order_process().build();
    process.end_event = None;
    let err = Compiler::new().compile(&process).unwrap_err();
    assert!(matches!(err, BpmnError::MissingEndEvent));
}

#[test]
fn test_duplicate_activity_id() {
    let mut process = order_process().build();
    process.manual_task = Some(OneOrMany::One(ActivityDoc {
        id: "review".to_string(),
        name: Some("Shadow".to_string()),
        ..Default::default()
    }));
    let err = Compiler::new().compile(&process).unwrap_err();
    assert!(matches!(err, BpmnError::DuplicateActivity(ref id) if id == "review"));
}

#[test]
fn test_empty_edge_list() {
    let mut process = order_process().build();
    process.task = Some(OneOrMany::One(ActivityDoc {
        id: "orphan".to_string(),
        outgoing: Some(OneOrMany::Many(Vec::new())),
        ..Default::default()
    }));
    let err = Compiler::new().compile(&process).unwrap_err();
    assert!(matches!(
        err,
        BpmnError::EmptyFlowList { ref activity, direction: "outgoing" } if activity == "orphan"
    ));
}

#[test]
fn test_scalar_and_list_refs_are_kept_apart() {
    let graph = Compiler::new().compile(&order_process().build()).unwrap();
    let review = graph.activity_by_id("review").unwrap();
    assert_eq!(review.incoming, Some(OneOrMany::One("f0".to_string())));
    let end = graph.activity_by_id("end").unwrap();
    assert_eq!(
        end.incoming,
        Some(OneOrMany::Many(vec![
            "f5".to_string(),
            "f6".to_string(),
            "f_timeout".to_string()
        ]))
    );
}
