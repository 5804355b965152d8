use bpmnflow::compiler::core::Compiler;
use bpmnflow::compiler::loader;
use bpmnflow::dsl::builder::ProcessBuilder;
use bpmnflow::dsl::OneOrMany;
use bpmnflow::nodes::gateway::GatewayKind;
use bpmnflow::{Callable, Engine};
use serde_json::json;
use std::fs;
use std::path::Path;

#[test]
fn test_load_simple_yaml_process() {
    let yaml_content = r#"
id: "yaml-process"
isExecutable: true
startEvent:
  id: "start"
  name: "StartEvent"
  outgoing: "f0"
exclusiveGateway:
  id: "xor"
  name: "Xor"
  incoming: "f0"
  outgoing: ["f1", "f2"]
task:
  - id: "a"
    name: "A"
    incoming: "f1"
  - id: "b"
    name: "B"
    incoming: "f2"
endEvent:
  id: "end"
  name: "End"
sequenceFlow:
  - id: "f0"
    sourceRef: "start"
    targetRef: "xor"
  - id: "f1"
    sourceRef: "xor"
    targetRef: "a"
  - id: "f2"
    sourceRef: "xor"
    targetRef: "b"
"#;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("process.yaml");
    fs::write(&file_path, yaml_content).expect("Failed to write temp file");

    let loaded = loader::load_process(&file_path).expect("Failed to load process from YAML");

    let expected = ProcessBuilder::new("yaml-process")
        .start("start", "StartEvent")
        .gateway(GatewayKind::Exclusive, "xor", "Xor")
        .task("a", "A")
        .task("b", "B")
        .end("end", "End")
        .flow("f0", "start", "xor")
        .flow("f1", "xor", "a")
        .flow("f2", "xor", "b")
        .build();

    assert_eq!(loaded, expected);

    temp_dir.close().expect("Failed to close temp dir");
}

#[test]
fn test_load_json_process() {
    let process = ProcessBuilder::new("json-process")
        .start("start", "StartEvent")
        .task("t", "T")
        .end("end", "End")
        .flow("f0", "start", "t")
        .flow("f1", "t", "end")
        .build();

    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("process.json");
    fs::write(&file_path, serde_json::to_string_pretty(&process).unwrap()).unwrap();

    let loaded = loader::load_process(&file_path).unwrap();
    assert_eq!(loaded, process);
    assert_eq!(loaded.start_event.as_ref().map(|s| s.is_many()), Some(false));
}

#[test]
fn test_load_reports_the_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("broken.yaml");
    fs::write(&file_path, "id: [unterminated").unwrap();

    let err = loader::load_process(&file_path).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));

    let missing = loader::load_process(&temp_dir.path().join("missing.yaml")).unwrap_err();
    assert!(missing.to_string().contains("Failed to read process file"));
}

#[tokio::test]
async fn test_bundled_approval_process_runs_to_completion() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("processes/approval.yaml");
    let process = loader::load_process(&path).unwrap();
    assert!(matches!(process.parallel_gateway, Some(OneOrMany::Many(ref g)) if g.len() == 2));

    let graph = Compiler::new().compile(&process).unwrap();
    let legal = graph.activity_by_id("legal").unwrap();
    assert_eq!(legal.lane.as_ref().and_then(|l| l.name.as_deref()), Some("Back office"));

    let mut engine = Engine::with_process(&process, Callable::new()).unwrap();
    engine.advance(json!({ "amount": 1200 })).await.unwrap();
    assert!(engine.is_finished());
    assert_eq!(engine.stack().len(), 7);
}
