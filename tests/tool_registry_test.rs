use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use stu::tool::MAX_EXECUTION_HISTORY;
use stu::{Error, ExecutionState, Result, Tool, ToolRegistry};

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeats the given text"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        input
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Tool("Missing text".to_string()))
    }
}

struct NamedTool(&'static str);

#[async_trait]
impl Tool for NamedTool {
    fn name(&self) -> &str {
        self.0
    }

    fn description(&self) -> &str {
        "Does nothing"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(String::new())
    }
}

#[test]
fn test_registration_order_is_kept() {
    let mut registry = ToolRegistry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.register(Arc::new(NamedTool(name))).unwrap();
    }

    assert_eq!(registry.tool_names(), vec!["zeta", "alpha", "mid"]);
    let defs = registry.get_tool_defs();
    let names: Vec<&str> = defs.iter().map(|d| d.function.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let err = registry.register(Arc::new(EchoTool)).unwrap_err();
    assert!(matches!(err, Error::Tool(_)));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_execute_records_history() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let ok = registry.execute_tool("echo", json!({"text": "hi"})).await;
    assert_eq!(ok.content, "hi");
    assert!(!ok.is_error);

    let bad_input = registry.execute_tool("echo", json!({})).await;
    assert!(bad_input.is_error);
    assert!(bad_input.content.starts_with("Tool execution failed:"));
    assert!(bad_input.content.contains("Missing text"));

    let unknown = registry.execute_tool("nope", json!({})).await;
    assert!(unknown.is_error);
    assert!(unknown.content.contains("Tool 'nope' not found"));

    let history = registry.execution_history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, "call_1");
    assert_eq!(history[0].result(), Some("hi"));
    assert!(history.iter().all(|exec| exec.is_finished()));
    assert!(history[0].duration_ms.is_some());
    assert!(matches!(history[2].state, ExecutionState::Failed { .. }));
    assert_eq!(history[2].tool_name, "nope");
    assert_eq!(registry.execution_stats(), (1, 2));
}

#[tokio::test]
async fn test_history_keeps_only_recent_calls() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let calls = MAX_EXECUTION_HISTORY + 10;
    for i in 0..calls {
        let input = if i % 2 == 0 {
            json!({"text": i.to_string()})
        } else {
            json!({})
        };
        registry.execute_tool("echo", input).await;
    }

    let history = registry.execution_history();
    assert_eq!(history.len(), MAX_EXECUTION_HISTORY);
    assert_eq!(history[0].id, "call_11");
    assert_eq!(
        registry.last_execution().map(|exec| exec.id.as_str()),
        Some(format!("call_{}", calls).as_str())
    );
    // Totals cover every call, not just the retained records.
    assert_eq!(registry.execution_stats(), (calls / 2, calls / 2));
}
