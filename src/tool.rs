use crate::error::{Error, Result};
use crate::execution::{ExecutionState, ToolExecution};
use crate::request::ToolDef;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// A function the model can call during a conversation
///
/// Every toolkit exposes its capabilities as `Tool` implementations. The
/// model sees the name, description and schema; the assistant calls
/// [`execute`](Tool::execute) with the arguments the model produced.
///
/// # Example
///
/// ```rust
/// use stu::{Tool, ToolDef};
/// use serde_json::{json, Value};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn description(&self) -> &str {
///         "Repeats the given text"
///     }
///
///     fn input_schema(&self) -> Value {
///         json!({
///             "type": "object",
///             "properties": { "text": { "type": "string" } },
///             "required": ["text"]
///         })
///     }
///
///     async fn execute(&self, input: Value) -> Result<String, stu::Error> {
///         input["text"]
///             .as_str()
///             .map(str::to_string)
///             .ok_or_else(|| stu::Error::Tool("Missing text".to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool
    fn name(&self) -> &str;

    /// Get a human-readable description of what this tool does
    fn description(&self) -> &str;

    /// Get the JSON schema defining the expected input format
    fn input_schema(&self) -> Value;

    /// Execute the tool with the arguments supplied by the model
    async fn execute(&self, input: Value) -> Result<String>;

    /// Convert this tool to a ToolDef for the chat request
    fn to_tool_def(&self) -> ToolDef {
        ToolDef::function(self.name(), self.description(), self.input_schema())
    }
}

/// Text returned to the model for one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

/// Tool calls kept in a registry's history; older records are dropped
pub const MAX_EXECUTION_HISTORY: usize = 50;

/// Ordered collection of the tools an assistant may call
///
/// Tools keep their registration order so that the definitions sent to the
/// model are the same for the same selection.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    /// The most recent calls, oldest first
    executions: Vec<ToolExecution>,
    calls: usize,
    completed: usize,
    failed: usize,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool at the end of the registry
    ///
    /// # Errors
    ///
    /// Returns an error if a tool with the same name is already registered
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.has_tool(tool.name()) {
            return Err(Error::Tool(format!("Tool '{}' already registered", tool.name())));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Tool definitions in registration order
    pub fn get_tool_defs(&self) -> Vec<ToolDef> {
        self.tools.iter().map(|tool| tool.to_tool_def()).collect()
    }

    /// Check whether a tool with this name is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.get_tool(name).is_some()
    }

    /// Look up a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Registered tool names in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name and record the call
    ///
    /// Failures are not returned as `Err`: they become an error text for the
    /// model, which may then answer without the tool or try again. Only the
    /// last [`MAX_EXECUTION_HISTORY`] records are kept.
    pub async fn execute_tool(&mut self, tool_name: &str, input: Value) -> ToolOutcome {
        self.calls += 1;
        let id = format!("call_{}", self.calls);
        let mut execution = ToolExecution::start(id, tool_name.to_string(), input.clone());

        let outcome = match self.get_tool(tool_name).cloned() {
            Some(tool) => tool.execute(input).await.map_err(|e| e.to_string()),
            None => Err(format!("Tool '{}' not found", tool_name)),
        };

        let result = match &outcome {
            Ok(output) => ToolOutcome {
                content: output.clone(),
                is_error: false,
            },
            Err(error) => {
                warn!(tool = tool_name, %error, "tool call failed");
                ToolOutcome {
                    content: format!("Tool execution failed: {}", error),
                    is_error: true,
                }
            }
        };

        execution.complete(outcome);
        match execution.state {
            ExecutionState::Completed { .. } => self.completed += 1,
            ExecutionState::Failed { .. } => self.failed += 1,
            ExecutionState::Executing => {}
        }

        self.executions.push(execution);
        if self.executions.len() > MAX_EXECUTION_HISTORY {
            let excess = self.executions.len() - MAX_EXECUTION_HISTORY;
            self.executions.drain(..excess);
        }
        result
    }

    /// The most recent calls, oldest first
    pub fn execution_history(&self) -> &[ToolExecution] {
        &self.executions
    }

    /// The record of the call made last
    pub fn last_execution(&self) -> Option<&ToolExecution> {
        self.executions.last()
    }

    /// Count every call since the registry was built as (completed, failed)
    pub fn execution_stats(&self) -> (usize, usize) {
        (self.completed, self.failed)
    }
}
