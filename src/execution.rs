use chrono::{DateTime, Utc};
use serde_json::Value;

/// Lifecycle of one tool call made by the model
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState {
    /// The call is running
    Executing,
    /// The tool returned a result
    Completed {
        /// Text handed back to the model
        result: String,
    },
    /// The tool failed or does not exist
    Failed {
        /// Error message handed back to the model
        error: String,
    },
}

/// Record of a tool call, kept by the [`ToolRegistry`](crate::ToolRegistry)
///
/// In debug mode the assistant logs the id and duration of each record; the
/// registry's totals are shown with the tool status.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// Identifier of this call within the assistant's lifetime
    pub id: String,
    /// Name of the function called
    pub tool_name: String,
    /// Arguments supplied by the model
    pub input: Value,
    pub state: ExecutionState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration of execution in milliseconds
    pub duration_ms: Option<u64>,
}

impl ToolExecution {
    /// Create a record for a call that is starting now
    pub fn start(id: String, tool_name: String, input: Value) -> Self {
        Self {
            id,
            tool_name,
            input,
            state: ExecutionState::Executing,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Mark the call as finished with its outcome
    pub fn complete(&mut self, outcome: Result<String, String>) {
        let completed_at = Utc::now();
        self.duration_ms = Some(
            (completed_at - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.completed_at = Some(completed_at);

        self.state = match outcome {
            Ok(result) => ExecutionState::Completed { result },
            Err(error) => ExecutionState::Failed { error },
        };
    }

    /// Whether the call has completed or failed
    pub fn is_finished(&self) -> bool {
        !matches!(self.state, ExecutionState::Executing)
    }

    /// Output of a completed call
    pub fn result(&self) -> Option<&str> {
        match &self.state {
            ExecutionState::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Error text of a failed call
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ExecutionState::Failed { error } => Some(error),
            _ => None,
        }
    }
}
