use crate::message::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition for the model to understand how to call a tool
///
/// Serialized in Ollama's function-calling shape:
/// `{"type": "function", "function": {"name", "description", "parameters"}}`.
///
/// # Example
///
/// ```rust
/// use stu::ToolDef;
/// use serde_json::json;
///
/// let def = ToolDef::function(
///     "get_current_stock_price",
///     "Get the current stock price for a ticker symbol",
///     json!({
///         "type": "object",
///         "properties": { "symbol": { "type": "string" } },
///         "required": ["symbol"]
///     }),
/// );
/// assert_eq!(def.function.name, "get_current_stock_price");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDef {
    /// Always "function"
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDef {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Name, description and JSON Schema of a callable function
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the expected arguments
    pub parameters: Value,
}

/// A tool call requested by the model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Render the call as `name(key=value, ...)` for display
    pub fn signature(&self) -> String {
        let args = match &self.function.arguments {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{}={}", key, s),
                    other => format!("{}={}", key, other),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        format!("{}({})", self.function.name, args)
    }
}

/// A message in the wire format of Ollama's chat endpoint
///
/// Unlike [`ChatMessage`], wire messages carry the system prompt, tool calls
/// requested by the model and tool results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct WireMessage {
    /// "system", "user", "assistant" or "tool"
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Name of the tool whose result this message carries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_name: None,
        }
    }

    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: None,
            tool_name: Some(tool_name.into()),
        }
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        match message.role {
            Role::User => WireMessage::user(message.content.clone()),
            Role::Assistant => WireMessage::assistant(message.content.clone(), Vec::new()),
        }
    }
}

/// Request body for Ollama's `/api/chat`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    /// The model to use (e.g., "llama3")
    pub model: String,
    /// System prompt, history and the latest message, in order
    pub messages: Vec<WireMessage>,
    /// Tools the model may call; omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDef>,
    /// Whether the reply is streamed as NDJSON
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

/// Sampling options forwarded to the model
///
/// Set from `--temperature` or `STU_TEMPERATURE`; unset fields keep the
/// model's defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ModelOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One line of a streamed `/api/chat` reply
///
/// The final line has `done: true` and carries token counts.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChatChunk {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: WireMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatChunk {
    /// A content-only chunk, as produced mid-stream
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: WireMessage::assistant(content, Vec::new()),
            ..Default::default()
        }
    }

    /// A chunk requesting tool calls
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            message: WireMessage::assistant(String::new(), calls),
            ..Default::default()
        }
    }

    /// The terminating chunk of a reply
    pub fn done() -> Self {
        Self {
            message: WireMessage::assistant(String::new(), Vec::new()),
            done: true,
            done_reason: Some("stop".to_string()),
            ..Default::default()
        }
    }
}

/// Token usage reported by the model for one reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the prompt
    pub input_tokens: u64,
    /// Tokens generated
    pub output_tokens: u64,
}
