//! The conversational agent and the factory that builds it

use crate::client::ModelBackend;
use crate::error::{Error, Result};
use crate::message::ChatMessage;
use crate::request::{ChatRequest, ModelOptions, ToolCall, Usage, WireMessage};
use crate::tool::ToolRegistry;
use crate::toolkit::{build_toolkits, ToolKind, ToolSelection, ToolSettings, Toolkit};
use async_stream::try_stream;
use chrono::{DateTime, Local};
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

pub const ASSISTANT_NAME: &str = "llama3_assistant";

pub const DEFAULT_MODEL: &str = "llama3";

pub const DEFAULT_DESCRIPTION: &str =
    "You are a helpful assistant that can access specific tools based on user selections.";

/// Tool-call rounds allowed per prompt before the turn is abandoned
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Behavioral switches of an assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantFlags {
    /// Emit a ` - Running: name(args)` line into the reply for each tool call
    pub show_tool_calls: bool,
    /// Log requests, tool calls and results
    pub debug_mode: bool,
    /// Put the current local time into the system instructions
    pub add_datetime_to_instructions: bool,
}

impl Default for AssistantFlags {
    fn default() -> Self {
        Self {
            show_tool_calls: true,
            debug_mode: true,
            add_datetime_to_instructions: true,
        }
    }
}

/// An item of a streamed reply
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// The next piece of reply text
    Fragment(String),
    /// The model ended its turn; no more events follow
    Finished(ReplySummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplySummary {
    /// Tool calls executed while producing the reply
    pub tool_calls: usize,
    /// Tokens summed over every model round of the reply
    pub usage: Usage,
}

/// Reply to one prompt, borrowed from the assistant that produces it
///
/// Dropping the stream cancels the turn.
pub type ReplyStream<'a> = Pin<Box<dyn Stream<Item = Result<ReplyEvent>> + Send + 'a>>;

/// A conversational agent bound to a model and a fixed set of toolkits
///
/// An assistant never changes its model, flags or tools after construction;
/// a different tool selection needs a new assistant from the
/// [`AssistantFactory`].
pub struct Assistant {
    name: String,
    model: String,
    description: String,
    flags: AssistantFlags,
    backend: Arc<dyn ModelBackend>,
    toolkits: Vec<ToolKind>,
    registry: ToolRegistry,
    max_tool_rounds: usize,
    history_limit: Option<usize>,
    options: Option<ModelOptions>,
}

impl Assistant {
    /// Assistant name, `llama3_assistant`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model id sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Opening line of the system instructions
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Behavioral switches fixed at construction
    pub fn flags(&self) -> AssistantFlags {
        self.flags
    }

    /// Kinds of the toolkits this assistant was built with, in registry order
    pub fn toolkits(&self) -> &[ToolKind] {
        &self.toolkits
    }

    /// Names of the callable functions, in registry order
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// Registry of callable functions and their call history
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Transcript messages replayed per prompt; `None` replays all
    pub fn history_limit(&self) -> Option<usize> {
        self.history_limit
    }

    /// Sampling options sent with every request, if any
    pub fn options(&self) -> Option<&ModelOptions> {
        self.options.as_ref()
    }

    /// System instructions sent ahead of every conversation
    pub fn instructions(&self, now: DateTime<Local>) -> String {
        let mut lines = vec![
            self.description.clone(),
            String::new(),
            "## Instructions".to_string(),
        ];
        if !self.registry.is_empty() {
            lines.push(
                "- You have access to tools. Call them when a question needs live data such as stock prices, company information or web results."
                    .to_string(),
            );
        }
        lines.push("- Use markdown to format your answers.".to_string());
        if self.flags.add_datetime_to_instructions {
            lines.push(format!(
                "- The current time is {}",
                now.format("%Y-%m-%d %H:%M:%S %Z")
            ));
        }
        lines.join("\n")
    }

    /// Messages for the first model round: instructions, history, prompt
    ///
    /// With a history limit only the most recent messages are replayed.
    pub fn build_messages(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        now: DateTime<Local>,
    ) -> Vec<WireMessage> {
        let start = match self.history_limit {
            Some(limit) => history.len().saturating_sub(limit),
            None => 0,
        };

        let mut messages = Vec::with_capacity(history.len() - start + 2);
        messages.push(WireMessage::system(self.instructions(now)));
        messages.extend(history[start..].iter().map(WireMessage::from));
        messages.push(WireMessage::user(prompt));
        messages
    }

    /// Answer `prompt` as a stream of reply events
    ///
    /// `history` is the conversation so far, not including `prompt`. Tool
    /// calls requested by the model are executed in order and their results
    /// fed back until the model ends its turn. The stream yields
    /// [`ReplyEvent::Finished`] exactly once on success; a reply that breaks
    /// off before the model is done yields an error instead.
    pub fn run<'a>(&'a mut self, prompt: &'a str, history: &'a [ChatMessage]) -> ReplyStream<'a> {
        let initial = self.build_messages(prompt, history, Local::now());
        Box::pin(self.reply_events(initial))
    }

    fn reply_events(
        &mut self,
        initial: Vec<WireMessage>,
    ) -> impl Stream<Item = Result<ReplyEvent>> + Send + '_ {
        let assistant = self;

        try_stream! {
            let mut messages = initial;
            let tools = assistant.registry.get_tool_defs();
            let mut summary = ReplySummary::default();
            let mut rounds = 0usize;

            loop {
                let request = ChatRequest {
                    model: assistant.model.clone(),
                    messages: messages.clone(),
                    tools: tools.clone(),
                    stream: true,
                    options: assistant.options.clone(),
                };
                if assistant.flags.debug_mode {
                    debug!(
                        target: "stu::assistant",
                        assistant = %assistant.name,
                        backend = assistant.backend.name(),
                        round = rounds,
                        messages = request.messages.len(),
                        "requesting reply"
                    );
                }

                let mut chunks = assistant.backend.chat_stream(request).await?;
                let mut text = String::new();
                let mut calls: Vec<ToolCall> = Vec::new();
                let mut done = false;

                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    if !chunk.message.content.is_empty() {
                        text.push_str(&chunk.message.content);
                        yield ReplyEvent::Fragment(chunk.message.content);
                    }
                    if let Some(requested) = chunk.message.tool_calls {
                        calls.extend(requested);
                    }
                    if chunk.done {
                        summary.usage.input_tokens += chunk.prompt_eval_count.unwrap_or(0);
                        summary.usage.output_tokens += chunk.eval_count.unwrap_or(0);
                        done = true;
                        break;
                    }
                }

                if !done {
                    Err::<(), Error>(Error::Stream(
                        "reply ended before the model finished its turn".to_string(),
                    ))?;
                }

                if calls.is_empty() {
                    if assistant.flags.debug_mode {
                        debug!(
                            target: "stu::assistant",
                            tool_calls = summary.tool_calls,
                            input_tokens = summary.usage.input_tokens,
                            output_tokens = summary.usage.output_tokens,
                            "reply finished"
                        );
                    }
                    yield ReplyEvent::Finished(summary);
                    break;
                }

                rounds += 1;
                if rounds > assistant.max_tool_rounds {
                    Err::<(), Error>(Error::Other(format!(
                        "Maximum tool rounds ({}) reached without a final answer",
                        assistant.max_tool_rounds
                    )))?;
                }

                messages.push(WireMessage::assistant(text, calls.clone()));
                for call in calls {
                    if assistant.flags.show_tool_calls {
                        yield ReplyEvent::Fragment(format!("\n - Running: {}\n\n", call.signature()));
                    }
                    if assistant.flags.debug_mode {
                        debug!(target: "stu::assistant", call = %call.signature(), "calling tool");
                    }
                    let outcome = assistant
                        .registry
                        .execute_tool(&call.function.name, call.function.arguments.clone())
                        .await;
                    if assistant.flags.debug_mode {
                        if let Some(record) = assistant.registry.last_execution() {
                            debug!(
                                target: "stu::assistant",
                                id = %record.id,
                                tool = %record.tool_name,
                                duration_ms = record.duration_ms.unwrap_or_default(),
                                is_error = outcome.is_error,
                                result = %outcome.content,
                                "tool result"
                            );
                        }
                    }
                    summary.tool_calls += 1;
                    messages.push(WireMessage::tool(call.function.name, outcome.content));
                }
            }
        }
    }
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("flags", &self.flags)
            .field("toolkits", &self.toolkits)
            .field("tools", &self.registry.tool_names())
            .finish()
    }
}

/// Builds assistants bound to one backend and model
///
/// Every assistant it builds shares the same model id, description and
/// flags; only the toolkits differ.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use stu::{AssistantFactory, Ollama, ToolSelection, ToolSettings};
///
/// let factory = AssistantFactory::new(
///     Arc::new(Ollama::default()),
///     "llama3",
///     ToolSettings::default(),
/// );
///
/// let assistant = factory.build_for(&ToolSelection::none()).unwrap();
/// assert!(assistant.tool_names().is_empty());
/// ```
#[derive(Clone)]
pub struct AssistantFactory {
    backend: Arc<dyn ModelBackend>,
    model: String,
    description: String,
    flags: AssistantFlags,
    tool_settings: ToolSettings,
    max_tool_rounds: usize,
    history_limit: Option<usize>,
    options: Option<ModelOptions>,
}

impl AssistantFactory {
    /// Create a factory with the default description, flags and limits
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        model: impl Into<String>,
        tool_settings: ToolSettings,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            description: DEFAULT_DESCRIPTION.to_string(),
            flags: AssistantFlags::default(),
            tool_settings,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            history_limit: None,
            options: None,
        }
    }

    /// Replace the default flags
    pub fn with_flags(mut self, flags: AssistantFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Tool-call rounds allowed per prompt
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Replay at most `limit` transcript messages to the model
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// Send these sampling options with every request
    pub fn with_options(mut self, options: Option<ModelOptions>) -> Self {
        self.options = options;
        self
    }

    /// Model id every built assistant is bound to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Credentials and endpoints used to build toolkits
    pub fn tool_settings(&self) -> &ToolSettings {
        &self.tool_settings
    }

    /// Build an assistant with the given toolkits
    ///
    /// No network traffic happens here; an unreachable backend shows up on
    /// the first prompt.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an empty model id, [`Error::Tool`] when two
    /// toolkits expose the same function name.
    pub fn build(&self, toolkits: Vec<Toolkit>) -> Result<Assistant> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("model id must not be empty".to_string()));
        }

        let mut registry = ToolRegistry::new();
        for toolkit in &toolkits {
            for function in toolkit.functions() {
                registry.register(Arc::clone(function))?;
            }
        }

        let assistant = Assistant {
            name: ASSISTANT_NAME.to_string(),
            model: self.model.clone(),
            description: self.description.clone(),
            flags: self.flags,
            backend: Arc::clone(&self.backend),
            toolkits: toolkits.iter().map(Toolkit::kind).collect(),
            registry,
            max_tool_rounds: self.max_tool_rounds,
            history_limit: self.history_limit,
            options: self.options.clone(),
        };
        info!(
            model = %assistant.model,
            tools = ?assistant.tool_names(),
            "assistant built"
        );
        Ok(assistant)
    }

    /// Build the toolkits for `selection`, then an assistant with them
    pub fn build_for(&self, selection: &ToolSelection) -> Result<Assistant> {
        let toolkits = build_toolkits(selection, &self.tool_settings)?;
        self.build(toolkits)
    }
}
