/*!
A chat assistant backed by a locally hosted language model, with optional
stock-data and web-search tools.

The crate connects four pieces:

- a [`ModelBackend`] (by default [`Ollama`]) that streams replies,
- toolkits the model may call, chosen through a [`ToolSelection`],
- an [`Assistant`] built by the [`AssistantFactory`] from a backend and toolkits,
- a [`Session`] holding the assistant and the chat transcript, driven by
  [`chat::submit`].

## Quick Start

```rust,no_run
# async fn example() -> Result<(), Box<dyn std::error::Error>> {
use std::sync::Arc;
use stu::{chat, AssistantFactory, Ollama, ReplyView, Session, ToolSelection, ToolSettings};

struct Print;

impl ReplyView for Print {
    fn partial(&mut self, _text: &str) {}
    fn complete(&mut self, text: &str) {
        println!("{}", text);
    }
    fn fail(&mut self, error: &stu::Error) {
        eprintln!("{}", error);
    }
}

let factory = AssistantFactory::new(
    Arc::new(Ollama::default()),
    "llama3",
    ToolSettings::with_serpapi_key("your-serpapi-key"),
);

let mut session = Session::new();
session.sync(ToolSelection::default(), &factory)?;
chat::submit(&mut session, "What is the stock price of ACME?", &mut Print).await?;
# Ok(())
# }
```

## Main Components

- [`Tool`] and [`ToolRegistry`]: callable functions and their ordered registry
- [`Toolkit`] and [`ToolKind`]: the closed set of capabilities
- [`Assistant`] and [`ReplyEvent`]: streamed, tool-using replies
- [`Session`]: per-session lifecycle and transcript
- [`Settings`]: startup configuration
*/

pub use assistant::{
    Assistant, AssistantFactory, AssistantFlags, ReplyEvent, ReplyStream, ReplySummary,
    ASSISTANT_NAME, DEFAULT_DESCRIPTION, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_MODEL,
};
pub use chat::{submit, ReplyView, Submission, TYPING_MARKER};
pub use client::{parse_stream_line, ChunkStream, ModelBackend, Ollama, DEFAULT_OLLAMA_URL};
pub use config::Settings;
pub use error::{Error, Result};
pub use execution::{ExecutionState, ToolExecution};
pub use message::{ChatMessage, Role, Transcript};
pub use request::{
    ChatChunk, ChatRequest, FunctionCall, FunctionDef, ModelOptions, ToolCall, ToolDef, Usage,
    WireMessage,
};
pub use session::{ActiveSession, Session, SyncOutcome};
pub use tool::{Tool, ToolOutcome, ToolRegistry};
pub use toolkit::{build_toolkits, ToolKind, ToolSelection, ToolSettings, Toolkit};

pub mod assistant;
pub mod chat;
pub mod chat_ui;
pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod message;
pub mod request;
pub mod session;
pub mod tool;
pub mod toolkit;
pub mod tools;
