#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stu::{
    AssistantFactory, AssistantFlags, ChatChunk, ChatRequest, ChunkStream, Error, FunctionCall,
    ModelBackend, ReplyView, Result, ToolCall, ToolSettings,
};

/// One scripted model round: the chunks to stream, or an error from the call itself
pub enum Round {
    Chunks(Vec<Result<ChatChunk>>),
    Fail(Error),
}

/// Backend that replays scripted rounds and records every request
#[derive(Default)]
pub struct ScriptedBackend {
    rounds: Mutex<VecDeque<Round>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(rounds: Vec<Round>) -> Arc<Self> {
        Arc::new(Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, round: Round) {
        self.rounds.lock().unwrap().push_back(round);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        match self.rounds.lock().unwrap().pop_front() {
            Some(Round::Chunks(chunks)) => Ok(Box::pin(futures::stream::iter(chunks))),
            Some(Round::Fail(e)) => Err(e),
            None => Err(Error::Other("no scripted round left".to_string())),
        }
    }
}

/// A reply streamed as the given fragments, then a done chunk
pub fn text_round(fragments: &[&str]) -> Round {
    let mut chunks: Vec<Result<ChatChunk>> =
        fragments.iter().map(|f| Ok(ChatChunk::text(*f))).collect();
    let mut done = ChatChunk::done();
    done.prompt_eval_count = Some(12);
    done.eval_count = Some(fragments.len() as u64);
    chunks.push(Ok(done));
    Round::Chunks(chunks)
}

/// A round in which the model asks for one tool call
pub fn tool_round(name: &str, arguments: serde_json::Value) -> Round {
    let call = ToolCall {
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    };
    Round::Chunks(vec![Ok(ChatChunk::tool_calls(vec![call])), Ok(ChatChunk::done())])
}

pub fn factory(backend: Arc<ScriptedBackend>) -> AssistantFactory {
    factory_with(backend, ToolSettings::with_serpapi_key("test-key"))
}

pub fn factory_with(backend: Arc<ScriptedBackend>, settings: ToolSettings) -> AssistantFactory {
    AssistantFactory::new(backend, "llama3", settings).with_flags(AssistantFlags {
        show_tool_calls: true,
        debug_mode: false,
        add_datetime_to_instructions: false,
    })
}

/// Records everything the chat loop shows
#[derive(Default)]
pub struct RecordingView {
    pub partials: Vec<String>,
    pub completed: Option<String>,
    pub failures: Vec<String>,
}

impl ReplyView for RecordingView {
    fn partial(&mut self, text: &str) {
        self.partials.push(text.to_string());
    }

    fn complete(&mut self, text: &str) {
        self.completed = Some(text.to_string());
    }

    fn fail(&mut self, error: &Error) {
        self.failures.push(error.to_string());
    }
}
