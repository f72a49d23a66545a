use crate::error::{Error, Result};
use crate::request::{ChatChunk, ChatRequest};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use tracing::{debug, warn};

/// Default address of a locally running Ollama server
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Stream of reply chunks produced by a [`ModelBackend`]
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// A language-model backend that answers chat requests as a stream of chunks
///
/// The assistant only talks to the model through this trait, so tests can
/// substitute a scripted backend for the real server.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Send a chat request and stream the reply
    ///
    /// The returned stream is finite and ends after the chunk with
    /// `done: true`. It cannot be restarted; each prompt needs a new call.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream>;
}

/// Client for the Ollama `/api/chat` endpoint
///
/// # Example
///
/// ```rust
/// use stu::Ollama;
///
/// let ollama = Ollama::new("http://localhost:11434");
/// assert_eq!(ollama.base_url(), "http://localhost:11434");
/// ```
#[derive(Clone)]
pub struct Ollama {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// Server address without trailing slash
    base_url: String,
}

impl Ollama {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is up and return the names of pulled models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error(status, &body));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn connect_error(&self, e: reqwest::Error) -> Error {
        if e.is_connect() {
            Error::Unavailable(format!(
                "cannot reach Ollama at {}. Start it with 'ollama serve'",
                self.base_url
            ))
        } else {
            Error::Request(e)
        }
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

#[async_trait]
impl ModelBackend for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error(status, &body));
        }

        Ok(Box::pin(ndjson_chunks(response.bytes_stream())))
    }
}

/// Split a body stream into NDJSON lines and parse each into a chunk
///
/// Lines may span network reads; bytes are buffered until a newline so a
/// multi-byte character split across reads stays intact.
fn ndjson_chunks<S, B>(body: S) -> impl Stream<Item = Result<ChatChunk>> + Send
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(piece) = body.next().await {
            let piece = piece.map_err(|e| Error::Stream(e.to_string()))?;
            buffer.extend_from_slice(piece.as_ref());
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(chunk) = parse_stream_line(&line)? {
                    yield chunk;
                }
            }
        }
        if let Some(chunk) = parse_stream_line(&buffer)? {
            yield chunk;
        }
    }
}

/// Parse one NDJSON line of a streamed reply
///
/// Blank lines are skipped. A line of the form `{"error": "..."}` is turned
/// into [`Error::Stream`].
pub fn parse_stream_line(line: &[u8]) -> Result<Option<ChatChunk>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<StreamLine>(text)? {
        StreamLine::Error { error } => {
            warn!(%error, "model backend reported an error mid-stream");
            Err(Error::Stream(error))
        }
        StreamLine::Chunk(chunk) => Ok(Some(chunk)),
    }
}

fn parse_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => Error::Response(parsed.error, Some(status)),
        Err(_) => Error::Response(body.to_string(), Some(status)),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamLine {
    Error { error: String },
    Chunk(ChatChunk),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}
