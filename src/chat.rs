//! Chat loop: one prompt in, one streamed reply out

use crate::assistant::{ReplyEvent, ReplySummary};
use crate::error::{Error, Result};
use crate::message::ChatMessage;
use crate::session::{ActiveSession, Session};
use futures::StreamExt;
use tracing::{error, info};

/// Appended to the visible reply while more text is still arriving
pub const TYPING_MARKER: &str = "▌";

/// Where a streamed reply is shown
///
/// The chat loop calls `partial` after every fragment with the text so far
/// plus [`TYPING_MARKER`], then either `complete` with the final text or
/// `fail` with the error that ended the turn.
pub trait ReplyView {
    fn partial(&mut self, text: &str);
    fn complete(&mut self, text: &str);
    fn fail(&mut self, error: &Error);
}

/// Result of a [`submit`] call that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Empty prompt; nothing was recorded or sent
    Ignored,
    /// The assistant answered and both turns were recorded
    Answered {
        reply: String,
        summary: ReplySummary,
    },
}

/// Send `prompt` to the session's assistant and record the exchange
///
/// The user message is appended before the assistant runs and stays in the
/// transcript even when the reply fails. The assistant message is appended
/// only after the reply finished.
///
/// # Errors
///
/// [`Error::Session`] if the session has no assistant yet, otherwise
/// whatever ended the reply. The error has already been shown through
/// `view.fail`.
pub async fn submit(
    session: &mut Session,
    prompt: &str,
    view: &mut dyn ReplyView,
) -> Result<Submission> {
    if prompt.trim().is_empty() {
        return Ok(Submission::Ignored);
    }

    let session_id = session.id();
    let active = session.active_mut()?;
    active.transcript.push(ChatMessage::user(prompt));

    match stream_reply(active, prompt, view).await {
        Ok((reply, summary)) => {
            active.transcript.push(ChatMessage::assistant(reply.clone()));
            info!(
                session = %session_id,
                messages = active.transcript.len(),
                tool_calls = summary.tool_calls,
                "reply recorded"
            );
            Ok(Submission::Answered { reply, summary })
        }
        Err(e) => {
            error!(session = %session_id, error = %e, "reply failed");
            view.fail(&e);
            Err(e)
        }
    }
}

async fn stream_reply(
    active: &mut ActiveSession,
    prompt: &str,
    view: &mut dyn ReplyView,
) -> Result<(String, ReplySummary)> {
    let ActiveSession {
        assistant,
        transcript,
        ..
    } = active;
    // The prompt was just pushed; the assistant receives it separately.
    let messages = transcript.messages();
    let history = &messages[..messages.len() - 1];

    let mut reply = assistant.run(prompt, history);
    let mut accumulated = String::new();

    while let Some(event) = reply.next().await {
        match event? {
            ReplyEvent::Fragment(text) => {
                accumulated.push_str(&text);
                view.partial(&format!("{}{}", accumulated, TYPING_MARKER));
            }
            ReplyEvent::Finished(summary) => {
                view.complete(&accumulated);
                return Ok((accumulated, summary));
            }
        }
    }

    Err(Error::Stream("reply ended without a final event".to_string()))
}
