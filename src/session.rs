//! Per-session state: tool selection, assistant and transcript
//!
//! A [`Session`] is created empty, becomes active on the first
//! [`sync`](Session::sync) and is rebuilt whenever the tool selection
//! changes. Dropping it ends the session. Sessions share nothing, so no
//! locking is needed between them.

use crate::assistant::{Assistant, AssistantFactory};
use crate::error::{Error, Result};
use crate::message::{ChatMessage, Transcript};
use crate::toolkit::ToolSelection;
use tracing::info;
use uuid::Uuid;

/// What [`Session::sync`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// First assistant of the session was built
    Created,
    /// The selection changed: new assistant, empty transcript
    Rebuilt,
    /// The selection matched; nothing was touched
    Unchanged,
}

/// The live part of an active session
#[derive(Debug)]
pub struct ActiveSession {
    pub(crate) selection: ToolSelection,
    pub(crate) assistant: Assistant,
    pub(crate) transcript: Transcript,
}

impl ActiveSession {
    /// The selection the assistant was built with
    pub fn selection(&self) -> ToolSelection {
        self.selection
    }

    /// The assistant answering prompts in this session
    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    /// Messages exchanged since the assistant was built
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

#[derive(Debug)]
enum SessionState {
    Uninitialized,
    Active(ActiveSession),
}

/// One user's chat session
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an uninitialized session with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Uninitialized,
        }
    }

    /// Identifier used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether an assistant has been built
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Selection, assistant and transcript, once active
    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Active(active) => Some(active),
            SessionState::Uninitialized => None,
        }
    }

    pub(crate) fn active_mut(&mut self) -> Result<&mut ActiveSession> {
        match &mut self.state {
            SessionState::Active(active) => Ok(active),
            SessionState::Uninitialized => {
                Err(Error::Session("no assistant yet; select tools first".to_string()))
            }
        }
    }

    /// The selection the current assistant was built with
    pub fn selection(&self) -> Option<ToolSelection> {
        self.active().map(|active| active.selection)
    }

    /// The current assistant, if any
    pub fn assistant(&self) -> Option<&Assistant> {
        self.active().map(|active| &active.assistant)
    }

    /// Transcript messages in display order; empty before the first sync
    pub fn messages(&self) -> &[ChatMessage] {
        match &self.state {
            SessionState::Active(active) => active.transcript.messages(),
            SessionState::Uninitialized => &[],
        }
    }

    /// Bring the session in line with `selection`
    ///
    /// Builds the first assistant, or replaces assistant and transcript
    /// together when the selection differs from the stored one. An unchanged
    /// selection leaves everything as it is.
    ///
    /// # Errors
    ///
    /// Construction errors from the factory. The session keeps its previous
    /// state in that case.
    pub fn sync(
        &mut self,
        selection: ToolSelection,
        factory: &AssistantFactory,
    ) -> Result<SyncOutcome> {
        let outcome = match &self.state {
            SessionState::Active(active) if active.selection == selection => {
                return Ok(SyncOutcome::Unchanged);
            }
            SessionState::Active(_) => SyncOutcome::Rebuilt,
            SessionState::Uninitialized => SyncOutcome::Created,
        };

        let assistant = factory.build_for(&selection)?;
        self.state = SessionState::Active(ActiveSession {
            selection,
            assistant,
            transcript: Transcript::new(),
        });

        info!(session = %self.id, ?selection, ?outcome, "session synced");
        Ok(outcome)
    }
}
