use thiserror::Error;

/// Error type for the assistant, its tools and the chat session
///
/// Variants fall into three groups:
/// - configuration problems found at startup ([`Error::Config`]),
/// - construction problems while building tools or an assistant,
/// - runtime failures while a prompt is being answered (backend, stream and tool errors).
///
/// # Example
///
/// ```rust
/// use stu::Error;
///
/// fn describe(error: &Error) -> &'static str {
///     match error {
///         Error::Config(_) => "fix your configuration and restart",
///         Error::Unavailable(_) => "start the model backend and retry",
///         Error::Cancelled => "reply cancelled",
///         _ => "retry the prompt",
///     }
/// }
///
/// assert_eq!(describe(&Error::Cancelled), "reply cancelled");
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The model backend could not be reached
    #[error("Model backend unavailable: {0}")]
    Unavailable(String),

    /// Non-success response with message and optional status code
    #[error("API error{}: {}", .1.map(|code| format!(" (status {code})")).unwrap_or_default(), .0)]
    Response(String, Option<u16>),

    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The reply stream broke off or reported an error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool construction or execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Session used in the wrong state
    #[error("Session error: {0}")]
    Session(String),

    /// The reply was cancelled before the model finished
    #[error("Reply cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should stop the application at startup
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
