/// Result alias that carries the custom [`KaliError`] type.
pub type Result<T> = std::result::Result<T, KaliError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum KaliError {
    /// A collaborator the sequencer cannot run without is absent: no scene
    /// attached to the presenter, or an atlas/clip missing from the manifest.
    /// Treated as a startup configuration error.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),
    /// The supplied configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A clip could not be started by the presenter.
    #[error("audio clip `{clip}` failed to play: {reason}")]
    AudioPlayback { clip: String, reason: String },
    /// Free-form message for host integrations.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON configuration or manifest.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl KaliError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn missing<T: Into<String>>(what: T) -> Self {
        Self::MissingCollaborator(what.into())
    }

    pub fn config<T: Into<String>>(reason: T) -> Self {
        Self::Config(reason.into())
    }
}

impl From<&str> for KaliError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for KaliError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
