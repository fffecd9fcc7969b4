use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoodsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No user selected")]
    NoUser,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Timeline engine stopped")]
    EngineStopped,
}

/// Coarse failure classes shown to the user differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network or origin failure; dismissible, retried manually or by the next poll.
    Transport,
    /// Bad or expired login code, missing token. Shown inline.
    Auth,
    /// Durable session storage could not be read or written.
    Storage,
    Other,
}

impl MoodsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MoodsError::Transport(_) | MoodsError::Http(_) => ErrorKind::Transport,
            MoodsError::Auth(_) | MoodsError::NoUser => ErrorKind::Auth,
            MoodsError::Storage(_) | MoodsError::Io(_) => ErrorKind::Storage,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

impl serde::Serialize for MoodsError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type MoodsResult<T> = Result<T, MoodsError>;
