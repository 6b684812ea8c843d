use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum FunilError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("A transition is already in flight for idea {0}")]
    ConcurrentTransition(String),

    #[error("Closing an idea requires a reason; transition aborted for idea {0}")]
    ClosureDeclined(String),

    #[error("Idea {0} no longer exists in the store; remove it from any local view")]
    IdeaVanished(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
