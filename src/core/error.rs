use std::io;

#[derive(thiserror::Error, Debug)]
pub enum RadarError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
    #[error("timeout")]
    Timeout,
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for RadarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RadarError::Timeout
        } else if err.is_status() {
            RadarError::Http(err.to_string())
        } else {
            RadarError::Transport(err.to_string())
        }
    }
}

impl From<hickory_resolver::error::ResolveError> for RadarError {
    fn from(err: hickory_resolver::error::ResolveError) -> Self {
        RadarError::Transport(format!("dns: {err}"))
    }
}
