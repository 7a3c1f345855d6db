use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("translation unavailable: {0}")]
    TranslationUnavailable(String),

    #[error("synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session task is no longer running")]
    ChannelClosed,
}
