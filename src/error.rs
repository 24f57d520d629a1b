use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubverifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Transcription error: {0}")]
    Transcriber(String),

    #[error("Segment could not be transcribed: {0}")]
    Gateway(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid time range: start={start}s, end={end}s")]
    InvalidTimeRange { start: f64, end: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No valid subtitles found in {0}")]
    NoCues(String),
}

pub type Result<T> = std::result::Result<T, SubverifyError>;
