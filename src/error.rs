use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaintError>;

#[derive(Error, Debug)]
pub enum TaintError {
    #[error("Scan root does not exist or is not readable: {0}")]
    InvalidRoot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid sink pattern '{name}': {message}")]
    SinkPattern { name: String, message: String },

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TaintError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
