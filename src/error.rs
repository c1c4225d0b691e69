use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed document: {0}")]
    Parse(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ScraperError {
    pub fn storage(message: impl Into<String>) -> Self {
        ScraperError::Storage {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
