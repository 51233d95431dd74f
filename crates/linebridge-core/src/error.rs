use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
}

impl BridgeError {
    /// Short error code string, used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "CONFIG_ERROR",
            BridgeError::MissingSetting(_) => "MISSING_SETTING",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
