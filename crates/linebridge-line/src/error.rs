/// Errors produced by the LINE Messaging API client.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("LINE request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE API returned {status}: {body}")]
    Api { status: u16, body: String },
}
