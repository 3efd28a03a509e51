use thiserror::Error;

#[derive(Debug, Error)]
pub enum BinanceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("binance api error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// Non-success status without a Binance error body (gateway pages, rate-limit walls).
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BinanceError {
    /// Network-level failures and server-side overload, worth retrying on the next pass.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            // -1001 disconnected, -1003 too many requests, -1007 backend timeout
            Self::Api { code, .. } => matches!(code, -1001 | -1003 | -1007),
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Decode(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BinanceError>;
