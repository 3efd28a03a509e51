use serde::{Deserialize, Serialize};

/// Configuration for BinancePerpsClient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinancePerpsClientConfig {
    /// Binance API key
    pub api_key: String,
    /// Binance API secret
    pub api_secret: String,
    /// Base URL for API endpoints, e.g. "https://fapi.binance.com"
    pub base_url: String,
    /// recvWindow sent with every signed request, in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
}

fn default_recv_window() -> u64 {
    5000
}
