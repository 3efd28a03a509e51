mod config;
mod error;
mod perps;
mod types;
mod utils;

pub use config::BinancePerpsClientConfig;
pub use error::{BinanceError, Result};
pub use perps::BinancePerpsClient;
pub use types::{LeverageResponse, MarginMode, OrderResponse, OrderSide, Position};
pub use utils::fapi_signed_request;
