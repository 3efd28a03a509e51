use reqwest::Method;
use tracing::{debug, info};

use crate::config::BinancePerpsClientConfig;
use crate::error::{BinanceError, Result};
use crate::types::{LeverageResponse, MarginMode, OrderResponse, OrderSide, Position};
use crate::utils;

/// Returned by `/fapi/v1/marginType` when the symbol already uses the requested mode.
const NO_NEED_TO_CHANGE_MARGIN_TYPE: i64 = -4046;

/// Client for Binance perpetual futures (USDT-M) API.
///
/// The account is expected to run in one-way ("net") position mode, so every order and
/// position uses `positionSide = BOTH`.
pub struct BinancePerpsClient {
    client: reqwest::Client,
    config: BinancePerpsClientConfig,
}

impl BinancePerpsClient {
    pub fn new(client: reqwest::Client, config: BinancePerpsClientConfig) -> Self {
        Self { client, config }
    }

    async fn signed(&self, method: Method, path: &str, params: Vec<(&str, String)>) -> Result<String> {
        utils::fapi_signed_request(
            &self.client,
            &self.config.base_url,
            path,
            method,
            &self.config.api_key,
            &self.config.api_secret,
            self.config.recv_window,
            params,
        )
        .await
    }

    /// All position rows reported for `symbol`.
    pub async fn get_positions(&self, symbol: &str) -> Result<Vec<Position>> {
        let body = self
            .signed(
                Method::GET,
                "/fapi/v3/positionRisk",
                vec![("symbol", symbol.to_string())],
            )
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// The net position for `symbol`, or `None` when the account holds nothing.
    pub async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let positions = self.get_positions(symbol).await?;
        Ok(positions.into_iter().find(|p| {
            p.symbol == symbol && p.position_side.as_deref().map_or(true, |s| s == "BOTH")
        }))
    }

    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<LeverageResponse> {
        let body = self
            .signed(
                Method::POST,
                "/fapi/v1/leverage",
                vec![
                    ("symbol", symbol.to_string()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;
        let resp: LeverageResponse = serde_json::from_str(&body)?;
        info!(symbol, leverage = resp.leverage, "leverage set");
        Ok(resp)
    }

    /// Switches the symbol's margin mode; already being in that mode counts as success.
    pub async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> Result<()> {
        let result = self
            .signed(
                Method::POST,
                "/fapi/v1/marginType",
                vec![
                    ("symbol", symbol.to_string()),
                    ("marginType", mode.as_str().to_string()),
                ],
            )
            .await;
        match result {
            Ok(_) => {
                info!(symbol, margin_mode = mode.as_str(), "margin mode set");
                Ok(())
            }
            Err(BinanceError::Api { code, .. }) if code == NO_NEED_TO_CHANGE_MARGIN_TYPE => {
                debug!(symbol, margin_mode = mode.as_str(), "margin mode unchanged");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Places a market order for `quantity` (base units, already rounded to the lot step).
    pub async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: &str,
    ) -> Result<OrderResponse> {
        let body = self
            .signed(
                Method::POST,
                "/fapi/v1/order",
                vec![
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", quantity.to_string()),
                    ("positionSide", "BOTH".to_string()),
                    ("newOrderRespType", "RESULT".to_string()),
                ],
            )
            .await?;
        let order: OrderResponse = serde_json::from_str(&body)?;
        info!(
            symbol,
            side = side.as_str(),
            quantity,
            order_id = order.order_id,
            status = %order.status,
            "market order placed"
        );
        Ok(order)
    }
}
