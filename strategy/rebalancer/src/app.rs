//! Process wiring shared by the binaries: the TOML file, secrets, logging and the signing
//! provider.

use std::path::{Path, PathBuf};

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clients_binance::{BinancePerpsClient, BinancePerpsClientConfig};
use clients_uniswapv3::UniswapV3Config;
use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use crate::config::RebalancerConfig;

/// Everything a binary reads from its configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rpc_url: String,
    pub uniswap: UniswapV3Config,
    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,
    #[serde(default = "default_recv_window")]
    pub binance_recv_window: u64,
    /// Directory of the fee-growth JSONL logs
    #[serde(default = "default_fee_log_dir")]
    pub fee_log_dir: PathBuf,
    pub strategy: RebalancerConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.rpc_url()?;
        config.strategy.validate()?;
        Ok(config)
    }

    pub fn rpc_url(&self) -> Result<Url> {
        self.rpc_url
            .parse()
            .with_context(|| format!("invalid rpc_url {:?}", self.rpc_url))
    }

    pub fn binance_client(&self, secrets: &Secrets) -> Result<BinancePerpsClient> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(BinancePerpsClient::new(
            http,
            BinancePerpsClientConfig {
                api_key: secrets.binance_api_key.clone(),
                api_secret: secrets.binance_api_secret.clone(),
                base_url: self.binance_base_url.clone(),
                recv_window: self.binance_recv_window,
            },
        ))
    }
}

/// Credentials taken from the environment, never from the config file
pub struct Secrets {
    pub private_key: String,
    pub binance_api_key: String,
    pub binance_api_secret: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            private_key: Self::private_key_from_env()?,
            binance_api_key: env("BINANCE_API_KEY")?,
            binance_api_secret: env("BINANCE_API_SECRET")?,
        })
    }

    /// For binaries that only touch the chain.
    pub fn private_key_from_env() -> Result<String> {
        env("PRIVATE_KEY")
    }
}

fn env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

/// Provider that signs with `private_key`, plus the signer's address.
pub fn signing_provider(rpc_url: Url, private_key: &str) -> Result<(DynProvider, Address)> {
    let signer: PrivateKeySigner = private_key
        .trim()
        .parse()
        .context("PRIVATE_KEY is not a valid secp256k1 key")?;
    let owner = signer.address();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url)
        .erased();
    Ok((provider, owner))
}

pub fn read_only_provider(rpc_url: Url) -> DynProvider {
    ProviderBuilder::new().connect_http(rpc_url).erased()
}

/// Human-readable logs by default, JSON lines when `LOG_FORMAT=json`. `RUST_LOG`
/// overrides the `info` default filter.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

fn default_binance_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

fn default_fee_log_dir() -> PathBuf {
    PathBuf::from("data/fee_growth")
}
