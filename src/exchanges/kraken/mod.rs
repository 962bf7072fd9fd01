pub mod nonce;
pub mod rest;
pub mod signer;
pub mod stream;

use std::fmt;
use std::time::Duration;

use crate::error::Result;

pub use nonce::NonceGenerator;
pub use rest::{KrakenClient, ReqwestTransport};
pub use signer::{KrakenSigner, Payload};
pub use stream::{KrakenStream, MidPriceHandler, MidPriceSubscription, StreamState};

const KRAKEN_API_URL: &str = "https://api.kraken.com";
const KRAKEN_WS_URL: &str = "wss://ws.kraken.com/";
const KRAKEN_API_VERSION: &str = "0";
const KRAKEN_API_TIMEOUT: u64 = 5000;

/// API key and base64 secret. Read-only once built.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_sec: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_sec: impl Into<String>) -> Self {
        Credentials {
            api_key: api_key.into(),
            api_sec: api_sec.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_sec(&self) -> &str {
        &self.api_sec
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.api_sec.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_sec", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct KrakenConfig {
    pub api_url: String,
    pub ws_url: String,
    pub timeout: Duration,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        KrakenConfig {
            api_url: KRAKEN_API_URL.to_string(),
            ws_url: KRAKEN_WS_URL.to_string(),
            timeout: Duration::from_millis(KRAKEN_API_TIMEOUT),
        }
    }
}

impl KrakenConfig {
    /// Defaults, overridden by `KRAKEN_API_URL`, `KRAKEN_WS_URL` and
    /// `KRAKEN_API_TIMEOUT_MS` when set.
    pub fn from_env() -> Self {
        let mut config = KrakenConfig::default();
        if let Ok(api_url) = std::env::var("KRAKEN_API_URL") {
            config.api_url = api_url;
        }
        if let Ok(ws_url) = std::env::var("KRAKEN_WS_URL") {
            config.ws_url = ws_url;
        }
        if let Some(timeout) = std::env::var("KRAKEN_API_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(timeout);
        }
        config
    }

    pub fn api_version(&self) -> &'static str {
        KRAKEN_API_VERSION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodType {
    Public,
    Private,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodType::Public => "public",
            MethodType::Private => "private",
        }
    }
}

pub struct KrakenUtils;

impl KrakenUtils {
    pub fn is_method_public(method: &str) -> bool {
        [
            "Time",
            "SystemStatus",
            "Assets",
            "AssetPairs",
            "Ticker",
            "Depth",
            "Trades",
            "Spread",
            "OHLC",
        ]
        .contains(&method)
    }

    pub fn is_method_private(method: &str) -> bool {
        [
            "BalanceEx",
            "Balance",
            "TradeBalance",
            "OpenOrders",
            "ClosedOrders",
            "QueryOrders",
            "TradesHistory",
            "QueryTrades",
            "OpenPositions",
            "Ledgers",
            "QueryLedgers",
            "TradeVolume",
            "AddOrder",
            "CancelOrder",
            "DepositMethods",
            "DepositAddresses",
            "DepositStatus",
            "WithdrawInfo",
            "Withdraw",
            "WithdrawStatus",
            "WithdrawCancel",
            "GetWebSocketsToken",
        ]
        .contains(&method)
    }

    pub fn get_method_type(method: &str) -> Option<MethodType> {
        if KrakenUtils::is_method_public(method) {
            Some(MethodType::Public)
        } else if KrakenUtils::is_method_private(method) {
            Some(MethodType::Private)
        } else {
            None
        }
    }

    /// `/0/public/OHLC`, `/0/private/Balance`, ...
    pub fn api_path(version: &str, method_type: MethodType, method: &str) -> String {
        format!("/{}/{}/{}", version, method_type.as_str(), method)
    }
}

/// REST and stream facades over one set of credentials.
///
/// The two halves share nothing mutable; REST calls and a running
/// subscription proceed independently.
#[derive(Debug)]
pub struct Kraken {
    rest: KrakenClient,
    stream: KrakenStream,
}

impl Kraken {
    pub fn new(credentials: Credentials, config: KrakenConfig) -> Result<Kraken> {
        Ok(Kraken {
            rest: KrakenClient::new(credentials, &config)?,
            stream: KrakenStream::new(&config),
        })
    }

    pub fn rest(&self) -> &KrakenClient {
        &self.rest
    }

    pub fn stream(&self) -> &KrakenStream {
        &self.stream
    }
}
