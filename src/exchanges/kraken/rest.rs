use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{
    Credentials, KrakenConfig, KrakenSigner, KrakenUtils, MethodType, NonceGenerator, Payload,
};
use crate::error::{KrakenError, Result};
use crate::exchanges::HttpTransport;

/// reqwest-backed transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<ReqwestTransport> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ReqwestTransport { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, headers: HeaderMap, body: String) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Ok(response.json::<Value>().await?)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;
        Ok(response.json::<Value>().await?)
    }
}

/// Kraken REST client. Private calls are signed, public calls are not.
#[derive(Debug)]
pub struct KrakenClient<T = ReqwestTransport> {
    transport: T,
    api_url: String,
    api_version: &'static str,
    credentials: Credentials,
    signer: KrakenSigner,
    nonces: NonceGenerator,
}

impl KrakenClient<ReqwestTransport> {
    pub fn new(credentials: Credentials, config: &KrakenConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(KrakenClient::with_transport(credentials, config, transport))
    }
}

impl<T: HttpTransport> KrakenClient<T> {
    pub fn with_transport(credentials: Credentials, config: &KrakenConfig, transport: T) -> Self {
        let signer = KrakenSigner::new(credentials.api_sec());
        KrakenClient {
            transport,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version(),
            credentials,
            signer,
            nonces: NonceGenerator::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Account balances per asset.
    pub async fn get_account_balance(&self) -> Result<Value> {
        self.query_private("Balance", Payload::new()).await
    }

    /// OHLCV candles for `pair` at `interval` minutes. Returned as the exchange sent it.
    pub async fn get_ohlcv(&self, pair: &str, interval: u32) -> Result<Value> {
        self.query_public(
            "OHLC",
            &[("pair", pair.to_string()), ("interval", interval.to_string())],
        )
        .await
    }

    /// Submit an order. `price` is sent only when it is `Some`; a zero price is
    /// still sent as `price=0`.
    pub async fn place_order(
        &self,
        pair: &str,
        side: &str,
        order_type: &str,
        volume: Decimal,
        price: Option<Decimal>,
    ) -> Result<Value> {
        let mut params = Payload::new();
        params.push("pair", pair);
        params.push("type", side);
        params.push("ordertype", order_type);
        params.push("volume", volume.to_string());
        if let Some(price) = price {
            params.push("price", price.to_string());
        }
        self.query_private("AddOrder", params).await
    }

    /// Unsigned GET against a public method.
    pub async fn query_public(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let api_path = self.api_path(method, MethodType::Public)?;
        let api_endpoint = format!("{}{}", self.api_url, api_path);
        debug!(method, endpoint = %api_endpoint, "kraken public request");
        self.transport.get(&api_endpoint, params).await
    }

    /// Signed POST against a private method. A fresh nonce is prepended to `params`.
    pub async fn query_private(&self, method: &str, params: Payload) -> Result<Value> {
        let api_path = self.api_path(method, MethodType::Private)?;
        let api_endpoint = format!("{}{}", self.api_url, api_path);

        let mut payload = Payload::with_nonce(self.nonces.next());
        for (key, value) in params.iter() {
            payload.push(key, value);
        }

        let signature = self.signer.sign(&api_path, &payload)?;
        let headers = self.get_headers(&signature)?;
        debug!(method, endpoint = %api_endpoint, fields = payload.len(), "kraken private request");

        let response = self
            .transport
            .post_form(&api_endpoint, headers, payload.encode())
            .await?;
        check_exchange_errors(response)
    }

    fn api_path(&self, method: &str, expected: MethodType) -> Result<String> {
        match KrakenUtils::get_method_type(method) {
            Some(method_type) if method_type == expected => {
                Ok(KrakenUtils::api_path(self.api_version, method_type, method))
            }
            _ => Err(KrakenError::UnknownMethod(method.to_string())),
        }
    }

    fn get_headers(&self, signature: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("API-Key", HeaderValue::from_str(self.credentials.api_key())?);
        headers.insert("API-Sign", HeaderValue::from_str(signature)?);
        Ok(headers)
    }
}

/// Turn a non-empty `error` array into `KrakenError::Auth`; anything else passes through.
pub fn check_exchange_errors(response: Value) -> Result<Value> {
    match response.get("error").and_then(Value::as_array) {
        Some(errors) if !errors.is_empty() => {
            let errors = errors
                .iter()
                .map(|e| e.as_str().map(str::to_owned).unwrap_or_else(|| e.to_string()))
                .collect::<Vec<_>>();
            debug!(?errors, "kraken rejected request");
            Err(KrakenError::Auth(errors))
        }
        _ => Ok(response),
    }
}
