use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kraken_mid::utils::api_key_man;
use kraken_mid::{Credentials, Kraken, KrakenConfig};

const DEFAULT_KEY_FILE: &str = "config/kraken_api_key";
const OHLC_INTERVAL_MINUTES: u32 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // usage: kraken-mid [PAIR] [KEY_FILE]
    let mut args = std::env::args().skip(1);
    let pair = args.next().unwrap_or_else(|| "XBT/USD".to_string());
    let key_file = args.next().unwrap_or_else(|| DEFAULT_KEY_FILE.to_string());

    //load api keys from env, then file; public endpoints still work without them
    let credentials = match api_key_man::read_api_credentials_from_env() {
        Some(credentials) => Some(credentials),
        None => match api_key_man::read_api_credentials_from_file(&key_file) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(%key_file, error = %e, "no credentials, private endpoints disabled");
                None
            }
        },
    };
    let authenticated = credentials.is_some();

    let kraken = Kraken::new(
        credentials.unwrap_or_else(|| Credentials::new("", "")),
        KrakenConfig::from_env(),
    )?;

    let rest_pair = pair.replace('/', "");
    let ohlc = kraken
        .rest()
        .get_ohlcv(&rest_pair, OHLC_INTERVAL_MINUTES)
        .await
        .context("OHLC request failed")?;
    let candles = ohlc["result"]
        .as_object()
        .and_then(|result| result.values().find_map(|v| v.as_array()))
        .map(|candles| candles.len())
        .unwrap_or(0);
    info!(pair = %rest_pair, candles, "fetched OHLC data");

    if authenticated {
        match kraken.rest().get_account_balance().await {
            Ok(balance) => info!(balance = %balance["result"], "account balance"),
            Err(e) => warn!(error = %e, "balance request failed"),
        }
    }

    let mut subscription = kraken
        .stream()
        .subscribe_mid_price(&pair, |mid: f64| println!("New mid-price: {}", mid))
        .await
        .context("ticker subscription failed")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        result = subscription.wait() => return result.context("ticker stream ended"),
    }
    subscription.close().await?;
    Ok(())
}
