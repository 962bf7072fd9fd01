//! Minimal Kraken client: signed REST calls, OHLC queries and a mid-price
//! ticker stream.

pub mod error;
pub mod exchanges;
pub mod utils;

pub use error::{KrakenError, Result};
pub use exchanges::kraken::{
    Credentials, Kraken, KrakenClient, KrakenConfig, KrakenSigner, KrakenStream, MidPriceHandler,
    MidPriceSubscription, Payload, StreamState,
};
pub use exchanges::{HttpTransport, WebsocketClient};
pub use utils::tick::Tick;
