// Exchange seams: streaming endpoint description and HTTP transport
pub mod kraken;

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::Result;

pub trait WebsocketClient {
    fn ws_url(&self) -> String;
    fn subscription_message(&self, asset: &str) -> String;
}

/// One outbound HTTP request per call, answered with the parsed JSON body.
///
/// The REST client only ever talks to the network through this trait, so the
/// same client can sit on top of an async stack, a blocking one, or a test double.
pub trait HttpTransport {
    async fn post_form(&self, url: &str, headers: HeaderMap, body: String) -> Result<Value>;
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value>;
}
