use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::KrakenConfig;
use crate::error::{KrakenError, Result};
use crate::exchanges::WebsocketClient;
use crate::utils::tick::Tick;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Subscribed,
    Receiving,
    Closed,
}

/// Receives mid-prices, and any per-frame errors, from a running subscription.
///
/// Closures `FnMut(f64)` implement this directly; errors then go to the log.
pub trait MidPriceHandler: Send + 'static {
    fn on_mid_price(&mut self, mid: f64);

    fn on_error(&mut self, error: &KrakenError) {
        warn!(%error, "kraken stream frame skipped");
    }
}

impl<F> MidPriceHandler for F
where
    F: FnMut(f64) + Send + 'static,
{
    fn on_mid_price(&mut self, mid: f64) {
        self(mid)
    }
}

/// Public ticker feed.
#[derive(Debug, Clone)]
pub struct KrakenStream {
    ws_url: String,
}

impl WebsocketClient for KrakenStream {
    fn ws_url(&self) -> String {
        self.ws_url.clone()
    }

    fn subscription_message(&self, asset: &str) -> String {
        serde_json::json!({
            "event": "subscribe",
            "pair": [
                asset
            ],
            "subscription": {"name": "ticker"}
        })
        .to_string()
    }
}

impl KrakenStream {
    pub fn new(config: &KrakenConfig) -> KrakenStream {
        KrakenStream {
            ws_url: config.ws_url.clone(),
        }
    }

    /// Connect, subscribe to the `pair` ticker and start the receive loop on
    /// its own task. Returns once the subscription request has been sent.
    ///
    /// The loop runs until [`MidPriceSubscription::close`], a remote close or a
    /// transport error. It never reconnects.
    pub async fn subscribe_mid_price<H: MidPriceHandler>(
        &self,
        pair: &str,
        handler: H,
    ) -> Result<MidPriceSubscription> {
        let (state_tx, state_rx) = watch::channel(StreamState::Disconnected);
        let ws_stream = match connect_and_subscribe(self, pair, &state_tx).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                state_tx.send_replace(StreamState::Closed);
                return Err(e);
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_receive_loop(
            ws_stream,
            pair.to_string(),
            handler,
            shutdown_rx,
            state_tx,
        ));

        Ok(MidPriceSubscription {
            pair: pair.to_string(),
            task: Some(task),
            shutdown: Some(shutdown_tx),
            state: state_rx,
        })
    }
}

/// Handle to a running receive loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct MidPriceSubscription {
    pair: String,
    task: Option<JoinHandle<Result<()>>>,
    shutdown: Option<oneshot::Sender<()>>,
    state: watch::Receiver<StreamState>,
}

impl MidPriceSubscription {
    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Wait for the loop to end on its own. A remote close or transport
    /// failure comes back as `ConnectionClosed`. Once the loop has been
    /// collected, further calls return `Ok(())`.
    pub async fn wait(&mut self) -> Result<()> {
        self.finish().await
    }

    /// Stop the loop, send a close frame and release the socket.
    pub async fn close(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.finish().await
    }

    async fn finish(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let outcome = task.await;
        self.task = None;
        match outcome {
            Ok(result) => result,
            Err(e) => Err(KrakenError::ConnectionClosed(format!(
                "receive task failed: {}",
                e
            ))),
        }
    }
}

async fn connect_and_subscribe<T: WebsocketClient>(
    exchange: &T,
    asset: &str,
    state: &watch::Sender<StreamState>,
) -> Result<WsStream> {
    state.send_replace(StreamState::Connecting);
    let url = exchange.ws_url();
    let (mut ws_stream, _) = connect_async(url.as_str()).await?;
    info!(%url, "websocket connected");

    ws_stream
        .send(Message::Text(exchange.subscription_message(asset)))
        .await?;
    state.send_replace(StreamState::Subscribed);
    info!(pair = asset, "ticker subscription sent");
    Ok(ws_stream)
}

async fn run_receive_loop<H: MidPriceHandler>(
    mut ws_stream: WsStream,
    pair: String,
    mut handler: H,
    mut shutdown: oneshot::Receiver<()>,
    state: watch::Sender<StreamState>,
) -> Result<()> {
    let mut receiving = false;

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = ws_stream.close(None).await {
                    debug!(error = %e, "close handshake failed");
                }
                info!(%pair, "ticker subscription closed");
                break Ok(());
            }
            incoming = ws_stream.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(e) => {
                            handler.on_error(&KrakenError::MalformedMessage(e.to_string()));
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by remote".to_string());
                        warn!(%pair, %reason, "ticker stream closed");
                        // flushes the queued close reply
                        if let Err(e) = ws_stream.close(None).await {
                            debug!(error = %e, "close reply not sent");
                        }
                        break Err(KrakenError::ConnectionClosed(reason));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(%pair, error = %e, "ticker stream failed");
                        break Err(KrakenError::ConnectionClosed(e.to_string()));
                    }
                    None => {
                        warn!(%pair, "ticker stream ended");
                        break Err(KrakenError::ConnectionClosed("stream ended".to_string()));
                    }
                };

                if !receiving {
                    receiving = true;
                    state.send_replace(StreamState::Receiving);
                }
                handle_frame(&text, &mut handler);
            }
        }
    };

    state.send_replace(StreamState::Closed);
    result
}

fn handle_frame<H: MidPriceHandler>(text: &str, handler: &mut H) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            handler.on_error(&KrakenError::MalformedMessage(format!("{}: {}", e, text)));
            return;
        }
    };

    if value.get("event").is_some() {
        match StreamEvent::deserialize(&value) {
            Ok(event) => handle_event(event, handler),
            Err(e) => {
                handler.on_error(&KrakenError::MalformedMessage(format!("{}: {}", e, text)))
            }
        }
        return;
    }

    match Tick::from_value(&value) {
        Some(tick) => {
            debug!(pair = tick.pair.as_deref(), mid = tick.mid, "mid-price");
            handler.on_mid_price(tick.mid)
        }
        None => debug!(frame = text, "ignoring non-ticker frame"),
    }
}

/// Control frames: `heartbeat`, `systemStatus`, `subscriptionStatus`.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    event: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

fn handle_event<H: MidPriceHandler>(event: StreamEvent, handler: &mut H) {
    match (event.event.as_str(), event.status.as_deref()) {
        ("heartbeat", _) => {}
        ("subscriptionStatus", Some("error")) => {
            let message = event.error_message.as_deref().unwrap_or("unknown error");
            handler.on_error(&KrakenError::Subscription(message.to_string()));
        }
        (name, status) => debug!(
            event = name,
            status,
            pair = event.pair.as_deref(),
            "kraken stream event"
        ),
    }
}
