use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// Best bid/ask from one ticker message and their midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    pub pair: Option<String>,
}

impl Tick {
    /// Accepts `{"b":[[price,..]],"a":[[price,..]]}` as well as the v1 channel
    /// envelope `[channelID, {"b":[price,..],"a":[price,..]}, "ticker", pair]`.
    ///
    /// Anything without a decimal best bid and ask (heartbeats, status
    /// events, `"NaN"` prices) is `None`.
    pub fn from_value(value: &Value) -> Option<Tick> {
        let (payload, pair) = match value {
            Value::Array(items) => (items.get(1)?, items.get(3).and_then(Value::as_str)),
            Value::Object(_) => (value, value.get("pair").and_then(Value::as_str)),
            _ => return None,
        };

        let bid = best_price(payload.get("b")?)?;
        let ask = best_price(payload.get("a")?)?;

        Some(Tick {
            bid,
            ask,
            mid: (bid + ask) / 2.0,
            pair: pair.map(str::to_owned),
        })
    }
}

// First level's first field. Levels are either nested (`[[price, ..], ..]`)
// or a single flat level (`[price, ..]`).
fn best_price(levels: &Value) -> Option<f64> {
    let first = levels.as_array()?.first()?;
    let price = match first {
        Value::Array(fields) => fields.first()?,
        other => other,
    };
    match price {
        Value::String(s) => Decimal::from_str(s).ok()?.to_f64(),
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite()),
        _ => None,
    }
}
