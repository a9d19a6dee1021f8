//! Inbound alert payload parsing.
//!
//! Alerts arrive as JSON:
//! `{"ticker": "005930", "action": "BUY", "price": 71200, "score": 87.5, "stop": 0, "country": "KR"}`
//!
//! Some senders prefix the JSON with a free-form header segment, separated by
//! a literal `||` (e.g. `"alert name||{...}"`). Line breaks inside the body
//! are stripped before parsing. Numeric fields may be numbers or strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::signal::{Signal, SignalAction};

/// Delimiter between the optional header segment and the JSON payload.
const HEADER_DELIMITER: &str = "||";

/// Parse a raw webhook body into a classified [`Signal`].
pub fn parse_alert(body: &str) -> CoreResult<Signal> {
    let cleaned: String = body.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let trimmed = cleaned.trim();

    let payload = locate_payload(trimmed)?;
    let fields = &payload;

    let ticker = string_field(fields, "ticker")
        .map(|t| normalize_ticker(&t))
        .filter(|t| !t.is_empty())
        .ok_or(CoreError::MissingField("ticker"))?;
    let action_raw = string_field(fields, "action")
        .filter(|a| !a.trim().is_empty())
        .ok_or(CoreError::MissingField("action"))?;

    let price = decimal_field(fields, "price")?.unwrap_or(Decimal::ZERO);
    let score = score_field(fields)?;

    let mut signal =
        Signal::new(ticker, SignalAction::classify(&action_raw), price).with_score(score);
    if let Some(stop) = decimal_field(fields, "stop")? {
        signal = signal.with_stop_price(stop);
    }
    if let Some(country) = string_field(fields, "country").filter(|c| !c.trim().is_empty()) {
        signal = signal.with_country(country.trim().to_uppercase());
    }

    Ok(signal)
}

/// Find the JSON object in a body that may carry a header segment.
///
/// The whole body is tried first. Otherwise the text after each `||`, left
/// to right, is tried until one parses as an object; the header itself may
/// contain braces or further delimiters. On failure the error for the whole
/// body is returned.
fn locate_payload(body: &str) -> CoreResult<Map<String, Value>> {
    let whole_body_error = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => return Ok(fields),
        Ok(_) => CoreError::MalformedAlert("payload is not a JSON object".to_string()),
        Err(e) => CoreError::Json(e),
    };

    for (idx, _) in body.match_indices(HEADER_DELIMITER) {
        let rest = body[idx + HEADER_DELIMITER.len()..].trim();
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(rest) {
            return Ok(fields);
        }
    }

    Err(whole_body_error)
}

/// Strip an exchange prefix (`KRX:005930` -> `005930`) and surrounding space.
fn normalize_ticker(raw: &str) -> String {
    let symbol = raw.rsplit(':').next().unwrap_or(raw);
    symbol.trim().to_uppercase()
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal_field(fields: &Map<String, Value>, name: &'static str) -> CoreResult<Option<Decimal>> {
    let text = match fields.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(CoreError::InvalidNumber {
                field: name,
                value: other.to_string(),
            })
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| CoreError::InvalidNumber {
            field: name,
            value: text,
        })
}

fn score_field(fields: &Map<String, Value>) -> CoreResult<f64> {
    match fields.get("score") {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| CoreError::InvalidNumber {
            field: "score",
            value: n.to_string(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| CoreError::InvalidNumber {
            field: "score",
            value: s.clone(),
        }),
        Some(other) => Err(CoreError::InvalidNumber {
            field: "score",
            value: other.to_string(),
        }),
    }
}
