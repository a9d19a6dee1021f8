//! Broker wire types and response decoding.
//!
//! The broker answers with loosely-typed JSON: return codes arrive as numbers
//! or strings, quantities as zero-padded strings, stock codes sometimes with
//! an `A` prefix. Decoding here normalizes all of that.

use relay_core::{OrderRequest, OrderSide, PriceMode};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{BrokerError, BrokerResult};

/// Trade type code for a limit order.
pub const TRADE_TYPE_LIMIT: &str = "0";
/// Trade type code for a market order.
pub const TRADE_TYPE_MARKET: &str = "3";
/// Return code of an accepted request.
pub const SUCCESS_CODE: &str = "0";

/// Order body as posted to the order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWire {
    /// Not serialized: selects the endpoint's operation id.
    #[serde(skip)]
    pub side: OrderSide,
    /// Exchange code.
    pub dmst_stex_tp: String,
    /// Stock code.
    pub stk_cd: String,
    /// Quantity.
    pub ord_qty: String,
    /// Limit price, empty for market orders.
    pub ord_uv: String,
    /// Trade type (limit / market).
    pub trde_tp: String,
    /// Condition price, unused.
    pub cond_uv: String,
}

impl OrderWire {
    pub fn from_request(request: &OrderRequest, exchange: &str) -> Self {
        let (ord_uv, trde_tp) = match request.price_mode {
            PriceMode::Market => (String::new(), TRADE_TYPE_MARKET),
            PriceMode::Limit(price) => (price.trunc().to_string(), TRADE_TYPE_LIMIT),
        };
        Self {
            side: request.side,
            dmst_stex_tp: exchange.to_string(),
            stk_cd: request.ticker.clone(),
            ord_qty: request.quantity.to_string(),
            ord_uv,
            trde_tp: trde_tp.to_string(),
            cond_uv: String::new(),
        }
    }
}

/// Decoded order endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReply {
    pub return_code: String,
    pub return_msg: String,
    pub order_id: Option<String>,
}

impl OrderReply {
    /// Accepted reply with the given order number.
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            return_code: SUCCESS_CODE.to_string(),
            return_msg: "accepted".to_string(),
            order_id: Some(order_id.into()),
        }
    }

    /// Refused reply.
    pub fn refused(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            return_code: code.into(),
            return_msg: msg.into(),
            order_id: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.return_code == SUCCESS_CODE
    }

    /// Decode from the raw JSON body.
    pub fn from_value(value: &Value) -> BrokerResult<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| BrokerError::Decode("order reply is not an object".to_string()))?;
        let return_code = fields
            .get("return_code")
            .map(code_string)
            .ok_or_else(|| BrokerError::Decode("order reply without return_code".to_string()))?;
        let return_msg = fields
            .get("return_msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let order_id = fields
            .get("ord_no")
            .map(code_string)
            .filter(|id| !id.is_empty());

        Ok(Self {
            return_code,
            return_msg,
            order_id,
        })
    }
}

/// One held position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub ticker: String,
    pub quantity: u64,
}

/// Affordability answer for a ticker at a price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Withdrawable {
    /// Cash available for orders.
    pub available_cash: Decimal,
    /// Maximum quantity purchasable at the queried price.
    pub max_quantity: u64,
}

/// Body of the withdrawable-amount query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawableQuery {
    pub stk_cd: String,
    /// Unit price.
    pub uv: String,
    /// Trade direction ("2" = buy).
    pub trde_tp: String,
}

impl WithdrawableQuery {
    pub fn buy(ticker: &str, price: Decimal) -> Self {
        Self {
            stk_cd: ticker.to_string(),
            uv: price.trunc().to_string(),
            trde_tp: "2".to_string(),
        }
    }
}

/// Field listing per-ticker holdings in the balance reply.
const HOLDINGS_FIELD: &str = "acnt_evlt_remn_indv_tot";
/// Field with order-allowable cash in the withdrawable reply.
const ALLOWED_CASH_FIELD: &str = "ord_alow_amt";
/// Field with order-allowable quantity in the withdrawable reply.
const ALLOWED_QTY_FIELD: &str = "ord_alowq";

/// Decode the holdings list of a balance reply.
pub fn parse_holdings(value: &Value) -> BrokerResult<Vec<Holding>> {
    ensure_success(value)?;
    let Some(rows) = value.get(HOLDINGS_FIELD).and_then(Value::as_array) else {
        // No array means no positions.
        return Ok(Vec::new());
    };

    Ok(rows
        .iter()
        .filter_map(|row| {
            let ticker = normalize_stock_code(row.get("stk_cd")?.as_str()?);
            let quantity = padded_u64(row.get("rmnd_qty")?)?;
            Some(Holding { ticker, quantity })
        })
        .collect())
}

/// Decode a withdrawable-amount reply.
pub fn parse_withdrawable(value: &Value) -> BrokerResult<Withdrawable> {
    ensure_success(value)?;
    let available_cash = value
        .get(ALLOWED_CASH_FIELD)
        .and_then(padded_decimal)
        .unwrap_or_default();
    let max_quantity = value
        .get(ALLOWED_QTY_FIELD)
        .and_then(padded_u64)
        .unwrap_or_default();
    Ok(Withdrawable {
        available_cash,
        max_quantity,
    })
}

/// Strip the `A` prefix the broker puts on domestic stock codes.
pub fn normalize_stock_code(code: &str) -> String {
    let code = code.trim();
    match code.strip_prefix('A') {
        Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) => {
            rest.to_string()
        }
        _ => code.to_string(),
    }
}

/// Fail with `Rejected` when a reply carries a non-zero return code.
fn ensure_success(value: &Value) -> BrokerResult<()> {
    match value.get("return_code").map(code_string) {
        Some(code) if code != SUCCESS_CODE => Err(BrokerError::Rejected {
            code,
            msg: value
                .get("return_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(()),
    }
}

fn code_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn padded_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let digits = s.trim().trim_start_matches('+');
            if digits.is_empty() {
                return None;
            }
            digits.parse::<u64>().ok()
        }
        _ => None,
    }
}

fn padded_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim().trim_start_matches('+')).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_order_wire_limit_and_market() {
        let limit = OrderRequest::new(OrderSide::Buy, "005930", 15, dec!(50000));
        let wire = OrderWire::from_request(&limit, "KRX");
        assert_eq!(wire.trde_tp, TRADE_TYPE_LIMIT);
        assert_eq!(wire.ord_uv, "50000");
        assert_eq!(wire.ord_qty, "15");

        let market = OrderRequest::new(OrderSide::Sell, "005930", 3, dec!(0));
        let wire = OrderWire::from_request(&market, "KRX");
        assert_eq!(wire.trde_tp, TRADE_TYPE_MARKET);
        assert_eq!(wire.ord_uv, "");
    }

    #[test]
    fn test_order_wire_serialization_skips_side() {
        let req = OrderRequest::new(OrderSide::Buy, "005930", 1, dec!(70000));
        let body = serde_json::to_value(OrderWire::from_request(&req, "KRX")).unwrap();
        assert!(body.get("side").is_none());
        assert_eq!(body["dmst_stex_tp"], "KRX");
        assert_eq!(body["stk_cd"], "005930");
    }

    #[test]
    fn test_order_reply_numeric_and_string_codes() {
        let reply = OrderReply::from_value(&json!({
            "return_code": 0,
            "return_msg": "ok",
            "ord_no": "0012345"
        }))
        .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.order_id.as_deref(), Some("0012345"));

        let reply = OrderReply::from_value(&json!({
            "return_code": "8005",
            "return_msg": "Token이 유효하지 않습니다"
        }))
        .unwrap();
        assert!(!reply.is_success());
        assert_eq!(reply.return_code, "8005");
        assert!(reply.order_id.is_none());
    }

    #[test]
    fn test_order_reply_without_code_is_error() {
        assert!(OrderReply::from_value(&json!({"return_msg": "?"})).is_err());
        assert!(OrderReply::from_value(&json!([])).is_err());
    }

    #[test]
    fn test_parse_holdings() {
        let body = json!({
            "return_code": 0,
            "acnt_evlt_remn_indv_tot": [
                {"stk_cd": "A005930", "rmnd_qty": "000000000010"},
                {"stk_cd": "000660", "rmnd_qty": 3},
                {"stk_cd": "A035720"}
            ]
        });
        let holdings = parse_holdings(&body).unwrap();
        assert_eq!(
            holdings,
            vec![
                Holding { ticker: "005930".to_string(), quantity: 10 },
                Holding { ticker: "000660".to_string(), quantity: 3 },
            ]
        );
    }

    #[test]
    fn test_parse_holdings_rejected() {
        let body = json!({"return_code": 8005, "return_msg": "expired"});
        assert!(matches!(
            parse_holdings(&body),
            Err(BrokerError::Rejected { ref code, .. }) if code == "8005"
        ));
    }

    #[test]
    fn test_parse_withdrawable() {
        let body = json!({
            "return_code": "0",
            "ord_alow_amt": "000000750000",
            "ord_alowq": "000000000015"
        });
        let w = parse_withdrawable(&body).unwrap();
        assert_eq!(w.available_cash, dec!(750000));
        assert_eq!(w.max_quantity, 15);

        let empty = parse_withdrawable(&json!({})).unwrap();
        assert_eq!(empty, Withdrawable::default());
    }

    #[test]
    fn test_normalize_stock_code() {
        assert_eq!(normalize_stock_code("A005930"), "005930");
        assert_eq!(normalize_stock_code(" 005930 "), "005930");
        assert_eq!(normalize_stock_code("AAPL"), "AAPL");
    }
}
