//! Raw fill validation and coercion.
//!
//! Rejection is binary: a fill is either fully typed or dropped and counted.
//! Nothing is silently corrected.

use ledger_core::{parse_decimal, Fill, PositionSide, Price, RawFill, Side, Size};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::error::RejectReason;

/// Validate a single raw fill.
pub fn normalize_fill(raw: &RawFill) -> Result<Fill, RejectReason> {
    let symbol = raw
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RejectReason::MissingSymbol)?
        .to_string();

    let time = raw
        .time
        .as_ref()
        .and_then(epoch_millis)
        .ok_or_else(|| RejectReason::InvalidTime(describe(raw.time.as_ref())))?;

    let side_text = raw.side.as_deref().unwrap_or_default();
    let side = Side::parse(side_text).ok_or_else(|| RejectReason::InvalidSide(side_text.into()))?;

    let price = raw
        .price
        .as_ref()
        .and_then(decimal_value)
        .filter(|p| p.is_sign_positive() && !p.is_zero())
        .ok_or_else(|| RejectReason::InvalidPrice(describe(raw.price.as_ref())))?;

    let qty = raw
        .qty
        .as_ref()
        .and_then(decimal_value)
        .filter(|q| q.is_sign_positive() && !q.is_zero())
        .ok_or_else(|| RejectReason::InvalidQty(describe(raw.qty.as_ref())))?;

    let realized_pnl = optional_decimal("realizedPnl", raw.realized_pnl.as_ref())?;
    let commission = optional_decimal("commission", raw.commission.as_ref())?;

    Ok(Fill {
        symbol,
        time,
        side,
        position_side: PositionSide::parse(raw.position_side.as_deref()),
        price: Price::new(price),
        qty: Size::new(qty),
        realized_pnl,
        commission,
        commission_asset: raw
            .commission_asset
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        order_id: raw.order_id.as_ref().and_then(identifier),
        trade_id: raw.trade_id.as_ref().and_then(identifier),
    })
}

/// Batch normalizer that keeps the ignored-fill count.
#[derive(Debug, Default)]
pub struct FillNormalizer {
    ignored_fills: u64,
}

impl FillNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one fill, counting it if rejected.
    pub fn normalize(&mut self, raw: &RawFill) -> Option<Fill> {
        match normalize_fill(raw) {
            Ok(fill) => Some(fill),
            Err(reason) => {
                self.ignored_fills += 1;
                debug!(
                    %reason,
                    symbol = ?raw.symbol,
                    trade_id = ?raw.trade_id,
                    "Ignoring invalid fill"
                );
                None
            }
        }
    }

    /// Normalize a batch, preserving input order of the accepted fills.
    pub fn normalize_batch(&mut self, raws: &[RawFill]) -> Vec<Fill> {
        raws.iter().filter_map(|raw| self.normalize(raw)).collect()
    }

    /// Record a fill that was dropped before it could be parsed at all.
    pub fn record_ignored(&mut self, count: u64) {
        self.ignored_fills += count;
    }

    pub fn ignored_fills(&self) -> u64 {
        self.ignored_fills
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s).ok(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                parse_decimal(&n.to_string()).ok()
            }
        }
        _ => None,
    }
}

fn optional_decimal(field: &'static str, value: Option<&Value>) -> Result<Decimal, RejectReason> {
    match value {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(v) => decimal_value(v).ok_or_else(|| RejectReason::InvalidNumber {
            field,
            value: v.to_string(),
        }),
    }
}

fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "missing".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(value: Value) -> RawFill {
        serde_json::from_value(value).unwrap()
    }

    fn valid_raw() -> Value {
        json!({
            "symbol": "BTCUSDC",
            "time": 1745000000000i64,
            "side": "SELL",
            "positionSide": "BOTH",
            "price": "75194.4",
            "qty": "0.066",
            "realizedPnl": "0",
            "commission": "2.67692064",
            "commissionAsset": "USDC",
            "orderId": 25851813,
            "id": 698759
        })
    }

    #[test]
    fn test_normalize_valid_fill() {
        let fill = normalize_fill(&raw(valid_raw())).unwrap();
        assert_eq!(fill.symbol, "BTCUSDC");
        assert_eq!(fill.time, 1_745_000_000_000);
        assert_eq!(fill.side, Side::Sell);
        assert_eq!(fill.position_side, PositionSide::Both);
        assert_eq!(fill.price, Price::new(dec!(75194.4)));
        assert_eq!(fill.qty, Size::new(dec!(0.066)));
        assert_eq!(fill.commission, dec!(2.67692064));
        assert_eq!(fill.commission_asset.as_deref(), Some("USDC"));
        assert_eq!(fill.order_id.as_deref(), Some("25851813"));
        assert_eq!(fill.trade_id.as_deref(), Some("698759"));
    }

    #[test]
    fn test_numeric_fields_accept_json_numbers() {
        let mut value = valid_raw();
        value["price"] = json!(100.5);
        value["qty"] = json!(2);
        value["time"] = json!("1745000000000");
        let fill = normalize_fill(&raw(value)).unwrap();
        assert_eq!(fill.price, Price::new(dec!(100.5)));
        assert_eq!(fill.qty, Size::new(dec!(2)));
        assert_eq!(fill.time, 1_745_000_000_000);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let fill = normalize_fill(&raw(json!({
            "symbol": "ETHUSDT", "time": 1, "side": "buy", "price": "10", "qty": "1"
        })))
        .unwrap();
        assert_eq!(fill.realized_pnl, Decimal::ZERO);
        assert_eq!(fill.commission, Decimal::ZERO);
        assert_eq!(fill.position_side, PositionSide::Unspecified);
        assert!(fill.order_id.is_none());
    }

    fn assert_rejects(field: &str, bad: Value, check: impl Fn(&RejectReason) -> bool) {
        let mut value = valid_raw();
        value[field] = bad.clone();
        let err = normalize_fill(&raw(value)).unwrap_err();
        assert!(check(&err), "field {field} = {bad} gave {err:?}");
    }

    #[test]
    fn test_rejections() {
        assert_rejects("symbol", json!("  "), |r| matches!(r, RejectReason::MissingSymbol));
        assert_rejects("time", json!(1.5), |r| matches!(r, RejectReason::InvalidTime(_)));
        assert_rejects("side", json!("HOLD"), |r| matches!(r, RejectReason::InvalidSide(_)));
        assert_rejects("price", json!("0"), |r| matches!(r, RejectReason::InvalidPrice(_)));
        assert_rejects("price", json!("NaN"), |r| matches!(r, RejectReason::InvalidPrice(_)));
        assert_rejects("qty", json!("-1"), |r| matches!(r, RejectReason::InvalidQty(_)));
        assert_rejects("qty", json!("inf"), |r| matches!(r, RejectReason::InvalidQty(_)));
        assert_rejects("commission", json!("abc"), |r| {
            matches!(r, RejectReason::InvalidNumber { field: "commission", .. })
        });
    }

    #[test]
    fn test_missing_time_rejected() {
        let mut value = valid_raw();
        value.as_object_mut().unwrap().remove("time");
        assert!(matches!(
            normalize_fill(&raw(value)),
            Err(RejectReason::InvalidTime(_))
        ));
    }

    #[test]
    fn test_batch_counts_exactly_the_rejected() {
        let mut bad_qty = valid_raw();
        bad_qty["qty"] = json!("0");
        let mut bad_side = valid_raw();
        bad_side["side"] = json!("");

        let batch = vec![
            raw(valid_raw()),
            raw(bad_qty),
            raw(valid_raw()),
            raw(bad_side),
            raw(valid_raw()),
        ];

        let mut normalizer = FillNormalizer::new();
        let fills = normalizer.normalize_batch(&batch);
        assert_eq!(fills.len(), 3);
        assert_eq!(normalizer.ignored_fills(), 2);

        normalizer.record_ignored(1);
        assert_eq!(normalizer.ignored_fills(), 3);
    }
}
