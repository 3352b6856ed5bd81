//! Money arithmetic shared across the engines: 2dp quantization, cash
//! effects of brokerage events, and FX conversion over a month's rate map.

use crate::db::enums::BrokerageEventKind;
use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;
use std::str::FromStr;

/// Grams per troy ounce, used to value metal holdings against futures quotes.
pub const TROY_OUNCE_G: &str = "31.1034768";

/// All cross-currency fallbacks route through the platform's base currency.
pub const ANCHOR_CURRENCY: &str = "PLN";

/// FX map of `SRC/DST` pair codes to decimal rates, as supplied by the caller
/// or stored in a monthly FX snapshot.
pub type FxTable = HashMap<String, BigDecimal>;

/// Quantize to two decimal places, rounding half up.
pub fn q2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, bigdecimal::RoundingMode::HalfUp)
}

pub fn troy_ounce_grams() -> BigDecimal {
    BigDecimal::from_str(TROY_OUNCE_G).unwrap()
}

/// Cash impact of a brokerage event: BUY drains the linked account, SELL and
/// DIV credit it, SPLIT moves no cash.
pub fn cash_effect(kind: BrokerageEventKind, quantity: &BigDecimal, price: &BigDecimal) -> BigDecimal {
    let gross = q2(&(quantity * price));
    match kind {
        BrokerageEventKind::Buy => -gross,
        BrokerageEventKind::Sell | BrokerageEventKind::Div => gross,
        BrokerageEventKind::Split => BigDecimal::zero(),
    }
}

/// Converts `amount` from `src` to `dst` using the rate map: a direct pair
/// when present, the inverse pair next, and finally a cross through the
/// anchor currency. Returns nothing when no path exists.
pub fn fx_convert(
    amount: &BigDecimal,
    src: &str,
    dst: &str,
    rates: &FxTable,
) -> Option<BigDecimal> {
    if src == dst {
        return Some(amount.clone());
    }
    if let Some(rate) = rates.get(&format!("{src}/{dst}")) {
        return Some(amount * rate);
    }
    if let Some(rate) = rates.get(&format!("{dst}/{src}")) {
        if rate.is_zero() {
            return None;
        }
        return Some(amount / rate);
    }
    if src != ANCHOR_CURRENCY && dst != ANCHOR_CURRENCY {
        let through_anchor = fx_convert(amount, src, ANCHOR_CURRENCY, rates)?;
        return fx_convert(&through_anchor, ANCHOR_CURRENCY, dst, rates);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    fn dec(v: f64) -> BigDecimal {
        BigDecimal::from_f64(v).unwrap().with_scale(4)
    }

    fn rates() -> FxTable {
        FxTable::from([
            ("USD/PLN".to_string(), dec(4.0)),
            ("EUR/PLN".to_string(), dec(4.5)),
        ])
    }

    #[test]
    fn test_fx_identity() {
        assert_eq!(
            fx_convert(&dec(10.0), "PLN", "PLN", &rates()),
            Some(dec(10.0))
        );
    }

    #[test]
    fn test_fx_direct() {
        let out = fx_convert(&dec(10.0), "USD", "PLN", &rates()).unwrap();
        assert_eq!(q2(&out), q2(&dec(40.0)));
    }

    #[test]
    fn test_fx_inverse() {
        // Only USD/PLN is present; PLN -> USD goes through the inverse.
        let out = fx_convert(&dec(40.0), "PLN", "USD", &rates()).unwrap();
        assert_eq!(q2(&out), q2(&dec(10.0)));
    }

    #[test]
    fn test_fx_anchor_cross() {
        // USD -> EUR has no pair either way; cross through PLN.
        let out = fx_convert(&dec(9.0), "USD", "EUR", &rates()).unwrap();
        assert_eq!(q2(&out), q2(&dec(8.0)));
    }

    #[test]
    fn test_fx_no_path() {
        assert_eq!(fx_convert(&dec(1.0), "USD", "CHF", &rates()), None);
        assert_eq!(fx_convert(&dec(1.0), "USD", "EUR", &FxTable::new()), None);
    }

    #[test]
    fn test_cash_effect_signs() {
        let q = dec(10.0);
        let p = dec(100.0);
        assert_eq!(
            cash_effect(BrokerageEventKind::Buy, &q, &p),
            q2(&dec(-1000.0))
        );
        assert_eq!(
            cash_effect(BrokerageEventKind::Sell, &q, &p),
            q2(&dec(1000.0))
        );
        assert_eq!(
            cash_effect(BrokerageEventKind::Div, &q, &p),
            q2(&dec(1000.0))
        );
        assert!(cash_effect(BrokerageEventKind::Split, &q, &p).is_zero());
    }
}
