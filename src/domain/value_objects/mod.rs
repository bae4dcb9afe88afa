//! Value Objects for the dashboard

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.chars().count() > Self::MAX_LEN { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Sku::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { Empty, TooLong }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU is required"), Self::TooLong => write!(f, "SKU too long") }
    }
}

/// Largest price or payment the forms accept, in whole Naira.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// True when a form amount is above [`MAX_AMOUNT`].
pub fn exceeds_max_amount(amount: Decimal) -> bool {
    amount > Decimal::from(MAX_AMOUNT)
}

/// Parses form or wire input the way the dashboard always has: blank or
/// unparsable input counts as zero.
pub fn coerce_amount(raw: &str) -> Decimal {
    let raw = raw.trim();
    if raw.is_empty() { return Decimal::ZERO; }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or(Decimal::ZERO)
}

/// Whole-unit counterpart of [`coerce_amount`] for stock counts.
/// Fractions truncate toward zero; anything outside `i64` is zero.
pub fn coerce_count(raw: &str) -> i64 {
    coerce_amount(raw).trunc().to_i64().unwrap_or(0)
}

/// Renders an amount as Naira: `₦` prefix, comma-grouped thousands, no
/// fractional digits.
pub fn format_naira(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push(','); }
        grouped.push(c);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-₦{}", grouped)
    } else {
        format!("₦{}", grouped)
    }
}

/// Lenient serde for money fields. Reads numbers, numeric strings, blanks and
/// nulls (the latter two as zero); writes plain JSON numbers.
pub mod amount_serde {
    use super::*;
    use serde::{Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = amount.normalize();
        if normalized.scale() == 0 {
            if let Some(whole) = normalized.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        serializer.serialize_f64(normalized.to_f64().unwrap_or(0.0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        Ok(from_value(&Value::deserialize(deserializer)?))
    }

    pub(crate) fn from_value(value: &Value) -> Decimal {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_u64().map(Decimal::from))
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .unwrap_or(Decimal::ZERO),
            Value::String(s) => coerce_amount(s),
            _ => Decimal::ZERO,
        }
    }
}

/// Lenient serde for whole-unit counts (stock levels, ledger totals).
pub mod count_serde {
    use super::*;
    use serde::{Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer, T: Copy + Into<i64>>(count: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64((*count).into())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64> + Default,
    {
        let whole = amount_serde::from_value(&Value::deserialize(deserializer)?)
            .trunc()
            .to_i64()
            .unwrap_or(0);
        Ok(T::try_from(whole).unwrap_or_default())
    }
}

/// Record identifiers arrive as strings (`"PRD-001"`, Mongo `_id`) or as bare
/// numbers depending on the backend; both are kept as strings.
pub mod id_serde {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    /// Backends may send one id under several keys (`id` next to Mongo's
    /// `_id`). Folds them into `target`, keeping the first non-empty value.
    pub fn merge_keys(value: &mut Value, target: &str, aliases: &[&str]) {
        let Value::Object(map) = value else { return };
        let mut chosen = map.remove(target).filter(is_present);
        for alias in aliases {
            let candidate = map.remove(*alias);
            if chosen.is_none() {
                chosen = candidate.filter(is_present);
            }
        }
        if let Some(id) = chosen {
            map.insert(target.to_string(), id);
        }
    }

    fn is_present(value: &Value) -> bool {
        match value {
            Value::String(s) => !s.trim().is_empty(),
            Value::Number(_) => true,
            _ => false,
        }
    }
}

/// Parses `YYYY-MM-DD` or a full RFC 3339 timestamp into a calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Optional dates: blank strings and unparsable values read as absent.
pub mod date_serde {
    use super::parse_date;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => parse_date(&s),
            _ => None,
        })
    }
}

/// Form inputs stay raw text until validation; clients may still post numbers.
pub mod raw_serde {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(Value::deserialize(deserializer)?))
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            other => Some(text(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku() { let sku = Sku::new(" dr-sav-100ml ").unwrap(); assert_eq!(sku.as_str(), "DR-SAV-100ML"); }

    #[test]
    fn test_sku_rejects_blank() { assert_eq!(Sku::new("   "), Err(SkuError::Empty)); }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(""), Decimal::ZERO);
        assert_eq!(coerce_amount("abc"), Decimal::ZERO);
        assert_eq!(coerce_amount(" 50000 "), Decimal::from(50000));
        assert_eq!(coerce_amount("42.5"), Decimal::new(425, 1));
        assert_eq!(coerce_amount("1e3"), Decimal::from(1000));
        assert_eq!(coerce_count("7.9"), 7);
    }

    #[test]
    fn test_format_naira() {
        assert_eq!(format_naira(Decimal::ZERO), "₦0");
        assert_eq!(format_naira(Decimal::from(999)), "₦999");
        assert_eq!(format_naira(Decimal::from(1000)), "₦1,000");
        assert_eq!(format_naira(Decimal::from(277500)), "₦277,500");
        assert_eq!(format_naira(Decimal::from(1_234_567)), "₦1,234,567");
        assert_eq!(format_naira(Decimal::new(75_850_50, 2)), "₦75,851");
        assert_eq!(format_naira(Decimal::from(-2500)), "-₦2,500");
    }

    #[test]
    fn test_merge_keys_prefers_first_present() {
        let mut v = serde_json::json!({"_id": "a1", "id": "", "name": "Chanel"});
        id_serde::merge_keys(&mut v, "id", &["_id"]);
        assert_eq!(v, serde_json::json!({"id": "a1", "name": "Chanel"}));

        let mut v = serde_json::json!({"_id": "mongo", "id": 7});
        id_serde::merge_keys(&mut v, "id", &["_id"]);
        assert_eq!(v["id"], 7);
        assert!(v.get("_id").is_none());

        let mut v = serde_json::json!({"name": "no ids"});
        id_serde::merge_keys(&mut v, "id", &["_id"]);
        assert!(v.get("id").is_none());
    }

    #[test]
    fn test_max_amount() {
        assert!(!exceeds_max_amount(Decimal::from(MAX_AMOUNT)));
        assert!(exceeds_max_amount(Decimal::MAX));
    }

    #[test]
    fn test_amount_serde_is_lenient() {
        #[derive(Deserialize, Serialize)]
        struct Row { #[serde(with = "amount_serde")] price: Decimal }
        let row: Row = serde_json::from_str(r#"{"price": ""}"#).unwrap();
        assert_eq!(row.price, Decimal::ZERO);
        let row: Row = serde_json::from_str(r#"{"price": "180000"}"#).unwrap();
        assert_eq!(row.price, Decimal::from(180000));
        let row: Row = serde_json::from_str(r#"{"price": 42.5}"#).unwrap();
        assert_eq!(row.price, Decimal::new(425, 1));
        assert_eq!(serde_json::to_string(&Row { price: Decimal::from(130000) }).unwrap(), r#"{"price":130000}"#);
    }
}
