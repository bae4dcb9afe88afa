//! Stock ledger: cumulative stock-in / stock-out per product

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use crate::query::{Listable, SortKey, SortValue};
use crate::domain::aggregates::product::{classify, Product, StockStatus, DEFAULT_MIN_STOCK};
use crate::domain::validation::FieldErrors;
use crate::domain::value_objects::{coerce_amount, coerce_count, count_serde, id_serde, raw_serde};

/// One product's ledger. Decodes from product JSON too, where the id may sit
/// under `id` or `_id` and the timestamp under `updatedAt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct StockRecord {
    #[serde(default, deserialize_with = "id_serde::deserialize")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, with = "count_serde")]
    pub stock_in: i64,
    #[serde(default, with = "count_serde")]
    pub stock_out: i64,
    #[serde(default = "default_min_stock", with = "count_serde")]
    pub min_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_min_stock() -> u32 { DEFAULT_MIN_STOCK }

impl Serialize for StockRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StockRecord::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for StockRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        id_serde::merge_keys(&mut value, "productId", &["id", "_id"]);
        id_serde::merge_keys(&mut value, "lastUpdated", &["updatedAt"]);
        StockRecord::deserialize(value).map_err(serde::de::Error::custom)
    }
}

impl StockRecord {
    /// Opens a ledger for a product whose current stock is all stock-in.
    pub fn opening(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(), name: product.name.clone(), sku: product.sku.clone(),
            category: product.category.clone(), stock_in: i64::from(product.stock), stock_out: 0,
            min_stock: product.min_stock, last_updated: product.updated_at,
        }
    }

    /// Stock in minus stock out. Not clamped at zero: a negative figure means
    /// more was booked out than ever came in. Saturates at the `i64` bounds.
    pub fn current_stock(&self) -> i64 { self.stock_in.saturating_sub(self.stock_out) }

    pub fn is_overdrawn(&self) -> bool { self.current_stock() < 0 }

    pub fn status(&self) -> StockStatus {
        match u32::try_from(self.current_stock()) {
            Ok(stock) => classify(stock, self.min_stock),
            Err(_) if self.is_overdrawn() => StockStatus::OutOfStock,
            Err(_) => StockStatus::InStock,
        }
    }

    pub fn apply(&mut self, movement: &StockMovement) {
        self.stock_in = movement.stock_in;
        self.stock_out = movement.stock_out;
        self.last_updated = Some(Utc::now());
    }
}

/// Ledger row as listed, with the derived figures spelled out.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecordView {
    #[serde(flatten)]
    pub record: StockRecord,
    pub current_stock: i64,
    pub status: StockStatus,
    pub overdrawn: bool,
}

impl From<StockRecord> for StockRecordView {
    fn from(record: StockRecord) -> Self {
        Self { current_stock: record.current_stock(), status: record.status(), overdrawn: record.is_overdrawn(), record }
    }
}

impl Listable for StockRecordView {
    fn haystacks(&self) -> Vec<&str> { vec![self.record.name.as_str(), self.record.sku.as_str(), self.record.product_id.as_str()] }
    fn category(&self) -> Option<&str> { Some(self.record.category.as_str()) }
    fn matches_status(&self, status: &str) -> bool { StockStatus::parse(status) == Some(self.status) }
    fn date(&self) -> Option<NaiveDate> { self.record.last_updated.map(|t| t.date_naive()) }
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::Name => Some(SortValue::text(&self.record.name)),
            SortKey::Sku => Some(SortValue::text(&self.record.sku)),
            SortKey::Category => Some(SortValue::text(&self.record.category)),
            SortKey::Stock => Some(SortValue::number(self.current_stock)),
            SortKey::Date => self.record.last_updated.map(|t| SortValue::Date(t.date_naive())),
            _ => None,
        }
    }
}

/// The record-stock edit form.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockMovementDraft {
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub stock_in: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub stock_out: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement { pub stock_in: i64, pub stock_out: i64 }

impl StockMovementDraft {
    /// Blank figures count as zero. Negative or fractional ones are rejected;
    /// an overdrawn ledger (out above in) is accepted.
    pub fn validate(&self) -> Result<StockMovement, FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, raw, label) in [("stockIn", &self.stock_in, "Stock in"), ("stockOut", &self.stock_out, "Stock out")] {
            let value = coerce_amount(raw);
            if value.is_sign_negative() && !value.is_zero() {
                errors.add(field, format!("{} cannot be negative", label));
            } else if !value.fract().is_zero() {
                errors.add(field, format!("{} must be a whole number", label));
            }
        }
        errors.into_result()?;
        Ok(StockMovement { stock_in: coerce_count(&self.stock_in), stock_out: coerce_count(&self.stock_out) })
    }
}
