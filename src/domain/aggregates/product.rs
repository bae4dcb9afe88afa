//! Product Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use validator::Validate;
use crate::query::{Listable, SortKey, SortValue};
use crate::domain::validation::{not_blank, FieldErrors};
use crate::domain::value_objects::{amount_serde, coerce_amount, coerce_count, count_serde, exceeds_max_amount, format_naira, id_serde, raw_serde, Sku, SkuError};

/// Threshold used when a record carries no minimum stock of its own.
pub const DEFAULT_MIN_STOCK: u32 = 5;

/// Category options offered by the fragrance catalogue forms.
pub const FRAGRANCE_CATEGORIES: [&str; 3] = ["Men", "Women", "Unisex"];
/// Category options offered by the home-scent catalogue forms.
pub const HOME_SCENT_CATEGORIES: [&str; 7] = ["Perfumes", "Essential Oils", "Diffusers", "Candles", "Gift Sets", "Sprays", "Accessories"];

/// A catalogue product. Backend records may carry `id`, `_id` or both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "id_serde::deserialize", skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, with = "amount_serde")]
    pub price: Decimal,
    #[serde(default, with = "count_serde")]
    pub stock: u32,
    #[serde(default = "default_min_stock", with = "count_serde")]
    pub min_stock: u32,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_min_stock() -> u32 { DEFAULT_MIN_STOCK }

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Product::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Product {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        id_serde::merge_keys(&mut value, "id", &["_id"]);
        Product::deserialize(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus { OutOfStock, LowStock, InStock }

impl StockStatus {
    pub const ALL: [StockStatus; 3] = [StockStatus::InStock, StockStatus::LowStock, StockStatus::OutOfStock];

    pub fn key(&self) -> &'static str {
        match self { Self::OutOfStock => "out-of-stock", Self::LowStock => "low-stock", Self::InStock => "in-stock" }
    }

    pub fn label(&self) -> &'static str {
        match self { Self::OutOfStock => "Out of Stock", Self::LowStock => "Low Stock", Self::InStock => "In Stock" }
    }

    /// Accepts wire keys (`low-stock`) and display labels (`Low Stock`).
    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_lowercase().replace([' ', '_'], "-");
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// Stock status from a stock level and its minimum threshold.
pub fn classify(stock: u32, min_stock: u32) -> StockStatus {
    if stock == 0 {
        StockStatus::OutOfStock
    } else if stock <= min_stock {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

impl Product {
    pub fn status(&self) -> StockStatus { classify(self.stock, self.min_stock) }
    pub fn needs_restock(&self) -> bool { self.status() != StockStatus::InStock }
    /// Price times units on hand, pinned at `Decimal::MAX` rather than overflowing.
    pub fn stock_value(&self) -> Decimal { self.price.saturating_mul(Decimal::from(self.stock)) }
    pub fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}

/// Product as shown in list views: the record plus its derived fields.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub status: StockStatus,
    pub status_label: &'static str,
    pub price_display: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let status = product.status();
        Self { price_display: format_naira(product.price), status_label: status.label(), status, product }
    }
}

impl Listable for ProductView {
    fn haystacks(&self) -> Vec<&str> {
        let p = &self.product;
        vec![p.name.as_str(), p.sku.as_str(), p.id.as_str(), p.brand.as_str(), p.supplier.as_str()]
    }
    fn category(&self) -> Option<&str> { Some(self.product.category.as_str()) }
    fn matches_status(&self, status: &str) -> bool { StockStatus::parse(status) == Some(self.status) }
    fn date(&self) -> Option<NaiveDate> { self.product.updated_at.map(|t| t.date_naive()) }
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        let p = &self.product;
        match key {
            SortKey::Name => Some(SortValue::text(&p.name)),
            SortKey::Sku => Some(SortValue::text(&p.sku)),
            SortKey::Category => Some(SortValue::text(&p.category)),
            SortKey::Price => Some(SortValue::number(p.price)),
            SortKey::Stock => Some(SortValue::number(p.stock)),
            SortKey::Total => Some(SortValue::number(p.stock_value())),
            SortKey::Date => p.updated_at.map(|t| SortValue::Date(t.date_naive())),
            SortKey::InvoiceNumber => None,
        }
    }
}

/// The add-product form, held as raw input until validated.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
    #[validate(custom(function = "not_blank", message = "Product name is required"))]
    pub name: String,
    pub brand: String,
    #[validate(custom(function = "not_blank", message = "Category is required"))]
    pub category: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub price: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub stock: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub min_stock: String,
    #[validate(custom(function = "not_blank", message = "SKU is required"))]
    pub sku: String,
    pub supplier: String,
    pub description: String,
    pub size: String,
}

impl ProductDraft {
    pub fn validate_fields(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = self.validate() { errors.absorb("", &e); }
        if matches!(Sku::new(&self.sku), Err(SkuError::TooLong)) {
            errors.add("sku", format!("SKU must be at most {} characters", Sku::MAX_LEN));
        }
        check_price(&mut errors, "price", &self.price, true);
        check_count(&mut errors, "stock", &self.stock, "Stock");
        check_count(&mut errors, "minStock", &self.min_stock, "Minimum stock");
        errors.into_result()
    }

    /// Validates and builds the product; the backend assigns the id.
    pub fn into_product(self, default_min_stock: u32) -> Result<Product, FieldErrors> {
        self.validate_fields()?;
        let min_stock = if self.min_stock.trim().is_empty() { default_min_stock } else { whole(&self.min_stock) };
        let sku = Sku::new(&self.sku).map(String::from).unwrap_or_default();
        Ok(Product {
            id: String::new(),
            name: self.name.trim().to_string(),
            brand: self.brand.trim().to_string(),
            category: self.category.trim().to_string(),
            price: coerce_amount(&self.price),
            stock: whole(&self.stock),
            min_stock,
            sku,
            supplier: self.supplier.trim().to_string(),
            description: self.description.trim().to_string(),
            size: self.size.trim().to_string(),
            updated_at: Some(Utc::now()),
        })
    }
}

/// The edit-product form; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "raw_serde::deserialize_option")]
    pub price: Option<String>,
    #[serde(deserialize_with = "raw_serde::deserialize_option")]
    pub stock: Option<String>,
    #[serde(deserialize_with = "raw_serde::deserialize_option")]
    pub min_stock: Option<String>,
    pub sku: Option<String>,
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
}

impl ProductPatch {
    pub fn validate_fields(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, value, message) in [
            ("name", &self.name, "Product name is required"),
            ("category", &self.category, "Category is required"),
            ("sku", &self.sku, "SKU is required"),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) { errors.add(field, message); }
        }
        if let Some(price) = &self.price { check_price(&mut errors, "price", price, true); }
        if let Some(stock) = &self.stock { check_count(&mut errors, "stock", stock, "Stock"); }
        if let Some(min) = &self.min_stock { check_count(&mut errors, "minStock", min, "Minimum stock"); }
        errors.into_result()
    }

    /// Applies the edit; status follows from the new stock figures.
    pub fn apply(self, product: &mut Product) -> Result<(), FieldErrors> {
        self.validate_fields()?;
        if let Some(v) = self.name { product.name = v.trim().to_string(); }
        if let Some(v) = self.brand { product.brand = v.trim().to_string(); }
        if let Some(v) = self.category { product.category = v.trim().to_string(); }
        if let Some(v) = self.price { product.price = coerce_amount(&v); }
        if let Some(v) = self.stock { product.stock = whole(&v); }
        if let Some(v) = self.min_stock { product.min_stock = whole(&v); }
        if let Some(v) = self.sku { product.sku = Sku::new(v).map(String::from).unwrap_or_default(); }
        if let Some(v) = self.supplier { product.supplier = v.trim().to_string(); }
        if let Some(v) = self.description { product.description = v.trim().to_string(); }
        if let Some(v) = self.size { product.size = v.trim().to_string(); }
        product.touch();
        Ok(())
    }
}

pub(crate) fn check_price(errors: &mut FieldErrors, field: &str, raw: &str, required: bool) {
    if raw.trim().is_empty() {
        if required { errors.add(field, "Price is required"); }
    } else if coerce_amount(raw).is_sign_negative() {
        errors.add(field, "Price cannot be negative");
    } else if exceeds_max_amount(coerce_amount(raw)) {
        errors.add(field, "Price is too large");
    }
}

fn check_count(errors: &mut FieldErrors, field: &str, raw: &str, label: &str) {
    let value = coerce_amount(raw);
    if value.is_sign_negative() && !value.is_zero() {
        errors.add(field, format!("{} cannot be negative", label));
    } else if !value.fract().is_zero() {
        errors.add(field, format!("{} must be a whole number", label));
    } else if u32::try_from(coerce_count(raw)).is_err() {
        errors.add(field, format!("{} is too large", label));
    }
}

fn whole(raw: &str) -> u32 {
    u32::try_from(coerce_count(raw)).unwrap_or(0)
}
