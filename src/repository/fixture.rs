//! In-memory backend seeded with the sample fragrance catalogue
//!
//! Used by the test suite and by `DATA_SOURCE=fixture` for demos without the
//! REST backend. Writes are last-write-wins.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;
use crate::domain::aggregates::{Invoice, LineItem, Product, StockMovement, StockRecord};
use crate::repository::{AuthGateway, Credentials, InvoiceRepository, ProductRepository, Session};
use crate::{DashboardError, Result};

#[derive(Default)]
struct Store {
    /// Kept in insertion order so listings are stable.
    products: Vec<Product>,
    ledger: HashMap<String, StockRecord>,
    invoices: Vec<Invoice>,
}

#[derive(Clone, Default)]
pub struct FixtureBackend {
    store: Arc<RwLock<Store>>,
}

fn lock_error<E: std::fmt::Display>(e: E) -> DashboardError {
    DashboardError::Storage(format!("Failed to acquire lock: {}", e))
}

impl FixtureBackend {
    /// An empty backend.
    pub fn new() -> Self { Self::default() }

    /// The sample catalogue plus two invoices.
    pub fn seeded() -> Self {
        let store = Store { products: sample_products(), ledger: HashMap::new(), invoices: sample_invoices() };
        Self { store: Arc::new(RwLock::new(store)) }
    }

    pub fn with_data(products: Vec<Product>, invoices: Vec<Invoice>) -> Self {
        Self { store: Arc::new(RwLock::new(Store { products, ledger: HashMap::new(), invoices })) }
    }
}

#[async_trait]
impl ProductRepository for FixtureBackend {
    async fn list(&self, _session: &Session) -> Result<Vec<Product>> {
        let store = self.store.read().map_err(lock_error)?;
        Ok(store.products.clone())
    }

    async fn get(&self, _session: &Session, id: &str) -> Result<Product> {
        let store = self.store.read().map_err(lock_error)?;
        store.products.iter().find(|p| p.id == id).cloned().ok_or_else(|| DashboardError::ProductNotFound(id.to_string()))
    }

    async fn create(&self, _session: &Session, mut product: Product) -> Result<Product> {
        let mut store = self.store.write().map_err(lock_error)?;
        product.id = Uuid::now_v7().to_string();
        product.touch();
        store.products.push(product.clone());
        info!(id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    async fn update(&self, _session: &Session, id: &str, mut product: Product) -> Result<Product> {
        let mut store = self.store.write().map_err(lock_error)?;
        let slot = store.products.iter_mut().find(|p| p.id == id).ok_or_else(|| DashboardError::ProductNotFound(id.to_string()))?;
        product.id = id.to_string();
        *slot = product.clone();
        Ok(product)
    }

    async fn delete(&self, _session: &Session, id: &str) -> Result<()> {
        let mut store = self.store.write().map_err(lock_error)?;
        let before = store.products.len();
        store.products.retain(|p| p.id != id);
        if store.products.len() == before { return Err(DashboardError::ProductNotFound(id.to_string())); }
        store.ledger.remove(id);
        Ok(())
    }

    async fn list_stock(&self, _session: &Session) -> Result<Vec<StockRecord>> {
        let store = self.store.read().map_err(lock_error)?;
        Ok(store
            .products
            .iter()
            .map(|p| match store.ledger.get(&p.id) {
                Some(record) => StockRecord { name: p.name.clone(), sku: p.sku.clone(), category: p.category.clone(), min_stock: p.min_stock, ..record.clone() },
                None => StockRecord::opening(p),
            })
            .collect())
    }

    async fn record_stock(&self, _session: &Session, id: &str, movement: StockMovement) -> Result<StockRecord> {
        let mut store = self.store.write().map_err(lock_error)?;
        let Store { products, ledger, .. } = &mut *store;
        let product = products.iter_mut().find(|p| p.id == id).ok_or_else(|| DashboardError::ProductNotFound(id.to_string()))?;
        let record = ledger.entry(id.to_string()).or_insert_with(|| StockRecord::opening(product));
        record.apply(&movement);
        if record.is_overdrawn() {
            warn!(id, current = record.current_stock(), "stock out exceeds stock in");
        }
        product.stock = u32::try_from(record.current_stock().max(0)).unwrap_or(u32::MAX);
        product.updated_at = record.last_updated;
        Ok(record.clone())
    }
}

#[async_trait]
impl InvoiceRepository for FixtureBackend {
    async fn list(&self, _session: &Session) -> Result<Vec<Invoice>> {
        let store = self.store.read().map_err(lock_error)?;
        Ok(store.invoices.clone())
    }

    async fn get(&self, _session: &Session, id: &str) -> Result<Invoice> {
        let store = self.store.read().map_err(lock_error)?;
        store.invoices.iter().find(|i| i.id == id).cloned().ok_or_else(|| DashboardError::InvoiceNotFound(id.to_string()))
    }

    async fn create(&self, _session: &Session, mut invoice: Invoice) -> Result<Invoice> {
        let mut store = self.store.write().map_err(lock_error)?;
        invoice.id = Uuid::now_v7().to_string();
        store.invoices.push(invoice.clone());
        info!(id = %invoice.id, number = %invoice.invoice_number, "invoice created");
        Ok(invoice)
    }

    async fn update(&self, _session: &Session, id: &str, mut invoice: Invoice) -> Result<Invoice> {
        let mut store = self.store.write().map_err(lock_error)?;
        let slot = store.invoices.iter_mut().find(|i| i.id == id).ok_or_else(|| DashboardError::InvoiceNotFound(id.to_string()))?;
        invoice.id = id.to_string();
        *slot = invoice.clone();
        Ok(invoice)
    }
}

#[async_trait]
impl AuthGateway for FixtureBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        Ok(Session {
            token: Some(format!("fixture-{}", Uuid::new_v4())),
            user: Some(serde_json::json!({ "email": credentials.email })),
        })
    }
}

fn sample_products() -> Vec<Product> {
    let rows: [(&str, &str, &str, &str, &str, i64, u32, u32, &str); 10] = [
        ("Chanel No. 5 Eau de Parfum", "CHN-NO5-100ML", "Women", "Chanel", "Chanel", 75850, 12, 8, "100ml"),
        ("Tom Ford Black Orchid", "TF-BO-50ML", "Unisex", "Tom Ford", "Tom Ford Beauty", 67650, 3, 5, "50ml"),
        ("Dior Sauvage Eau de Toilette", "DR-SAV-100ML", "Men", "Dior", "Dior", 49200, 25, 15, "100ml"),
        ("Creed Aventus", "CRD-AVT-120ML", "Men", "Creed", "Creed", 182450, 0, 3, "120ml"),
        ("Yves Saint Laurent Black Opium", "YSL-BO-90ML", "Women", "YSL", "YSL Beauty", 55350, 8, 10, "90ml"),
        ("Versace Eros", "VER-ERS-100ML", "Men", "Versace", "Versace", 34850, 18, 12, "100ml"),
        ("Maison Margiela REPLICA Jazz Club", "MM-JC-100ML", "Unisex", "Maison Margiela", "Maison Margiela", 58220, 2, 6, "100ml"),
        ("Dolce & Gabbana Light Blue", "DG-LB-100ML", "Women", "D&G", "D&G", 40180, 15, 10, "100ml"),
        ("Viktor & Rolf Flowerbomb", "VR-FB-100ML", "Women", "Viktor & Rolf", "Viktor & Rolf", 63550, 6, 8, "100ml"),
        ("Le Labo Santal 33", "LL-S33-50ML", "Unisex", "Le Labo", "Le Labo", 81180, 4, 5, "50ml"),
    ];
    let now = Utc::now();
    rows.into_iter()
        .enumerate()
        .map(|(i, (name, sku, category, brand, supplier, price, stock, min_stock, size))| Product {
            id: (i + 1).to_string(),
            name: name.into(),
            brand: brand.into(),
            category: category.into(),
            price: Decimal::from(price),
            stock,
            min_stock,
            sku: sku.into(),
            supplier: supplier.into(),
            description: String::new(),
            size: size.into(),
            updated_at: Some(now),
        })
        .collect()
}

fn sample_invoices() -> Vec<Invoice> {
    vec![
        Invoice {
            id: "inv-1".into(),
            invoice_number: "INV-1704448800000".into(),
            customer_name: "Adaeze Okafor".into(),
            customer_email: "adaeze@example.com".into(),
            customer_phone: "08031234567".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 20),
            items: vec![
                LineItem::new("Dior Sauvage Eau de Toilette", 2, Decimal::from(49200)),
                LineItem::new("Versace Eros", 1, Decimal::from(34850)),
            ],
            payment_method: "Transfer".into(),
            amount_paid: Decimal::from(133250),
            edited: false,
        },
        Invoice {
            id: "inv-2".into(),
            invoice_number: "INV-1706781600000".into(),
            customer_name: "Tunde Bakare".into(),
            customer_email: "tunde@example.com".into(),
            customer_phone: String::new(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 15),
            items: vec![LineItem::new("Creed Aventus", 1, Decimal::from(182450))],
            payment_method: "Cash".into(),
            amount_paid: Decimal::from(100000),
            edited: false,
        },
    ]
}
