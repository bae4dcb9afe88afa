//! Data access for products, stock records, invoices and login
//!
//! Every call takes the caller's [`Session`] explicitly; nothing reads a
//! token from global state. Two backends implement the traits:
//! [`HttpBackend`] talks to the shop's REST API and [`FixtureBackend`] keeps a
//! seeded catalogue in memory.

pub mod fixture;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::aggregates::{Invoice, Product, StockMovement, StockRecord};
use crate::domain::validation::{not_blank, FieldErrors};
use crate::Result;

pub use fixture::FixtureBackend;
pub use http::HttpBackend;

/// Who is calling: the bearer token the backend issued plus the user record
/// it returned alongside.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

impl Session {
    pub fn anonymous() -> Self { Self::default() }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), user: None }
    }

    pub fn is_authenticated(&self) -> bool { self.token.as_deref().is_some_and(|t| !t.is_empty()) }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct Credentials {
    #[validate(custom(function = "not_blank", message = "Please enter both email and password."))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "Please enter both email and password."))]
    pub password: String,
}

impl Credentials {
    /// Checks both fields are filled in and lowercases the e-mail.
    pub fn normalized(self) -> std::result::Result<Self, FieldErrors> {
        if let Err(e) = self.validate() {
            let mut errors = FieldErrors::new();
            errors.absorb("", &e);
            return Err(errors);
        }
        Ok(Self { email: self.email.trim().to_lowercase(), password: self.password })
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<Product>>;
    async fn get(&self, session: &Session, id: &str) -> Result<Product>;
    async fn create(&self, session: &Session, product: Product) -> Result<Product>;
    async fn update(&self, session: &Session, id: &str, product: Product) -> Result<Product>;
    async fn delete(&self, session: &Session, id: &str) -> Result<()>;
    /// Stock ledger rows, one per product.
    async fn list_stock(&self, session: &Session) -> Result<Vec<StockRecord>>;
    async fn record_stock(&self, session: &Session, id: &str, movement: StockMovement) -> Result<StockRecord>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<Invoice>>;
    async fn get(&self, session: &Session, id: &str) -> Result<Invoice>;
    async fn create(&self, session: &Session, invoice: Invoice) -> Result<Invoice>;
    async fn update(&self, session: &Session, id: &str, invoice: Invoice) -> Result<Invoice>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges credentials for a session. A response without a token is an
    /// error, never an anonymous session.
    async fn login(&self, credentials: &Credentials) -> Result<Session>;
}
