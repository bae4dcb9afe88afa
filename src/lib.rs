//! COF Dashboard
//!
//! Inventory and invoicing dashboard for a fragrance retailer, served in front
//! of the shop's REST backend.
//!
//! ## Features
//! - Product catalogue with stock status classification
//! - Stock ledger (stock in / stock out) per product
//! - Invoices with computed totals and payment status
//! - Search, filter, date range, sort and pagination over every list
//! - Naira formatting for display
//! - HTTP or in-memory fixture data source

pub mod config;
pub mod domain;
pub mod overview;
pub mod query;
pub mod repository;
pub mod server;

use domain::validation::FieldErrors;
use thiserror::Error;

pub use config::{Config, DataSource};
pub use domain::value_objects::format_naira;
pub use query::{ListQuery, Page, SortDirection, SortKey};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("No token received from the server")]
    MissingToken,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<FieldErrors> for DashboardError {
    fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
