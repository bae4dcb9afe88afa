//! Aggregates module
pub mod product;
pub mod stock_record;
pub mod invoice;

pub use product::{classify, Product, ProductDraft, ProductPatch, ProductView, StockStatus, DEFAULT_MIN_STOCK};
pub use stock_record::{StockMovement, StockMovementDraft, StockRecord, StockRecordView};
pub use invoice::{compute_totals, render_printable, Invoice, InvoiceDraft, InvoiceTotals, InvoiceView, LineItem, LineItemDraft, PaymentStatus, Standing};
