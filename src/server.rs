//! Dashboard HTTP surface
//!
//! Every list route runs [`query::apply`] over the backend's collection, so
//! search, filters, sorting and paging behave the same on each screen.

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use crate::config::{Config, DataSource};
use crate::domain::aggregates::product::{FRAGRANCE_CATEGORIES, HOME_SCENT_CATEGORIES};
use crate::domain::validation::FieldErrors;
use crate::domain::value_objects::parse_date;
use crate::domain::aggregates::{
    render_printable, InvoiceDraft, InvoiceView, ProductDraft, ProductPatch, ProductView, StockMovementDraft, StockRecordView,
};
use crate::overview::{summarize_customers, CustomerSummary, InventoryOverview, InvoiceOverview};
use crate::query::{self, ListQuery, Page, SortDirection, SortKey};
use crate::repository::{AuthGateway, Credentials, FixtureBackend, HttpBackend, InvoiceRepository, ProductRepository, Session};
use crate::DashboardError;

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub auth: Arc<dyn AuthGateway>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn from_config(config: Config) -> crate::Result<Self> {
        match config.data_source {
            DataSource::Http => {
                let backend = HttpBackend::new(config.api_base_url.clone(), config.request_timeout)?;
                Ok(Self::with_backend(backend, config))
            }
            DataSource::Fixture => Ok(Self::with_backend(FixtureBackend::seeded(), config)),
        }
    }

    pub fn with_backend<B>(backend: B, config: Config) -> Self
    where
        B: ProductRepository + InvoiceRepository + AuthGateway + 'static,
    {
        let backend = Arc::new(backend);
        Self { products: backend.clone(), invoices: backend.clone(), auth: backend, config: Arc::new(config) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(product_categories))
        .route("/products/:id", get(get_product).patch(update_product).delete(delete_product))
        .route("/inventory/overview", get(inventory_overview))
        .route("/stock-records", get(list_stock_records))
        .route("/stock-records/:id", patch(record_stock))
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/overview", get(invoice_overview))
        .route("/invoices/:id", get(get_invoice).put(update_invoice))
        .route("/invoices/:id/print", get(print_invoice))
        .route("/customers", get(list_customers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Request plumbing
// =============================================================================

/// The caller's `Authorization: Bearer` token, forwarded to the backend.
#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        Ok(token.map(Session::bearer).unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    /// Inclusive range on the record's date (`lastUpdated`, `invoiceDate`).
    #[serde(alias = "startDate")]
    pub from: Option<String>,
    #[serde(alias = "endDate")]
    pub to: Option<String>,
    /// Preset range: the last `days` days up to today.
    pub days: Option<u32>,
    pub sort: Option<SortKey>,
    pub dir: Option<SortDirection>,
    pub page: Option<usize>,
    #[serde(alias = "per_page")]
    pub page_size: Option<usize>,
}

impl ListParams {
    pub fn into_query(self, default_page_size: usize, today: NaiveDate) -> Result<ListQuery, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut date = |field: &str, raw: Option<String>| match raw.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() { errors.add(field, "Date is invalid"); }
                parsed
            }
        };
        let mut from = date("from", self.from);
        let mut to = date("to", self.to);
        if let Some(days) = self.days {
            from = from.or_else(|| today.checked_sub_days(Days::new(u64::from(days))));
            to = to.or(Some(today));
        }
        if from.zip(to).is_some_and(|(f, t)| f > t) {
            errors.add("to", "End date cannot be before the start date");
        }
        errors.into_result()?;
        Ok(ListQuery {
            search: self.search,
            category: self.category,
            status: self.status,
            from,
            to,
            sort_key: self.sort.unwrap_or_default(),
            sort_dir: self.dir.unwrap_or_default(),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound(_) | Self::InvoiceNotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Backend { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::MissingToken | Self::Backend { .. } | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingToken => "MISSING_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            Self::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        ErrorResponse { code: self.error_code().to_string(), message: self.to_string(), details }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

type ApiResult<T> = Result<T, DashboardError>;

fn today() -> NaiveDate { Utc::now().date_naive() }

// =============================================================================
// Handlers
// =============================================================================

async fn health(State(s): State<AppState>) -> Json<serde_json::Value> {
    let source = match s.config.data_source { DataSource::Http => "http", DataSource::Fixture => "fixture" };
    Json(serde_json::json!({"status": "healthy", "service": "cof-dashboard", "dataSource": source}))
}

async fn login(State(s): State<AppState>, Json(credentials): Json<Credentials>) -> ApiResult<Json<Session>> {
    let credentials = credentials.normalized()?;
    let session = s.auth.login(&credentials).await?;
    info!(email = %credentials.email, "signed in");
    Ok(Json(session))
}

async fn list_products(State(s): State<AppState>, session: Session, Query(p): Query<ListParams>) -> ApiResult<Json<Page<ProductView>>> {
    let products = s.products.list(&session).await?;
    let views = products.into_iter().map(ProductView::from).collect();
    Ok(Json(query::apply(views, &p.into_query(s.config.default_page_size, today())?)))
}

async fn get_product(State(s): State<AppState>, session: Session, Path(id): Path<String>) -> ApiResult<Json<ProductView>> {
    Ok(Json(ProductView::from(s.products.get(&session, &id).await?)))
}

/// Category options for the product forms.
async fn product_categories() -> Json<serde_json::Value> {
    Json(serde_json::json!({"fragrance": FRAGRANCE_CATEGORIES, "homeScent": HOME_SCENT_CATEGORIES}))
}

async fn create_product(State(s): State<AppState>, session: Session, Json(draft): Json<ProductDraft>) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let product = draft.into_product(s.config.low_stock_threshold)?;
    let saved = s.products.create(&session, product).await?;
    info!(id = %saved.id, sku = %saved.sku, "product added");
    Ok((StatusCode::CREATED, Json(ProductView::from(saved))))
}

async fn update_product(State(s): State<AppState>, session: Session, Path(id): Path<String>, Json(patch): Json<ProductPatch>) -> ApiResult<Json<ProductView>> {
    let mut product = s.products.get(&session, &id).await?;
    patch.apply(&mut product)?;
    let saved = s.products.update(&session, &id, product).await?;
    info!(%id, "product updated");
    Ok(Json(ProductView::from(saved)))
}

async fn delete_product(State(s): State<AppState>, session: Session, Path(id): Path<String>) -> ApiResult<StatusCode> {
    s.products.delete(&session, &id).await?;
    info!(%id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn inventory_overview(State(s): State<AppState>, session: Session) -> ApiResult<Json<InventoryOverview>> {
    let products = s.products.list(&session).await?;
    Ok(Json(InventoryOverview::from_products(&products)))
}

async fn list_stock_records(State(s): State<AppState>, session: Session, Query(p): Query<ListParams>) -> ApiResult<Json<Page<StockRecordView>>> {
    let records = s.products.list_stock(&session).await?;
    let views = records.into_iter().map(StockRecordView::from).collect();
    Ok(Json(query::apply(views, &p.into_query(s.config.default_page_size, today())?)))
}

async fn record_stock(State(s): State<AppState>, session: Session, Path(id): Path<String>, Json(draft): Json<StockMovementDraft>) -> ApiResult<Json<StockRecordView>> {
    let movement = draft.validate()?;
    let record = s.products.record_stock(&session, &id, movement).await?;
    info!(%id, stock_in = record.stock_in, stock_out = record.stock_out, "stock recorded");
    Ok(Json(StockRecordView::from(record)))
}

async fn list_invoices(State(s): State<AppState>, session: Session, Query(p): Query<ListParams>) -> ApiResult<Json<Page<InvoiceView>>> {
    let today = today();
    let invoices = s.invoices.list(&session).await?;
    let views = invoices.into_iter().map(|i| InvoiceView::new(i, today)).collect();
    Ok(Json(query::apply(views, &p.into_query(s.config.default_page_size, today)?)))
}

async fn create_invoice(State(s): State<AppState>, session: Session, Json(draft): Json<InvoiceDraft>) -> ApiResult<(StatusCode, Json<InvoiceView>)> {
    let invoice = draft.into_invoice(Utc::now())?;
    let saved = s.invoices.create(&session, invoice).await?;
    info!(number = %saved.invoice_number, "invoice created");
    Ok((StatusCode::CREATED, Json(InvoiceView::new(saved, today()))))
}

async fn get_invoice(State(s): State<AppState>, session: Session, Path(id): Path<String>) -> ApiResult<Json<InvoiceView>> {
    let invoice = s.invoices.get(&session, &id).await?;
    Ok(Json(InvoiceView::new(invoice, today())))
}

/// Replaces an invoice from the edit form. Blank number and date keep the
/// stored ones; the result is flagged as edited.
async fn update_invoice(State(s): State<AppState>, session: Session, Path(id): Path<String>, Json(mut draft): Json<InvoiceDraft>) -> ApiResult<Json<InvoiceView>> {
    let existing = s.invoices.get(&session, &id).await?;
    if draft.invoice_number.trim().is_empty() { draft.invoice_number = existing.invoice_number; }
    if draft.invoice_date.trim().is_empty() {
        if let Some(date) = existing.invoice_date { draft.invoice_date = date.format("%Y-%m-%d").to_string(); }
    }
    let mut invoice = draft.into_invoice(Utc::now())?;
    invoice.id = id.clone();
    invoice.edited = true;
    let saved = s.invoices.update(&session, &id, invoice).await?;
    info!(%id, "invoice updated");
    Ok(Json(InvoiceView::new(saved, today())))
}

async fn print_invoice(State(s): State<AppState>, session: Session, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let invoice = s.invoices.get(&session, &id).await?;
    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], render_printable(&invoice, today())))
}

async fn invoice_overview(State(s): State<AppState>, session: Session) -> ApiResult<Json<InvoiceOverview>> {
    let invoices = s.invoices.list(&session).await?;
    Ok(Json(InvoiceOverview::from_invoices(&invoices, today())))
}

async fn list_customers(State(s): State<AppState>, session: Session, Query(p): Query<ListParams>) -> ApiResult<Json<Page<CustomerSummary>>> {
    let invoices = s.invoices.list(&session).await?;
    Ok(Json(query::apply(summarize_customers(&invoices), &p.into_query(s.config.default_page_size, today())?)))
}
