//! REST backend client

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use crate::domain::aggregates::{Invoice, Product, StockMovement, StockRecord};
use crate::repository::{AuthGateway, Credentials, InvoiceRepository, ProductRepository, Session};
use crate::{DashboardError, Result};

const PRODUCTS: &str = "api/products";
const INVOICES: &str = "invoices";
const LOGIN: &str = "api/auth/login";

/// Client for the shop's REST API. Cheap to clone: the connection pool is
/// shared.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') { base_url.push('/'); }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, %url, "backend request");
        let builder = self.client.request(method, url);
        match session.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, not_found: impl FnOnce() -> DashboardError) -> Result<T> {
        Ok(check(builder.send().await?, not_found).await?.json::<T>().await?)
    }
}

/// Maps a non-2xx response onto the error taxonomy, preferring the backend's
/// own `message` field.
async fn check(response: Response, not_found: impl FnOnce() -> DashboardError) -> Result<Response> {
    let status = response.status();
    if status.is_success() { return Ok(response); }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "backend call failed");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DashboardError::Unauthorized,
        StatusCode::NOT_FOUND => not_found(),
        _ => DashboardError::Backend { status: status.as_u16(), message: error_message(status, &body) },
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

/// A ledger row from a product payload; products that never recorded a
/// movement open with their stock as stock-in.
fn stock_record(value: Value) -> Result<StockRecord> {
    let has_ledger = value.get("stockIn").is_some() || value.get("stockOut").is_some();
    let product: Product = decode(value.clone())?;
    if !has_ledger { return Ok(StockRecord::opening(&product)); }
    let mut record: StockRecord = decode(value)?;
    if record.product_id.is_empty() { record.product_id = product.id; }
    Ok(record)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| DashboardError::Backend {
        status: StatusCode::BAD_GATEWAY.as_u16(),
        message: format!("unexpected response: {}", e),
    })
}

#[async_trait]
impl ProductRepository for HttpBackend {
    async fn list(&self, session: &Session) -> Result<Vec<Product>> {
        self.fetch(self.request(Method::GET, PRODUCTS, session), || DashboardError::ProductNotFound(String::new())).await
    }

    async fn get(&self, session: &Session, id: &str) -> Result<Product> {
        let path = format!("{}/{}", PRODUCTS, id);
        self.fetch(self.request(Method::GET, &path, session), || DashboardError::ProductNotFound(id.to_string())).await
    }

    async fn create(&self, session: &Session, product: Product) -> Result<Product> {
        let builder = self.request(Method::POST, PRODUCTS, session).json(&product);
        self.fetch(builder, || DashboardError::ProductNotFound(String::new())).await
    }

    async fn update(&self, session: &Session, id: &str, product: Product) -> Result<Product> {
        let path = format!("{}/{}", PRODUCTS, id);
        let builder = self.request(Method::PATCH, &path, session).json(&product);
        self.fetch(builder, || DashboardError::ProductNotFound(id.to_string())).await
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        let path = format!("{}/{}", PRODUCTS, id);
        let response = self.request(Method::DELETE, &path, session).send().await?;
        check(response, || DashboardError::ProductNotFound(id.to_string())).await?;
        Ok(())
    }

    async fn list_stock(&self, session: &Session) -> Result<Vec<StockRecord>> {
        let rows: Vec<Value> = self.fetch(self.request(Method::GET, PRODUCTS, session), || DashboardError::ProductNotFound(String::new())).await?;
        rows.into_iter().map(stock_record).collect()
    }

    async fn record_stock(&self, session: &Session, id: &str, movement: StockMovement) -> Result<StockRecord> {
        let path = format!("{}/{}", PRODUCTS, id);
        let body = json!({
            "stockIn": movement.stock_in,
            "stockOut": movement.stock_out,
            "currentStock": movement.stock_in - movement.stock_out,
            "lastUpdated": chrono::Utc::now(),
        });
        let builder = self.request(Method::PATCH, &path, session).json(&body);
        let value: Value = self.fetch(builder, || DashboardError::ProductNotFound(id.to_string())).await?;
        let mut record = match value {
            Value::Object(_) => stock_record(value)?,
            _ => decode::<StockRecord>(json!({}))?,
        };
        if record.product_id.is_empty() { record.product_id = id.to_string(); }
        record.apply(&movement);
        Ok(record)
    }
}

#[async_trait]
impl InvoiceRepository for HttpBackend {
    async fn list(&self, session: &Session) -> Result<Vec<Invoice>> {
        self.fetch(self.request(Method::GET, INVOICES, session), || DashboardError::InvoiceNotFound(String::new())).await
    }

    async fn get(&self, session: &Session, id: &str) -> Result<Invoice> {
        let path = format!("{}/{}", INVOICES, id);
        self.fetch(self.request(Method::GET, &path, session), || DashboardError::InvoiceNotFound(id.to_string())).await
    }

    async fn create(&self, session: &Session, invoice: Invoice) -> Result<Invoice> {
        let builder = self.request(Method::POST, INVOICES, session).json(&invoice.payload());
        let mut saved: Invoice = self.fetch(builder, || DashboardError::InvoiceNotFound(String::new())).await?;
        if saved.invoice_number.is_empty() { saved.invoice_number = invoice.invoice_number; }
        Ok(saved)
    }

    async fn update(&self, session: &Session, id: &str, invoice: Invoice) -> Result<Invoice> {
        let path = format!("{}/{}", INVOICES, id);
        let builder = self.request(Method::PUT, &path, session).json(&invoice.payload());
        let mut saved: Invoice = self.fetch(builder, || DashboardError::InvoiceNotFound(id.to_string())).await?;
        if saved.id.is_empty() { saved.id = id.to_string(); }
        Ok(saved)
    }
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

#[async_trait]
impl AuthGateway for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let builder = self.request(Method::POST, LOGIN, &Session::anonymous()).json(credentials);
        let response: LoginResponse = self.fetch(builder, || DashboardError::Unauthorized).await?;
        match response.token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(Session { token: Some(token), user: response.user }),
            None => {
                warn!("login response carried no token");
                Err(DashboardError::MissingToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_backend_text() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message": "SKU already exists"}"#), "SKU already exists");
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"), "Internal Server Error");
    }

    #[test]
    fn test_stock_record_falls_back_to_opening() {
        let r = stock_record(json!({"id": "4", "name": "Creed Aventus", "stock": 7, "minStock": 3})).unwrap();
        assert_eq!((r.product_id.as_str(), r.stock_in, r.stock_out), ("4", 7, 0));
        let r = stock_record(json!({"_id": "5", "name": "Versace Eros", "stockIn": 20, "stockOut": 2})).unwrap();
        assert_eq!((r.product_id.as_str(), r.current_stock()), ("5", 18));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000/");
    }
}
