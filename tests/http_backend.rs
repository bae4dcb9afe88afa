//! HttpBackend against an in-process mock of the REST backend

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use cof_dashboard::domain::aggregates::{Invoice, LineItem, StockMovement};
use cof_dashboard::repository::{AuthGateway, Credentials, HttpBackend, InvoiceRepository, ProductRepository, Session};
use cof_dashboard::DashboardError;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

fn bearer(headers: &HeaderMap) -> String {
    headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string()
}

async fn spawn_backend(seen: Seen) -> HttpBackend {
    let products_seen = seen.clone();
    let patch_seen = seen.clone();
    let invoice_seen = seen.clone();
    let app = Router::new()
        .route("/api/products", get(move |headers: HeaderMap| {
            let seen = products_seen.clone();
            async move {
                seen.auth.lock().unwrap().push(bearer(&headers));
                Json(json!([
                    {"_id": "a1", "id": "a1", "name": "Chanel No. 5", "category": "Women", "price": "277500", "stock": 12, "minStock": 8},
                    {"_id": "a2", "name": "Creed Aventus", "category": "Men", "price": 667500, "stock": 0, "stockIn": 4, "stockOut": 4}
                ]))
            }
        }))
        .route("/api/products/:id", patch(move |Path(id): Path<String>, Json(body): Json<Value>| {
            let seen = patch_seen.clone();
            async move {
                seen.bodies.lock().unwrap().push(body.clone());
                if id == "missing" {
                    return Err((StatusCode::NOT_FOUND, Json(json!({"message": "Product not found"}))));
                }
                Ok(Json(json!({"_id": id, "name": "Creed Aventus", "category": "Men", "stockIn": body["stockIn"], "stockOut": body["stockOut"]})))
            }
        }))
        .route("/invoices", get(|| async { Json(json!([
            {"_id": "i1", "invoiceNumber": "INV-1", "customerName": "Ada", "amountPaid": "0", "totalAmount": 5,
             "items": [{"description": "Oud", "quantity": "2", "price": 1000}]}
        ])) }).post(move |Json(body): Json<Value>| {
            let seen = invoice_seen.clone();
            async move {
                seen.bodies.lock().unwrap().push(body.clone());
                let mut saved = body;
                saved["_id"] = json!("i2");
                (StatusCode::CREATED, Json(saved))
            }
        }))
        .route("/invoices/:id", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "database offline"}))) }))
        .route("/api/auth/login", post(|Json(body): Json<Value>| async move {
            match body["password"].as_str() {
                Some("right") => (StatusCode::OK, Json(json!({"token": "tok-123", "user": {"email": body["email"]}}))),
                Some("tokenless") => (StatusCode::OK, Json(json!({"user": {}}))),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"}))),
            }
        }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    HttpBackend::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_products_sends_bearer() {
    let seen = Seen::default();
    let backend = spawn_backend(seen.clone()).await;
    let products = ProductRepository::list(&backend, &Session::bearer("tok-123")).await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, "a1");
    assert_eq!(products[0].price, Decimal::from(277500));
    assert_eq!(seen.auth.lock().unwrap()[0], "Bearer tok-123");

    ProductRepository::list(&backend, &Session::anonymous()).await.unwrap();
    assert_eq!(seen.auth.lock().unwrap()[1], "");
}

#[tokio::test]
async fn test_stock_ledger_and_movement() {
    let seen = Seen::default();
    let backend = spawn_backend(seen.clone()).await;
    let session = Session::anonymous();
    let ledger = backend.list_stock(&session).await.unwrap();
    assert_eq!((ledger[0].stock_in, ledger[0].stock_out), (12, 0));
    assert_eq!((ledger[1].stock_in, ledger[1].stock_out), (4, 4));

    let record = backend.record_stock(&session, "a2", StockMovement { stock_in: 10, stock_out: 3 }).await.unwrap();
    assert_eq!(record.product_id, "a2");
    assert_eq!(record.current_stock(), 7);
    let body = seen.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["currentStock"], 7);

    let err = backend.record_stock(&session, "missing", StockMovement { stock_in: 1, stock_out: 0 }).await.unwrap_err();
    assert!(matches!(err, DashboardError::ProductNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn test_invoices_recompute_totals() {
    let seen = Seen::default();
    let backend = spawn_backend(seen.clone()).await;
    let session = Session::anonymous();
    let invoices = InvoiceRepository::list(&backend, &session).await.unwrap();
    assert_eq!(invoices[0].totals().total, Decimal::from(2000));

    let invoice = Invoice {
        id: "temp".into(), invoice_number: "INV-42".into(), customer_name: "Ada".into(),
        customer_email: "ada@example.com".into(), customer_phone: String::new(), invoice_date: None, due_date: None,
        items: vec![LineItem::new("Oud", 3, Decimal::from(1500))], payment_method: "Cash".into(),
        amount_paid: Decimal::from(4500), edited: false,
    };
    let saved = InvoiceRepository::create(&backend, &session, invoice).await.unwrap();
    assert_eq!(saved.id, "i2");
    let body = seen.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["totalAmount"], 4500);
    assert_eq!(body["status"], "Paid");
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_backend_error_message_is_kept() {
    let backend = spawn_backend(Seen::default()).await;
    let err = InvoiceRepository::get(&backend, &Session::anonymous(), "i1").await.unwrap_err();
    match err {
        DashboardError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_outcomes() {
    let backend = spawn_backend(Seen::default()).await;
    let credentials = |password: &str| Credentials { email: "ada@example.com".into(), password: password.into() };

    let session = backend.login(&credentials("right")).await.unwrap();
    assert_eq!(session.token.as_deref(), Some("tok-123"));
    assert_eq!(session.user.unwrap()["email"], "ada@example.com");

    assert!(matches!(backend.login(&credentials("tokenless")).await, Err(DashboardError::MissingToken)));
    assert!(matches!(backend.login(&credentials("wrong")).await, Err(DashboardError::Unauthorized)));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let err = ProductRepository::list(&backend, &Session::anonymous()).await.unwrap_err();
    assert!(matches!(err, DashboardError::Network(_)));
}
