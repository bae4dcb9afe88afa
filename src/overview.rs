//! Dashboard statistics for the inventory and invoice overview screens

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use crate::domain::aggregates::{Invoice, InvoiceView, PaymentStatus, Product, ProductView, Standing, StockStatus};
use crate::domain::value_objects::{amount_serde, format_naira};
use crate::query::{Listable, SortKey, SortValue};

/// How many rows the overview "recent" and "restock" lists show.
pub const OVERVIEW_LIST_LEN: usize = 5;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOverview {
    pub total_products: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_units: u64,
    #[serde(with = "amount_serde")]
    pub inventory_value: Decimal,
    pub inventory_value_display: String,
    /// Low and out-of-stock products, emptiest first.
    pub needs_restock: Vec<ProductView>,
}

impl InventoryOverview {
    pub fn from_products(products: &[Product]) -> Self {
        let count = |status: StockStatus| products.iter().filter(|p| p.status() == status).count();
        let inventory_value = products.iter().map(Product::stock_value).fold(Decimal::ZERO, Decimal::saturating_add);
        let mut needs_restock: Vec<&Product> = products.iter().filter(|p| p.needs_restock()).collect();
        needs_restock.sort_by_key(|p| p.stock);
        Self {
            total_products: products.len(),
            in_stock: count(StockStatus::InStock),
            low_stock: count(StockStatus::LowStock),
            out_of_stock: count(StockStatus::OutOfStock),
            total_units: products.iter().map(|p| u64::from(p.stock)).sum(),
            inventory_value_display: format_naira(inventory_value),
            inventory_value,
            needs_restock: needs_restock.into_iter().take(OVERVIEW_LIST_LEN).cloned().map(ProductView::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOverview {
    pub total_invoices: usize,
    #[serde(with = "amount_serde")]
    pub total_revenue: Decimal,
    pub total_revenue_display: String,
    pub paid: usize,
    /// Every unpaid invoice, overdue ones included.
    pub pending: usize,
    pub overdue: usize,
    #[serde(with = "amount_serde")]
    pub outstanding: Decimal,
    pub outstanding_display: String,
    /// Latest invoices by invoice date.
    pub recent: Vec<InvoiceView>,
}

impl InvoiceOverview {
    pub fn from_invoices(invoices: &[Invoice], today: NaiveDate) -> Self {
        let total_revenue = invoices.iter().map(|i| i.totals().total).fold(Decimal::ZERO, Decimal::saturating_add);
        let outstanding = invoices.iter().map(Invoice::balance_due).fold(Decimal::ZERO, Decimal::saturating_add);
        let paid = invoices.iter().filter(|i| i.totals().status == PaymentStatus::Paid).count();
        let overdue = invoices.iter().filter(|i| i.standing(today) == Standing::Overdue).count();
        let mut recent: Vec<&Invoice> = invoices.iter().collect();
        recent.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));
        Self {
            total_invoices: invoices.len(),
            total_revenue_display: format_naira(total_revenue),
            total_revenue,
            paid,
            pending: invoices.len() - paid,
            overdue,
            outstanding_display: format_naira(outstanding),
            outstanding,
            recent: recent.into_iter().take(OVERVIEW_LIST_LEN).cloned().map(|i| InvoiceView::new(i, today)).collect(),
        }
    }
}

/// A customer as seen through their invoices.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub invoice_count: usize,
    #[serde(with = "amount_serde")]
    pub total_billed: Decimal,
    #[serde(with = "amount_serde")]
    pub total_paid: Decimal,
    #[serde(with = "amount_serde")]
    pub balance_due: Decimal,
    pub last_invoice_date: Option<NaiveDate>,
}

/// Groups invoices by customer e-mail (case-insensitive), or by name when the
/// e-mail is blank. Customers keep the order they first appear in.
pub fn summarize_customers(invoices: &[Invoice]) -> Vec<CustomerSummary> {
    let mut order: Vec<CustomerSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for invoice in invoices {
        let key = match invoice.customer_email.trim() {
            "" => format!("name:{}", invoice.customer_name.trim().to_lowercase()),
            email => format!("email:{}", email.to_lowercase()),
        };
        let slot = *index.entry(key).or_insert_with(|| {
            order.push(CustomerSummary {
                name: invoice.customer_name.trim().to_string(),
                email: invoice.customer_email.trim().to_string(),
                phone: invoice.customer_phone.trim().to_string(),
                invoice_count: 0,
                total_billed: Decimal::ZERO,
                total_paid: Decimal::ZERO,
                balance_due: Decimal::ZERO,
                last_invoice_date: None,
            });
            order.len() - 1
        });
        let summary = &mut order[slot];
        summary.invoice_count += 1;
        summary.total_billed = summary.total_billed.saturating_add(invoice.totals().total);
        summary.total_paid = summary.total_paid.saturating_add(invoice.amount_paid);
        summary.balance_due = summary.balance_due.saturating_add(invoice.balance_due());
        summary.last_invoice_date = summary.last_invoice_date.max(invoice.invoice_date);
        if summary.phone.is_empty() { summary.phone = invoice.customer_phone.trim().to_string(); }
    }
    order
}

impl Listable for CustomerSummary {
    fn haystacks(&self) -> Vec<&str> { vec![self.name.as_str(), self.email.as_str(), self.phone.as_str()] }
    fn matches_status(&self, status: &str) -> bool {
        match status {
            "paid" => self.balance_due.is_zero(),
            "credit" | "pending" => !self.balance_due.is_zero(),
            _ => false,
        }
    }
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::Name => Some(SortValue::text(&self.name)),
            SortKey::Total => Some(SortValue::number(self.total_billed)),
            SortKey::Date => self.last_invoice_date.map(SortValue::Date),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItem;

    fn product(name: &str, price: i64, stock: u32, min_stock: u32) -> Product {
        Product {
            id: name.to_lowercase(), name: name.into(), brand: String::new(), category: "Men".into(),
            price: Decimal::from(price), stock, min_stock, sku: String::new(), supplier: String::new(),
            description: String::new(), size: String::new(), updated_at: None,
        }
    }

    fn invoice(email: &str, date: (i32, u32, u32), due: Option<(i32, u32, u32)>, paid: i64) -> Invoice {
        Invoice {
            id: String::new(), invoice_number: format!("INV-{}{}", date.1, date.2), customer_name: "Ada Obi".into(),
            customer_email: email.into(), customer_phone: String::new(),
            invoice_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            items: vec![LineItem::new("Dior Sauvage", 2, Decimal::from(50000))],
            payment_method: "Cash".into(), amount_paid: Decimal::from(paid), edited: false,
        }
    }

    #[test]
    fn test_inventory_overview() {
        let products = vec![
            product("Chanel No. 5", 277500, 12, 8),
            product("Tom Ford Black Orchid", 247500, 3, 5),
            product("Creed Aventus", 667500, 0, 3),
        ];
        let o = InventoryOverview::from_products(&products);
        assert_eq!((o.total_products, o.in_stock, o.low_stock, o.out_of_stock), (3, 1, 1, 1));
        assert_eq!(o.total_units, 15);
        assert_eq!(o.inventory_value, Decimal::from(277500 * 12 + 247500 * 3));
        assert_eq!(o.inventory_value_display, "₦4,072,500");
        let restock: Vec<&str> = o.needs_restock.iter().map(|v| v.product.name.as_str()).collect();
        assert_eq!(restock, vec!["Creed Aventus", "Tom Ford Black Orchid"]);
    }

    #[test]
    fn test_invoice_overview() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let invoices = vec![
            invoice("ada@example.com", (2024, 1, 5), None, 100000),
            invoice("ada@example.com", (2024, 2, 5), Some((2024, 2, 20)), 40000),
            invoice("bola@example.com", (2024, 2, 25), Some((2024, 3, 10)), 0),
        ];
        let o = InvoiceOverview::from_invoices(&invoices, today);
        assert_eq!(o.total_revenue, Decimal::from(300000));
        assert_eq!((o.paid, o.pending, o.overdue), (1, 2, 1));
        assert_eq!(o.outstanding, Decimal::from(160000));
        assert_eq!(o.recent[0].invoice.invoice_number, "INV-225");
    }

    #[test]
    fn test_overviews_saturate_on_huge_amounts() {
        let products = vec![product("Oud Royale", 1, 2, 1), product("Amber", 1, 3, 1)];
        let huge: Vec<Product> = products.into_iter().map(|p| Product { price: Decimal::MAX, ..p }).collect();
        let o = InventoryOverview::from_products(&huge);
        assert_eq!(o.inventory_value, Decimal::MAX);

        let mut big = invoice("ada@example.com", (2024, 1, 5), None, 0);
        big.items = vec![LineItem::new("Oud", 3, Decimal::MAX)];
        big.amount_paid = Decimal::MIN;
        let invoices = vec![big.clone(), big];
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let o = InvoiceOverview::from_invoices(&invoices, today);
        assert_eq!(o.total_revenue, Decimal::MAX);
        assert_eq!(o.outstanding, Decimal::MAX);
        let customers = summarize_customers(&invoices);
        assert_eq!(customers[0].total_billed, Decimal::MAX);
        assert_eq!(customers[0].total_paid, Decimal::MIN);
    }

    #[test]
    fn test_customers_grouped_by_email() {
        let invoices = vec![
            invoice("ada@example.com", (2024, 1, 5), None, 100000),
            invoice("bola@example.com", (2024, 2, 25), None, 0),
            invoice("ADA@example.com", (2024, 2, 5), None, 40000),
        ];
        let customers = summarize_customers(&invoices);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].email, "ada@example.com");
        assert_eq!(customers[0].invoice_count, 2);
        assert_eq!(customers[0].total_billed, Decimal::from(200000));
        assert_eq!(customers[0].balance_due, Decimal::from(60000));
        assert_eq!(customers[0].last_invoice_date, NaiveDate::from_ymd_opt(2024, 2, 5));
    }
}
