//! Invoice Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::Write;
use uuid::Uuid;
use validator::Validate;
use crate::domain::validation::{not_blank, FieldErrors};
use crate::query::{Listable, SortKey, SortValue};
use crate::domain::value_objects::{amount_serde, coerce_amount, coerce_count, count_serde, date_serde, exceeds_max_amount, format_naira, id_serde, parse_date, raw_serde};

/// An invoice as the backend stores it. Totals are not fields: they are
/// recomputed from the items whenever they are needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default, deserialize_with = "id_serde::deserialize", skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default, deserialize_with = "date_serde::deserialize")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "date_serde::deserialize", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default, with = "amount_serde")]
    pub amount_paid: Decimal,
    #[serde(default)]
    pub edited: bool,
}

impl Serialize for Invoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Invoice::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Invoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        id_serde::merge_keys(&mut value, "id", &["_id"]);
        Invoice::deserialize(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "count_serde")]
    pub quantity: u32,
    #[serde(default, with = "amount_serde")]
    pub price: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self { description: description.into(), quantity, price }
    }
    /// Quantity times price, pinned at `Decimal::MAX` rather than overflowing.
    pub fn line_total(&self) -> Decimal { Decimal::from(self.quantity).saturating_mul(self.price) }
    pub fn checked_line_total(&self) -> Option<Decimal> { Decimal::from(self.quantity).checked_mul(self.price) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus { Paid, Credit }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str { match self { Self::Paid => "Paid", Self::Credit => "Credit" } }
}

/// Where an invoice stands on a given day: settled, awaiting payment, or
/// unpaid past its due date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standing { Paid, Pending, Overdue }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    #[serde(with = "amount_serde")]
    pub subtotal: Decimal,
    #[serde(rename = "totalAmount", with = "amount_serde")]
    pub total: Decimal,
    pub status: PaymentStatus,
}

/// Subtotal and total are Σ quantity × price (no tax or discount); paid once
/// the amount paid covers the total. Sums saturate at `Decimal::MAX`.
pub fn compute_totals(items: &[LineItem], amount_paid: Decimal) -> InvoiceTotals {
    let subtotal = items.iter().map(LineItem::line_total).fold(Decimal::ZERO, Decimal::saturating_add);
    let total = subtotal;
    let status = if amount_paid >= total { PaymentStatus::Paid } else { PaymentStatus::Credit };
    InvoiceTotals { subtotal, total, status }
}

/// Client-side invoice number: `INV-<unix millis>`.
pub fn invoice_number_at(now: DateTime<Utc>) -> String {
    format!("INV-{}", now.timestamp_millis())
}

impl Invoice {
    pub fn totals(&self) -> InvoiceTotals { compute_totals(&self.items, self.amount_paid) }

    /// Outstanding amount; overpayment does not go negative.
    pub fn balance_due(&self) -> Decimal { self.totals().total.saturating_sub(self.amount_paid).max(Decimal::ZERO) }

    pub fn standing(&self, today: NaiveDate) -> Standing {
        match (self.totals().status, self.due_date) {
            (PaymentStatus::Paid, _) => Standing::Paid,
            (PaymentStatus::Credit, Some(due)) if due < today => Standing::Overdue,
            (PaymentStatus::Credit, _) => Standing::Pending,
        }
    }

    /// Body sent to the backend: the invoice plus its freshly computed totals.
    pub fn payload(&self) -> InvoicePayload<'_> {
        InvoicePayload { invoice: self, totals: self.totals() }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoicePayload<'a> {
    #[serde(flatten)]
    pub invoice: &'a Invoice,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
}

/// Invoice as returned to dashboard clients.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    pub id: String,
    #[serde(flatten)]
    pub invoice: Invoice,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
    #[serde(with = "amount_serde")]
    pub balance_due: Decimal,
    pub standing: Standing,
    pub total_display: String,
    pub balance_display: String,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        let totals = invoice.totals();
        let balance_due = invoice.balance_due();
        Self {
            id: invoice.id.clone(),
            standing: invoice.standing(today),
            total_display: format_naira(totals.total),
            balance_display: format_naira(balance_due),
            totals,
            balance_due,
            invoice,
        }
    }
}

/// Invoices filter on payment method as their category; the status filter
/// accepts a payment status (`paid`, `credit`) or a standing (`pending`,
/// `overdue`).
impl Listable for InvoiceView {
    fn haystacks(&self) -> Vec<&str> {
        vec![self.invoice.customer_name.as_str(), self.invoice.invoice_number.as_str(), self.invoice.customer_email.as_str()]
    }
    fn category(&self) -> Option<&str> { Some(self.invoice.payment_method.as_str()) }
    fn date(&self) -> Option<NaiveDate> { self.invoice.invoice_date }
    fn matches_status(&self, status: &str) -> bool {
        let standing = match self.standing { Standing::Paid => "paid", Standing::Pending => "pending", Standing::Overdue => "overdue" };
        self.totals.status.as_str().eq_ignore_ascii_case(status) || standing == status
    }
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::Name => Some(SortValue::text(&self.invoice.customer_name)),
            SortKey::InvoiceNumber => Some(SortValue::text(&self.invoice.invoice_number)),
            SortKey::Date => self.invoice.invoice_date.map(SortValue::Date),
            SortKey::Total => Some(SortValue::number(self.totals.total)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    #[validate(custom(function = "not_blank", message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(custom(function = "not_blank", message = "Customer email is required"))]
    pub customer_email: String,
    pub customer_phone: String,
    pub invoice_date: String,
    pub due_date: String,
    pub items: Vec<LineItemDraft>,
    pub payment_method: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub amount_paid: String,
    pub edited: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LineItemDraft {
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub description: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub quantity: String,
    #[serde(deserialize_with = "raw_serde::deserialize")]
    pub price: String,
}

impl LineItemDraft {
    pub fn new(description: &str, quantity: &str, price: &str) -> Self {
        Self { description: description.into(), quantity: quantity.into(), price: price.into() }
    }

    fn check(&self, index: usize, errors: &mut FieldErrors) {
        let prefix = format!("items[{}].", index);
        if let Err(e) = self.validate() { errors.absorb(&prefix, &e); }
        let quantity = coerce_amount(&self.quantity);
        if self.quantity.trim().is_empty() || quantity <= Decimal::ZERO {
            errors.add(format!("{}quantity", prefix), "Quantity must be > 0");
        } else if !quantity.fract().is_zero() {
            errors.add(format!("{}quantity", prefix), "Quantity must be a whole number");
        } else if quantity.to_u32().is_none() {
            errors.add(format!("{}quantity", prefix), "Quantity is too large");
        }
        if self.price.trim().is_empty() || coerce_amount(&self.price).is_sign_negative() {
            errors.add(format!("{}price", prefix), "Price cannot be negative");
        } else if exceeds_max_amount(coerce_amount(&self.price)) {
            errors.add(format!("{}price", prefix), "Price is too large");
        }
    }

    fn into_item(self) -> LineItem {
        let quantity = u32::try_from(coerce_count(&self.quantity)).unwrap_or(0);
        LineItem { description: self.description.trim().to_string(), quantity, price: coerce_amount(&self.price) }
    }
}

impl InvoiceDraft {
    /// Running totals while the form is being filled in; blank quantities and
    /// prices count as zero.
    pub fn preview_totals(&self) -> InvoiceTotals {
        let items: Vec<LineItem> = self.items.iter().cloned().map(LineItemDraft::into_item).collect();
        compute_totals(&items, coerce_amount(&self.amount_paid))
    }

    pub fn validate_fields(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = self.validate() { errors.absorb("", &e); }
        if self.items.is_empty() { errors.add("items", "At least one line item is required"); }
        for (i, item) in self.items.iter().enumerate() { item.check(i, &mut errors); }
        let total = self.items.iter().cloned().map(LineItemDraft::into_item).try_fold(Decimal::ZERO, |sum, item| {
            item.checked_line_total().and_then(|line| sum.checked_add(line))
        });
        if total.is_none() { errors.add("items", "Amount is too large"); }
        let amount_paid = coerce_amount(&self.amount_paid);
        if amount_paid.is_sign_negative() && !amount_paid.is_zero() {
            errors.add("amountPaid", "Amount paid cannot be negative");
        } else if exceeds_max_amount(amount_paid) {
            errors.add("amountPaid", "Amount is too large");
        }
        let invoice_date = if self.invoice_date.trim().is_empty() { None } else {
            let parsed = parse_date(&self.invoice_date);
            if parsed.is_none() { errors.add("invoiceDate", "Invoice date is invalid"); }
            parsed
        };
        if !self.due_date.trim().is_empty() {
            match parse_date(&self.due_date) {
                None => errors.add("dueDate", "Due date is invalid"),
                Some(due) if invoice_date.is_some_and(|issued| due < issued) => {
                    errors.add("dueDate", "Due date cannot be before the invoice date")
                }
                Some(_) => {}
            }
        }
        errors.into_result()
    }

    /// Validates the form and builds the invoice under a temporary id; the
    /// backend assigns the permanent one when it is saved.
    pub fn into_invoice(self, now: DateTime<Utc>) -> Result<Invoice, FieldErrors> {
        self.validate_fields()?;
        let invoice_number = match self.invoice_number.trim() {
            "" => invoice_number_at(now),
            given => given.to_string(),
        };
        Ok(Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            customer_name: self.customer_name.trim().to_string(),
            customer_email: self.customer_email.trim().to_string(),
            customer_phone: self.customer_phone.trim().to_string(),
            invoice_date: Some(parse_date(&self.invoice_date).unwrap_or_else(|| now.date_naive())),
            due_date: parse_date(&self.due_date),
            amount_paid: coerce_amount(&self.amount_paid),
            items: self.items.into_iter().map(LineItemDraft::into_item).collect(),
            payment_method: self.payment_method.trim().to_string(),
            edited: self.edited,
        })
    }
}

/// Plain-text snapshot of an invoice for printing, carrying the same computed
/// figures as the list and detail views.
pub fn render_printable(invoice: &Invoice, today: NaiveDate) -> String {
    let totals = invoice.totals();
    let mut out = String::new();
    let _ = writeln!(out, "INVOICE {}", invoice.invoice_number);
    if invoice.edited { let _ = writeln!(out, "** EDITED **"); }
    if let Some(date) = invoice.invoice_date { let _ = writeln!(out, "Date: {}", date.format("%Y-%m-%d")); }
    if let Some(due) = invoice.due_date { let _ = writeln!(out, "Due: {}", due.format("%Y-%m-%d")); }
    let _ = writeln!(out, "Bill to: {}", invoice.customer_name);
    if !invoice.customer_email.is_empty() { let _ = writeln!(out, "Email: {}", invoice.customer_email); }
    if !invoice.customer_phone.is_empty() { let _ = writeln!(out, "Phone: {}", invoice.customer_phone); }
    if !invoice.payment_method.is_empty() { let _ = writeln!(out, "Payment method: {}", invoice.payment_method); }
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<30} {:>5} {:>14} {:>14}", "Description", "Qty", "Price", "Amount");
    for item in &invoice.items {
        let _ = writeln!(
            out,
            "{:<30} {:>5} {:>14} {:>14}",
            item.description,
            item.quantity,
            format_naira(item.price),
            format_naira(item.line_total())
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Subtotal: {}", format_naira(totals.subtotal));
    let _ = writeln!(out, "Total: {}", format_naira(totals.total));
    let _ = writeln!(out, "Amount paid: {}", format_naira(invoice.amount_paid));
    let _ = writeln!(out, "Balance due: {}", format_naira(invoice.balance_due()));
    let _ = writeln!(out, "Status: {}", totals.status.as_str());
    if invoice.standing(today) == Standing::Overdue { let _ = writeln!(out, "OVERDUE"); }
    out
}
