//! Filtering, sorting and pagination for list views
//!
//! Every list screen (products, stock records, invoices, customers) runs the
//! same pipeline over an in-memory collection:
//!
//! 1. search: case-insensitive substring match over a record's searchable
//!    fields, any one matching is enough
//! 2. category and status filters: exact match, skipped for `All`
//! 3. date range: inclusive `from`/`to` on the record's date; undated records
//!    drop out once either bound is set
//! 4. stable sort on one key, ascending or descending
//! 5. page slicing, with the filtered count reported alongside
//!
//! ```rust,ignore
//! let query = ListQuery { search: Some("dior".into()), ..ListQuery::default() };
//! let page = query::apply(products, &query);
//! assert_eq!(page.total_count, 1);
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort keys understood by the list views. Records without a value for the key
/// go last in either direction, in input order; a key no record supports
/// leaves the input order untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    Sku,
    Category,
    Price,
    Stock,
    Date,
    Total,
    #[serde(alias = "number")]
    InvoiceNumber,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// A comparable projection of one record field.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl SortValue {
    /// Text compares case-insensitively.
    pub fn text(value: &str) -> Self { Self::Text(value.to_lowercase()) }
    pub fn number(value: impl Into<Decimal>) -> Self { Self::Number(value.into()) }
}

/// What a record exposes to the pipeline.
pub trait Listable {
    /// Fields the search term is matched against.
    fn haystacks(&self) -> Vec<&str>;

    fn category(&self) -> Option<&str> { None }

    /// `status` arrives normalised (`low-stock`, `paid`).
    fn matches_status(&self, _status: &str) -> bool { true }

    /// The date a range filter applies to.
    fn date(&self) -> Option<NaiveDate> { None }

    fn sort_value(&self, key: SortKey) -> Option<SortValue>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort_key: SortKey,
    pub sort_dir: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None, category: None, status: None, from: None, to: None,
            sort_key: SortKey::default(), sort_dir: SortDirection::default(),
            page: 1, page_size: 20,
        }
    }
}

impl ListQuery {
    /// Page number, at least 1.
    pub fn page(&self) -> usize { self.page.max(1) }

    /// Page size, at least 1.
    pub fn page_size(&self) -> usize { self.page_size.max(1) }

    fn in_range(&self, date: Option<NaiveDate>) -> bool {
        if self.from.is_none() && self.to.is_none() { return true; }
        date.is_some_and(|d| self.from.map_or(true, |f| d >= f) && self.to.map_or(true, |t| d <= t))
    }
}

/// `All`, `all` and blank disable a filter.
fn is_bypassed(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("all")
}

/// `"Low Stock"` and `"low_stock"` both become `low-stock`.
pub fn normalize_status(value: &str) -> String {
    value.trim().to_lowercase().replace([' ', '_'], "-")
}

/// One page of a filtered, sorted collection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Matching records before pagination.
    pub total_count: usize,
    pub pagination: PaginationMeta,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, page_size: usize, total: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(page_size) };
        let start = (page - 1).saturating_mul(page_size);
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: start.saturating_add(page_size) < total,
            has_prev: page > 1,
        }
    }
}

/// Runs the full pipeline. Pure: the result depends only on the inputs.
pub fn apply<T: Listable>(items: Vec<T>, query: &ListQuery) -> Page<T> {
    let needle = query.search.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let category = query.category.as_deref().filter(|c| !is_bypassed(c)).map(str::trim);
    let status = query.status.as_deref().filter(|s| !is_bypassed(s)).map(normalize_status);

    let mut keyed: Vec<(Option<SortValue>, T)> = items
        .into_iter()
        .filter(|item| match &needle {
            Some(needle) => item.haystacks().iter().any(|h| h.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .filter(|item| category.map_or(true, |c| item.category() == Some(c)))
        .filter(|item| status.as_deref().map_or(true, |s| item.matches_status(s)))
        .filter(|item| query.in_range(item.date()))
        .map(|item| (item.sort_value(query.sort_key), item))
        .collect();

    // `sort_by` is stable, so equal keys keep their input order either way.
    keyed.sort_by(|(a, _), (b, _)| compare(a.as_ref(), b.as_ref(), query.sort_dir));

    let total_count = keyed.len();
    let (page, page_size) = (query.page(), query.page_size());
    let start = (page - 1).saturating_mul(page_size);
    let data = keyed.into_iter().skip(start).take(page_size).map(|(_, item)| item).collect();

    Page { data, total_count, pagination: PaginationMeta::new(page, page_size, total_count) }
}

fn compare(a: Option<&SortValue>, b: Option<&SortValue>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if dir == SortDirection::Desc => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row { name: &'static str, brand: &'static str, category: &'static str, status: &'static str, stock: u32, day: Option<u32> }

    impl Listable for Row {
        fn haystacks(&self) -> Vec<&str> { vec![self.name, self.brand] }
        fn category(&self) -> Option<&str> { Some(self.category) }
        fn matches_status(&self, status: &str) -> bool { self.status == status }
        fn date(&self) -> Option<NaiveDate> { self.day.and_then(|d| NaiveDate::from_ymd_opt(2024, 3, d)) }
        fn sort_value(&self, key: SortKey) -> Option<SortValue> {
            match key {
                SortKey::Name => Some(SortValue::text(self.name)),
                SortKey::Stock => Some(SortValue::number(self.stock)),
                SortKey::Date => self.date().map(SortValue::Date),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Dior Sauvage", brand: "Dior", category: "Men", status: "in-stock", stock: 25, day: Some(10) },
            Row { name: "Creed Aventus", brand: "Creed", category: "Men", status: "out-of-stock", stock: 0, day: None },
            Row { name: "chanel No. 5", brand: "Chanel", category: "Women", status: "in-stock", stock: 12, day: Some(1) },
            Row { name: "Tom Ford Black Orchid", brand: "Tom Ford", category: "Unisex", status: "low-stock", stock: 3, day: None },
            Row { name: "YSL Black Opium", brand: "YSL", category: "Women", status: "low-stock", stock: 3, day: Some(20) },
        ]
    }

    fn names(page: &Page<Row>) -> Vec<&'static str> { page.data.iter().map(|r| r.name).collect() }

    #[test]
    fn test_search_is_case_insensitive() {
        let page = apply(rows(), &ListQuery { search: Some("dior".into()), ..Default::default() });
        assert_eq!(names(&page), vec!["Dior Sauvage"]);
        assert_eq!(page.total_count, 1);
        let page = apply(rows(), &ListQuery { search: Some(" TOM ".into()), ..Default::default() });
        assert_eq!(names(&page), vec!["Tom Ford Black Orchid"]);
    }

    #[test]
    fn test_search_without_match() {
        let page = apply(rows(), &ListQuery { search: Some("guerlain".into()), ..Default::default() });
        assert_eq!(page.total_count, 0);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }

    #[test]
    fn test_filters_and_sentinel() {
        let page = apply(rows(), &ListQuery { category: Some("Women".into()), status: Some("Low Stock".into()), ..Default::default() });
        assert_eq!(names(&page), vec!["YSL Black Opium"]);
        let page = apply(rows(), &ListQuery { category: Some("All".into()), status: Some("all".into()), ..Default::default() });
        assert_eq!(page.total_count, 5);
        let page = apply(rows(), &ListQuery { category: Some("women".into()), ..Default::default() });
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_sort_name_both_directions() {
        let asc = apply(rows(), &ListQuery::default());
        assert_eq!(names(&asc), vec!["chanel No. 5", "Creed Aventus", "Dior Sauvage", "Tom Ford Black Orchid", "YSL Black Opium"]);
        let desc = apply(rows(), &ListQuery { sort_dir: SortDirection::Desc, ..Default::default() });
        let mut reversed = names(&asc);
        reversed.reverse();
        assert_eq!(names(&desc), reversed);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let asc = apply(rows(), &ListQuery { sort_key: SortKey::Stock, ..Default::default() });
        assert_eq!(names(&asc)[1..3], ["Tom Ford Black Orchid", "YSL Black Opium"]);
        let desc = apply(rows(), &ListQuery { sort_key: SortKey::Stock, sort_dir: SortDirection::Desc, ..Default::default() });
        assert_eq!(names(&desc)[2..4], ["Tom Ford Black Orchid", "YSL Black Opium"]);
        let unsupported = apply(rows(), &ListQuery { sort_key: SortKey::Total, ..Default::default() });
        assert_eq!(unsupported.data, rows());
    }

    #[test]
    fn test_undated_rows_sort_last() {
        let asc = apply(rows(), &ListQuery { sort_key: SortKey::Date, ..Default::default() });
        assert_eq!(names(&asc), vec!["chanel No. 5", "Dior Sauvage", "YSL Black Opium", "Creed Aventus", "Tom Ford Black Orchid"]);
        let desc = apply(rows(), &ListQuery { sort_key: SortKey::Date, sort_dir: SortDirection::Desc, ..Default::default() });
        assert_eq!(names(&desc), vec!["YSL Black Opium", "Dior Sauvage", "chanel No. 5", "Creed Aventus", "Tom Ford Black Orchid"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d);
        let page = apply(rows(), &ListQuery { from: day(1), to: day(10), ..Default::default() });
        assert_eq!(names(&page), vec!["chanel No. 5", "Dior Sauvage"]);
        let page = apply(rows(), &ListQuery { from: day(10), ..Default::default() });
        assert_eq!(names(&page), vec!["Dior Sauvage", "YSL Black Opium"]);
        let page = apply(rows(), &ListQuery { to: day(9), ..Default::default() });
        assert_eq!(names(&page), vec!["chanel No. 5"]);
        let page = apply(rows(), &ListQuery { from: day(11), to: day(19), ..Default::default() });
        assert_eq!(page.total_count, 0);
        assert_eq!(apply(rows(), &ListQuery::default()).total_count, 5);
    }

    #[test]
    fn test_pages_cover_everything_once() {
        let full = apply(rows(), &ListQuery { page_size: 100, ..Default::default() });
        let mut stitched = Vec::new();
        let pages = full.total_count.div_ceil(2);
        for page in 1..=pages {
            let p = apply(rows(), &ListQuery { page, page_size: 2, ..Default::default() });
            assert_eq!(p.total_count, 5);
            assert_eq!(p.pagination.has_prev, page > 1);
            assert_eq!(p.pagination.has_next, page < pages);
            stitched.extend(p.data);
        }
        assert_eq!(stitched, full.data);
        assert!(apply(rows(), &ListQuery { page: pages + 1, page_size: 2, ..Default::default() }).data.is_empty());
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let p = apply(rows(), &ListQuery { page: 0, page_size: 0, ..Default::default() });
        assert_eq!(p.pagination.page, 1);
        assert_eq!(p.pagination.page_size, 1);
        assert_eq!(p.data.len(), 1);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);
    }
}
