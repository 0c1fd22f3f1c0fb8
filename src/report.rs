use comfy_table::{presets::ASCII_HORIZONTAL_ONLY, Cell, CellAlignment, Table};

use std::fmt::Display;

use crate::{
    items::{Item, Items},
    price::Price,
};

pub const HEADERS: [&str; 4] = ["Count", "Item", "Total Price", "Unit Prices"];

/// One line of the summary: everything bought under a single item number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub count: usize,
    pub name: String,
    pub total: Price,
    /// Unit prices in purchase order, joined with `", "`.
    pub unit_prices: String,
}

impl From<&Item> for Row {
    fn from(item: &Item) -> Self {
        Self {
            count: item.purchases.len(),
            name: item.name.clone(),
            total: item.total_price(),
            unit_prices: item
                .purchases
                .iter()
                .map(|p| p.unit_price.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Returns items sorted by name, ascending.
///
/// Items sharing a name are ordered by item number, so the order is the same
/// on every run.
#[must_use]
pub fn items_by_name(items: &Items) -> Vec<&Item> {
    let mut sorted: Vec<_> = items.values().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.number.cmp(&b.number)));
    sorted
}

/// Produces one [`Row`] per item with at least one purchase, in
/// [`items_by_name`] order. Rows are built as the iterator is consumed.
///
/// # Examples
///
/// ```
/// # use receipts::{report::rows, Items};
/// # use serde_json::json;
/// let receipts = vec![json!({ "items": [
///     { "article": { "itemNumber": "A1", "itemText": "Milk" }, "unitPrice": 10, "total": 10 },
///     { "article": { "itemNumber": "B2", "itemText": "Bread" }, "unitPrice": 25, "total": 50 },
///     { "article": { "itemNumber": "A1", "itemText": "Milk" }, "unitPrice": 12, "total": 12 },
/// ] })];
/// let items = Items::from_receipts(&receipts).unwrap();
///
/// let summary: Vec<_> = rows(&items)
///     .map(|row| (row.count, row.name, row.total.to_string(), row.unit_prices))
///     .collect();
/// assert_eq!(
///     summary,
///     vec![
///         (1, "Bread".to_string(), "50".to_string(), "25".to_string()),
///         (2, "Milk".to_string(), "22".to_string(), "10, 12".to_string()),
///     ]
/// );
/// ```
pub fn rows(items: &Items) -> impl Iterator<Item = Row> + '_ {
    items_by_name(items)
        .into_iter()
        .filter(|item| !item.purchases.is_empty())
        .map(Row::from)
}

/// A finished purchase summary.
///
/// To build one, use [`Report::from_items`]. To get a printable version of
/// the report, use its [`Display`] implementation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    rows: Vec<Row>,
}

impl Report {
    #[must_use]
    pub fn from_items(items: &Items) -> Self {
        rows(items).collect()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(ASCII_HORIZONTAL_ONLY).set_header(HEADERS);
        for row in &self.rows {
            table.add_row(vec![
                Cell::new(row.count).set_alignment(CellAlignment::Right),
                Cell::new(&row.name),
                Cell::new(row.total).set_alignment(CellAlignment::Right),
                Cell::new(&row.unit_prices),
            ]);
        }
        table
    }
}

impl FromIterator<Row> for Report {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}
