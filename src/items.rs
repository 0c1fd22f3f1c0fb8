use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt::Display,
};

use crate::{
    error::{Error, Result},
    price::Price,
};

/// Opaque article identifier used as the grouping key.
///
/// The API normally sends a string, but numeric identifiers are accepted
/// and kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemNumber(String);

impl ItemNumber {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemNumber {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for ItemNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(de::Error::invalid_type(
                de::Unexpected::Other(&other.to_string()),
                &"a string or number",
            )),
        }
    }
}

/// Defines the JSON format of one receipt.
///
/// Only the fields the report needs are declared; everything else the API
/// sends is ignored.
#[derive(Debug, Deserialize)]
pub struct Receipt {
    pub items: Vec<ItemLine>,
}

/// One purchased article within a [`Receipt`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLine {
    pub article: Article,
    pub unit_price: Price,
    pub total: Price,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub item_number: ItemNumber,
    pub item_text: String,
}

/// One line of a receipt, reduced to its prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub unit_price: Price,
    pub total_price: Price,
}

/// Purchase history of a single article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub number: ItemNumber,
    pub name: String,
    /// In the order the receipts were received.
    pub purchases: Vec<Purchase>,
    total: Price,
}

impl Item {
    fn new(number: ItemNumber, name: String) -> Self {
        Self {
            number,
            name,
            purchases: Vec::new(),
            total: Price::default(),
        }
    }

    /// Records `purchase`, or returns `None` if the running total would
    /// overflow. The item is left unchanged in that case.
    fn push(&mut self, purchase: Purchase) -> Option<()> {
        self.total = self.total.checked_add(purchase.total_price)?;
        self.purchases.push(purchase);
        Some(())
    }

    /// Sum of every purchase's total price.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.total
    }
}

/// Holds every purchased item, keyed by item number.
///
/// To build one from the raw API response, use [`Items::from_receipts`].
#[derive(Debug, Default)]
pub struct Items(BTreeMap<ItemNumber, Item>);

impl Items {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and aggregates `receipts` in order.
    ///
    /// An item number seen for the first time takes the name on that line;
    /// later lines for the same number keep it. Every line adds one purchase.
    ///
    /// # Examples
    ///
    /// ```
    /// # use receipts::Items;
    /// # use serde_json::json;
    /// let receipts = vec![
    ///     json!({ "items": [{ "article": { "itemNumber": "A1", "itemText": "Milk" }, "unitPrice": 10, "total": 10 }] }),
    ///     json!({ "items": [{ "article": { "itemNumber": "A1", "itemText": "Milk" }, "unitPrice": 12, "total": 12 }] }),
    /// ];
    /// let items = Items::from_receipts(&receipts).unwrap();
    /// let milk = items.get(&"A1".into()).unwrap();
    /// assert_eq!(milk.purchases.len(), 2);
    /// assert_eq!(milk.total_price().to_string(), "22");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for the first receipt that fails, naming its index.
    /// Nothing is aggregated in that case.
    /// * [`Error::Parse`] if the receipt does not match [`Receipt`]
    /// * [`Error::Overflow`] if an item's total price leaves the decimal range
    pub fn from_receipts(receipts: &[Value]) -> Result<Self> {
        let mut items = Self::new();
        for (index, raw) in receipts.iter().enumerate() {
            let receipt = Receipt::deserialize(raw).map_err(|source| Error::Parse { index, source })?;
            items.add_receipt(index, receipt)?;
        }
        debug!(receipts = receipts.len(), items = items.len(), "aggregated receipts");
        Ok(items)
    }

    fn add_receipt(&mut self, index: usize, receipt: Receipt) -> Result<()> {
        for line in receipt.items {
            let purchase = Purchase {
                unit_price: line.unit_price,
                total_price: line.total,
            };
            let item = match self.0.entry(line.article.item_number) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let number = entry.key().clone();
                    entry.insert(Item::new(number, line.article.item_text))
                }
            };
            if item.push(purchase).is_none() {
                return Err(Error::Overflow {
                    index,
                    item: item.number.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, number: &ItemNumber) -> Option<&Item> {
        self.0.get(number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Item> {
        self.0.values()
    }
}
