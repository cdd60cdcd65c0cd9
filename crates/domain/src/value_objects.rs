//! Value objects shared by the aggregates.

use std::collections::HashMap;

use common::AggregateId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Products are aggregates, so a product reference is the product's aggregate id.
pub type ProductId = AggregateId;

/// Money amount represented in cents to avoid floating point issues.
///
/// The operators saturate at the `i64` bounds. Line lists reject any edit whose
/// total would not fit, so saturation is never reached by a stored total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Multiplies by a quantity, or `None` if the product does not fit.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_sub(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A product line with the price captured when the line was added.
///
/// Cart, order and purchase lines are copies: later changes to the product do
/// not reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,

    /// Sale price for cart and order lines, unit cost for purchase lines.
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit_price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    pub fn checked_subtotal(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Errors raised while editing a list of lines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },

    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },

    #[error("Quantity too large: {current} + {added} units of {product_id}")]
    QuantityOverflow {
        product_id: ProductId,
        current: u32,
        added: u32,
    },

    #[error("Line total too large for {product_id}")]
    TotalOverflow { product_id: ProductId },
}

impl LineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineError::InvalidQuantity { .. }
            | LineError::InvalidPrice { .. }
            | LineError::QuantityOverflow { .. }
            | LineError::TotalOverflow { .. } => ErrorKind::InvalidArgument,
            LineError::ItemNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

/// Data for the item-quantity-updated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantityUpdatedData {
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

/// Data for the item-removed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub product_id: ProductId,
}

/// A single edit to a list of lines, decided by a command and replayed by `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    Added(LineItem),
    QuantityUpdated(ItemQuantityUpdatedData),
    Removed(ItemRemovedData),
}

/// Ordered product lines with at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItems(Vec<LineItem>);

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from raw lines, merging repeated products.
    pub fn from_lines(lines: impl IntoIterator<Item = LineItem>) -> Result<Self, LineError> {
        let mut items = Self::new();
        for line in lines {
            let change = items.plan_add(line)?;
            items.apply(change);
        }
        Ok(items)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.0.iter().find(|line| line.product_id == product_id)
    }

    /// Sum of the line subtotals.
    pub fn total(&self) -> Money {
        self.0.iter().map(LineItem::subtotal).sum()
    }

    /// Sum of the line subtotals, or `None` if it does not fit.
    pub fn checked_total(&self) -> Option<Money> {
        self.0.iter().try_fold(Money::zero(), |total, line| {
            total.checked_add(line.checked_subtotal()?)
        })
    }

    pub fn total_quantity(&self) -> u64 {
        self.0.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Quantity per product.
    pub fn quantities(&self) -> HashMap<ProductId, u32> {
        self.0
            .iter()
            .map(|line| (line.product_id, line.quantity))
            .collect()
    }

    pub fn to_vec(&self) -> Vec<LineItem> {
        self.0.clone()
    }

    /// Decides how adding `line` changes the list.
    ///
    /// A product already present keeps its line and price; only the quantity grows.
    pub fn plan_add(&self, line: LineItem) -> Result<LineChange, LineError> {
        if line.quantity == 0 {
            return Err(LineError::InvalidQuantity {
                quantity: line.quantity,
            });
        }
        if !line.unit_price.is_positive() {
            return Err(LineError::InvalidPrice {
                price: line.unit_price,
            });
        }

        let product_id = line.product_id;
        let change = match self.get(product_id) {
            Some(existing) => {
                let new_quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    LineError::QuantityOverflow {
                        product_id,
                        current: existing.quantity,
                        added: line.quantity,
                    },
                )?;
                LineChange::QuantityUpdated(ItemQuantityUpdatedData {
                    product_id,
                    old_quantity: existing.quantity,
                    new_quantity,
                })
            }
            None => LineChange::Added(line),
        };
        self.check_total(product_id, change)
    }

    /// Decides how setting a product's quantity changes the list.
    ///
    /// Zero removes the line; an unchanged quantity yields no change.
    pub fn plan_update(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<LineChange>, LineError> {
        let existing = self
            .get(product_id)
            .ok_or(LineError::ItemNotFound { product_id })?;

        if quantity == 0 {
            Ok(Some(LineChange::Removed(ItemRemovedData { product_id })))
        } else if quantity != existing.quantity {
            let change = LineChange::QuantityUpdated(ItemQuantityUpdatedData {
                product_id,
                old_quantity: existing.quantity,
                new_quantity: quantity,
            });
            self.check_total(product_id, change).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn plan_remove(&self, product_id: ProductId) -> Result<LineChange, LineError> {
        if self.get(product_id).is_none() {
            return Err(LineError::ItemNotFound { product_id });
        }
        Ok(LineChange::Removed(ItemRemovedData { product_id }))
    }

    /// Rejects `change` if the list total would no longer fit in [`Money`].
    fn check_total(&self, product_id: ProductId, change: LineChange) -> Result<LineChange, LineError> {
        let mut next = self.clone();
        next.apply(change.clone());
        match next.checked_total() {
            Some(_) => Ok(change),
            None => Err(LineError::TotalOverflow { product_id }),
        }
    }

    pub fn apply(&mut self, change: LineChange) {
        match change {
            LineChange::Added(line) => self.0.push(line),
            LineChange::QuantityUpdated(data) => {
                if let Some(line) = self.0.iter_mut().find(|l| l.product_id == data.product_id) {
                    line.quantity = data.new_quantity;
                }
            }
            LineChange::Removed(data) => self.0.retain(|l| l.product_id != data.product_id),
        }
    }
}

impl From<Vec<LineItem>> for LineItems {
    fn from(lines: Vec<LineItem>) -> Self {
        Self(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(quantity: u32) -> LineItem {
        LineItem::new(ProductId::new(), "Widget", quantity, Money::from_cents(1000))
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
        assert_eq!(Money::from_dollars(20).to_string(), "$20.00");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
        assert_eq!([a, b].into_iter().sum::<Money>().cents(), 1500);
    }

    #[test]
    fn test_line_subtotal() {
        assert_eq!(widget(3).subtotal(), Money::from_cents(3000));
    }

    #[test]
    fn test_adding_present_product_merges_line() {
        let line = widget(2);
        let mut items = LineItems::new();
        items.apply(items.plan_add(line.clone()).unwrap());

        let change = items.plan_add(LineItem { quantity: 3, ..line.clone() }).unwrap();
        assert!(matches!(
            change,
            LineChange::QuantityUpdated(ItemQuantityUpdatedData { old_quantity: 2, new_quantity: 5, .. })
        ));
        items.apply(change);

        assert_eq!(items.len(), 1);
        assert_eq!(items.get(line.product_id).unwrap().quantity, 5);
        assert_eq!(items.total(), Money::from_cents(5000));
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let line = widget(2);
        let mut items = LineItems::from_lines([line.clone(), widget(1)]).unwrap();

        let change = items.plan_update(line.product_id, 0).unwrap().unwrap();
        items.apply(change);

        assert_eq!(items.len(), 1);
        assert!(items.get(line.product_id).is_none());
        assert_eq!(items.total(), Money::from_cents(1000));
    }

    #[test]
    fn test_update_to_same_quantity_is_no_change() {
        let line = widget(2);
        let items = LineItems::from_lines([line.clone()]).unwrap();
        assert_eq!(items.plan_update(line.product_id, 2).unwrap(), None);
    }

    #[test]
    fn test_rejects_bad_lines() {
        let items = LineItems::new();
        assert_eq!(
            items.plan_add(widget(0)),
            Err(LineError::InvalidQuantity { quantity: 0 })
        );

        let free = LineItem::new(ProductId::new(), "Free", 1, Money::zero());
        assert!(matches!(items.plan_add(free), Err(LineError::InvalidPrice { .. })));

        let missing = ProductId::new();
        assert_eq!(
            items.plan_remove(missing),
            Err(LineError::ItemNotFound { product_id: missing })
        );
        assert_eq!(
            items.plan_remove(missing).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_money_operators_saturate() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(max.multiply(2), max);
        assert_eq!(max.checked_multiply(2), None);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(7).checked_multiply(3),
            Some(Money::from_cents(21))
        );
    }

    #[test]
    fn test_merging_past_u32_is_rejected() {
        let line = LineItem::new(ProductId::new(), "Bolt", u32::MAX - 1, Money::from_cents(1));
        let items = LineItems::from_lines([line.clone()]).unwrap();

        let err = items
            .plan_add(LineItem { quantity: 5, ..line.clone() })
            .unwrap_err();
        assert_eq!(
            err,
            LineError::QuantityOverflow {
                product_id: line.product_id,
                current: u32::MAX - 1,
                added: 5,
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(items.get(line.product_id).unwrap().quantity, u32::MAX - 1);
    }

    #[test]
    fn test_total_that_does_not_fit_is_rejected() {
        let price = Money::from_cents(i64::MAX / 2 + 1);
        let line = LineItem::new(ProductId::new(), "Yacht", 2, price);

        let err = LineItems::new().plan_add(line.clone()).unwrap_err();
        assert_eq!(err, LineError::TotalOverflow { product_id: line.product_id });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // Each line fits alone, the sum does not.
        let one = LineItem { quantity: 1, ..line.clone() };
        let items = LineItems::from_lines([one.clone()]).unwrap();
        let other = LineItem::new(ProductId::new(), "Yacht II", 1, price);
        assert!(matches!(
            items.plan_add(other),
            Err(LineError::TotalOverflow { .. })
        ));
        assert!(matches!(
            items.plan_update(one.product_id, 2),
            Err(LineError::TotalOverflow { .. })
        ));
    }

    #[test]
    fn test_total_quantity_does_not_wrap() {
        let items = LineItems::from_lines([
            LineItem::new(ProductId::new(), "A", u32::MAX, Money::from_cents(1)),
            LineItem::new(ProductId::new(), "B", u32::MAX, Money::from_cents(1)),
        ])
        .unwrap();
        assert_eq!(items.total_quantity(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_from_lines_merges_duplicates() {
        let line = widget(1);
        let items = LineItems::from_lines([line.clone(), line.clone()]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.total_quantity(), 2);
        assert_eq!(items.quantities().get(&line.product_id), Some(&2));
    }
}
