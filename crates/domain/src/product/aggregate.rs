//! Product aggregate implementation.

use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::state_machine::StateMachine;
use crate::value_objects::{LineItem, Money, ProductId};

use super::{ProductAction, ProductError, ProductEvent, ProductStatus, events::ProductRegisteredData};

/// A sellable item with a stock count.
///
/// Invariants: stock never goes below zero, and outside of `Eliminated` the
/// status is `Exhausted` exactly when stock is zero.
#[derive(Debug, Clone, Default)]
pub struct Product {
    id: Option<AggregateId>,
    version: Version,
    name: String,
    price: Money,
    stock: u32,
    status: ProductStatus,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductRegistered(data) => self.apply_registered(data),
            ProductEvent::StockDecreased(data) => {
                self.stock = data.remaining;
                if self.stock == 0 {
                    self.status = ProductStatus::Exhausted;
                }
            }
            ProductEvent::StockIncreased(data) => {
                self.stock = data.resulting;
                if self.status == ProductStatus::Exhausted {
                    self.status = ProductStatus::Active;
                }
            }
            ProductEvent::ProductEliminated(_) => {
                self.status = ProductStatus::Eliminated;
            }
        }
    }
}

// Query methods
impl Product {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    /// Returns true if `quantity` units can be sold right now.
    pub fn is_available(&self, quantity: u32) -> bool {
        self.status == ProductStatus::Active && self.stock >= quantity
    }

    /// A line for this product priced at its current price.
    pub fn line(&self, quantity: u32) -> Option<LineItem> {
        self.id
            .map(|id| LineItem::new(id, self.name.clone(), quantity, self.price))
    }

    fn product_id(&self) -> ProductId {
        self.id.unwrap_or_default()
    }
}

// Command methods (return events)
impl Product {
    pub fn register(
        &self,
        product_id: ProductId,
        name: impl Into<String>,
        price: Money,
        initial_stock: u32,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        if self.id.is_some() {
            return Err(ProductError::AlreadyRegistered);
        }

        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProductError::NameRequired);
        }
        if !price.is_positive() {
            return Err(ProductError::InvalidPrice { price });
        }

        Ok(vec![ProductEvent::product_registered(
            product_id,
            name,
            price,
            initial_stock,
        )])
    }

    /// Checks that `quantity` units can be sold right now.
    pub fn check_available(&self, quantity: u32) -> Result<(), ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity { quantity });
        }
        if !self.status.allows(ProductAction::DecreaseStock) {
            return Err(ProductError::NotAvailable {
                product_id: self.product_id(),
                status: self.status,
            });
        }
        if self.stock < quantity {
            return Err(ProductError::InsufficientStock {
                product_id: self.product_id(),
                requested: quantity,
                available: self.stock,
            });
        }
        Ok(())
    }

    /// Prices `quantity` units at the current price, if they are available.
    pub fn snapshot(&self, quantity: u32) -> Result<LineItem, ProductError> {
        self.check_available(quantity)?;
        Ok(LineItem::new(
            self.product_id(),
            self.name.clone(),
            quantity,
            self.price,
        ))
    }

    /// Takes `quantity` units out of stock.
    pub fn decrease_stock(&self, quantity: u32) -> Result<Vec<ProductEvent>, ProductError> {
        self.check_available(quantity)?;

        Ok(vec![ProductEvent::stock_decreased(
            quantity,
            self.stock - quantity,
        )])
    }

    /// Returns `quantity` units to stock.
    pub fn increase_stock(&self, quantity: u32) -> Result<Vec<ProductEvent>, ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity { quantity });
        }
        self.guard(ProductAction::IncreaseStock)?;
        let resulting = self
            .stock
            .checked_add(quantity)
            .ok_or(ProductError::StockOverflow {
                product_id: self.product_id(),
                stock: self.stock,
                added: quantity,
            })?;

        Ok(vec![ProductEvent::stock_increased(quantity, resulting)])
    }

    pub fn eliminate(&self) -> Result<Vec<ProductEvent>, ProductError> {
        self.guard(ProductAction::Eliminate)?;
        Ok(vec![ProductEvent::product_eliminated()])
    }

    fn guard(&self, action: ProductAction) -> Result<ProductStatus, ProductError> {
        self.status
            .next(action)
            .ok_or(ProductError::InvalidStateTransition {
                current_state: self.status,
                action,
            })
    }
}

// Apply event helpers
impl Product {
    fn apply_registered(&mut self, data: ProductRegisteredData) {
        self.id = Some(data.product_id);
        self.name = data.name;
        self.price = data.price;
        self.stock = data.initial_stock;
        self.status = if data.initial_stock == 0 {
            ProductStatus::Exhausted
        } else {
            ProductStatus::Active
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(stock: u32) -> Product {
        let mut product = Product::default();
        let events = product
            .register(ProductId::new(), "Widget", Money::from_cents(1000), stock)
            .unwrap();
        product.apply_events(events);
        product
    }

    fn run(product: &mut Product, events: Result<Vec<ProductEvent>, ProductError>) {
        product.apply_events(events.unwrap());
    }

    #[test]
    fn test_increase_past_u32_is_rejected() {
        let product = registered(10);

        let err = product.increase_stock(u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            ProductError::StockOverflow { stock: 10, added: u32::MAX, .. }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert_eq!(product.stock(), 10);
    }

    #[test]
    fn test_register_with_zero_stock_is_exhausted() {
        assert_eq!(registered(0).status(), ProductStatus::Exhausted);
        assert_eq!(registered(3).status(), ProductStatus::Active);
    }

    #[test]
    fn test_register_validates_input() {
        let product = Product::default();
        assert!(matches!(
            product.register(ProductId::new(), " ", Money::from_cents(1), 1),
            Err(ProductError::NameRequired)
        ));
        assert!(matches!(
            product.register(ProductId::new(), "Widget", Money::zero(), 1),
            Err(ProductError::InvalidPrice { .. })
        ));
        assert!(matches!(
            registered(1).register(ProductId::new(), "Again", Money::from_cents(1), 1),
            Err(ProductError::AlreadyRegistered)
        ));
    }

    #[test]
    fn test_decrease_to_zero_exhausts() {
        let mut product = registered(5);
        let events = product.decrease_stock(5);
        run(&mut product, events);

        assert_eq!(product.stock(), 0);
        assert_eq!(product.status(), ProductStatus::Exhausted);

        let err = product.decrease_stock(1).unwrap_err();
        assert!(matches!(err, ProductError::NotAvailable { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::NotAvailable);
    }

    #[test]
    fn test_decrease_beyond_stock_is_rejected() {
        let product = registered(2);
        assert!(matches!(
            product.decrease_stock(3),
            Err(ProductError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
        assert!(matches!(
            product.decrease_stock(0),
            Err(ProductError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_snapshot_prices_available_units() {
        let product = registered(2);
        let line = product.snapshot(2).unwrap();
        assert_eq!(line.subtotal(), Money::from_cents(2000));
        assert_eq!(line.product_name, "Widget");

        assert!(matches!(
            product.snapshot(3),
            Err(ProductError::InsufficientStock { available: 2, .. })
        ));
        assert!(matches!(
            registered(0).snapshot(1),
            Err(ProductError::NotAvailable {
                status: ProductStatus::Exhausted,
                ..
            })
        ));
    }

    #[test]
    fn test_increase_reactivates_exhausted() {
        let mut product = registered(0);
        let events = product.increase_stock(4);
        run(&mut product, events);

        assert_eq!(product.stock(), 4);
        assert_eq!(product.status(), ProductStatus::Active);
        assert!(product.is_available(4));
        assert!(!product.is_available(5));
    }

    #[test]
    fn test_eliminated_rejects_increase() {
        let mut product = registered(1);
        let events = product.eliminate();
        run(&mut product, events);

        let err = product.increase_stock(1).unwrap_err();
        assert!(matches!(
            err,
            ProductError::InvalidStateTransition {
                current_state: ProductStatus::Eliminated,
                action: ProductAction::IncreaseStock,
            }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::InvalidState);
        assert!(matches!(
            product.decrease_stock(1),
            Err(ProductError::NotAvailable { .. })
        ));
    }

    #[test]
    fn test_line_uses_current_price() {
        let product = registered(3);
        let line = product.line(2).unwrap();
        assert_eq!(line.product_id, product.id().unwrap());
        assert_eq!(line.subtotal(), Money::from_cents(2000));
    }
}
