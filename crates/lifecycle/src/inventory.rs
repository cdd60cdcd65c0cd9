//! Inventory guard: every stock mutation goes through here.

use domain::{
    Aggregate, CommandHandler, LineItem, Money, Product, ProductEvent, ProductId, ProductStatus,
    UnitOfWork,
};
use event_store::{EventStore, EventStoreError, Version};

use crate::env::commit_one;
use crate::error::Result;

/// Guards stock non-negativity and the status coupling of products.
///
/// Writers race on the product version: whoever commits second with a stale
/// version gets a concurrency conflict and must reload.
pub struct InventoryGuard<S: EventStore> {
    products: CommandHandler<S, Product>,
}

impl<S: EventStore + Clone> Clone for InventoryGuard<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
        }
    }
}

impl<S: EventStore> InventoryGuard<S> {
    pub fn new(store: S) -> Self {
        Self {
            products: CommandHandler::new(store),
        }
    }

    pub async fn get(&self, product_id: ProductId) -> Result<Product> {
        Ok(self.products.get(product_id).await?)
    }

    /// Registers a product. Zero initial stock registers it exhausted.
    #[tracing::instrument(skip(self, name))]
    pub async fn register_product(
        &self,
        name: impl Into<String>,
        price: Money,
        initial_stock: u32,
    ) -> Result<Product> {
        let product_id = ProductId::new();
        let name = name.into();
        let result = self
            .products
            .execute(product_id, |p| {
                p.register(product_id, name, price, initial_stock)
            })
            .await?;

        tracing::info!(%product_id, initial_stock, "product registered");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn decrease_stock(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let mut product = self.get(product_id).await?;
        let events = product.decrease_stock(quantity)?;
        self.commit(product_id, &mut product, events, "inventory.decrease")
            .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn increase_stock(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let mut product = self.get(product_id).await?;
        let events = product.increase_stock(quantity)?;
        self.commit(product_id, &mut product, events, "inventory.increase")
            .await?;
        Ok(product)
    }

    /// Decreases stock only if the product is still at `expected`.
    ///
    /// `expected` is the version the caller last read; a product changed
    /// since then is a concurrency conflict.
    #[tracing::instrument(skip(self))]
    pub async fn decrease_stock_at(
        &self,
        product_id: ProductId,
        quantity: u32,
        expected: Version,
    ) -> Result<Product> {
        let mut product = self.get_at(product_id, expected).await?;
        let events = product.decrease_stock(quantity)?;
        self.commit(product_id, &mut product, events, "inventory.decrease")
            .await?;
        Ok(product)
    }

    /// Increases stock only if the product is still at `expected`.
    #[tracing::instrument(skip(self))]
    pub async fn increase_stock_at(
        &self,
        product_id: ProductId,
        quantity: u32,
        expected: Version,
    ) -> Result<Product> {
        let mut product = self.get_at(product_id, expected).await?;
        let events = product.increase_stock(quantity)?;
        self.commit(product_id, &mut product, events, "inventory.increase")
            .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn eliminate(&self, product_id: ProductId) -> Result<Product> {
        let mut product = self.get(product_id).await?;
        let events = product.eliminate()?;
        self.commit(product_id, &mut product, events, "inventory.eliminate")
            .await?;
        tracing::info!(%product_id, "product eliminated");
        Ok(product)
    }

    /// Prices `quantity` more units of a product for a line that already holds
    /// `held` units, checking availability of the combined quantity.
    pub(crate) async fn snapshot(
        &self,
        product_id: ProductId,
        quantity: u32,
        held: u32,
    ) -> Result<LineItem> {
        let product = self.get(product_id).await?;
        product.check_available(held.saturating_add(quantity))?;
        Ok(product.snapshot(quantity)?)
    }

    /// Checks that `quantity` units are available without pricing them.
    pub(crate) async fn check_available(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        Ok(self.get(product_id).await?.check_available(quantity)?)
    }

    /// Stages a stock decrease in the caller's unit of work.
    pub(crate) async fn stage_decrease(
        &self,
        uow: &mut UnitOfWork,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let mut product = self.get(product_id).await?;
        let events = product.decrease_stock(quantity)?;
        uow.stage(product_id, &mut product, events)?;
        Ok(())
    }

    /// Stages a stock increase in the caller's unit of work.
    ///
    /// With `skip_eliminated`, an eliminated product is left untouched instead
    /// of failing the whole unit of work.
    pub(crate) async fn stage_increase(
        &self,
        uow: &mut UnitOfWork,
        product_id: ProductId,
        quantity: u32,
        skip_eliminated: bool,
    ) -> Result<()> {
        let mut product = self.get(product_id).await?;
        if skip_eliminated && product.status() == ProductStatus::Eliminated {
            tracing::debug!(%product_id, quantity, "eliminated product not restocked");
            return Ok(());
        }
        let events = product.increase_stock(quantity)?;
        uow.stage(product_id, &mut product, events)?;
        Ok(())
    }

    async fn get_at(&self, product_id: ProductId, expected: Version) -> Result<Product> {
        let product = self.get(product_id).await?;
        if product.version() != expected {
            metrics::counter!("stock_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: product_id,
                expected,
                actual: product.version(),
            }
            .into());
        }
        Ok(product)
    }

    async fn commit(
        &self,
        product_id: ProductId,
        product: &mut Product,
        events: Vec<ProductEvent>,
        name: &'static str,
    ) -> Result<()> {
        match commit_one(self.products.store(), name, product_id, product, events).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.is_conflict() {
                    metrics::counter!("stock_conflicts_total").increment(1);
                    tracing::debug!(%product_id, "stock update lost the race");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ErrorKind;
    use event_store::InMemoryEventStore;

    fn guard() -> InventoryGuard<InMemoryEventStore> {
        InventoryGuard::new(InMemoryEventStore::new())
    }

    #[tokio::test]
    async fn test_decrease_to_zero_then_unavailable() {
        let guard = guard();
        let product = guard
            .register_product("Widget", Money::from_cents(1000), 5)
            .await
            .unwrap();
        let id = product.id().unwrap();

        let product = guard.decrease_stock(id, 5).await.unwrap();
        assert_eq!(product.stock(), 0);
        assert_eq!(product.status(), ProductStatus::Exhausted);

        let err = guard.decrease_stock(id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAvailable);
    }

    #[tokio::test]
    async fn test_increase_on_eliminated_is_invalid_state() {
        let guard = guard();
        let product = guard
            .register_product("Widget", Money::from_cents(1000), 1)
            .await
            .unwrap();
        let id = product.id().unwrap();
        guard.eliminate(id).await.unwrap();

        let err = guard.increase_stock(id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let guard = guard();
        let product = guard
            .register_product("Widget", Money::from_cents(1000), 10)
            .await
            .unwrap();
        let id = product.id().unwrap();
        let seen = product.version();

        guard.decrease_stock_at(id, 1, seen).await.unwrap();
        let err = guard.increase_stock_at(id, 1, seen).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(guard.get(id).await.unwrap().stock(), 9);
    }

    #[tokio::test]
    async fn test_staged_increase_skips_eliminated() {
        let guard = guard();
        let product = guard
            .register_product("Widget", Money::from_cents(1000), 1)
            .await
            .unwrap();
        let id = product.id().unwrap();
        guard.eliminate(id).await.unwrap();

        let mut uow = UnitOfWork::begin("test");
        guard.stage_increase(&mut uow, id, 3, true).await.unwrap();
        assert!(uow.is_empty());
        assert!(guard.stage_increase(&mut uow, id, 3, false).await.is_err());
    }
}
