//! Cart lifecycle.

use common::{AggregateId, CustomerId};
use domain::{Cart, CommandHandler, LineItem, ProductId};
use event_store::EventStore;

use crate::env::{Environment, commit_one};
use crate::error::Result;
use crate::inventory::InventoryGuard;

/// Pre-checkout item collection of a customer.
///
/// Availability is checked when lines are priced; stock is never reserved.
pub struct CartService<S: EventStore> {
    carts: CommandHandler<S, Cart>,
    inventory: InventoryGuard<S>,
    env: Environment,
}

impl<S: EventStore + Clone> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            inventory: self.inventory.clone(),
            env: self.env.clone(),
        }
    }
}

impl<S: EventStore + Clone> CartService<S> {
    pub fn new(store: S, env: Environment) -> Self {
        Self {
            carts: CommandHandler::new(store.clone()),
            inventory: InventoryGuard::new(store),
            env,
        }
    }
}

impl<S: EventStore> CartService<S> {
    pub async fn get(&self, cart_id: AggregateId) -> Result<Cart> {
        Ok(self.carts.get(cart_id).await?)
    }

    /// Creates a cart for an active customer, pricing each line at the
    /// product's current price.
    #[tracing::instrument(skip(self, items))]
    pub async fn create(
        &self,
        customer_id: CustomerId,
        items: &[(ProductId, u32)],
    ) -> Result<Cart> {
        self.env.active_customer(customer_id).await?;

        let mut lines: Vec<LineItem> = Vec::with_capacity(items.len());
        for &(product_id, quantity) in items {
            let held = lines
                .iter()
                .filter(|l| l.product_id == product_id)
                .map(|l| l.quantity)
                .sum();
            lines.push(self.inventory.snapshot(product_id, quantity, held).await?);
        }

        let cart_id = AggregateId::new();
        let mut cart = Cart::default();
        let events = cart.create(cart_id, customer_id, lines)?;
        commit_one(self.carts.store(), "cart.create", cart_id, &mut cart, events).await?;

        tracing::info!(%cart_id, "cart created");
        Ok(cart)
    }

    /// Adds units of a product; a present product has its line increased.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: AggregateId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.get(cart_id).await?;
        let held = cart.get_item(product_id).map_or(0, |l| l.quantity);
        let line = self.inventory.snapshot(product_id, quantity, held).await?;

        let events = cart.add_item(line)?;
        commit_one(self.carts.store(), "cart.add_item", cart_id, &mut cart, events).await?;
        Ok(cart)
    }

    /// Sets a line's quantity; zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        cart_id: AggregateId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.get(cart_id).await?;
        let events = cart.update_item(product_id, quantity)?;
        if quantity > 0 && !events.is_empty() {
            self.inventory.check_available(product_id, quantity).await?;
        }

        commit_one(self.carts.store(), "cart.update_item", cart_id, &mut cart, events).await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: AggregateId, product_id: ProductId) -> Result<Cart> {
        let mut cart = self.get(cart_id).await?;
        let events = cart.remove_item(product_id)?;
        commit_one(self.carts.store(), "cart.remove_item", cart_id, &mut cart, events).await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn check_out(&self, cart_id: AggregateId) -> Result<Cart> {
        let mut cart = self.get(cart_id).await?;
        let events = cart.check_out()?;
        commit_one(self.carts.store(), "cart.check_out", cart_id, &mut cart, events).await?;

        tracing::info!(%cart_id, total = %cart.total(), "cart checked out");
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn abandon(&self, cart_id: AggregateId) -> Result<Cart> {
        let mut cart = self.get(cart_id).await?;
        let events = cart.abandon()?;
        commit_one(self.carts.store(), "cart.abandon", cart_id, &mut cart, events).await?;
        Ok(cart)
    }

    /// Deletes a cart that was never confirmed; it is no longer found afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, cart_id: AggregateId) -> Result<()> {
        let mut cart = self.get(cart_id).await?;
        let events = cart.delete()?;
        commit_one(self.carts.store(), "cart.delete", cart_id, &mut cart, events).await?;
        tracing::info!(%cart_id, "cart deleted");
        Ok(())
    }
}
