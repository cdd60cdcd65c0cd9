//! Order lifecycle.

use common::AggregateId;
use domain::{Cart, CartState, CommandHandler, DomainError, Order, ProductId, UnitOfWork};
use event_store::{EventStore, EventStoreError, UniqueKey};

use crate::env::{Environment, commit_one, keys};
use crate::error::{LifecycleError, Result};
use crate::inventory::InventoryGuard;

/// The confirmed sale made from a checked-out cart.
pub struct OrderService<S: EventStore> {
    orders: CommandHandler<S, Order>,
    carts: CommandHandler<S, Cart>,
    inventory: InventoryGuard<S>,
    env: Environment,
}

impl<S: EventStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            carts: self.carts.clone(),
            inventory: self.inventory.clone(),
            env: self.env.clone(),
        }
    }
}

impl<S: EventStore + Clone> OrderService<S> {
    pub fn new(store: S, env: Environment) -> Self {
        Self {
            orders: CommandHandler::new(store.clone()),
            carts: CommandHandler::new(store.clone()),
            inventory: InventoryGuard::new(store),
            env,
        }
    }
}

impl<S: EventStore> OrderService<S> {
    pub async fn get(&self, order_id: AggregateId) -> Result<Order> {
        Ok(self.orders.get(order_id).await?)
    }

    /// Returns the order made from `cart_id`, if any.
    pub async fn find_by_cart(&self, cart_id: AggregateId) -> Result<Option<Order>> {
        let key = UniqueKey::new(keys::ORDER_CART, cart_id);
        match self.orders.store().find_unique(&key).await? {
            Some(order_id) => Ok(self.orders.load_existing(order_id).await?),
            None => Ok(None),
        }
    }

    /// Creates the single order of a checked-out cart.
    ///
    /// The cart reference is claimed together with the order's events, so of
    /// two concurrent creators exactly one commits.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, cart_id: AggregateId) -> Result<Order> {
        let cart = self.carts.get(cart_id).await?;
        if cart.state() != CartState::CheckedOut {
            return Err(LifecycleError::CartNotCheckedOut {
                cart_id,
                state: cart.state(),
            });
        }

        let key = UniqueKey::new(keys::ORDER_CART, cart_id);
        if let Some(existing) = self.orders.store().find_unique(&key).await? {
            return Err(LifecycleError::OrderAlreadyExists {
                cart_id,
                existing: Some(existing),
            });
        }

        let customer_id = cart
            .customer_id()
            .ok_or_else(|| DomainError::not_found::<Cart>(cart_id))?;
        self.env.active_customer(customer_id).await?;

        let order_id = AggregateId::new();
        let mut order = Order::default();
        let events = order.create(order_id, cart_id, customer_id, cart.items().to_vec())?;

        let mut uow = UnitOfWork::begin("order.create");
        uow.stage(order_id, &mut order, events)?;
        uow.claim_unique(key, order_id);
        uow.commit(self.orders.store())
            .await
            .map_err(|err| match err {
                DomainError::EventStore(EventStoreError::UniqueViolation { existing, .. }) => {
                    LifecycleError::OrderAlreadyExists { cart_id, existing }
                }
                other => other.into(),
            })?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, %cart_id, total = %order.total(), "order created");
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        order_id: AggregateId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let held = order.get_item(product_id).map_or(0, |l| l.quantity);
        let line = self.inventory.snapshot(product_id, quantity, held).await?;

        let events = order.add_item(line)?;
        commit_one(self.orders.store(), "order.add_item", order_id, &mut order, events).await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        order_id: AggregateId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let events = order.update_item(product_id, quantity)?;
        if quantity > 0 && !events.is_empty() {
            self.inventory.check_available(product_id, quantity).await?;
        }

        commit_one(self.orders.store(), "order.update_item", order_id, &mut order, events).await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, order_id: AggregateId, product_id: ProductId) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let events = order.remove_item(product_id)?;
        commit_one(self.orders.store(), "order.remove_item", order_id, &mut order, events).await?;
        Ok(order)
    }

    /// Confirms the order, takes its stock and confirms its cart, together.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, order_id: AggregateId) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let events = order.confirm()?;

        let mut uow = UnitOfWork::begin("order.confirm");
        for line in order.items().iter() {
            self.inventory
                .stage_decrease(&mut uow, line.product_id, line.quantity)
                .await?;
        }

        if let Some(cart_id) = order.cart_id() {
            match self.carts.load_existing(cart_id).await? {
                Some(mut cart) => {
                    let cart_events = cart.confirm(order_id)?;
                    uow.stage(cart_id, &mut cart, cart_events)?;
                }
                None => tracing::debug!(%cart_id, "cart deleted before confirmation"),
            }
        }

        uow.stage(order_id, &mut order, events)?;
        uow.commit(self.orders.store()).await?;

        metrics::counter!("orders_confirmed_total").increment(1);
        tracing::info!(%order_id, total = %order.total(), "order confirmed");

        if let Some(customer_id) = order.customer_id() {
            self.env
                .notify_customer(
                    customer_id,
                    "Order confirmed",
                    format!("Order {order_id} was confirmed, total {}", order.total()),
                )
                .await;
        }
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, order_id: AggregateId) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let events = order.ship()?;
        commit_one(self.orders.store(), "order.ship", order_id, &mut order, events).await?;

        tracing::info!(%order_id, "order shipped");
        if let Some(customer_id) = order.customer_id() {
            self.env
                .notify_customer(
                    customer_id,
                    "Order shipped",
                    format!("Order {order_id} is on its way"),
                )
                .await;
        }
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn deliver(&self, order_id: AggregateId) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let events = order.deliver()?;
        commit_one(self.orders.store(), "order.deliver", order_id, &mut order, events).await?;

        tracing::info!(%order_id, "order delivered");
        Ok(order)
    }

    /// Cancels the order, returning its stock if it was taken.
    ///
    /// Lines of eliminated products are not restocked.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(&self, order_id: AggregateId, reason: impl Into<String>) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let restock = order.state().holds_stock();
        let events = order.cancel(reason)?;

        let mut uow = UnitOfWork::begin("order.cancel");
        if restock {
            for line in order.items().iter() {
                self.inventory
                    .stage_increase(&mut uow, line.product_id, line.quantity, true)
                    .await?;
            }
        }
        uow.stage(order_id, &mut order, events)?;
        uow.commit(self.orders.store()).await?;

        metrics::counter!("orders_canceled_total").increment(1);
        tracing::info!(%order_id, restocked = restock, "order canceled");
        Ok(order)
    }
}
