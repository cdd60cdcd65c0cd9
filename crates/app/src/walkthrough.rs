//! A scripted pass through every lifecycle against a given store.

use common::AggregateId;
use domain::{
    Aggregate, Money, OrderState, PaymentMethod, PaymentState, PurchaseState, ReceivedLine,
};
use event_store::EventStore;
use lifecycle::{Environment, InMemoryDirectory, LifecycleConfig, PurchaseLine, RetailCore};

use crate::error::{AppError, Result};

/// What the walkthrough left behind.
#[derive(Debug, Clone)]
pub struct Summary {
    pub order_id: AggregateId,
    pub order_state: OrderState,
    pub order_total: Money,
    pub payment_state: PaymentState,
    pub purchase_state: PurchaseState,
    /// Stock per product name after the run.
    pub stock: Vec<(String, u32)>,
}

/// Restocks from a supplier, then sells to a customer through delivery.
#[tracing::instrument(skip(store, config))]
pub async fn run<S: EventStore + Clone>(store: S, config: LifecycleConfig) -> Result<Summary> {
    let directory = InMemoryDirectory::new();
    let customer = directory.register_customer("Ada Lovelace", "ada@example.com");
    let supplier = directory.register_supplier("Acme Supplies", "orders@acme.test");
    let core = RetailCore::new(store, Environment::in_memory(directory, config));

    let keyboard = core
        .inventory
        .register_product("Keyboard", Money::from_cents(4999), 0)
        .await?;
    let mouse = core
        .inventory
        .register_product("Mouse", Money::from_cents(1999), 5)
        .await?;
    let (keyboard_id, mouse_id) = (id_of(&keyboard)?, id_of(&mouse)?);

    let purchase = core
        .purchases
        .create(
            supplier,
            format!("PO-{}", &AggregateId::new().to_string()[..8]),
            &[PurchaseLine::new(keyboard_id, 10, Money::from_cents(3000))],
        )
        .await?;
    let purchase_id = id_of(&purchase)?;
    core.purchases.confirm(purchase_id).await?;
    core.purchases
        .receive(purchase_id, &[ReceivedLine::new(keyboard_id, 10)])
        .await?;
    let purchase = core.purchases.close(purchase_id).await?;
    tracing::info!(%purchase_id, "restock closed");

    let cart = core
        .carts
        .create(customer, &[(keyboard_id, 1), (mouse_id, 2)])
        .await?;
    let cart_id = id_of(&cart)?;
    core.carts.check_out(cart_id).await?;

    let order = core.orders.create_order(cart_id).await?;
    let order_id = id_of(&order)?;
    core.orders.confirm(order_id).await?;

    let payment = core
        .payments
        .create(order_id, PaymentMethod::CreditCard)
        .await?;
    let payment = core.payments.confirm(id_of(&payment)?).await?;

    core.orders.ship(order_id).await?;
    let order = core.orders.deliver(order_id).await?;
    tracing::info!(%order_id, total = %order.total(), "order delivered");

    let mut stock = Vec::new();
    for id in [keyboard_id, mouse_id] {
        let product = core.inventory.get(id).await?;
        stock.push((product.name().to_string(), product.stock()));
    }

    Ok(Summary {
        order_id,
        order_state: order.state(),
        order_total: order.total(),
        payment_state: payment.state(),
        purchase_state: purchase.state(),
        stock,
    })
}

fn id_of<A: Aggregate>(aggregate: &A) -> Result<AggregateId> {
    aggregate
        .id()
        .ok_or(AppError::MissingId(A::aggregate_type()))
}
