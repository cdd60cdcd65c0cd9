//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::state_machine::StateMachine;
use crate::value_objects::{LineChange, LineItem, LineItems, Money, ProductId};

use super::{OrderAction, OrderError, OrderEvent, OrderState, events::OrderCreatedData};

/// Order aggregate root.
///
/// Holds copies of the cart lines it was created from, so later cart changes
/// never reach it. The total is recomputed from the lines after every change.
#[derive(Debug, Clone, Default)]
pub struct Order {
    id: Option<AggregateId>,
    version: Version,
    cart_id: Option<AggregateId>,
    customer_id: Option<CustomerId>,
    state: OrderState,
    items: LineItems,
    total: Money,
    payment_id: Option<AggregateId>,
    cancel_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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
            OrderEvent::OrderCreated(data) => self.apply_created(data),
            OrderEvent::ItemAdded(line) => self.apply_line_change(LineChange::Added(line)),
            OrderEvent::ItemQuantityUpdated(data) => {
                self.apply_line_change(LineChange::QuantityUpdated(data))
            }
            OrderEvent::ItemRemoved(data) => self.apply_line_change(LineChange::Removed(data)),
            OrderEvent::OrderConfirmed(_) => self.state = OrderState::Confirmed,
            OrderEvent::OrderPaid(data) => {
                self.state = OrderState::Paid;
                self.payment_id = Some(data.payment_id);
            }
            OrderEvent::OrderShipped(_) => self.state = OrderState::Shipped,
            OrderEvent::OrderDelivered(_) => self.state = OrderState::Delivered,
            OrderEvent::OrderCanceled(data) => {
                self.state = OrderState::Canceled;
                self.cancel_reason = Some(data.reason);
            }
        }
    }
}

// Query methods
impl Order {
    /// The cart this order was created from.
    pub fn cart_id(&self) -> Option<AggregateId> {
        self.cart_id
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn items(&self) -> &LineItems {
        &self.items
    }

    pub fn get_item(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.get(product_id)
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// The payment that settled this order.
    pub fn payment_id(&self) -> Option<AggregateId> {
        self.payment_id
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Creates an order from copies of a cart's lines.
    pub fn create(
        &self,
        order_id: AggregateId,
        cart_id: AggregateId,
        customer_id: CustomerId,
        items: Vec<LineItem>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }

        let items = LineItems::from_lines(items)?;
        Ok(vec![OrderEvent::order_created(
            order_id,
            cart_id,
            customer_id,
            items.to_vec(),
        )])
    }

    /// Adds a line; a product already present has its quantity increased.
    pub fn add_item(&self, line: LineItem) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::MutateItems)?;
        Ok(vec![self.items.plan_add(line)?.into()])
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::MutateItems)?;
        Ok(self
            .items
            .plan_update(product_id, quantity)?
            .map(OrderEvent::from)
            .into_iter()
            .collect())
    }

    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::MutateItems)?;
        Ok(vec![self.items.plan_remove(product_id)?.into()])
    }

    pub fn confirm(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::Confirm)?;
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        Ok(vec![OrderEvent::order_confirmed(self.total)])
    }

    /// Records payment `payment_id`, which must cover the total exactly.
    pub fn pay(&self, payment_id: AggregateId, amount: Money) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::Pay)?;
        if amount != self.total {
            return Err(OrderError::AmountMismatch {
                total: self.total,
                paid: amount,
            });
        }
        Ok(vec![OrderEvent::order_paid(payment_id, amount)])
    }

    pub fn ship(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::Ship)?;
        Ok(vec![OrderEvent::order_shipped()])
    }

    pub fn deliver(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::Deliver)?;
        Ok(vec![OrderEvent::order_delivered()])
    }

    pub fn cancel(&self, reason: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.guard(OrderAction::Cancel)?;
        Ok(vec![OrderEvent::order_canceled(reason, self.state)])
    }

    fn guard(&self, action: OrderAction) -> Result<OrderState, OrderError> {
        self.state
            .next(action)
            .ok_or(OrderError::InvalidStateTransition {
                current_state: self.state,
                action,
            })
    }
}

// Apply event helpers
impl Order {
    fn apply_created(&mut self, data: OrderCreatedData) {
        self.id = Some(data.order_id);
        self.cart_id = Some(data.cart_id);
        self.customer_id = Some(data.customer_id);
        self.items = LineItems::from(data.items);
        self.total = self.items.total();
        self.state = OrderState::Created;
        self.created_at = Some(data.created_at);
    }

    fn apply_line_change(&mut self, change: LineChange) {
        self.items.apply(change);
        self.total = self.items.total();
    }
}
