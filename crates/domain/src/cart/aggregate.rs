//! Cart aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::state_machine::StateMachine;
use crate::value_objects::{LineChange, LineItem, LineItems, Money, ProductId};

use super::{CartAction, CartError, CartEvent, CartState, events::CartCreatedData};

/// A customer's pre-checkout collection of lines.
///
/// Cart lines carry the price captured when they were added. Nothing here
/// touches stock; availability is checked by the caller before lines are added.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    id: Option<AggregateId>,
    version: Version,
    customer_id: Option<CustomerId>,
    state: CartState,
    items: LineItems,
    deleted: bool,
    created_at: Option<DateTime<Utc>>,
    abandoned_at: Option<DateTime<Utc>>,
    order_id: Option<AggregateId>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
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
            CartEvent::CartCreated(data) => self.apply_created(data),
            CartEvent::ItemAdded(line) => self.items.apply(LineChange::Added(line)),
            CartEvent::ItemQuantityUpdated(data) => {
                self.items.apply(LineChange::QuantityUpdated(data))
            }
            CartEvent::ItemRemoved(data) => self.items.apply(LineChange::Removed(data)),
            CartEvent::CartReactivated(_) => {
                self.state = CartState::Active;
                self.abandoned_at = None;
            }
            CartEvent::CartCheckedOut(_) => self.state = CartState::CheckedOut,
            CartEvent::CartAbandoned(data) => {
                self.state = CartState::Abandoned;
                self.abandoned_at = Some(data.abandoned_at);
            }
            CartEvent::CartConfirmed(data) => {
                self.state = CartState::Confirmed;
                self.order_id = Some(data.order_id);
            }
            CartEvent::CartDeleted(_) => self.deleted = true,
        }
    }

    fn exists(&self) -> bool {
        self.id.is_some() && !self.deleted
    }
}

// Query methods
impl Cart {
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn state(&self) -> CartState {
        self.state
    }

    pub fn items(&self) -> &LineItems {
        &self.items
    }

    pub fn get_item(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.get(product_id)
    }

    pub fn total(&self) -> Money {
        self.items.total()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn abandoned_at(&self) -> Option<DateTime<Utc>> {
        self.abandoned_at
    }

    /// The order this cart was confirmed into.
    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

// Command methods (return events)
impl Cart {
    pub fn create(
        &self,
        cart_id: AggregateId,
        customer_id: CustomerId,
        items: Vec<LineItem>,
    ) -> Result<Vec<CartEvent>, CartError> {
        if self.id.is_some() {
            return Err(CartError::AlreadyCreated);
        }

        let items = LineItems::from_lines(items)?;
        Ok(vec![CartEvent::cart_created(
            cart_id,
            customer_id,
            items.to_vec(),
        )])
    }

    /// Adds a line, merging it into an existing line for the same product.
    pub fn add_item(&self, line: LineItem) -> Result<Vec<CartEvent>, CartError> {
        let mut events = self.begin_item_change()?;
        events.push(self.items.plan_add(line)?.into());
        Ok(events)
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartEvent>, CartError> {
        let mut events = self.begin_item_change()?;
        match self.items.plan_update(product_id, quantity)? {
            Some(change) => events.push(change.into()),
            // Nothing to record; an abandoned cart stays abandoned.
            None => events.clear(),
        }
        Ok(events)
    }

    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<CartEvent>, CartError> {
        let mut events = self.begin_item_change()?;
        events.push(self.items.plan_remove(product_id)?.into());
        Ok(events)
    }

    pub fn check_out(&self) -> Result<Vec<CartEvent>, CartError> {
        self.guard(CartAction::CheckOut)?;
        if self.items.is_empty() {
            return Err(CartError::NoItems);
        }
        Ok(vec![CartEvent::cart_checked_out(self.total())])
    }

    pub fn abandon(&self) -> Result<Vec<CartEvent>, CartError> {
        self.guard(CartAction::Abandon)?;
        Ok(vec![CartEvent::cart_abandoned()])
    }

    /// Marks the cart as turned into the confirmed order `order_id`.
    pub fn confirm(&self, order_id: AggregateId) -> Result<Vec<CartEvent>, CartError> {
        self.guard(CartAction::Confirm)?;
        Ok(vec![CartEvent::cart_confirmed(order_id)])
    }

    pub fn delete(&self) -> Result<Vec<CartEvent>, CartError> {
        self.guard(CartAction::Delete)?;
        Ok(vec![CartEvent::cart_deleted()])
    }

    /// Checks that items may change and reactivates an abandoned cart.
    fn begin_item_change(&self) -> Result<Vec<CartEvent>, CartError> {
        self.guard(CartAction::MutateItems)?;
        Ok(if self.state == CartState::Abandoned {
            vec![CartEvent::cart_reactivated()]
        } else {
            Vec::new()
        })
    }

    fn guard(&self, action: CartAction) -> Result<CartState, CartError> {
        self.state
            .next(action)
            .ok_or(CartError::InvalidStateTransition {
                current_state: self.state,
                action,
            })
    }
}

// Apply event helpers
impl Cart {
    fn apply_created(&mut self, data: CartCreatedData) {
        self.id = Some(data.cart_id);
        self.customer_id = Some(data.customer_id);
        self.items = LineItems::from(data.items);
        self.state = CartState::Active;
        self.created_at = Some(data.created_at);
    }
}
