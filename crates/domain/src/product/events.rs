//! Product domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{Money, ProductId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductRegistered(ProductRegisteredData),
    StockDecreased(StockDecreasedData),
    StockIncreased(StockIncreasedData),
    ProductEliminated(ProductEliminatedData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductRegistered(_) => "ProductRegistered",
            ProductEvent::StockDecreased(_) => "StockDecreased",
            ProductEvent::StockIncreased(_) => "StockIncreased",
            ProductEvent::ProductEliminated(_) => "ProductEliminated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRegisteredData {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub initial_stock: u32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDecreasedData {
    pub quantity: u32,

    /// Stock left after the decrease.
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockIncreasedData {
    pub quantity: u32,

    /// Stock after the increase.
    pub resulting: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEliminatedData {
    pub eliminated_at: DateTime<Utc>,
}

impl ProductEvent {
    pub fn product_registered(
        product_id: ProductId,
        name: impl Into<String>,
        price: Money,
        initial_stock: u32,
    ) -> Self {
        ProductEvent::ProductRegistered(ProductRegisteredData {
            product_id,
            name: name.into(),
            price,
            initial_stock,
            registered_at: Utc::now(),
        })
    }

    pub fn stock_decreased(quantity: u32, remaining: u32) -> Self {
        ProductEvent::StockDecreased(StockDecreasedData {
            quantity,
            remaining,
        })
    }

    pub fn stock_increased(quantity: u32, resulting: u32) -> Self {
        ProductEvent::StockIncreased(StockIncreasedData {
            quantity,
            resulting,
        })
    }

    pub fn product_eliminated() -> Self {
        ProductEvent::ProductEliminated(ProductEliminatedData {
            eliminated_at: Utc::now(),
        })
    }
}
