//! Line items shared by carts and orders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;

/// Owner of a line-item collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemParent {
    Cart(Uuid),
    Order(Uuid),
}

impl ItemParent {
    pub fn id(&self) -> Uuid {
        match self { Self::Cart(id) | Self::Order(id) => *id }
    }
}

/// A product reference plus the price snapshot taken when the item was
/// created. The snapshot never follows later product price changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LineItem {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub product_id: Uuid,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineItem {
    pub fn create(parent: ItemParent, product_id: Uuid, price: Money) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), parent_id: parent.id(), product_id, price, created_at: now, updated_at: now }
    }

    pub fn change(&mut self, product_id: Uuid, price: Money) {
        self.product_id = product_id;
        self.price = price;
        self.updated_at = Utc::now();
    }
}

/// A line item joined with the product it references.
#[derive(Clone, Debug)]
pub struct ItemDetails {
    pub item: LineItem,
    pub product: Product,
}
