//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::ItemDetails;
use crate::domain::value_objects::Money;

/// Placed order. Unlike a cart, freight is stored, not derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub freight: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn create(user_id: Uuid, freight: Money) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, freight, created_at: now, updated_at: now }
    }

    pub fn set_freight(&mut self, freight: Money) {
        self.freight = freight;
        self.touch();
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn compute(prices: &[Money], freight: Money) -> Self {
        let subtotal: Money = prices.iter().sum();
        Self { subtotal, total: subtotal + freight }
    }
}

#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<ItemDetails>,
    pub totals: OrderTotals,
}

impl OrderDetails {
    pub fn new(order: Order, items: Vec<ItemDetails>) -> Self {
        let prices: Vec<Money> = items.iter().map(|d| d.item.price).collect();
        let totals = OrderTotals::compute(&prices, order.freight);
        Self { order, items, totals }
    }
}
