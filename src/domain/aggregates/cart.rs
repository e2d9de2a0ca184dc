//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::ItemDetails;
use crate::domain::value_objects::{FreightPolicy, Money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, created_at: now, updated_at: now }
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Derived cart amounts; never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Money,
    pub freight: Money,
    pub total: Money,
}

impl CartTotals {
    pub fn compute(prices: &[Money], policy: &FreightPolicy) -> Self {
        let subtotal: Money = prices.iter().sum();
        let freight = policy.freight(prices.len(), subtotal);
        Self { subtotal, freight, total: subtotal + freight }
    }
}

/// A cart with its items and computed amounts.
#[derive(Clone, Debug)]
pub struct CartDetails {
    pub cart: Cart,
    pub items: Vec<ItemDetails>,
    pub totals: CartTotals,
}

impl CartDetails {
    pub fn new(cart: Cart, items: Vec<ItemDetails>, policy: &FreightPolicy) -> Self {
        let prices: Vec<Money> = items.iter().map(|d| d.item.price).collect();
        let totals = CartTotals::compute(&prices, policy);
        Self { cart, items, totals }
    }
}
