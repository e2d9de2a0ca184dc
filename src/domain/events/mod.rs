//! Domain events
use crate::domain::value_objects::Money;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, item_count: usize, total: Money, from_cart: bool },
    CartsCleared { user_id: Uuid, count: u64 },
}

impl DomainEvent {
    /// Bus subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "webstore.orders.placed",
            Self::CartsCleared { .. } => "webstore.carts.cleared",
        }
    }
}
