//! Response bodies for carts and orders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{CartDetails, ItemDetails, OrderDetails, Product};
use crate::domain::value_objects::Money;

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product: Product,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItemResponse>,
    pub subtotal_price: Money,
    pub total_freight: Money,
    pub total_price: Money,
}

impl From<CartDetails> for CartResponse {
    fn from(details: CartDetails) -> Self {
        let CartDetails { cart, items, totals } = details;
        Self {
            id: cart.id,
            user: cart.user_id,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            items: items
                .into_iter()
                .map(|ItemDetails { item, product }| CartItemResponse {
                    id: item.id,
                    cart_id: item.parent_id,
                    product,
                    price: item.price,
                    created_at: item.created_at,
                    updated_at: item.updated_at,
                })
                .collect(),
            subtotal_price: totals.subtotal,
            total_freight: totals.freight,
            total_price: totals.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product: Product,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub freight: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_price: Money,
    pub total_price: Money,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let OrderDetails { order, items, totals } = details;
        Self {
            id: order.id,
            user: order.user_id,
            freight: order.freight,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items
                .into_iter()
                .map(|ItemDetails { item, product }| OrderItemResponse {
                    id: item.id,
                    order_id: item.parent_id,
                    product,
                    price: item.price,
                    created_at: item.created_at,
                    updated_at: item.updated_at,
                })
                .collect(),
            subtotal_price: totals.subtotal,
            total_price: totals.total,
        }
    }
}
