//! Order service and the cart-to-order converter.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

use super::{apply_sync, insert_items, load_items, product_catalog, CommerceError};
use crate::domain::aggregates::{CartTotals, ItemParent, Order, OrderDetails};
use crate::domain::events::DomainEvent;
use crate::domain::reconcile::{self, ItemInput};
use crate::domain::value_objects::{FreightPolicy, Money};
use crate::events::EventPublisher;
use crate::services::carts::NO_CART;
use crate::store::{Page, PageRequest, Store, UnitOfWork};
use crate::validation;

pub const ORDER_NOT_FOUND: &str = "Not found.";

/// Order body. On update, missing keys leave the stored values untouched.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct OrderInput {
    #[serde(default)]
    #[validate(custom = "validation::money")]
    pub freight: Option<Money>,
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
}

/// Outcome of the in-transaction part of order creation.
struct Placed {
    details: OrderDetails,
    carts_cleared: u64,
}

pub struct OrderService<'a> {
    store: &'a dyn Store,
    freight: FreightPolicy,
    events: &'a EventPublisher,
}

impl<'a> OrderService<'a> {
    pub fn new(store: &'a dyn Store, freight: FreightPolicy, events: &'a EventPublisher) -> Self {
        Self { store, freight, events }
    }

    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the query fails.
    pub async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<Page<OrderDetails>, CommerceError> {
        let mut uow = self.store.begin().await?;
        let (orders, count) = uow.list_orders(user_id, page).await?;
        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            let items = load_items(uow.as_mut(), ItemParent::Order(order.id)).await?;
            results.push(OrderDetails::new(order, items));
        }
        Ok(Page::new(results, count, page))
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` unless the order is the caller's.
    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetails, CommerceError> {
        let mut uow = self.store.begin().await?;
        let order = uow.find_order(user_id, order_id).await?.ok_or_else(not_found)?;
        let items = load_items(uow.as_mut(), ItemParent::Order(order.id)).await?;
        Ok(OrderDetails::new(order, items))
    }

    /// Create an order and clear the owner's carts.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Invalid` with the freight and item failures;
    /// nothing is persisted in that case.
    pub async fn create(&self, user_id: Uuid, input: OrderInput) -> Result<OrderDetails, CommerceError> {
        let mut errors = field_errors(&input);
        let inputs = input.items.unwrap_or_default();
        let mut uow = self.store.begin().await?;

        if !errors.is_empty() {
            let catalog = product_catalog(uow.as_mut(), &inputs).await?;
            if let Err(failures) = reconcile::plan_insert(&inputs, &catalog) {
                errors.extend(items_entry(&failures));
            }
            return Err(CommerceError::Invalid(Value::Object(errors)));
        }

        let placed = place(uow.as_mut(), user_id, input.freight.unwrap_or(Money::ZERO), &inputs)
            .await?
            .map_err(|items| CommerceError::Invalid(Value::Object(items)))?;
        uow.commit().await?;

        self.announce(&placed, false).await;
        Ok(placed.details)
    }

    /// Turn the caller's latest cart into an order, then delete all of the
    /// caller's carts.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` when the caller has no cart and
    /// `CommerceError::Invalid` with the item failures under `"order"`.
    pub async fn create_from_cart(&self, user_id: Uuid) -> Result<OrderDetails, CommerceError> {
        let mut uow = self.store.begin().await?;
        let cart = uow.latest_cart(user_id).await?.ok_or_else(|| CommerceError::NotFound(NO_CART.into()))?;

        let items = uow.list_items(ItemParent::Cart(cart.id)).await?;
        let prices: Vec<Money> = items.iter().map(|i| i.price).collect();
        let freight = CartTotals::compute(&prices, &self.freight).freight;
        let inputs: Vec<ItemInput> = items.iter().map(|i| ItemInput::new(i.product_id, Some(i.price))).collect();

        let placed = place(uow.as_mut(), user_id, freight, &inputs)
            .await?
            .map_err(|items| CommerceError::Invalid(json!({ "order": Value::Object(items) })))?;
        uow.commit().await?;

        tracing::info!(cart_id = %cart.id, order_id = %placed.details.order.id, "cart converted to order");
        self.announce(&placed, true).await;
        Ok(placed.details)
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` unless the order is the caller's and
    /// `CommerceError::Invalid` with the freight and item failures.
    pub async fn update(&self, user_id: Uuid, order_id: Uuid, input: OrderInput) -> Result<OrderDetails, CommerceError> {
        let mut errors = field_errors(&input);
        let mut uow = self.store.begin().await?;
        let mut order = uow.find_order(user_id, order_id).await?.ok_or_else(not_found)?;
        let parent = ItemParent::Order(order.id);

        if let Some(inputs) = &input.items {
            let existing = uow.list_items(parent).await?;
            let catalog = product_catalog(uow.as_mut(), inputs).await?;
            match reconcile::plan_sync(&existing, inputs, &catalog) {
                Ok(plan) if errors.is_empty() => apply_sync(uow.as_mut(), parent, existing, plan).await?,
                Ok(_) => {}
                Err(failures) => errors.extend(items_entry(&failures)),
            }
        }
        if !errors.is_empty() {
            return Err(CommerceError::Invalid(Value::Object(errors)));
        }

        match input.freight {
            Some(freight) => order.set_freight(freight),
            None => order.touch(),
        }
        uow.update_order(&order).await?;
        let details = OrderDetails::new(order, load_items(uow.as_mut(), parent).await?);
        uow.commit().await?;

        tracing::info!(order_id = %details.order.id, user_id = %user_id, items = details.items.len(), "order updated");
        Ok(details)
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` unless the order is the caller's.
    pub async fn delete(&self, user_id: Uuid, order_id: Uuid) -> Result<(), CommerceError> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_order(user_id, order_id).await? {
            return Err(not_found());
        }
        uow.commit().await?;
        tracing::info!(order_id = %order_id, user_id = %user_id, "order deleted");
        Ok(())
    }

    async fn announce(&self, placed: &Placed, from_cart: bool) {
        let order = &placed.details.order;
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            items = placed.details.items.len(),
            total = %placed.details.totals.total,
            from_cart,
            "order placed"
        );
        self.events
            .publish(&DomainEvent::OrderPlaced {
                order_id: order.id,
                user_id: order.user_id,
                item_count: placed.details.items.len(),
                total: placed.details.totals.total,
                from_cart,
            })
            .await;
        if placed.carts_cleared > 0 {
            self.events.publish(&DomainEvent::CartsCleared { user_id: order.user_id, count: placed.carts_cleared }).await;
        }
    }
}

/// Inserts the order and its items and deletes the owner's carts. The inner
/// error carries the `"items"` entry for the response body.
async fn place(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
    freight: Money,
    inputs: &[ItemInput],
) -> Result<Result<Placed, Map<String, Value>>, CommerceError> {
    let catalog = product_catalog(uow, inputs).await?;
    let items = match reconcile::plan_insert(inputs, &catalog) {
        Ok(items) => items,
        Err(failures) => return Ok(Err(items_entry(&failures))),
    };

    let order = Order::create(user_id, freight);
    uow.insert_order(&order).await?;
    let parent = ItemParent::Order(order.id);
    insert_items(uow, parent, items).await?;
    let carts_cleared = uow.delete_carts(user_id).await?;

    let details = OrderDetails::new(order, load_items(uow, parent).await?);
    Ok(Ok(Placed { details, carts_cleared }))
}

fn field_errors(input: &OrderInput) -> Map<String, Value> {
    match input.validate() {
        Ok(()) => Map::new(),
        Err(e) => match serde_json::to_value(validation::field_errors(&e)) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
    }
}

fn items_entry(failures: &reconcile::ItemErrors) -> Map<String, Value> {
    match failures.to_json() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn not_found() -> CommerceError { CommerceError::NotFound(ORDER_NOT_FOUND.into()) }
