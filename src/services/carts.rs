//! Cart service.

use serde::Deserialize;
use uuid::Uuid;

use super::{apply_sync, insert_items, load_items, product_catalog, CommerceError};
use crate::domain::aggregates::{Cart, CartDetails, ItemParent};
use crate::domain::events::DomainEvent;
use crate::domain::reconcile::{self, ItemInput};
use crate::domain::value_objects::FreightPolicy;
use crate::events::EventPublisher;
use crate::store::{Store, UnitOfWork};

pub const NO_CART: &str = "There isn't cart data for this user.";

/// Cart body. On update, a missing `items` key leaves the items untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CartInput {
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
}

pub struct CartService<'a> {
    store: &'a dyn Store,
    freight: FreightPolicy,
    events: &'a EventPublisher,
}

impl<'a> CartService<'a> {
    pub fn new(store: &'a dyn Store, freight: FreightPolicy, events: &'a EventPublisher) -> Self {
        Self { store, freight, events }
    }

    /// Create a cart for `user_id` with one item per descriptor.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Invalid` with every item failure; nothing is
    /// persisted in that case.
    pub async fn create(&self, user_id: Uuid, input: CartInput) -> Result<CartDetails, CommerceError> {
        let inputs = input.items.unwrap_or_default();
        let mut uow = self.store.begin().await?;

        let catalog = product_catalog(uow.as_mut(), &inputs).await?;
        let items = reconcile::plan_insert(&inputs, &catalog).map_err(|e| CommerceError::Invalid(e.to_json()))?;

        let cart = Cart::for_user(user_id);
        uow.insert_cart(&cart).await?;
        let parent = ItemParent::Cart(cart.id);
        insert_items(uow.as_mut(), parent, items).await?;

        let details = CartDetails::new(cart, load_items(uow.as_mut(), parent).await?, &self.freight);
        uow.commit().await?;

        tracing::info!(
            cart_id = %details.cart.id,
            user_id = %user_id,
            items = details.items.len(),
            total = %details.totals.total,
            "cart created"
        );
        Ok(details)
    }

    /// Replace the items of one of the caller's carts.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` when the cart is not the caller's
    /// and `CommerceError::Invalid` with every item failure.
    pub async fn update(&self, user_id: Uuid, cart_id: Uuid, input: CartInput) -> Result<CartDetails, CommerceError> {
        let mut uow = self.store.begin().await?;
        let mut cart = uow.find_cart(user_id, cart_id).await?.ok_or_else(|| CommerceError::NotFound(NO_CART.into()))?;
        let parent = ItemParent::Cart(cart.id);

        if let Some(inputs) = input.items {
            let existing = uow.list_items(parent).await?;
            let catalog = product_catalog(uow.as_mut(), &inputs).await?;
            let plan = reconcile::plan_sync(&existing, &inputs, &catalog).map_err(|e| CommerceError::Invalid(e.to_json()))?;
            tracing::debug!(
                cart_id = %cart.id,
                removed = plan.remove.len(),
                updated = plan.update.len(),
                inserted = plan.insert.len(),
                "syncing cart items"
            );
            apply_sync(uow.as_mut(), parent, existing, plan).await?;
        }
        cart.touch();
        uow.update_cart(&cart).await?;

        let details = CartDetails::new(cart, load_items(uow.as_mut(), parent).await?, &self.freight);
        uow.commit().await?;

        tracing::info!(cart_id = %details.cart.id, user_id = %user_id, items = details.items.len(), "cart updated");
        Ok(details)
    }

    /// The caller's most recently created cart.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` when the caller has no cart.
    pub async fn current(&self, user_id: Uuid) -> Result<CartDetails, CommerceError> {
        let mut uow = self.store.begin().await?;
        let cart = uow.latest_cart(user_id).await?.ok_or_else(|| CommerceError::NotFound(NO_CART.into()))?;
        self.details(uow.as_mut(), cart).await
    }

    /// Delete every cart of the caller.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` when there was nothing to delete.
    pub async fn delete_current(&self, user_id: Uuid) -> Result<u64, CommerceError> {
        let mut uow = self.store.begin().await?;
        let count = uow.delete_carts(user_id).await?;
        if count == 0 {
            return Err(CommerceError::NotFound(NO_CART.into()));
        }
        uow.commit().await?;

        tracing::info!(user_id = %user_id, count, "carts deleted");
        self.events.publish(&DomainEvent::CartsCleared { user_id, count }).await;
        Ok(count)
    }

    async fn details(&self, uow: &mut dyn UnitOfWork, cart: Cart) -> Result<CartDetails, CommerceError> {
        let items = load_items(uow, ItemParent::Cart(cart.id)).await?;
        Ok(CartDetails::new(cart, items, &self.freight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Product, ProductDraft};
    use crate::domain::value_objects::Money;
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, cents: i64) -> Product {
        let product = Product::create(ProductDraft {
            name: "test product".into(),
            price: Money::from_cents(cents),
            score: Some(500),
            image: None,
        });
        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&product).await.unwrap();
        uow.commit().await.unwrap();
        product
    }

    fn items(inputs: Vec<ItemInput>) -> CartInput { CartInput { items: Some(inputs) } }

    #[tokio::test]
    async fn test_create_applies_freight_below_threshold() {
        let store = MemoryStore::new();
        let events = EventPublisher::disabled();
        let carts = CartService::new(&store, FreightPolicy::default(), &events);
        let product = seed(&store, 20_000).await;

        let one = carts.create(Uuid::now_v7(), items(vec![ItemInput::new(product.id, None)])).await.unwrap();
        assert_eq!(one.totals.freight, Money::from_cents(1_000));
        assert_eq!(one.totals.total, Money::from_cents(21_000));

        let two = carts
            .create(Uuid::now_v7(), items(vec![ItemInput::new(product.id, None), ItemInput::new(product.id, None)]))
            .await
            .unwrap();
        assert_eq!(two.totals.freight, Money::ZERO);
        assert_eq!(two.totals.total, Money::from_cents(40_000));
    }

    #[tokio::test]
    async fn test_update_removes_omitted_items() {
        let store = MemoryStore::new();
        let events = EventPublisher::disabled();
        let carts = CartService::new(&store, FreightPolicy::default(), &events);
        let product = seed(&store, 1_050).await;
        let user_id = Uuid::now_v7();

        let cart = carts
            .create(user_id, items(vec![ItemInput::new(product.id, None), ItemInput::new(product.id, None)]))
            .await
            .unwrap();
        let kept = cart.items[0].item.id;
        let keep = ItemInput::existing(kept, product.id, Some(Money::from_cents(500)));

        let updated = carts.update(user_id, cart.cart.id, items(vec![keep])).await.unwrap();
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].item.id, kept);
        assert_eq!(updated.items[0].item.price, Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_unknown_item_rolls_back() {
        let store = MemoryStore::new();
        let events = EventPublisher::disabled();
        let carts = CartService::new(&store, FreightPolicy::default(), &events);
        let product = seed(&store, 1_050).await;
        let user_id = Uuid::now_v7();

        let cart = carts.create(user_id, items(vec![ItemInput::new(product.id, None)])).await.unwrap();
        let unknown = ItemInput::existing(Uuid::now_v7(), product.id, None);
        let err = carts.update(user_id, cart.cart.id, items(vec![ItemInput::new(product.id, None), unknown])).await;

        let Err(CommerceError::Invalid(body)) = err else { panic!("expected item errors") };
        assert_eq!(body["items"][0]["index"], 1);
        assert_eq!(body["items"][0]["errors"]["id"][0], reconcile::ITEM_DOES_NOT_EXIST);

        let current = carts.current(user_id).await.unwrap();
        assert_eq!(current.items.len(), 1);
        assert_eq!(current.items[0].item.id, cart.items[0].item.id);
    }

    #[tokio::test]
    async fn test_update_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let events = EventPublisher::disabled();
        let carts = CartService::new(&store, FreightPolicy::default(), &events);
        let cart = carts.create(Uuid::now_v7(), CartInput::default()).await.unwrap();

        let err = carts.update(Uuid::now_v7(), cart.cart.id, CartInput::default()).await;
        assert!(matches!(err, Err(CommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_current_without_cart() {
        let store = MemoryStore::new();
        let events = EventPublisher::disabled();
        let carts = CartService::new(&store, FreightPolicy::default(), &events);
        let user_id = Uuid::now_v7();

        assert!(matches!(carts.delete_current(user_id).await, Err(CommerceError::NotFound(_))));
        carts.create(user_id, CartInput::default()).await.unwrap();
        carts.create(user_id, CartInput::default()).await.unwrap();
        assert_eq!(carts.delete_current(user_id).await.unwrap(), 2);
        assert!(matches!(carts.current(user_id).await, Err(CommerceError::NotFound(_))));
    }
}
