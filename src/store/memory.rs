//! In-process store.
//!
//! Used when no `DATABASE_URL` is configured and by the integration tests.
//! A unit of work owns the store lock for its whole lifetime, so units of
//! work are fully serialized.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    PageRequest, ProductOrdering, ProductQuery, ProductSortField, RepositoryError, Store, UnitOfWork,
};
use crate::domain::aggregates::{Cart, ItemParent, LineItem, NewUser, Order, Product, User};

#[derive(Clone, Debug, Default)]
struct State {
    users: HashMap<Uuid, (User, String)>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    cart_items: HashMap<Uuid, LineItem>,
    order_items: HashMap<Uuid, LineItem>,
}

impl State {
    fn items(&self, parent: ItemParent) -> &HashMap<Uuid, LineItem> {
        match parent {
            ItemParent::Cart(_) => &self.cart_items,
            ItemParent::Order(_) => &self.order_items,
        }
    }

    fn items_mut(&mut self, parent: ItemParent) -> &mut HashMap<Uuid, LineItem> {
        match parent {
            ItemParent::Cart(_) => &mut self.cart_items,
            ItemParent::Order(_) => &mut self.order_items,
        }
    }

    fn parent_exists(&self, parent: ItemParent) -> bool {
        match parent {
            ItemParent::Cart(id) => self.carts.contains_key(&id),
            ItemParent::Order(id) => self.orders.contains_key(&id),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: State,
}

fn sort_products(products: &mut [Product], ordering: Option<ProductOrdering>) {
    products.sort_by(|a, b| {
        let primary = match ordering.map(|o| o.field) {
            Some(ProductSortField::Name) => a.name.cmp(&b.name),
            Some(ProductSortField::Price) => a.price.cmp(&b.price),
            Some(ProductSortField::Score) => a.score.cmp(&b.score),
            None => Ordering::Equal,
        };
        let primary = if ordering.is_some_and(|o| o.descending) { primary.reverse() } else { primary };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, RepositoryError> {
        if self.working.users.values().any(|(u, _)| u.username == user.username) {
            return Err(RepositoryError::Conflict(format!("username {} already exists", user.username)));
        }
        let (user, hash) = user.into_user();
        self.working.users.insert(user.id, (user.clone(), hash));
        Ok(user)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.working.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.working.users.values().find(|(u, _)| u.username == username).map(|(u, _)| u.clone()))
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .working
            .users
            .values()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials(&mut self, username: &str) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self.working.users.values().find(|(u, _)| u.username == username).cloned())
    }

    async fn list_products(&mut self, query: &ProductQuery) -> Result<(Vec<Product>, u64), RepositoryError> {
        let filter = &query.filter;
        let mut products: Vec<Product> = self
            .working
            .products
            .values()
            .filter(|p| filter.name.as_ref().map_or(true, |n| &p.name == n))
            .filter(|p| filter.price.map_or(true, |price| p.price == price))
            .filter(|p| filter.score.map_or(true, |s| p.score == Some(s)))
            .cloned()
            .collect();
        sort_products(&mut products, query.ordering);
        let count = products.len() as u64;
        Ok((paginate(products, query.page), count))
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn find_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, RepositoryError> {
        Ok(ids.iter().filter_map(|id| self.working.products.get(id).cloned()).collect())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), RepositoryError> {
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), RepositoryError> {
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let removed = self.working.products.remove(&id).is_some();
        if removed {
            self.working.cart_items.retain(|_, item| item.product_id != id);
            self.working.order_items.retain(|_, item| item.product_id != id);
        }
        Ok(removed)
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        self.working.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn find_cart(&mut self, user_id: Uuid, cart_id: Uuid) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.carts.get(&cart_id).filter(|c| c.user_id == user_id).cloned())
    }

    async fn latest_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .working
            .carts
            .values()
            .filter(|c| c.user_id == user_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        self.working.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn delete_carts(&mut self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let before = self.working.carts.len();
        self.working.carts.retain(|_, c| c.user_id != user_id);
        let carts = &self.working.carts;
        self.working.cart_items.retain(|_, item| carts.contains_key(&item.parent_id));
        Ok((before - self.working.carts.len()) as u64)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.orders.get(&order_id).filter(|o| o.user_id == user_id).cloned())
    }

    async fn list_orders(&mut self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Order>, u64), RepositoryError> {
        let mut orders: Vec<Order> = self.working.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let count = orders.len() as u64;
        Ok((paginate(orders, page), count))
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<bool, RepositoryError> {
        if self.find_order(user_id, order_id).await?.is_none() {
            return Ok(false);
        }
        self.working.orders.remove(&order_id);
        self.working.order_items.retain(|_, item| item.parent_id != order_id);
        Ok(true)
    }

    async fn list_items(&mut self, parent: ItemParent) -> Result<Vec<LineItem>, RepositoryError> {
        let mut items: Vec<LineItem> =
            self.working.items(parent).values().filter(|i| i.parent_id == parent.id()).cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError> {
        if !self.working.parent_exists(parent) {
            return Err(RepositoryError::Conflict(format!("parent {} does not exist", parent.id())));
        }
        if !self.working.products.contains_key(&item.product_id) {
            return Err(RepositoryError::Conflict(format!("product {} does not exist", item.product_id)));
        }
        self.working.items_mut(parent).insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError> {
        match self.working.items_mut(parent).get_mut(&item.id) {
            Some(stored) if stored.parent_id == parent.id() => {
                *stored = item.clone();
                Ok(())
            }
            _ => Err(RepositoryError::DataCorruption(format!("item {} not found for update", item.id))),
        }
    }

    async fn delete_items(&mut self, parent: ItemParent, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        let items = self.working.items_mut(parent);
        let before = items.len();
        items.retain(|id, item| !(item.parent_id == parent.id() && ids.contains(id)));
        Ok((before - items.len()) as u64)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepositoryError> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductDraft;
    use crate::domain::value_objects::Money;

    fn product(name: &str, cents: i64) -> Product {
        Product::create(ProductDraft { name: name.into(), price: Money::from_cents(cents), score: None, image: None })
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_writes() {
        let store = MemoryStore::new();
        let p = product("a", 100);
        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_product(&p).await.unwrap();
        }
        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_product(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let p = product("a", 100);
        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&p).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.find_product(p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_delete_carts_cascades_items() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let p = product("a", 100);
        let cart = Cart::for_user(user);
        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&p).await.unwrap();
        uow.insert_cart(&cart).await.unwrap();
        let parent = ItemParent::Cart(cart.id);
        uow.insert_item(parent, &LineItem::create(parent, p.id, p.price)).await.unwrap();

        assert_eq!(uow.delete_carts(user).await.unwrap(), 1);
        assert!(uow.list_items(parent).await.unwrap().is_empty());
    }
}
