//! Persistence layer.
//!
//! All reads and writes go through a [`UnitOfWork`] obtained from a
//! [`Store`]. A unit of work is all-or-nothing: writes become visible only on
//! [`UnitOfWork::commit`], and dropping it discards them.
//!
//! Two backends:
//! - [`PgStore`]: one `PostgreSQL` transaction per unit of work.
//! - [`MemoryStore`]: in-process state; a unit of work holds the store lock
//!   and a working copy that replaces the state on commit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, ItemParent, LineItem, NewUser, Order, Product, User};
use crate::domain::value_objects::Money;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError>;
}

/// Repository operations scoped to one atomic unit of work.
#[async_trait]
pub trait UnitOfWork: Send {
    // users
    async fn insert_user(&mut self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// User and password hash for a login attempt.
    async fn find_credentials(&mut self, username: &str) -> Result<Option<(User, String)>, RepositoryError>;

    // products
    async fn list_products(&mut self, query: &ProductQuery) -> Result<(Vec<Product>, u64), RepositoryError>;
    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, RepositoryError>;
    async fn find_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, RepositoryError>;
    async fn insert_product(&mut self, product: &Product) -> Result<(), RepositoryError>;
    async fn update_product(&mut self, product: &Product) -> Result<(), RepositoryError>;
    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // carts
    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError>;
    async fn find_cart(&mut self, user_id: Uuid, cart_id: Uuid) -> Result<Option<Cart>, RepositoryError>;
    /// Most recently created cart of the user.
    async fn latest_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, RepositoryError>;
    async fn update_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError>;
    /// Deletes every cart of the user (items cascade); returns how many.
    async fn delete_carts(&mut self, user_id: Uuid) -> Result<u64, RepositoryError>;

    // orders
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError>;
    async fn find_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, RepositoryError>;
    async fn list_orders(&mut self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Order>, u64), RepositoryError>;
    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError>;
    async fn delete_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<bool, RepositoryError>;

    // line items
    async fn list_items(&mut self, parent: ItemParent) -> Result<Vec<LineItem>, RepositoryError>;
    async fn insert_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError>;
    async fn update_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError>;
    async fn delete_items(&mut self, parent: ItemParent, ids: &[Uuid]) -> Result<u64, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// 1-based page selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default_size).clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.page_size) }

    pub fn limit(&self) -> u64 { u64::from(self.page_size) }
}

/// One page of results plus neighbouring page numbers.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, request: PageRequest) -> Self {
        let seen = request.offset() + results.len() as u64;
        Self {
            count,
            next: (seen < count).then_some(request.page + 1),
            previous: (request.page > 1).then_some(request.page - 1),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { count: self.count, next: self.next, previous: self.previous, results: self.results.into_iter().map(f).collect() }
    }
}

/// Exact-match product filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub score: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSortField { Name, Price, Score }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductOrdering {
    pub field: ProductSortField,
    pub descending: bool,
}

impl ProductOrdering {
    /// Parses `name`, `-price`, ... ; unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "name" => ProductSortField::Name,
            "price" => ProductSortField::Price,
            "score" => ProductSortField::Score,
            _ => return None,
        };
        Some(Self { field, descending })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub ordering: Option<ProductOrdering>,
    pub page: PageRequest,
}
