//! `PostgreSQL` store: one database transaction per unit of work.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{PageRequest, ProductFilter, ProductQuery, ProductSortField, RepositoryError, Store, UnitOfWork};
use crate::domain::aggregates::{Cart, ItemParent, LineItem, NewUser, Order, Product, User};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, date_joined";
const PRODUCT_COLUMNS: &str = "id, name, price, score, image, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    date_joined: DateTime<Utc>,
    password_hash: String,
}

/// Table and parent-key column holding a parent's items.
fn item_table(parent: ItemParent) -> (&'static str, &'static str) {
    match parent {
        ItemParent::Cart(_) => ("cart_items", "cart_id"),
        ItemParent::Order(_) => ("order_items", "order_id"),
    }
}

fn unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(what()),
        _ => RepositoryError::Database(err),
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(price) = filter.price {
        qb.push(" AND price = ").push_bind(price);
    }
    if let Some(score) = filter.score {
        qb.push(" AND score = ").push_bind(score);
    }
}

fn to_i64(value: u64) -> i64 { i64::try_from(value).unwrap_or(i64::MAX) }

fn to_u64(value: i64) -> u64 { u64::try_from(value).unwrap_or(0) }

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, RepositoryError> {
        let username = user.username.clone();
        let (user, hash) = user.into_user();
        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, date_joined) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id).bind(&user.username).bind(&user.email).bind(&user.first_name)
        .bind(&user.last_name).bind(&hash).bind(user.date_joined)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_violation(e, || format!("username {username} already exists")))?;
        Ok(user)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"))
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_credentials(&mut self, username: &str) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|r| {
            let user = User {
                id: r.id, username: r.username, email: r.email, first_name: r.first_name,
                last_name: r.last_name, date_joined: r.date_joined,
            };
            (user, r.password_hash)
        }))
    }

    async fn list_products(&mut self, query: &ProductQuery) -> Result<(Vec<Product>, u64), RepositoryError> {
        let mut count_q = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE TRUE");
        push_product_filters(&mut count_q, &query.filter);
        let (count,) = count_q.build_query_as::<(i64,)>().fetch_one(&mut *self.tx).await?;

        let mut q = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        push_product_filters(&mut q, &query.filter);
        match query.ordering {
            Some(ordering) => {
                let column = match ordering.field {
                    ProductSortField::Name => "name",
                    ProductSortField::Price => "price",
                    ProductSortField::Score => "score",
                };
                let direction = if ordering.descending { "DESC" } else { "ASC" };
                q.push(format!(" ORDER BY {column} {direction}, id ASC"));
            }
            None => {
                q.push(" ORDER BY id ASC");
            }
        }
        q.push(" LIMIT ").push_bind(to_i64(query.page.limit()));
        q.push(" OFFSET ").push_bind(to_i64(query.page.offset()));
        let products = q.build_query_as::<Product>().fetch_all(&mut *self.tx).await?;
        Ok((products, to_u64(count)))
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(product)
    }

    async fn find_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(products)
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (id, name, price, score, image, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product.id).bind(&product.name).bind(product.price).bind(product.score)
        .bind(&product.image).bind(product.created_at).bind(product.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET name = $2, price = $3, score = $4, image = $5, updated_at = $6 WHERE id = $1")
            .bind(product.id).bind(&product.name).bind(product.price).bind(product.score)
            .bind(&product.image).bind(product.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(cart.id).bind(cart.user_id).bind(cart.created_at).bind(cart.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_cart(&mut self, user_id: Uuid, cart_id: Uuid) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE id = $1 AND user_id = $2",
        )
        .bind(cart_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(cart)
    }

    async fn latest_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(cart)
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET updated_at = $2 WHERE id = $1")
            .bind(cart.id)
            .bind(cart.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_carts(&mut self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO orders (id, user_id, freight, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(order.id).bind(order.user_id).bind(order.freight).bind(order.created_at).bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, user_id, freight, created_at, updated_at FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn list_orders(&mut self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Order>, u64), RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, user_id, freight, created_at, updated_at FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok((orders, to_u64(count)))
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET freight = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id)
            .bind(order.freight)
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_order(&mut self, user_id: Uuid, order_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&mut self, parent: ItemParent) -> Result<Vec<LineItem>, RepositoryError> {
        let (table, key) = item_table(parent);
        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT id, {key} AS parent_id, product_id, price, created_at, updated_at FROM {table} \
             WHERE {key} = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(parent.id())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn insert_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError> {
        let (table, key) = item_table(parent);
        sqlx::query(&format!(
            "INSERT INTO {table} (id, {key}, product_id, price, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(item.id).bind(parent.id()).bind(item.product_id).bind(item.price)
        .bind(item.created_at).bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_item(&mut self, parent: ItemParent, item: &LineItem) -> Result<(), RepositoryError> {
        let (table, key) = item_table(parent);
        let result = sqlx::query(&format!(
            "UPDATE {table} SET product_id = $3, price = $4, updated_at = $5 WHERE id = $1 AND {key} = $2"
        ))
        .bind(item.id).bind(parent.id()).bind(item.product_id).bind(item.price).bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::DataCorruption(format!("item {} not found for update", item.id)));
        }
        Ok(())
    }

    async fn delete_items(&mut self, parent: ItemParent, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (table, key) = item_table(parent);
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE {key} = $1 AND id = ANY($2)"))
            .bind(parent.id())
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
