//! Application services.
//!
//! Each service call opens one unit of work on the [`Store`](crate::store::Store)
//! and commits it only after every step succeeded.

pub mod auth;
pub mod carts;
pub mod catalog;
mod error;
pub mod orders;

pub use error::CommerceError;

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::aggregates::{ItemDetails, ItemParent, LineItem, Product};
use crate::domain::reconcile::{self, ItemInput, NewItem, SyncPlan};
use crate::store::{RepositoryError, UnitOfWork};

/// Products referenced by `inputs`, keyed by id. Unknown ids are simply absent.
async fn product_catalog(
    uow: &mut dyn UnitOfWork,
    inputs: &[ItemInput],
) -> Result<HashMap<Uuid, Product>, RepositoryError> {
    let ids = reconcile::referenced_products(inputs);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products = uow.find_products(&ids).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

async fn insert_items(uow: &mut dyn UnitOfWork, parent: ItemParent, items: Vec<NewItem>) -> Result<(), RepositoryError> {
    for new in items {
        let item = LineItem::create(parent, new.product_id, new.price);
        uow.insert_item(parent, &item).await?;
    }
    Ok(())
}

/// Applies a reconciliation plan against the parent's `existing` items.
async fn apply_sync(
    uow: &mut dyn UnitOfWork,
    parent: ItemParent,
    existing: Vec<LineItem>,
    plan: SyncPlan,
) -> Result<(), RepositoryError> {
    if !plan.remove.is_empty() {
        uow.delete_items(parent, &plan.remove).await?;
    }
    let mut by_id: HashMap<Uuid, LineItem> = existing.into_iter().map(|item| (item.id, item)).collect();
    for change in plan.update {
        let Some(item) = by_id.get_mut(&change.id) else {
            return Err(RepositoryError::DataCorruption(format!("item {} vanished during update", change.id)));
        };
        item.change(change.product_id, change.price);
        uow.update_item(parent, item).await?;
    }
    insert_items(uow, parent, plan.insert).await
}

/// Items of `parent` joined with their products, in insertion order.
async fn load_items(uow: &mut dyn UnitOfWork, parent: ItemParent) -> Result<Vec<ItemDetails>, RepositoryError> {
    let items = uow.list_items(parent).await?;
    let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let products: HashMap<Uuid, Product> = uow.find_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

    items
        .into_iter()
        .map(|item| match products.get(&item.product_id) {
            Some(product) => Ok(ItemDetails { product: product.clone(), item }),
            None => Err(RepositoryError::DataCorruption(format!("item {} references missing product", item.id))),
        })
        .collect()
}
