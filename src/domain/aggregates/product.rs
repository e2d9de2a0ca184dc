//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Money;

/// Catalog entry. The price here is the *current* price; line items keep
/// their own copy taken when they were created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub score: Option<i32>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated field set for a full create or replace.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub name: String,
    pub price: Money,
    pub score: Option<i32>,
    pub image: Option<String>,
}

/// Validated partial update; `None` leaves a field untouched, `Some(None)`
/// clears a nullable one.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub score: Option<Option<i32>>,
    pub image: Option<Option<String>>,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: draft.name, price: draft.price, score: draft.score,
            image: draft.image, created_at: now, updated_at: now,
        }
    }

    pub fn replace(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.price = draft.price;
        self.score = draft.score;
        self.image = draft.image;
        self.touch();
    }

    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name { self.name = name; }
        if let Some(price) = changes.price { self.price = price; }
        if let Some(score) = changes.score { self.score = score; }
        if let Some(image) = changes.image { self.image = image; }
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
