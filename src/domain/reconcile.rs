//! Nested line-item reconciliation.
//!
//! Carts and orders accept their items as a list of descriptors. On create
//! every descriptor becomes a new item. On update the list is authoritative:
//! persisted items whose id is absent are removed, identified descriptors
//! update their item in place and anonymous descriptors are inserted.
//!
//! Planning is pure. It either yields a complete [`SyncPlan`] or every
//! per-entry failure at once, so the caller can apply the plan inside one
//! unit of work or apply nothing.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{LineItem, Product};
use crate::domain::value_objects::Money;
use crate::validation::{self, FieldErrors};

pub const ITEM_DOES_NOT_EXIST: &str = "Item does not exist.";
pub const PRODUCT_DOES_NOT_EXIST: &str = "Product does not exist.";
pub const INVALID_UUID: &str = "Must be a valid UUID.";
pub const INVALID_NUMBER: &str = "A valid number is required.";
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// One desired item as sent by the client.
///
/// Deserialization never fails: a field of the wrong type is recorded in
/// `malformed` and reported with the entry's index like any other item error.
#[derive(Clone, Debug, Default, PartialEq, Validate)]
pub struct ItemInput {
    /// Existing item to update; ignored when creating.
    pub id: Option<Uuid>,
    #[validate(required)]
    pub product_id: Option<Uuid>,
    /// Price override. A missing or zero price falls back to the product's
    /// current price on insert; a missing one keeps the stored price on update.
    #[validate(custom = "validation::money")]
    pub price: Option<Money>,
    pub malformed: FieldErrors,
}

impl ItemInput {
    pub fn new(product_id: Uuid, price: Option<Money>) -> Self {
        Self { product_id: Some(product_id), price, ..Self::default() }
    }

    pub fn existing(id: Uuid, product_id: Uuid, price: Option<Money>) -> Self {
        Self { id: Some(id), ..Self::new(product_id, price) }
    }

    pub fn from_value(value: &Value) -> Self {
        let mut input = Self::default();
        let Some(entry) = value.as_object() else {
            let message = format!("Invalid data. Expected a dictionary, but got {}.", json_kind(value));
            validation::push(&mut input.malformed, NON_FIELD_ERRORS, message);
            return input;
        };
        input.id = lenient_field(entry, "id", INVALID_UUID, &mut input.malformed);
        input.product_id = lenient_field(entry, "product_id", INVALID_UUID, &mut input.malformed);
        input.price = lenient_field(entry, "price", INVALID_NUMBER, &mut input.malformed);
        input
    }
}

impl<'de> Deserialize<'de> for ItemInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::from_value(&value))
    }
}

/// `None` for an absent or `null` key; a value of the wrong type records `message`.
fn lenient_field<T: DeserializeOwned>(
    entry: &Map<String, Value>,
    key: &str,
    message: &str,
    malformed: &mut FieldErrors,
) -> Option<T> {
    match entry.get(key) {
        None | Some(Value::Null) => None,
        Some(raw) => T::deserialize(raw).map_err(|_| validation::push(malformed, key, message)).ok(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Zero counts as "not given", like a missing price.
fn price_override(input: &ItemInput) -> Option<Money> {
    input.price.filter(|price| !price.is_zero())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub product_id: Uuid,
    pub price: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemChange {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price: Money,
}

/// Writes needed to make the persisted items match the desired list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub remove: Vec<Uuid>,
    pub update: Vec<ItemChange>,
    pub insert: Vec<NewItem>,
}

/// Failure for the descriptor at `index` of the input list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub errors: FieldErrors,
}

/// All descriptor failures of one request, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ItemErrors(pub Vec<ItemError>);

impl ItemErrors {
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    fn push(&mut self, index: usize, errors: FieldErrors) { self.0.push(ItemError { index, errors }); }

    /// Client-facing body: `{"items": [...]}`.
    pub fn to_json(&self) -> serde_json::Value { json!({ "items": self }) }
}

/// Product ids referenced by the descriptors, for a single catalog lookup.
pub fn referenced_products(inputs: &[ItemInput]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    inputs.iter().filter_map(|i| i.product_id).filter(|id| seen.insert(*id)).collect()
}

/// Validates a descriptor and resolves its product against `catalog`.
fn resolve<'c>(input: &ItemInput, catalog: &'c HashMap<Uuid, Product>) -> Result<&'c Product, FieldErrors> {
    let mut errors = input.malformed.clone();
    if let Err(e) = input.validate() {
        for (field, messages) in validation::field_errors(&e) {
            errors.entry(field).or_insert(messages);
        }
    }
    let product = input.product_id.and_then(|id| catalog.get(&id));
    if input.product_id.is_some() && product.is_none() {
        validation::push(&mut errors, "product_id", PRODUCT_DOES_NOT_EXIST);
    }
    match product {
        Some(p) if errors.is_empty() => Ok(p),
        _ => Err(errors),
    }
}

/// Create path: one new item per descriptor.
pub fn plan_insert(inputs: &[ItemInput], catalog: &HashMap<Uuid, Product>) -> Result<Vec<NewItem>, ItemErrors> {
    let mut items = Vec::with_capacity(inputs.len());
    let mut failures = ItemErrors::default();
    for (index, input) in inputs.iter().enumerate() {
        match resolve(input, catalog) {
            Ok(product) => items.push(NewItem { product_id: product.id, price: price_override(input).unwrap_or(product.price) }),
            Err(errors) => failures.push(index, errors),
        }
    }
    if failures.is_empty() { Ok(items) } else { Err(failures) }
}

/// Update path: diff `inputs` against the parent's persisted `existing` items.
pub fn plan_sync(
    existing: &[LineItem],
    inputs: &[ItemInput],
    catalog: &HashMap<Uuid, Product>,
) -> Result<SyncPlan, ItemErrors> {
    let persisted: HashMap<Uuid, &LineItem> = existing.iter().map(|item| (item.id, item)).collect();
    let wanted: HashSet<Uuid> = inputs.iter().filter_map(|i| i.id).collect();

    let mut plan = SyncPlan {
        remove: existing.iter().map(|item| item.id).filter(|id| !wanted.contains(id)).collect(),
        ..SyncPlan::default()
    };
    let mut failures = ItemErrors::default();

    for (index, input) in inputs.iter().enumerate() {
        let current = match input.id {
            Some(id) => match persisted.get(&id) {
                Some(item) => Some(*item),
                None => {
                    let mut errors = FieldErrors::new();
                    validation::push(&mut errors, "id", ITEM_DOES_NOT_EXIST);
                    failures.push(index, errors);
                    continue;
                }
            },
            None => None,
        };
        let product = match resolve(input, catalog) {
            Ok(product) => product,
            Err(errors) => {
                failures.push(index, errors);
                continue;
            }
        };
        match current {
            Some(item) => {
                let price = match input.price {
                    None => item.price,
                    Some(_) => price_override(input).unwrap_or(product.price),
                };
                let change = ItemChange { id: item.id, product_id: product.id, price };
                // A repeated id replaces the earlier entry's change.
                match plan.update.iter_mut().find(|c| c.id == item.id) {
                    Some(earlier) => *earlier = change,
                    None => plan.update.push(change),
                }
            }
            None => plan.insert.push(NewItem {
                product_id: product.id,
                price: price_override(input).unwrap_or(product.price),
            }),
        }
    }

    if failures.is_empty() { Ok(plan) } else { Err(failures) }
}
