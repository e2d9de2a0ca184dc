//! Product catalog service.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use super::CommerceError;
use crate::domain::aggregates::{Product, ProductChanges, ProductDraft};
use crate::domain::value_objects::Money;
use crate::store::{Page, ProductQuery, Store};
use crate::validation;

pub const PRODUCT_NOT_FOUND: &str = "Not found.";

/// Full product body (create and replace).
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductInput {
    #[serde(default)]
    #[validate(required, length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(required, custom = "validation::money")]
    pub price: Option<Money>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub score: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub image: Option<String>,
}

impl ProductInput {
    fn into_draft(self) -> Result<ProductDraft, CommerceError> {
        self.validate().map_err(|e| CommerceError::fields(validation::field_errors(&e)))?;
        match (self.name, self.price) {
            (Some(name), Some(price)) => Ok(ProductDraft { name, price, score: self.score, image: self.image }),
            _ => Err(CommerceError::Invalid(serde_json::Value::Null)),
        }
    }
}

/// Partial product body. Explicit `null` clears `score`/`image`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default, deserialize_with = "nullable")]
    pub score: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
}

impl ProductPatch {
    /// The full body this patch would produce on `product`.
    fn merged_with(&self, product: &Product) -> ProductInput {
        ProductInput {
            name: Some(self.name.clone().unwrap_or_else(|| product.name.clone())),
            price: Some(self.price.unwrap_or(product.price)),
            score: self.score.unwrap_or(product.score),
            image: self.image.clone().unwrap_or_else(|| product.image.clone()),
        }
    }

    fn into_changes(self) -> ProductChanges {
        ProductChanges { name: self.name, price: self.price, score: self.score, image: self.image }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    pub fn new(store: &'a dyn Store) -> Self { Self { store } }

    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the query fails.
    pub async fn list(&self, query: ProductQuery) -> Result<Page<Product>, CommerceError> {
        let mut uow = self.store.begin().await?;
        let (products, count) = uow.list_products(&query).await?;
        Ok(Page::new(products, count, query.page))
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` for an unknown id.
    pub async fn get(&self, id: Uuid) -> Result<Product, CommerceError> {
        let mut uow = self.store.begin().await?;
        uow.find_product(id).await?.ok_or_else(|| CommerceError::NotFound(PRODUCT_NOT_FOUND.into()))
    }

    /// # Errors
    ///
    /// Returns `CommerceError::Invalid` with per-field messages.
    pub async fn create(&self, input: ProductInput) -> Result<Product, CommerceError> {
        let product = Product::create(input.into_draft()?);
        let mut uow = self.store.begin().await?;
        uow.insert_product(&product).await?;
        uow.commit().await?;
        tracing::info!(product_id = %product.id, name = %product.name, price = %product.price, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` or `CommerceError::Invalid`.
    pub async fn replace(&self, id: Uuid, input: ProductInput) -> Result<Product, CommerceError> {
        let draft = input.into_draft()?;
        let mut uow = self.store.begin().await?;
        let mut product = uow.find_product(id).await?.ok_or_else(|| CommerceError::NotFound(PRODUCT_NOT_FOUND.into()))?;
        product.replace(draft);
        uow.update_product(&product).await?;
        uow.commit().await?;
        tracing::info!(product_id = %product.id, "product replaced");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` or `CommerceError::Invalid`.
    pub async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Product, CommerceError> {
        let mut uow = self.store.begin().await?;
        let mut product = uow.find_product(id).await?.ok_or_else(|| CommerceError::NotFound(PRODUCT_NOT_FOUND.into()))?;
        patch.merged_with(&product).into_draft()?;
        product.apply(patch.into_changes());
        uow.update_product(&product).await?;
        uow.commit().await?;
        tracing::info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` for an unknown id.
    pub async fn delete(&self, id: Uuid) -> Result<(), CommerceError> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_product(id).await? {
            return Err(CommerceError::NotFound(PRODUCT_NOT_FOUND.into()));
        }
        uow.commit().await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PageRequest, ProductFilter, ProductOrdering};

    fn input(name: &str, cents: i64, score: i32) -> ProductInput {
        ProductInput { name: Some(name.into()), price: Some(Money::from_cents(cents)), score: Some(score), image: None }
    }

    #[test]
    fn test_missing_fields_are_required() {
        let err = ProductInput::default().into_draft().unwrap_err();
        let CommerceError::Invalid(body) = err else { panic!("expected invalid") };
        assert_eq!(body["name"][0], validation::REQUIRED);
        assert_eq!(body["price"][0], validation::REQUIRED);
    }

    #[test]
    fn test_patch_null_clears_score() {
        let patch: ProductPatch = serde_json::from_str(r#"{"score": null}"#).unwrap();
        assert_eq!(patch.score, Some(None));
        let patch: ProductPatch = serde_json::from_str(r#"{"price": "100.00"}"#).unwrap();
        assert_eq!(patch.score, None);
        assert_eq!(patch.price, Some(Money::from_cents(10_000)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.create(input("b", 20_000, 1)).await.unwrap();
        catalog.create(input("a", 1_050, 3)).await.unwrap();
        catalog.create(input("c", 25_050, 2)).await.unwrap();

        let page = PageRequest::new(None, None, 10);
        let by_price = catalog
            .list(ProductQuery { filter: ProductFilter::default(), ordering: ProductOrdering::parse("-price"), page })
            .await
            .unwrap();
        let names: Vec<&str> = by_price.results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let scored = catalog
            .list(ProductQuery { filter: ProductFilter { score: Some(3), ..Default::default() }, ordering: None, page })
            .await
            .unwrap();
        assert_eq!(scored.count, 1);
        assert_eq!(scored.results[0].name, "a");
    }

    #[tokio::test]
    async fn test_patch_price_only() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let product = catalog.create(input("test product", 1_050, 500)).await.unwrap();
        let patch = ProductPatch { price: Some(Money::from_cents(10_000)), ..Default::default() };
        let updated = catalog.update(product.id, patch).await.unwrap();
        assert_eq!(updated.price, Money::from_cents(10_000));
        assert_eq!(updated.name, "test product");
        assert_eq!(updated.score, Some(500));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(matches!(catalog.delete(Uuid::now_v7()).await, Err(CommerceError::NotFound(_))));
    }
}
