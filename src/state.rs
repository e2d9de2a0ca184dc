//! Shared handler state.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::AppConfig;
use crate::domain::value_objects::FreightPolicy;
use crate::events::EventPublisher;
use crate::services::auth::{AuthService, TokenIssuer};
use crate::services::carts::CartService;
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderService;
use crate::store::{PageRequest, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub freight: FreightPolicy,
    pub page_size: u32,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig, events: EventPublisher) -> Self {
        Self {
            store,
            tokens: Arc::new(TokenIssuer::new(
                config.jwt_secret.expose_secret().as_bytes(),
                config.access_token_ttl_secs,
                config.refresh_token_ttl_secs,
            )),
            freight: FreightPolicy::new(config.freight_price),
            page_size: config.page_size,
            events,
        }
    }

    pub fn auth(&self) -> AuthService<'_> { AuthService::new(self.store.as_ref(), &self.tokens) }

    pub fn catalog(&self) -> CatalogService<'_> { CatalogService::new(self.store.as_ref()) }

    pub fn carts(&self) -> CartService<'_> { CartService::new(self.store.as_ref(), self.freight, &self.events) }

    pub fn orders(&self) -> OrderService<'_> { OrderService::new(self.store.as_ref(), self.freight, &self.events) }

    pub fn page(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::new(page, page_size, self.page_size)
    }
}
