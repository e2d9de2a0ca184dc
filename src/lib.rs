//! OpenSASE Webstore
//!
//! Web-store backend: account registration and bearer tokens, a product
//! catalog, carts with derived freight and orders.
//!
//! ## Features
//! - Access/refresh JWT issuance
//! - Product catalog with filters, ordering and pagination
//! - Carts and orders with nested item reconciliation
//! - Cart to order conversion
//! - PostgreSQL or in-memory storage

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

pub use api::router;
pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use events::EventPublisher;
pub use state::AppState;
