//! Aggregates module
pub mod product;
pub mod line_item;
pub mod cart;
pub mod order;
pub mod user;

pub use product::{Product, ProductChanges, ProductDraft};
pub use line_item::{ItemDetails, ItemParent, LineItem};
pub use cart::{Cart, CartDetails, CartTotals};
pub use order::{Order, OrderDetails, OrderTotals};
pub use user::{NewUser, User};
