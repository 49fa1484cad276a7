//! Products domain module.
//!
//! This crate contains business rules for the catalog and product reviews,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod product;

pub use catalog::{CatalogFilter, FEATURED_LIMIT};
pub use product::{
    AddReview, CreateProduct, MAX_RATING, MIN_RATING, Product, ProductCommand, ProductCreated,
    ProductDetails, ProductEvent, ProductId, Review, ReviewAdded,
};
