//! Read-side queries over the document collections.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use storefront_auth::{UserAccount, normalize_email};
use storefront_core::UserId;
use storefront_orders::{Order, OrderId};
use storefront_products::{CatalogFilter, FEATURED_LIMIT, Product, ProductId};

use crate::document_store::{DocumentQuery, DocumentStore, Predicate, StoreError};

pub type ProductStore = Arc<dyn DocumentStore<Product>>;
pub type OrderStore = Arc<dyn DocumentStore<Order>>;
pub type UserStore = Arc<dyn DocumentStore<UserAccount>>;

#[derive(Clone)]
pub struct ProductRepository {
    store: ProductStore,
}

impl ProductRepository {
    pub fn new(store: ProductStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.store.get(*id.0.as_uuid()).await
    }

    /// Catalog listing. Blank criteria are ignored.
    pub async fn list(&self, filter: CatalogFilter) -> Result<Vec<Product>, StoreError> {
        self.store.find(&catalog_query(filter)).await
    }

    pub async fn featured(&self) -> Result<Vec<Product>, StoreError> {
        let query = DocumentQuery::all()
            .filter(Predicate::eq("featured", true))
            .limit(FEATURED_LIMIT);
        self.store.find(&query).await
    }
}

fn catalog_query(filter: CatalogFilter) -> DocumentQuery {
    let filter = filter.normalized();
    let mut query = DocumentQuery::all();
    if let Some(category) = filter.category {
        query = query.filter(Predicate::eq("category", category));
    }
    if let Some(brand) = filter.brand {
        query = query.filter(Predicate::eq("brand", brand));
    }
    if let Some(search) = filter.search {
        query = query.filter(Predicate::contains_ignore_case("name", search));
    }
    query
}

#[derive(Clone)]
pub struct OrderRepository {
    store: OrderStore,
}

impl OrderRepository {
    pub fn new(store: OrderStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.store.get(*id.0.as_uuid()).await
    }

    /// Orders placed by `user`, oldest first.
    pub async fn for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let query =
            DocumentQuery::all().filter(Predicate::eq("user", JsonValue::String(user.to_string())));
        self.store.find(&query).await
    }
}

#[derive(Clone)]
pub struct UserRepository {
    store: UserStore,
}

impl UserRepository {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        self.store.get(*id.as_uuid()).await
    }

    /// Case-insensitive email lookup.
    pub async fn by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let query = DocumentQuery::all()
            .filter(Predicate::eq("email", normalize_email(email)))
            .limit(1);
        Ok(self.store.find(&query).await?.into_iter().next())
    }
}
