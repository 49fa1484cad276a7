//! Service wiring: document stores, dispatchers and repositories per collection.

use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use storefront_auth::{Hs256Jwt, UserAccount, normalize_email};
use storefront_infra::{
    CommandDispatcher, InMemoryDocumentStore, OrderRepository, OrderStore, PgDocumentStore,
    ProductRepository, ProductStore, StoreError, UserRepository, UserStore,
};
use storefront_orders::{Order, PricingPolicy};
use storefront_products::Product;

use crate::app::errors::ApiError;
use crate::config::ApiConfig;

pub struct AppServices {
    pub products: CommandDispatcher<ProductStore>,
    pub orders: CommandDispatcher<OrderStore>,
    pub users: CommandDispatcher<UserStore>,
    pub product_repo: ProductRepository,
    pub order_repo: OrderRepository,
    pub user_repo: UserRepository,
    pub jwt: Arc<Hs256Jwt>,
    pub pricing: PricingPolicy,
    admin_email: Option<String>,
}

impl AppServices {
    /// Process-local storage; contents are lost on restart.
    pub fn in_memory(config: &ApiConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryDocumentStore::<Product>::new()),
            Arc::new(InMemoryDocumentStore::<Order>::new()),
            Arc::new(InMemoryDocumentStore::<UserAccount>::new()),
        )
    }

    /// Connect to Postgres and create the collection tables if needed.
    pub async fn postgres(config: &ApiConfig, database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let products = PgDocumentStore::<Product>::new(pool.clone());
        let orders = PgDocumentStore::<Order>::new(pool.clone());
        let users = PgDocumentStore::<UserAccount>::new(pool);
        products.migrate().await?;
        orders.migrate().await?;
        users.migrate().await?;

        Ok(Self::with_stores(
            config,
            Arc::new(products),
            Arc::new(orders),
            Arc::new(users),
        ))
    }

    /// Choose the backend from `DATABASE_URL`.
    pub async fn from_config(config: &ApiConfig) -> Result<Self, StoreError> {
        match &config.database_url {
            Some(url) => Self::postgres(config, url.expose_secret()).await,
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory storage");
                Ok(Self::in_memory(config))
            }
        }
    }

    fn with_stores(
        config: &ApiConfig,
        products: ProductStore,
        orders: OrderStore,
        users: UserStore,
    ) -> Self {
        Self {
            products: CommandDispatcher::new(products.clone()),
            orders: CommandDispatcher::new(orders.clone()),
            users: CommandDispatcher::new(users.clone()),
            product_repo: ProductRepository::new(products),
            order_repo: OrderRepository::new(orders),
            user_repo: UserRepository::new(users),
            jwt: Arc::new(Hs256Jwt::new(
                config.jwt_secret.expose_secret().as_bytes(),
                config.token_ttl,
            )),
            pricing: PricingPolicy::STANDARD,
            admin_email: config.admin_email.clone(),
        }
    }

    /// Whether registering `email` bootstraps an admin account.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin == normalize_email(email))
    }

    /// Issue a bearer token carrying the account's roles.
    pub fn issue_token(&self, account: &UserAccount) -> Result<String, ApiError> {
        self.jwt
            .issue(account.user_id(), account.roles(), Utc::now())
            .map_err(ApiError::internal)
    }
}
