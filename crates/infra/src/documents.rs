//! Collection bindings for the storefront aggregates.

use uuid::Uuid;

use storefront_auth::UserAccount;
use storefront_core::AggregateRoot;
use storefront_orders::Order;
use storefront_products::Product;

use crate::document_store::Document;

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn key(&self) -> Uuid {
        *self.id_typed().0.as_uuid()
    }

    fn revision(&self) -> u64 {
        self.version()
    }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn key(&self) -> Uuid {
        *self.id_typed().0.as_uuid()
    }

    fn revision(&self) -> u64 {
        self.version()
    }
}

impl Document for UserAccount {
    const COLLECTION: &'static str = "users";

    fn key(&self) -> Uuid {
        *self.user_id().as_uuid()
    }

    fn revision(&self) -> u64 {
        self.version()
    }
}
