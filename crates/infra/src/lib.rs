//! Infrastructure layer: document storage, repositories, command dispatch.

pub mod command_dispatcher;
pub mod document_store;
pub mod documents;
pub mod repositories;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use document_store::{
    Document, DocumentQuery, DocumentStore, InMemoryDocumentStore, PgDocumentStore, Predicate,
    StoreError,
};
pub use repositories::{
    OrderRepository, OrderStore, ProductRepository, ProductStore, UserRepository, UserStore,
};
