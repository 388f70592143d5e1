//! Transactional persistence for orders, inventory, and notifications.
//!
//! Writes go through a [`UnitOfWork`]: order rows and inventory rows are
//! locked exclusively when first touched, and every write becomes visible at
//! once on commit or not at all. Two implementations share the same traits:
//! [`PostgresStore`] for production and [`InMemoryStore`] for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use store::{
    CatalogPrices, InventoryRepository, NotificationStore, OrderRepository, Store, UnitOfWork,
};
