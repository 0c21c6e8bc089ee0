//! Persistence layer
//!
//! [`Store`] is the single query interface every route dispatches into. Two
//! backends implement it:
//!
//! - [`PgStore`]: PostgreSQL through a `sqlx` pool
//! - [`MemoryStore`]: in-process tables, used by tests and local runs
//!
//! The store handle is created once at startup, shared behind an `Arc`, and
//! released with [`Store::close`] on shutdown.

pub mod input;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::{AppConfig, StorageBackend};
use crate::models::{Customer, CustomerRecord, Order, OrderRelation, OrderWithProducts, Product};

pub use input::{CustomerPatch, NewCustomer, NewOrder};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{
    CreditAggregate, CustomerFilter, CustomerOrder, CustomerQuery, Include, NameMatch,
    NameMatchMode,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("Foreign key constraint failed: {0}")]
    ForeignKey(String),

    #[error("Unique constraint failed: {0}")]
    Conflict(String),

    #[error("Numeric overflow while computing {0}")]
    Overflow(&'static str),

    #[error("Store is closed")]
    Closed,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Canonical operations over customers and orders
#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip to the backend
    async fn ping(&self) -> StoreResult<()>;

    async fn create_customer(&self, input: NewCustomer) -> StoreResult<Customer>;

    async fn find_customers(&self, query: &CustomerQuery) -> StoreResult<Vec<CustomerRecord>>;

    /// `Ok(None)` when no customer has this id
    async fn find_customer(&self, id: &str) -> StoreResult<Option<Customer>>;

    /// Fails with [`StoreError::NotFound`] when no customer has this id
    async fn update_customer(&self, id: &str, patch: CustomerPatch) -> StoreResult<Customer>;

    /// Fails when the id is unknown or the customer still has orders
    async fn delete_customer(&self, id: &str) -> StoreResult<()>;

    /// `Ok(None)` over zero rows
    async fn aggregate_credit(&self, aggregate: CreditAggregate) -> StoreResult<Option<Decimal>>;

    async fn count_customers(&self) -> StoreResult<i64>;

    /// Fails with [`StoreError::ForeignKey`] when the customer does not exist
    async fn create_order(&self, input: NewOrder) -> StoreResult<Order>;

    async fn find_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>>;

    /// Release backend resources. Later calls fail.
    async fn close(&self);
}

/// Open the backend selected by configuration
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            if config.database.init_schema {
                schema::init_schema(store.pool()).await?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Attach relations to customers according to `include`.
///
/// `orders` and `products` may contain rows for other parents; only the
/// matching ones are attached. Child order follows the input order.
pub(crate) fn assemble_records(
    customers: Vec<Customer>,
    orders: Vec<Order>,
    products: Vec<Product>,
    include: Include,
) -> Vec<CustomerRecord> {
    if include == Include::None {
        return customers.into_iter().map(CustomerRecord::from).collect();
    }

    let mut products_by_order: HashMap<String, Vec<Product>> = HashMap::new();
    for product in products {
        products_by_order
            .entry(product.order_id.clone())
            .or_default()
            .push(product);
    }

    let mut orders_by_customer: HashMap<String, Vec<Order>> = HashMap::new();
    for order in orders {
        orders_by_customer
            .entry(order.customer_id.clone())
            .or_default()
            .push(order);
    }

    customers
        .into_iter()
        .map(|customer| {
            let orders = orders_by_customer.remove(&customer.id).unwrap_or_default();
            let relation = match include {
                Include::OrdersWithProducts => OrderRelation::OrdersWithProducts(
                    orders
                        .into_iter()
                        .map(|order| OrderWithProducts {
                            products: products_by_order.remove(&order.id).unwrap_or_default(),
                            order,
                        })
                        .collect(),
                ),
                _ => OrderRelation::Orders(orders),
            };
            CustomerRecord {
                customer,
                orders: Some(relation),
            }
        })
        .collect()
}
