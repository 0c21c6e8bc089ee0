//! Customer/Order Query Service
//!
//! A stateless REST-over-JSON front for customers, their orders, and the
//! products on those orders. Each route maps to one canonical store
//! operation; every failure becomes the same `{"error": ...}` envelope.
//!
//! # Modules
//!
//! - [`models`] - Wire records (Customer, Order, Product)
//! - [`store`] - `Store` trait, query descriptors, Postgres and memory backends
//! - [`gateway`] - Dispatch table, axum router, error envelope
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use gateway::{build_router, run_server};
pub use models::{Customer, CustomerRecord, Order, Product};
pub use store::{MemoryStore, PgStore, Store, StoreError};
