//! In-process store
//!
//! Tables live in vectors behind a single `RwLock`, so every operation is
//! atomic with respect to the others. Default row order is insertion order.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CreditAggregate, CustomerOrder, CustomerPatch, CustomerQuery, Include, NewCustomer, NewOrder,
    Store, StoreError, StoreResult, assemble_records,
};
use crate::models::{Customer, CustomerRecord, Order, Product};

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    orders: Vec<Order>,
    products: Vec<Product>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product under an existing order. Products have no write
    /// route; this is how they get into the store.
    pub async fn seed_product(
        &self,
        order_id: &str,
        name: &str,
        price: Decimal,
    ) -> StoreResult<Product> {
        self.check_open()?;
        let mut tables = self.tables.write().await;
        if !tables.orders.iter().any(|o| o.id == order_id) {
            return Err(StoreError::ForeignKey(format!(
                "product.order_id references unknown order {}",
                order_id
            )));
        }
        let product = Product {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            name: name.to_string(),
            price,
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_open()
    }

    async fn create_customer(&self, input: NewCustomer) -> StoreResult<Customer> {
        self.check_open()?;
        let mut tables = self.tables.write().await;
        let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if tables.customers.iter().any(|c| c.id == id) {
            return Err(StoreError::Conflict(format!("customer.id = {}", id)));
        }
        let customer = Customer {
            id,
            name: input.name,
            credit: input.credit,
        };
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    async fn find_customers(&self, query: &CustomerQuery) -> StoreResult<Vec<CustomerRecord>> {
        self.check_open()?;
        let tables = self.tables.read().await;

        let mut customers: Vec<Customer> = tables
            .customers
            .iter()
            .filter(|c| query.filter.matches(c))
            .cloned()
            .collect();
        if query.order == CustomerOrder::NameAsc {
            customers.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let orders = match query.include {
            Include::None => Vec::new(),
            _ => tables
                .orders
                .iter()
                .filter(|o| customers.iter().any(|c| c.id == o.customer_id))
                .cloned()
                .collect(),
        };
        let products = match query.include {
            Include::OrdersWithProducts => tables
                .products
                .iter()
                .filter(|p| orders.iter().any(|o| o.id == p.order_id))
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        Ok(assemble_records(customers, orders, products, query.include))
    }

    async fn find_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        self.check_open()?;
        let tables = self.tables.read().await;
        Ok(tables.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn update_customer(&self, id: &str, patch: CustomerPatch) -> StoreResult<Customer> {
        self.check_open()?;
        let mut tables = self.tables.write().await;
        let index = tables
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound("Record to update not found.".to_string()))?;

        if let Some(new_id) = patch.id.as_deref()
            && new_id != id
        {
            if tables.customers.iter().any(|c| c.id == new_id) {
                return Err(StoreError::Conflict(format!("customer.id = {}", new_id)));
            }
            if tables.orders.iter().any(|o| o.customer_id == id) {
                return Err(StoreError::ForeignKey(format!(
                    "customer {} still has orders",
                    id
                )));
            }
        }

        let customer = &mut tables.customers[index];
        if let Some(new_id) = patch.id {
            customer.id = new_id;
        }
        if let Some(name) = patch.name {
            customer.name = name;
        }
        if let Some(credit) = patch.credit {
            customer.credit = credit;
        }
        Ok(customer.clone())
    }

    async fn delete_customer(&self, id: &str) -> StoreResult<()> {
        self.check_open()?;
        let mut tables = self.tables.write().await;
        let index = tables
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound("Record to delete does not exist.".to_string()))?;
        if tables.orders.iter().any(|o| o.customer_id == id) {
            return Err(StoreError::ForeignKey(format!(
                "customer {} still has orders",
                id
            )));
        }
        tables.customers.remove(index);
        Ok(())
    }

    async fn aggregate_credit(&self, aggregate: CreditAggregate) -> StoreResult<Option<Decimal>> {
        self.check_open()?;
        let tables = self.tables.read().await;
        aggregate.apply(tables.customers.iter().map(|c| c.credit))
    }

    async fn count_customers(&self) -> StoreResult<i64> {
        self.check_open()?;
        Ok(self.tables.read().await.customers.len() as i64)
    }

    async fn create_order(&self, input: NewOrder) -> StoreResult<Order> {
        self.check_open()?;
        let mut tables = self.tables.write().await;
        if !tables.customers.iter().any(|c| c.id == input.customer_id) {
            return Err(StoreError::ForeignKey(format!(
                "order.customerId references unknown customer {}",
                input.customer_id
            )));
        }
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: input.customer_id,
            amount: input.amount,
        };
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn find_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>> {
        self.check_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::info!("In-memory store closed");
    }
}
