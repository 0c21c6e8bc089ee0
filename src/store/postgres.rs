//! PostgreSQL store

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    CreditAggregate, CustomerFilter, CustomerOrder, CustomerPatch, CustomerQuery, Include,
    NewCustomer, NewOrder, Store, StoreError, StoreResult, assemble_records,
};
use crate::config::DatabaseConfig;
use crate::models::{Customer, CustomerRecord, Order, Product};

const CUSTOMER_COLUMNS: &str = "id, name, credit";
const ORDER_COLUMNS: &str = "id, customer_id, amount";
const PRODUCT_COLUMNS: &str = "id, order_id, name, price";

/// SQLSTATE codes surfaced as distinct store errors
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// Store backed by a PostgreSQL connection pool
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create the connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_orders(&self, customer_ids: Vec<String>) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM customer_order WHERE customer_id = ANY($1)",
            ORDER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(customer_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn load_products(&self, order_ids: Vec<String>) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM product WHERE order_id = ANY($1)",
            PRODUCT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// Render `filter` as a SQL boolean expression
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    match filter {
        CustomerFilter::All => {
            qb.push("TRUE");
        }
        CustomerFilter::Id(id) => {
            qb.push("id = ").push_bind(id.clone());
        }
        CustomerFilter::Name(m) => {
            qb.push("name LIKE ")
                .push_bind(m.like_pattern())
                .push(" ESCAPE '\\'");
        }
        CustomerFilter::CreditGt(bound) => {
            qb.push("credit > ").push_bind(*bound);
        }
        CustomerFilter::CreditLt(bound) => {
            qb.push("credit < ").push_bind(*bound);
        }
        CustomerFilter::And(filters) if filters.is_empty() => {
            qb.push("TRUE");
        }
        CustomerFilter::And(filters) => {
            qb.push("(");
            for (i, f) in filters.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, f);
            }
            qb.push(")");
        }
    }
}

/// Build the find-many statement for `query`, without relations
fn select_customers(query: &CustomerQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM customer", CUSTOMER_COLUMNS));
    if query.filter != CustomerFilter::All {
        qb.push(" WHERE ");
        push_filter(&mut qb, &query.filter);
    }
    if query.order == CustomerOrder::NameAsc {
        qb.push(" ORDER BY name ASC");
    }
    qb
}

/// `UPDATE` for the supplied fields of a non-empty patch. A new `id` goes
/// through the same SET list, so key and reference checks stay with the
/// database.
fn update_customer_statement(id: &str, patch: CustomerPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE customer SET ");
    {
        let mut sets = qb.separated(", ");
        if let Some(new_id) = patch.id {
            sets.push("id = ").push_bind_unseparated(new_id);
        }
        if let Some(name) = patch.name {
            sets.push("name = ").push_bind_unseparated(name);
        }
        if let Some(credit) = patch.credit {
            sets.push("credit = ").push_bind_unseparated(credit);
        }
    }
    qb.push(" WHERE id = ")
        .push_bind(id.to_string())
        .push(format!(" RETURNING {}", CUSTOMER_COLUMNS));
    qb
}

/// Promote constraint violations to their own error kinds
fn classify(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.code().as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                return StoreError::ForeignKey(db_err.message().to_string());
            }
            Some(UNIQUE_VIOLATION) => {
                return StoreError::Conflict(db_err.message().to_string());
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_customer(&self, input: NewCustomer) -> StoreResult<Customer> {
        let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let sql = format!(
            "INSERT INTO customer (id, name, credit) VALUES ($1, $2, $3) RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(input.name)
            .bind(input.credit)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;

        tracing::debug!(id = %customer.id, "customer created");
        Ok(customer)
    }

    async fn find_customers(&self, query: &CustomerQuery) -> StoreResult<Vec<CustomerRecord>> {
        let customers: Vec<Customer> = select_customers(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        if query.include == Include::None || customers.is_empty() {
            return Ok(assemble_records(customers, vec![], vec![], query.include));
        }

        let orders = self
            .load_orders(customers.iter().map(|c| c.id.clone()).collect())
            .await?;
        let products = if query.include == Include::OrdersWithProducts && !orders.is_empty() {
            self.load_products(orders.iter().map(|o| o.id.clone()).collect())
                .await?
        } else {
            Vec::new()
        };

        Ok(assemble_records(customers, orders, products, query.include))
    }

    async fn find_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customer WHERE id = $1", CUSTOMER_COLUMNS);
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_customer(&self, id: &str, patch: CustomerPatch) -> StoreResult<Customer> {
        let not_found = || StoreError::NotFound("Record to update not found.".to_string());
        if patch.is_empty() {
            return self.find_customer(id).await?.ok_or_else(not_found);
        }

        update_customer_statement(id, patch)
            .build_query_as::<Customer>()
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or_else(not_found)
    }

    async fn delete_customer(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM customer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(
                "Record to delete does not exist.".to_string(),
            ));
        }
        Ok(())
    }

    async fn aggregate_credit(&self, aggregate: CreditAggregate) -> StoreResult<Option<Decimal>> {
        let sql = format!("SELECT {}(credit) FROM customer", aggregate.sql_function());
        Ok(sqlx::query_scalar::<_, Option<Decimal>>(&sql)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_customers(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_order(&self, input: NewOrder) -> StoreResult<Order> {
        let sql = format!(
            "INSERT INTO customer_order (id, customer_id, amount) VALUES ($1, $2, $3) RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(input.customer_id)
            .bind(input.amount)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;

        tracing::debug!(id = %order.id, customer_id = %order.customer_id, "order created");
        Ok(order)
    }

    async fn find_orders(&self, customer_id: &str) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM customer_order WHERE customer_id = $1",
            ORDER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NameMatch, NameMatchMode};

    #[test]
    fn test_select_all_has_no_where_clause() {
        let qb = select_customers(&CustomerQuery::all());
        assert_eq!(qb.sql(), "SELECT id, name, credit FROM customer");
    }

    #[test]
    fn test_select_sorted_by_name() {
        let qb = select_customers(&CustomerQuery::all().order_by(CustomerOrder::NameAsc));
        assert_eq!(
            qb.sql(),
            "SELECT id, name, credit FROM customer ORDER BY name ASC"
        );
    }

    #[test]
    fn test_select_with_compound_filter() {
        let query = CustomerQuery::filtered(CustomerFilter::And(vec![
            CustomerFilter::Name(NameMatch::new(NameMatchMode::Contains, "i")),
            CustomerFilter::CreditGt(Decimal::ZERO),
        ]));
        assert_eq!(
            select_customers(&query).sql(),
            "SELECT id, name, credit FROM customer WHERE (name LIKE $1 ESCAPE '\\' AND credit > $2)"
        );
    }

    #[test]
    fn test_select_by_id() {
        let query = CustomerQuery::filtered(CustomerFilter::Id("c1".to_string()));
        assert_eq!(
            select_customers(&query).sql(),
            "SELECT id, name, credit FROM customer WHERE id = $1"
        );
    }

    #[test]
    fn test_update_sets_only_supplied_fields() {
        let patch = CustomerPatch {
            credit: Some(Decimal::TEN),
            ..Default::default()
        };
        assert_eq!(
            update_customer_statement("c1", patch).sql(),
            "UPDATE customer SET credit = $1 WHERE id = $2 RETURNING id, name, credit"
        );
    }

    #[test]
    fn test_update_can_rename_id() {
        let patch = CustomerPatch {
            id: Some("c2".to_string()),
            name: Some("Nia".to_string()),
            credit: None,
        };
        assert_eq!(
            update_customer_statement("c1", patch).sql(),
            "UPDATE customer SET id = $1, name = $2 WHERE id = $3 RETURNING id, name, credit"
        );
    }

    // The following tests need a running PostgreSQL with the schema applied.
    // Run with: DATABASE_URL=postgres://... cargo test -- --ignored

    async fn connect() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Failed to connect");
        crate::store::schema::init_schema(&pool)
            .await
            .expect("Failed to init schema");
        PgStore::from_pool(pool)
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_pg_ping() {
        let store = connect().await;
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn test_pg_customer_lifecycle() {
        let store = connect().await;
        let created = store
            .create_customer(NewCustomer {
                id: None,
                name: "Livia".to_string(),
                credit: Decimal::from(5),
            })
            .await
            .expect("Should create customer");

        let fetched = store.find_customer(&created.id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        store.delete_customer(&created.id).await.unwrap();
        assert!(store.find_customer(&created.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_customer(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore]
    async fn test_pg_order_for_unknown_customer_fails() {
        let store = connect().await;
        let result = store
            .create_order(NewOrder {
                customer_id: Uuid::new_v4().to_string(),
                amount: Decimal::ONE,
            })
            .await;
        assert!(matches!(result, Err(StoreError::ForeignKey(_))));
    }
}
