use anyhow::Result;
use sqlx::PgPool;

/// Create the customer, order and product tables if they do not exist
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (table, ddl) in [
        ("customer", CREATE_CUSTOMER_TABLE),
        ("customer_order", CREATE_ORDER_TABLE),
        ("product", CREATE_PRODUCT_TABLE),
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {} table: {}", table, e))?;
    }

    for ddl in [CREATE_ORDER_CUSTOMER_INDEX, CREATE_PRODUCT_ORDER_INDEX] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create index: {}", e))?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

const CREATE_CUSTOMER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customer (
    id      TEXT PRIMARY KEY,
    name    TEXT NOT NULL,
    credit  NUMERIC NOT NULL
)
"#;

// Deleting a customer with orders is rejected rather than cascaded.
const CREATE_ORDER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customer_order (
    id           TEXT PRIMARY KEY,
    customer_id  TEXT NOT NULL REFERENCES customer (id) ON DELETE RESTRICT,
    amount       NUMERIC NOT NULL
)
"#;

const CREATE_PRODUCT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product (
    id        TEXT PRIMARY KEY,
    order_id  TEXT NOT NULL REFERENCES customer_order (id) ON DELETE CASCADE,
    name      TEXT NOT NULL,
    price     NUMERIC NOT NULL
)
"#;

const CREATE_ORDER_CUSTOMER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS customer_order_customer_id_idx ON customer_order (customer_id)";

const CREATE_PRODUCT_ORDER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS product_order_id_idx ON product (order_id)";
