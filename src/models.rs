//! Entity records as they cross the wire
//!
//! Field names follow the persisted schema: `customerId`, `orderId`, and the
//! relation keys `Order` / `Product` when a query eagerly loads children.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Customer row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub credit: Decimal,
}

/// Order row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
    pub id: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub amount: Decimal,
}

/// Product row, only ever read through an order
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
    pub id: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub name: String,
    pub price: Decimal,
}

/// Order with its products attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithProducts {
    #[serde(flatten)]
    pub order: Order,
    #[serde(rename = "Product")]
    pub products: Vec<Product>,
}

/// Orders attached to a customer, at the depth the query asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderRelation {
    Orders(Vec<Order>),
    OrdersWithProducts(Vec<OrderWithProducts>),
}

/// Customer as returned by a find query; `Order` is present only when the
/// query included it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(rename = "Order", skip_serializing_if = "Option::is_none")]
    pub orders: Option<OrderRelation>,
}

impl From<Customer> for CustomerRecord {
    fn from(customer: Customer) -> Self {
        Self {
            customer,
            orders: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alice() -> Customer {
        Customer {
            id: "c1".to_string(),
            name: "Alice".to_string(),
            credit: Decimal::new(200000, 0),
        }
    }

    #[test]
    fn test_plain_record_has_no_order_key() {
        let value = serde_json::to_value(CustomerRecord::from(alice())).unwrap();
        assert_eq!(value, json!({"id": "c1", "name": "Alice", "credit": 200000.0}));
    }

    #[test]
    fn test_nested_relation_keys() {
        let order = Order {
            id: "o1".to_string(),
            customer_id: "c1".to_string(),
            amount: Decimal::new(15, 1),
        };
        let record = CustomerRecord {
            customer: alice(),
            orders: Some(OrderRelation::OrdersWithProducts(vec![OrderWithProducts {
                order,
                products: vec![],
            }])),
        };

        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["Order"][0]["customerId"], "c1");
        assert_eq!(value["Order"][0]["amount"], 1.5);
        assert_eq!(value["Order"][0]["Product"], json!([]));
    }
}
