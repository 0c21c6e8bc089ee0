//! Canonical operations
//!
//! Every route resolves to exactly one [`Operation`]. Executing it issues a
//! single call against the [`Store`] and shapes the result as JSON; failures
//! surface as [`ApiError`].

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::error::ApiError;
use super::response::{CONNECTED, CUSTOMER_DELETED, MessageResponse};
use crate::store::{
    CreditAggregate, CustomerFilter, CustomerOrder, CustomerPatch, CustomerQuery, Include,
    NameMatch, NameMatchMode, NewCustomer, NewOrder, Store, StoreError,
};

/// Lower bound (exclusive) of the credit band route
pub const CREDIT_BAND_LOW: i64 = 150_000;
/// Upper bound (exclusive) of the credit band route
pub const CREDIT_BAND_HIGH: i64 = 310_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Round-trip to the store
    ProbeConnection,
    CreateCustomer,
    /// Fixed find-many: the query does not depend on the request
    FindCustomers(CustomerQuery),
    /// Find-many filtered by `keyword` from the request body
    SearchCustomers(NameMatchMode),
    /// Single customer by path id, `null` when absent
    CustomerDetail,
    UpdateCustomer,
    DeleteCustomer,
    AggregateCredit(CreditAggregate),
    CountCustomers,
    CreateOrder,
    /// Orders of the customer in the path
    ListOrders,
    /// Customer in the path as a 0-or-1 element list, orders and products nested
    CustomerOrdersAndProducts,
}

/// What a request contributes to an operation
#[derive(Debug, Clone, Default)]
pub struct OperationInput {
    pub path_id: Option<String>,
    pub payload: Value,
}

impl Operation {
    /// Customers whose name contains "i" and whose credit is positive
    pub fn where_and() -> Self {
        Operation::FindCustomers(CustomerQuery::filtered(CustomerFilter::And(vec![
            CustomerFilter::Name(NameMatch::new(NameMatchMode::Contains, "i")),
            CustomerFilter::CreditGt(Decimal::ZERO),
        ])))
    }

    /// Customers with credit strictly inside the fixed band
    pub fn credit_band() -> Self {
        Operation::FindCustomers(CustomerQuery::filtered(CustomerFilter::And(vec![
            CustomerFilter::CreditGt(Decimal::from(CREDIT_BAND_LOW)),
            CustomerFilter::CreditLt(Decimal::from(CREDIT_BAND_HIGH)),
        ])))
    }

    pub fn sorted_by_name() -> Self {
        Operation::FindCustomers(CustomerQuery::all().order_by(CustomerOrder::NameAsc))
    }

    pub fn all_with_orders() -> Self {
        Operation::FindCustomers(CustomerQuery::all().include(Include::Orders))
    }

    /// Whether the route carries a single path parameter
    pub fn takes_path_id(&self) -> bool {
        matches!(
            self,
            Operation::CustomerDetail
                | Operation::UpdateCustomer
                | Operation::DeleteCustomer
                | Operation::ListOrders
                | Operation::CustomerOrdersAndProducts
        )
    }

    pub async fn execute(
        &self,
        store: &dyn Store,
        input: OperationInput,
    ) -> Result<Value, ApiError> {
        let OperationInput { path_id: id, payload } = input;
        let path_id = || {
            id.clone()
                .ok_or_else(|| ApiError::OperationFailed("Missing path parameter".to_string()))
        };

        match self {
            Operation::ProbeConnection => {
                store.ping().await.map_err(|e| {
                    tracing::error!(error = %e, "database connectivity probe failed");
                    ApiError::ConnectionFailed
                })?;
                to_json(&MessageResponse::new(CONNECTED))
            }
            Operation::CreateCustomer => {
                let input = NewCustomer::from_payload(&payload)?;
                to_json(&store.create_customer(input).await?)
            }
            Operation::FindCustomers(query) => to_json(&store.find_customers(query).await?),
            Operation::SearchCustomers(mode) => {
                let filter = match keyword(&payload)? {
                    Some(keyword) => CustomerFilter::Name(NameMatch::new(*mode, keyword)),
                    None => CustomerFilter::All,
                };
                to_json(&store.find_customers(&CustomerQuery::filtered(filter)).await?)
            }
            Operation::CustomerDetail => to_json(&store.find_customer(&path_id()?).await?),
            Operation::UpdateCustomer => {
                let id = path_id()?;
                let patch = CustomerPatch::from_payload(&payload)?;
                to_json(&store.update_customer(&id, patch).await?)
            }
            Operation::DeleteCustomer => {
                store.delete_customer(&path_id()?).await?;
                to_json(&MessageResponse::new(CUSTOMER_DELETED))
            }
            Operation::AggregateCredit(aggregate) => {
                let value = store.aggregate_credit(*aggregate).await?;
                let mut body = Map::new();
                body.insert(aggregate.field_name().to_string(), serde_json::to_value(value)?);
                Ok(Value::Object(body))
            }
            Operation::CountCustomers => {
                let count = store.count_customers().await?;
                Ok(json!({ "countCustomer": count }))
            }
            Operation::CreateOrder => {
                let input = NewOrder::from_payload(&payload)?;
                to_json(&store.create_order(input).await?)
            }
            Operation::ListOrders => to_json(&store.find_orders(&path_id()?).await?),
            Operation::CustomerOrdersAndProducts => {
                let query = CustomerQuery::filtered(CustomerFilter::Id(path_id()?))
                    .include(Include::OrdersWithProducts);
                to_json(&store.find_customers(&query).await?)
            }
        }
    }
}

/// `keyword` from the body. Absent or null means no name filter.
fn keyword(payload: &Value) -> Result<Option<String>, ApiError> {
    match payload.get("keyword") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(StoreError::InvalidPayload(format!(
            "Argument `keyword`: expected a string, got {}",
            other
        ))
        .into()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}
