//! Write inputs decoded from client payloads
//!
//! Each input mirrors the column set of its table. Unknown keys fail the
//! whole write. Numeric columns accept JSON numbers or numeric strings, the
//! latter being how urlencoded bodies carry them.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::StoreError;

/// Fields for a new customer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCustomer {
    /// Client-supplied id, generated by the store when absent
    pub id: Option<String>,
    pub name: String,
    pub credit: Decimal,
}

/// Partial update of a customer; absent fields stay untouched
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    /// New primary key. Uniqueness and order references are checked by the
    /// store.
    pub id: Option<String>,
    pub name: Option<String>,
    pub credit: Option<Decimal>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.credit.is_none()
    }
}

/// Fields for a new order
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: String,
    pub amount: Decimal,
}

impl NewCustomer {
    pub fn from_payload(payload: &Value) -> Result<Self, StoreError> {
        decode(payload)
    }
}

impl CustomerPatch {
    pub fn from_payload(payload: &Value) -> Result<Self, StoreError> {
        decode(payload)
    }
}

impl NewOrder {
    pub fn from_payload(payload: &Value) -> Result<Self, StoreError> {
        decode(payload)
    }
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, StoreError> {
    if !payload.is_object() {
        return Err(StoreError::InvalidPayload(
            "Argument `data` must be an object".to_string(),
        ));
    }
    T::deserialize(payload).map_err(|e| StoreError::InvalidPayload(e.to_string()))
}
