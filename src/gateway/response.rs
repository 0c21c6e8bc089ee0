//! Response bodies with a fixed shape

use serde::Serialize;

pub const CONNECTED: &str = "Connected to the database";
pub const CONNECTION_FAILED: &str = "Cannot connect to database";
pub const CUSTOMER_DELETED: &str = "Customer deleted successfully";

/// `{"message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// `{"error": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
