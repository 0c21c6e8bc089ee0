//! Dispatch table
//!
//! One row per public route. The router is built from this table, so the
//! table is the complete list of what the service answers.

use axum::routing::MethodFilter;

use super::operation::Operation;
use crate::store::{CreditAggregate, CustomerQuery, NameMatchMode};

#[derive(Debug, Clone)]
pub struct Route {
    pub method: MethodFilter,
    /// axum path pattern; `{id}`-style segments bind the path parameter
    pub path: &'static str,
    pub operation: Operation,
}

impl Route {
    fn new(method: MethodFilter, path: &'static str, operation: Operation) -> Self {
        Self {
            method,
            path,
            operation,
        }
    }
}

pub fn route_table() -> Vec<Route> {
    use MethodFilter as M;
    use Operation as Op;

    vec![
        Route::new(M::GET, "/check-db-connection", Op::ProbeConnection),
        // Customer CRUD
        Route::new(M::POST, "/customer/create", Op::CreateCustomer),
        Route::new(M::GET, "/customer/list", Op::FindCustomers(CustomerQuery::all())),
        Route::new(M::GET, "/customer/detail/{id}", Op::CustomerDetail),
        Route::new(M::PUT, "/customer/update/{id}", Op::UpdateCustomer),
        Route::new(M::DELETE, "/customer/delete/{id}", Op::DeleteCustomer),
        // Search and fixed filters
        Route::new(M::GET, "/customer/startsWith", Op::SearchCustomers(NameMatchMode::StartsWith)),
        Route::new(M::GET, "/customer/endsWith", Op::SearchCustomers(NameMatchMode::EndsWith)),
        Route::new(M::GET, "/customer/contains", Op::SearchCustomers(NameMatchMode::Contains)),
        Route::new(M::GET, "/customer/sortByName", Op::sorted_by_name()),
        Route::new(M::GET, "/customer/whereAnd", Op::where_and()),
        Route::new(M::GET, "/customer/listBetweenCredit", Op::credit_band()),
        // Aggregates
        Route::new(M::GET, "/customer/sumCredit", Op::AggregateCredit(CreditAggregate::Sum)),
        Route::new(M::GET, "/customer/maxCredit", Op::AggregateCredit(CreditAggregate::Max)),
        Route::new(M::GET, "/customer/minCredit", Op::AggregateCredit(CreditAggregate::Min)),
        Route::new(M::GET, "/customer/avgCredit", Op::AggregateCredit(CreditAggregate::Avg)),
        Route::new(M::GET, "/customer/countCustomer", Op::CountCustomers),
        // Orders
        Route::new(M::POST, "/order/create", Op::CreateOrder),
        Route::new(M::GET, "/customer/listOrder/{customerId}", Op::ListOrders),
        Route::new(M::GET, "/customer/listAllOrder", Op::all_with_orders()),
        Route::new(
            M::GET,
            "/customer/listOrderAndProduct/{customerId}",
            Op::CustomerOrdersAndProducts,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_unique() {
        let table = route_table();
        let paths: HashSet<_> = table.iter().map(|r| r.path).collect();
        assert_eq!(paths.len(), table.len());
        assert_eq!(table.len(), 21);
    }

    #[test]
    fn test_path_params_match_operations() {
        for route in route_table() {
            assert_eq!(
                route.path.contains('{'),
                route.operation.takes_path_id(),
                "path parameter mismatch on {}",
                route.path
            );
        }
    }
}
