//! Query descriptors
//!
//! Each route commits to one of these shapes. Backends interpret them: the
//! Postgres store renders SQL, the memory store evaluates them row by row.
//! Both must agree on the observable result.

use rust_decimal::Decimal;

use super::{StoreError, StoreResult};
use crate::models::Customer;

/// How a name keyword is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatchMode {
    StartsWith,
    EndsWith,
    Contains,
}

/// Literal (wildcard-free) match of `keyword` against `Customer.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub mode: NameMatchMode,
    pub keyword: String,
}

impl NameMatch {
    pub fn new(mode: NameMatchMode, keyword: impl Into<String>) -> Self {
        Self {
            mode,
            keyword: keyword.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self.mode {
            NameMatchMode::StartsWith => name.starts_with(&self.keyword),
            NameMatchMode::EndsWith => name.ends_with(&self.keyword),
            NameMatchMode::Contains => name.contains(&self.keyword),
        }
    }

    /// `LIKE` pattern with `\` as escape character. `%` and `_` inside the
    /// keyword are escaped so they match literally.
    pub fn like_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.keyword.len() + 2);
        for ch in self.keyword.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        match self.mode {
            NameMatchMode::StartsWith => format!("{}%", escaped),
            NameMatchMode::EndsWith => format!("%{}", escaped),
            NameMatchMode::Contains => format!("%{}%", escaped),
        }
    }
}

/// Row predicate over customers
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerFilter {
    All,
    Id(String),
    Name(NameMatch),
    CreditGt(Decimal),
    CreditLt(Decimal),
    And(Vec<CustomerFilter>),
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        match self {
            CustomerFilter::All => true,
            CustomerFilter::Id(id) => customer.id == *id,
            CustomerFilter::Name(m) => m.matches(&customer.name),
            CustomerFilter::CreditGt(bound) => customer.credit > *bound,
            CustomerFilter::CreditLt(bound) => customer.credit < *bound,
            CustomerFilter::And(filters) => filters.iter().all(|f| f.matches(customer)),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomerOrder {
    /// Whatever order the backend produces
    #[default]
    Unspecified,
    NameAsc,
}

/// Relations loaded alongside each customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Include {
    #[default]
    None,
    Orders,
    OrdersWithProducts,
}

/// Full find-many descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerQuery {
    pub filter: CustomerFilter,
    pub order: CustomerOrder,
    pub include: Include,
}

impl CustomerQuery {
    pub fn all() -> Self {
        Self::filtered(CustomerFilter::All)
    }

    pub fn filtered(filter: CustomerFilter) -> Self {
        Self {
            filter,
            order: CustomerOrder::Unspecified,
            include: Include::None,
        }
    }

    pub fn order_by(mut self, order: CustomerOrder) -> Self {
        self.order = order;
        self
    }

    pub fn include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }
}

/// Aggregate over `Customer.credit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditAggregate {
    Sum,
    Max,
    Min,
    Avg,
}

impl CreditAggregate {
    pub fn sql_function(self) -> &'static str {
        match self {
            CreditAggregate::Sum => "SUM",
            CreditAggregate::Max => "MAX",
            CreditAggregate::Min => "MIN",
            CreditAggregate::Avg => "AVG",
        }
    }

    /// JSON field the result is reported under
    pub fn field_name(self) -> &'static str {
        match self {
            CreditAggregate::Sum => "sumCredit",
            CreditAggregate::Max => "maxCredit",
            CreditAggregate::Min => "minCredit",
            CreditAggregate::Avg => "avgCredit",
        }
    }

    /// Fold over credits; `None` when there are no rows. A sum outside the
    /// `Decimal` range is [`StoreError::Overflow`].
    pub fn apply<I>(self, credits: I) -> StoreResult<Option<Decimal>>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let mut iter = credits.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let overflow = || StoreError::Overflow(self.field_name());
        let value = match self {
            CreditAggregate::Sum => {
                iter.try_fold(first, |acc, c| acc.checked_add(c).ok_or_else(overflow))?
            }
            CreditAggregate::Max => iter.fold(first, Decimal::max),
            CreditAggregate::Min => iter.fold(first, Decimal::min),
            CreditAggregate::Avg => {
                let (sum, count) = iter.try_fold((first, 1u64), |(s, n), c| {
                    s.checked_add(c).map(|s| (s, n + 1)).ok_or_else(overflow)
                })?;
                sum.checked_div(Decimal::from(count)).ok_or_else(overflow)?
            }
        };
        Ok(Some(value))
    }
}
