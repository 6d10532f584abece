use std::cmp::Ordering;

use serde_json::Value;

use super::{compare_values, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Condition on one top-level field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    /// A missing field behaves like `null`.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        let ordering = compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => ordering == Some(Ordering::Equal),
            FilterOp::Ne => ordering != Some(Ordering::Equal),
            FilterOp::Gt => ordering == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => ordering == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Filters, ordering and limit for [`super::RecordStore::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Applies filters, ordering and limit to an in-memory row set.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut selected: Vec<Record> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();
        if let Some((field, direction)) = &self.order_by {
            // Stable sort keeps insertion order between equal keys.
            selected.sort_by(|a, b| {
                let left = a.get(field).unwrap_or(&Value::Null);
                let right = b.get(field).unwrap_or(&Value::Null);
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        vec![
            json!({"id": "1", "account_id": "a", "transaction_date": "2024-03-01", "amount": "-20"}),
            json!({"id": "2", "account_id": "b", "transaction_date": "2024-01-15", "amount": "100"}),
            json!({"id": "3", "account_id": "a", "transaction_date": "2024-02-10", "amount": "5.5"}),
        ]
    }

    #[test]
    fn filters_and_orders_rows() {
        let query = Query::new()
            .filter(Filter::eq("account_id", "a"))
            .order_by("transaction_date", Direction::Ascending);
        let result = query.apply(&rows());
        let ids: Vec<_> = result.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!("3"), json!("1")]);
    }

    #[test]
    fn range_filters_compare_decimals() {
        let query = Query::new()
            .filter(Filter::gt("amount", "0"))
            .order_by("amount", Direction::Descending)
            .limit(1);
        let result = query.apply(&rows());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["id"], json!("2"));
    }

    #[test]
    fn missing_field_matches_null_only() {
        let filter = Filter::eq("category_id", Value::Null);
        assert!(filter.matches(&json!({"id": "1"})));
        assert!(!filter.matches(&json!({"id": "1", "category_id": "x"})));
        assert!(Filter::ne("category_id", "x").matches(&json!({"id": "1"})));
    }
}
