//! Range queries over timestamp fields.

use crate::document::Document;
use crate::timestamp::Timestamp;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator for a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Equal.
    Eq,
}

impl Comparison {
    /// Evaluates `lhs <op> rhs`.
    pub fn evaluate(self, lhs: Timestamp, rhs: Timestamp) -> bool {
        match self {
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Eq => lhs == rhs,
        }
    }

    /// Operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
        }
    }
}

/// A single `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Field name.
    pub field: String,
    /// Operator.
    pub op: Comparison,
    /// Right-hand side.
    pub value: Timestamp,
}

impl Filter {
    /// Returns true if the document carries the field as a timestamp and
    /// the predicate holds. Documents without the field never match.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.timestamp(&self.field)
            .is_some_and(|ts| self.op.evaluate(ts, self.value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.symbol(), self.value)
    }
}

/// A conjunction of filters with an ascending sort field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<Filter>,
    order_by: Option<String>,
}

impl Query {
    /// Creates a query matching everything, unordered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter (conjunction).
    pub fn filter(mut self, field: impl Into<String>, op: Comparison, value: Timestamp) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    /// Sorts ascending by the given timestamp field.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Returns the filters.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the sort field.
    pub fn order_field(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// Returns true if every filter matches and, when ordered, the sort
    /// field is present.
    pub fn matches(&self, doc: &Document) -> bool {
        let has_order_key = match &self.order_by {
            Some(field) => doc.timestamp(field).is_some(),
            None => true,
        };
        has_order_key && self.filters.iter().all(|f| f.matches(doc))
    }

    /// Ascending comparison on the sort field, ties broken by id.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let by_field = match &self.order_by {
            Some(field) => a.timestamp(field).cmp(&b.timestamp(field)),
            None => Ordering::Equal,
        };
        by_field.then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{filter}")?;
        }
        if let Some(field) = &self.order_by {
            write!(f, " ORDER BY {field} ASC")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CREATED_AT, UPDATED_AT};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn doc(id: &str, created: &str, updated: &str) -> Document {
        Document::new(id)
            .with_field(CREATED_AT, ts(created))
            .with_field(UPDATED_AT, ts(updated))
    }

    #[test]
    fn boundary_is_exclusive_for_gt() {
        let t = ts("2024-01-05");
        let q = Query::new().filter(CREATED_AT, Comparison::Gt, t);
        assert!(!q.matches(&doc("a", "2024-01-05", "2024-01-05")));
        assert!(q.matches(&doc("b", "2024-01-05T00:00:00.001Z", "2024-01-06")));
    }

    #[test]
    fn conjunction() {
        let t = ts("2024-01-05");
        let q = Query::new()
            .filter(UPDATED_AT, Comparison::Gt, t)
            .filter(CREATED_AT, Comparison::Le, t);
        assert!(q.matches(&doc("a", "2024-01-05", "2024-01-06")));
        assert!(!q.matches(&doc("b", "2024-01-06", "2024-01-07")));
        assert!(!q.matches(&doc("c", "2024-01-01", "2024-01-02")));
    }

    #[test]
    fn missing_field_never_matches() {
        let q = Query::new().filter(CREATED_AT, Comparison::Ge, ts("1970-01-01"));
        assert!(!q.matches(&Document::new("x")));
    }

    #[test]
    fn compare_breaks_ties_by_id() {
        let q = Query::new().order_by(UPDATED_AT);
        let a = doc("a", "2024-01-01", "2024-01-02");
        let b = doc("b", "2024-01-01", "2024-01-02");
        let c = doc("c", "2024-01-01", "2024-01-01");
        assert_eq!(q.compare(&a, &b), Ordering::Less);
        assert_eq!(q.compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn display() {
        let q = Query::new()
            .filter(CREATED_AT, Comparison::Gt, ts("2024-01-05"))
            .order_by(CREATED_AT);
        assert_eq!(
            q.to_string(),
            "createdAt > 2024-01-05T00:00:00.000Z ORDER BY createdAt ASC"
        );
    }
}
