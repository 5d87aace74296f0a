//! Filter and ordering expressions passed across the data-source boundary.
//!
//! Criteria are structured values, never query text. A data source may
//! translate them into its dialect; [`Criteria::matches`] gives the reference
//! semantics used by the in-memory source.

use std::fmt;

use crate::source::Row;
use crate::value::Value;

/// A composable row filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Criteria {
    /// Matches every row.
    #[default]
    All,
    /// `column = value`.
    Eq(String, Value),
    /// `column <> value`.
    Ne(String, Value),
    /// `column IS NULL`.
    IsNull(String),
    /// Conjunction of sub-criteria. Empty conjunction matches everything.
    And(Vec<Criteria>),
}

impl Criteria {
    /// `column = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Criteria::Eq(column.into(), value.into())
    }

    /// `column <> value`.
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Criteria::Ne(column.into(), value.into())
    }

    /// `column IS NULL`.
    pub fn is_null(column: impl Into<String>) -> Self {
        Criteria::IsNull(column.into())
    }

    /// Implicit equality-AND over a column → value mapping.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let parts: Vec<Criteria> = pairs
            .into_iter()
            .map(|(k, v)| Criteria::eq(k, v))
            .collect();
        match parts.len() {
            0 => Criteria::All,
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => Criteria::And(parts),
        }
    }

    /// AND this criteria with another, flattening nested conjunctions.
    pub fn and(self, other: Criteria) -> Self {
        match (self, other) {
            (Criteria::All, c) | (c, Criteria::All) => c,
            (Criteria::And(mut a), Criteria::And(b)) => {
                a.extend(b);
                Criteria::And(a)
            }
            (Criteria::And(mut a), c) => {
                a.push(c);
                Criteria::And(a)
            }
            (c, Criteria::And(mut b)) => {
                b.insert(0, c);
                Criteria::And(b)
            }
            (a, b) => Criteria::And(vec![a, b]),
        }
    }

    /// True if this criteria filters nothing.
    pub fn is_all(&self) -> bool {
        match self {
            Criteria::All => true,
            Criteria::And(parts) => parts.iter().all(Criteria::is_all),
            _ => false,
        }
    }

    /// Evaluate against a row. Missing columns read as NULL.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Criteria::All => true,
            Criteria::Eq(col, value) => row.get(col).is_some_and(|v| v.matches(value)),
            Criteria::Ne(col, value) => row.get(col).is_none_or(|v| !v.matches(value)),
            Criteria::IsNull(col) => row.get(col).is_none_or(Value::is_null),
            Criteria::And(parts) => parts.iter().all(|c| c.matches(row)),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criteria::All => f.write_str("(all)"),
            Criteria::Eq(col, v) => write!(f, "{col} = {v}"),
            Criteria::Ne(col, v) => write!(f, "{col} <> {v}"),
            Criteria::IsNull(col) => write!(f, "{col} IS NULL"),
            Criteria::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(" AND "))
            }
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort on.
    pub column: String,
    /// Descending when true.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Single-value aggregate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// `COUNT(*)`.
    Count,
    /// `MAX(column)`.
    Max(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_pairs_shapes() {
        assert_eq!(Criteria::from_pairs(Vec::<(&str, i64)>::new()), Criteria::All);
        assert_eq!(
            Criteria::from_pairs([("id", 3)]),
            Criteria::Eq("id".to_string(), Value::Int(3))
        );
        assert!(matches!(
            Criteria::from_pairs([("a", 1), ("b", 2)]),
            Criteria::And(ref parts) if parts.len() == 2
        ));
    }

    #[test]
    fn test_and_flattens() {
        let c = Criteria::eq("a", 1)
            .and(Criteria::eq("b", 2))
            .and(Criteria::All)
            .and(Criteria::eq("c", 3));
        match c {
            Criteria::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_matches() {
        let r = row(&[("artist_id", Value::Int(4)), ("name", Value::from("Kid A"))]);
        assert!(Criteria::eq("artist_id", "4").matches(&r));
        assert!(!Criteria::eq("artist_id", 5).matches(&r));
        assert!(Criteria::ne("name", "Amnesiac").matches(&r));
        assert!(Criteria::is_null("year").matches(&r));
        assert!(
            Criteria::eq("artist_id", 4)
                .and(Criteria::eq("name", "Kid A"))
                .matches(&r)
        );
    }

    #[test]
    fn test_display() {
        let c = Criteria::eq("artist_id", 4).and(Criteria::is_null("year"));
        assert_eq!(c.to_string(), "artist_id = 4 AND year IS NULL");
    }
}
