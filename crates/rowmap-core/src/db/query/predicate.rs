use crate::value::Value;
use serde::Serialize;
use std::ops::BitAnd;

///
/// CompareOp
///
/// Comparator vocabulary of the predicate AST. Translation supports
/// equality, ordering, and set membership; the text operators are
/// recognized here so they fail with a typed error instead of a parse
/// error, but no translation exists for them.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }

    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

///
/// CompareClause
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompareClause {
    pub attribute: String,
    pub op: CompareOp,
    pub value: Value,
}

///
/// Predicate
///
/// A conjunction of comparison clauses over declared attributes. The empty
/// predicate matches every row.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Predicate {
    clauses: Vec<CompareClause>,
}

impl Predicate {
    /// The predicate matching every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    fn clause(attribute: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            clauses: vec![CompareClause {
                attribute: attribute.into(),
                op,
                value,
            }],
        }
    }

    #[must_use]
    pub fn eq(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn in_(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::clause(attribute, CompareOp::In, Value::List(values))
    }

    #[must_use]
    pub fn not_in(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::clause(attribute, CompareOp::NotIn, Value::List(values))
    }

    #[must_use]
    pub fn contains(attribute: impl Into<String>, value: Value) -> Self {
        Self::clause(attribute, CompareOp::Contains, value)
    }

    #[must_use]
    pub fn clauses(&self) -> &[CompareClause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(mut self, mut rhs: Self) -> Self::Output {
        self.clauses.append(&mut rhs.clauses);
        self
    }
}

impl BitAnd for &Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.clone() & rhs.clone()
    }
}
