// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expressions and filters embedded in style documents.
//!
//! These are carried through parsing and serialization but never evaluated.
//! The bridge to and from markup is a pair of traits so callers can swap in
//! their own expression language; [`OgcMarkup`] handles the OGC Filter
//! Encoding vocabulary.

use std::fmt;

use crate::de::Element;
use crate::ser::{ElementWriter, Error};

mod ogc;

pub use ogc::OgcMarkup;

/// Name of the binary concatenation function.
pub const STR_CONCAT: &str = "strConcat";

/// Name of the n-ary concatenation function.
pub const CONCATENATE: &str = "Concatenate";

/// An expression: a constant or a computation against feature data.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// The absence of a value; never written.
    Nil,
    Literal(String),
    Property(String),
    Function {
        name: String,
        args: Vec<Expression>,
    },
    Add(Box<Expression>, Box<Expression>),
    Sub(Box<Expression>, Box<Expression>),
    Mul(Box<Expression>, Box<Expression>),
    Div(Box<Expression>, Box<Expression>),
}

impl Expression {
    #[inline]
    pub fn literal(value: impl Into<String>) -> Self {
        Expression::Literal(value.into())
    }

    #[inline]
    pub fn property(name: impl Into<String>) -> Self {
        Expression::Property(name.into())
    }

    /// A literal holding the shortest representation of `value`.
    pub fn number(value: f64) -> Self {
        Expression::Literal(format_f64(value))
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    /// `strConcat(a, b)`.
    pub fn concat2(a: Expression, b: Expression) -> Self {
        Expression::function(STR_CONCAT, vec![a, b])
    }

    /// `Concatenate(args...)`.
    pub fn concat_n(args: Vec<Expression>) -> Self {
        Expression::function(CONCATENATE, args)
    }

    /// Joins parts the way mixed content is joined: nothing becomes an empty
    /// literal, one part stands alone, two use [`Expression::concat2`] and
    /// more use [`Expression::concat_n`].
    pub fn join(mut parts: Vec<Expression>) -> Self {
        match parts.len() {
            0 => Expression::literal(""),
            1 => parts.remove(0),
            2 => {
                let b = parts.remove(1);
                let a = parts.remove(0);
                Expression::concat2(a, b)
            }
            _ => Expression::concat_n(parts),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expression::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the literal value as a number, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_literal().and_then(crate::de::parse_f64)
    }

    /// Returns the arguments if this is any of the string concatenation functions.
    pub fn concatenation_args(&self) -> Option<&[Expression]> {
        match self {
            Expression::Function { name, args }
                if name == STR_CONCAT || name == CONCATENATE || name == "concat" =>
            {
                Some(args)
            }
            _ => None,
        }
    }

    /// Returns true if this is a literal equal to `default`.
    ///
    /// Literals compare equal as strings or, when both parse as numbers, as
    /// numbers, so `1` matches a default of `1.0`.
    pub fn is_literal_eq(&self, default: &str) -> bool {
        match self.as_literal() {
            Some(s) if s == default => true,
            Some(s) => match (crate::de::parse_f64(s), crate::de::parse_f64(default)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            None => false,
        }
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::literal(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Nil => f.write_str("NIL"),
            Expression::Literal(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Expression::Property(p) => f.write_str(p),
            Expression::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    a.fmt(f)?;
                }
                f.write_str(")")
            }
            Expression::Add(a, b) => write!(f, "({} + {})", a, b),
            Expression::Sub(a, b) => write!(f, "({} - {})", a, b),
            Expression::Mul(a, b) => write!(f, "({} * {})", a, b),
            Expression::Div(a, b) => write!(f, "({} / {})", a, b),
        }
    }
}

/// Formats a number as a literal: integral values keep a `.0`, infinities
/// use the XML Schema spelling.
pub(crate) fn format_f64(value: f64) -> String {
    if value == f64::INFINITY {
        "INF".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ComparisonOp {
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
}

impl ComparisonOp {
    const ALL: [ComparisonOp; 6] = [
        ComparisonOp::EqualTo,
        ComparisonOp::NotEqualTo,
        ComparisonOp::LessThan,
        ComparisonOp::GreaterThan,
        ComparisonOp::LessThanOrEqualTo,
        ComparisonOp::GreaterThanOrEqualTo,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            ComparisonOp::EqualTo => "PropertyIsEqualTo",
            ComparisonOp::NotEqualTo => "PropertyIsNotEqualTo",
            ComparisonOp::LessThan => "PropertyIsLessThan",
            ComparisonOp::GreaterThan => "PropertyIsGreaterThan",
            ComparisonOp::LessThanOrEqualTo => "PropertyIsLessThanOrEqualTo",
            ComparisonOp::GreaterThanOrEqualTo => "PropertyIsGreaterThanOrEqualTo",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.element_name().eq_ignore_ascii_case(name))
    }

    fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::EqualTo => "=",
            ComparisonOp::NotEqualTo => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessThanOrEqualTo => "<=",
            ComparisonOp::GreaterThanOrEqualTo => ">=",
        }
    }
}

/// A predicate selecting the features a rule or constraint applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Include,
    Exclude,
    Compare {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
        match_case: bool,
    },
    Like {
        expr: Expression,
        pattern: String,
        wild_card: String,
        single_char: String,
        escape: String,
    },
    IsNull(Expression),
    Between {
        expr: Expression,
        lower: Expression,
        upper: Expression,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),

    /// Selects features by id.
    Id(Vec<String>),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, parts: &[Filter]) -> fmt::Result {
            f.write_str("(")?;
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                p.fmt(f)?;
            }
            f.write_str(")")
        }
        match self {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),
            Filter::Compare {
                op, left, right, ..
            } => write!(f, "{} {} {}", left, op.symbol(), right),
            Filter::Like { expr, pattern, .. } => write!(f, "{} LIKE '{}'", expr, pattern),
            Filter::IsNull(e) => write!(f, "{} IS NULL", e),
            Filter::Between { expr, lower, upper } => {
                write!(f, "{} BETWEEN {} AND {}", expr, lower, upper)
            }
            Filter::And(parts) => join(f, "AND", parts),
            Filter::Or(parts) => join(f, "OR", parts),
            Filter::Not(inner) => write!(f, "NOT {}", inner),
            Filter::Id(ids) => write!(f, "IN ({})", ids.join(", ")),
        }
    }
}

/// Turns an element embedded in a style document into an expression or filter.
pub trait ExpressionFromMarkup: Send + Sync {
    /// Returns `None` if the element isn't an expression this reader understands.
    fn expression(&self, node: &Element) -> Option<Expression>;

    /// Parses a filter, given either the `Filter` wrapper or a bare operator.
    fn filter(&self, node: &Element) -> Option<Filter>;
}

/// Writes an expression or filter as child markup of a style element.
pub trait MarkupFromExpression: Send + Sync {
    fn write_expression(&self, parent: &mut ElementWriter, expr: &Expression)
        -> Result<(), Error>;

    /// Writes the filter operator itself, without a `Filter` wrapper.
    fn write_filter(&self, parent: &mut ElementWriter, filter: &Filter) -> Result<(), Error>;
}
