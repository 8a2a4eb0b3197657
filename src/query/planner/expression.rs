use crate::common::constants::FIELD_PATH_PREFIX;
use crate::common::Result;
use crate::errinput;
use crate::types::{Document, Value};

/// An aggregation expression, evaluated against a single document.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A constant value.
    Literal(Value),
    /// A field path without the leading $, e.g. "price" or "store.city".
    /// Evaluates to null if the field is missing.
    Field(String),
    /// An embedded document of expressions, e.g. a compound group key.
    Document(Vec<(String, Expression)>),
    /// An array of expressions.
    Array(Vec<Expression>),
    /// Sums the operands.
    Add(Vec<Expression>),
    /// Multiplies the operands.
    Multiply(Vec<Expression>),
    /// Subtracts the second operand from the first.
    Subtract(Box<Expression>, Box<Expression>),
    /// Divides the first operand by the second.
    Divide(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Builds an expression from its literal shell form, e.g. "$price" or
    /// { $multiply: ["$price", "$quantity"] }.
    pub fn build(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::String(s) => match s.strip_prefix(FIELD_PATH_PREFIX) {
                Some("") => return errinput!("'$' is not a valid field path"),
                Some(path) if path.starts_with(FIELD_PATH_PREFIX) => {
                    return errinput!("variables like {s} are not supported")
                }
                Some(path) => Self::Field(path.to_string()),
                None => Self::Literal(value.clone()),
            },
            Value::Array(values) => Self::Array(values.iter().map(Self::build).collect::<Result<_>>()?),
            Value::Document(doc) => Self::build_document(doc)?,
            _ => Self::Literal(value.clone()),
        })
    }

    /// Builds either an operator expression ({ $op: args }) or an embedded
    /// document of expressions.
    fn build_document(doc: &Document) -> Result<Self> {
        let operators = doc.keys().filter(|k| k.starts_with(FIELD_PATH_PREFIX)).count();
        if operators == 0 {
            return Ok(Self::Document(
                doc.iter()
                    .map(|(key, value)| Ok((key.clone(), Self::build(value)?)))
                    .collect::<Result<_>>()?,
            ));
        }
        if operators != doc.len() || doc.len() != 1 {
            return errinput!("an expression object must have exactly one operator field: {doc}");
        }
        let Some((operator, args)) = doc.iter().next() else {
            return errinput!("empty expression object");
        };
        Ok(match operator.as_str() {
            "$literal" => Self::Literal(args.clone()),
            "$add" => Self::Add(Self::build_args(operator, args)?),
            "$multiply" => Self::Multiply(Self::build_args(operator, args)?),
            "$subtract" => {
                let (lhs, rhs) = Self::build_binary(operator, args)?;
                Self::Subtract(lhs, rhs)
            }
            "$divide" => {
                let (lhs, rhs) = Self::build_binary(operator, args)?;
                Self::Divide(lhs, rhs)
            }
            _ => return errinput!("unrecognized expression operator {operator}"),
        })
    }

    /// Builds operator arguments. A single non-array argument is allowed.
    fn build_args(operator: &str, args: &Value) -> Result<Vec<Expression>> {
        match args {
            Value::Array(values) => values.iter().map(Self::build).collect(),
            Value::Document(_) | Value::String(_) => Ok(vec![Self::build(args)?]),
            value if value.is_numeric() || value.is_null() => Ok(vec![Self::build(args)?]),
            value => errinput!("{operator} can't take {value} as an argument"),
        }
    }

    fn build_binary(operator: &str, args: &Value) -> Result<(Box<Expression>, Box<Expression>)> {
        let args: std::result::Result<[Expression; 2], _> = Self::build_args(operator, args)?.try_into();
        match args {
            Ok([lhs, rhs]) => Ok((Box::new(lhs), Box::new(rhs))),
            Err(args) => errinput!("{operator} takes exactly 2 arguments, got {}", args.len()),
        }
    }

    /// Evaluates the expression against a document.
    pub fn evaluate(&self, doc: &Document) -> Result<Value> {
        use Expression::*;
        Ok(match self {
            Literal(value) => value.clone(),
            Field(path) => doc.get_path(path).cloned().unwrap_or(Value::Null),
            Document(fields) => Value::Document(
                fields
                    .iter()
                    .filter_map(|(key, expr)| expr.compute(doc).map(|v| v.map(|v| (key.clone(), v))).transpose())
                    .collect::<Result<_>>()?,
            ),
            Array(exprs) => Value::Array(exprs.iter().map(|e| e.evaluate(doc)).collect::<Result<_>>()?),
            Add(exprs) => exprs
                .iter()
                .try_fold(Value::Integer(0), |sum, e| sum.checked_add(&e.evaluate(doc)?))?,
            Multiply(exprs) => exprs
                .iter()
                .try_fold(Value::Integer(1), |product, e| product.checked_mul(&e.evaluate(doc)?))?,
            Subtract(lhs, rhs) => lhs.evaluate(doc)?.checked_sub(&rhs.evaluate(doc)?)?,
            Divide(lhs, rhs) => lhs.evaluate(doc)?.checked_div(&rhs.evaluate(doc)?)?,
        })
    }

    /// Evaluates the expression as the value of an output field. A bare
    /// reference to a missing field yields no value, so the field is left
    /// out rather than set to null.
    pub fn compute(&self, doc: &Document) -> Result<Option<Value>> {
        match self {
            Self::Field(path) => Ok(doc.get_path(path).cloned()),
            expr => expr.evaluate(doc).map(Some),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Field(path) => write!(f, "'${path}'"),
            Self::Document(fields) => {
                f.write_str("{ ")?;
                for (i, (key, expr)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {expr}")?;
                }
                f.write_str(" }")
            }
            Self::Array(exprs) => write_list(f, exprs),
            Self::Add(exprs) => {
                f.write_str("{ $add: ")?;
                write_list(f, exprs)?;
                f.write_str(" }")
            }
            Self::Multiply(exprs) => {
                f.write_str("{ $multiply: ")?;
                write_list(f, exprs)?;
                f.write_str(" }")
            }
            Self::Subtract(lhs, rhs) => write!(f, "{{ $subtract: [ {lhs}, {rhs} ] }}"),
            Self::Divide(lhs, rhs) => write!(f, "{{ $divide: [ {lhs}, {rhs} ] }}"),
        }
    }
}

fn write_list(f: &mut std::fmt::Formatter<'_>, exprs: &[Expression]) -> std::fmt::Result {
    f.write_str("[ ")?;
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{expr}")?;
    }
    f.write_str(" ]")
}
