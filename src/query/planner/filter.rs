use crate::common::constants::FIELD_PATH_PREFIX;
use crate::common::Result;
use crate::errinput;
use crate::types::{Document, Value};
use std::cmp::Ordering;

/// A query filter, as used by $match, find() and deleteMany().
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches if all filters match. An empty And matches everything.
    And(Vec<Filter>),
    /// Matches if any filter matches.
    Or(Vec<Filter>),
    /// Matches if no filter matches.
    Nor(Vec<Filter>),
    /// Matches if the value at the path satisfies the condition.
    Condition { path: String, condition: Condition },
}

/// A condition on a single field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

static NULL: Value = Value::Null;

impl Filter {
    /// Builds a filter from a query document, e.g.
    /// { category: "Fruit", price: { $gte: 5 } }.
    pub fn build(query: &Document) -> Result<Self> {
        let mut filters = Vec::with_capacity(query.len());
        for (key, value) in query.iter() {
            match key.as_str() {
                "$and" => filters.push(Self::And(Self::build_list(key, value)?)),
                "$or" => filters.push(Self::Or(Self::build_list(key, value)?)),
                "$nor" => filters.push(Self::Nor(Self::build_list(key, value)?)),
                op if op.starts_with(FIELD_PATH_PREFIX) => {
                    return errinput!("unknown top level operator {op}")
                }
                path => filters.extend(Self::build_conditions(path, value)?),
            }
        }
        Ok(match filters.len() {
            1 => filters.remove(0),
            _ => Self::And(filters),
        })
    }

    /// Builds the filter list of $and, $or and $nor.
    fn build_list(operator: &str, value: &Value) -> Result<Vec<Filter>> {
        let Value::Array(queries) = value else {
            return errinput!("{operator} must be an array");
        };
        if queries.is_empty() {
            return errinput!("{operator} must be a nonempty array");
        }
        queries
            .iter()
            .map(|query| match query {
                Value::Document(query) => Self::build(query),
                other => errinput!("{operator} entries must be documents, got {other}"),
            })
            .collect()
    }

    /// Builds the conditions on a field: either an operator document such
    /// as { $gt: 5, $lt: 10 }, or a plain value to compare for equality.
    fn build_conditions(path: &str, value: &Value) -> Result<Vec<Filter>> {
        let operators = match value {
            Value::Document(doc) if doc.keys().any(|k| k.starts_with(FIELD_PATH_PREFIX)) => doc,
            _ => {
                return Ok(vec![Self::Condition {
                    path: path.to_string(),
                    condition: Condition::Eq(value.clone()),
                }])
            }
        };
        operators
            .iter()
            .map(|(op, operand)| {
                let condition = match op.as_str() {
                    "$eq" => Condition::Eq(operand.clone()),
                    "$ne" => Condition::Ne(operand.clone()),
                    "$gt" => Condition::Gt(operand.clone()),
                    "$gte" => Condition::Gte(operand.clone()),
                    "$lt" => Condition::Lt(operand.clone()),
                    "$lte" => Condition::Lte(operand.clone()),
                    "$in" | "$nin" => {
                        let Value::Array(values) = operand else {
                            return errinput!("{op} needs an array");
                        };
                        match op.as_str() {
                            "$in" => Condition::In(values.clone()),
                            _ => Condition::Nin(values.clone()),
                        }
                    }
                    "$exists" => match operand.as_flag() {
                        Some(exists) => Condition::Exists(exists),
                        None => return errinput!("$exists needs a boolean, got {operand}"),
                    },
                    _ => return errinput!("unknown operator {op}"),
                };
                Ok(Self::Condition {
                    path: path.to_string(),
                    condition,
                })
            })
            .collect()
    }

    /// Returns true if the document matches the filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Self::Nor(filters) => !filters.iter().any(|f| f.matches(doc)),
            Self::Condition { path, condition } => condition.matches(doc.get_path(path)),
        }
    }
}

impl Condition {
    /// Checks the condition against a field value, or None if the field is
    /// missing. Array fields match if the array itself or any element does.
    fn matches(&self, value: Option<&Value>) -> bool {
        use Condition::*;
        match self {
            Exists(expected) => value.is_some() == *expected,
            Eq(target) => any_equal(value, target),
            Ne(target) => !any_equal(value, target),
            In(targets) => targets.iter().any(|target| any_equal(value, target)),
            Nin(targets) => !targets.iter().any(|target| any_equal(value, target)),
            Gt(target) => any_compare(value, target, |o| o == Ordering::Greater),
            Gte(target) => any_compare(value, target, |o| o != Ordering::Less),
            Lt(target) => any_compare(value, target, |o| o == Ordering::Less),
            Lte(target) => any_compare(value, target, |o| o != Ordering::Greater),
        }
    }
}

/// Returns the candidate values of a field for matching. A missing field
/// behaves as null.
fn candidates(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => vec![&NULL],
        Some(Value::Array(values)) => values.iter().chain(value).collect(),
        Some(value) => vec![value],
    }
}

fn any_equal(value: Option<&Value>, target: &Value) -> bool {
    candidates(value).into_iter().any(|candidate| candidate == target)
}

/// Range comparisons only match values of the same type bracket, so
/// { price: { $gt: 5 } } never matches a string price.
fn any_compare(value: Option<&Value>, target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates(value)
        .into_iter()
        .any(|candidate| candidate.same_bracket(target) && accept(candidate.cmp(target)))
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And(filters) if filters.is_empty() => f.write_str("{}"),
            Self::And(filters) => join(f, "$and", filters),
            Self::Or(filters) => join(f, "$or", filters),
            Self::Nor(filters) => join(f, "$nor", filters),
            Self::Condition { path, condition } => write!(f, "{{ {path}: {condition} }}"),
        }
    }
}

fn join(f: &mut std::fmt::Formatter<'_>, op: &str, filters: &[Filter]) -> std::fmt::Result {
    write!(f, "{{ {op}: [ ")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{filter}")?;
    }
    f.write_str(" ] }")
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (op, operand) = match self {
            Self::Eq(v) => ("$eq", v.clone()),
            Self::Ne(v) => ("$ne", v.clone()),
            Self::Gt(v) => ("$gt", v.clone()),
            Self::Gte(v) => ("$gte", v.clone()),
            Self::Lt(v) => ("$lt", v.clone()),
            Self::Lte(v) => ("$lte", v.clone()),
            Self::In(vs) => ("$in", Value::Array(vs.clone())),
            Self::Nin(vs) => ("$nin", Value::Array(vs.clone())),
            Self::Exists(b) => ("$exists", Value::Boolean(*b)),
        };
        write!(f, "{{ {op}: {operand} }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn build(query: Document) -> Filter {
        Filter::build(&query).expect("valid filter")
    }

    fn apple() -> Document {
        doc! { "_id" => 1, "item" => "Apple", "price" => 10, "quantity" => 5, "category" => "Fruit" }
    }

    #[test]
    fn test_equality() {
        assert!(build(doc! { "category" => "Fruit" }).matches(&apple()));
        assert!(!build(doc! { "category" => "Vegetable" }).matches(&apple()));
        assert!(build(doc! { "price" => 10.0 }).matches(&apple()));
        assert!(build(doc! {}).matches(&apple()));
    }

    #[test]
    fn test_comparisons() {
        assert!(build(doc! { "price" => doc! { "$gte" => 10, "$lt" => 11 } }).matches(&apple()));
        assert!(!build(doc! { "price" => doc! { "$gt" => 10 } }).matches(&apple()));
        // Strings and numbers never compare.
        assert!(!build(doc! { "item" => doc! { "$gt" => 0 } }).matches(&apple()));
        assert!(build(doc! { "item" => doc! { "$lt" => "Banana" } }).matches(&apple()));
    }

    #[test]
    fn test_missing_fields() {
        assert!(build(doc! { "discount" => Value::Null }).matches(&apple()));
        assert!(build(doc! { "discount" => doc! { "$exists" => false } }).matches(&apple()));
        assert!(!build(doc! { "price" => doc! { "$exists" => 0 } }).matches(&apple()));
        assert!(build(doc! { "discount" => doc! { "$ne" => 5 } }).matches(&apple()));
    }

    #[test]
    fn test_sets_and_logic() {
        let fruit_or_cheap = build(doc! {
            "$or" => vec![
                Value::from(doc! { "category" => doc! { "$in" => vec![Value::from("Fruit")] } }),
                Value::from(doc! { "price" => doc! { "$lt" => 5 } }),
            ]
        });
        assert!(fruit_or_cheap.matches(&apple()));

        let neither = build(doc! {
            "$nor" => vec![
                Value::from(doc! { "category" => "Fruit" }),
                Value::from(doc! { "item" => doc! { "$nin" => vec![Value::from("Apple")] } }),
            ]
        });
        assert!(!neither.matches(&apple()));
    }

    #[test]
    fn test_array_fields() {
        let doc = doc! { "tags" => vec![Value::from("fresh"), Value::from("red")] };
        assert!(build(doc! { "tags" => "red" }).matches(&doc));
        assert!(build(doc! { "tags" => vec![Value::from("fresh"), Value::from("red")] }).matches(&doc));
        assert!(!build(doc! { "tags" => doc! { "$ne" => "fresh" } }).matches(&doc));
    }

    #[test]
    fn test_embedded_paths() {
        let doc = doc! { "store" => doc! { "city" => "Lahore" } };
        assert!(build(doc! { "store.city" => "Lahore" }).matches(&doc));
        assert!(build(doc! { "store" => doc! { "city" => "Lahore" } }).matches(&doc));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(Filter::build(&doc! { "$where" => "true" }).is_err());
        assert!(Filter::build(&doc! { "price" => doc! { "$regex" => "x" } }).is_err());
        assert!(Filter::build(&doc! { "$or" => vec![] as Vec<Value> }).is_err());
        assert!(Filter::build(&doc! { "price" => doc! { "$in" => 5 } }).is_err());
    }

    #[test]
    fn test_display() {
        let filter = build(doc! { "category" => "Fruit", "price" => doc! { "$gt" => 5 } });
        assert_eq!(
            filter.to_string(),
            "{ $and: [ { category: { $eq: 'Fruit' } }, { price: { $gt: 5 } } ] }"
        );
    }
}
