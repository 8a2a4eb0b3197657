use crate::common::constants::ID_FIELD;
use crate::common::Result;
use crate::query::planner::{Aggregate, Expression};
use crate::types::{Document, Documents, Value};
use std::collections::BTreeMap;

/// Groups the source documents by the evaluated _id expression ($group), and
/// accumulates each group. Emits one document per group, in _id order, with
/// the _id followed by the accumulated fields in the given order.
pub fn group(mut source: Documents, id: Expression, aggregates: Vec<(String, Aggregate)>) -> Result<Documents> {
    let mut aggregator = Aggregator::new(id, aggregates);
    while let Some(doc) = source.next().transpose()? {
        aggregator.add(&doc)?;
    }
    aggregator.into_documents()
}

/// Computes bucketed aggregates for documents.
struct Aggregator {
    /// Accumulators by group key. Keys compare with value order, so 5 and 5.0
    /// share a bucket.
    buckets: BTreeMap<Value, Vec<Accumulator>>,
    /// The set of empty accumulators. Used to create new buckets.
    empty: Vec<Accumulator>,
    /// The group key expression.
    id: Expression,
    /// Output field names. Indexes map to accumulators.
    names: Vec<String>,
    /// Expressions to accumulate, None for $count. Indexes map to accumulators.
    expressions: Vec<Option<Expression>>,
}

impl Aggregator {
    fn new(id: Expression, aggregates: Vec<(String, Aggregate)>) -> Self {
        use Aggregate::*;
        let empty = aggregates.iter().map(|(_, aggregate)| Accumulator::new(aggregate)).collect();
        let (names, expressions) = aggregates
            .into_iter()
            .map(|(name, aggregate)| match aggregate {
                Count => (name, None),
                Average(expr) | First(expr) | Last(expr) | Max(expr) | Min(expr) | Push(expr)
                | Sum(expr) => (name, Some(expr)),
            })
            .unzip();
        Self {
            buckets: BTreeMap::new(),
            empty,
            id,
            names,
            expressions,
        }
    }

    /// Adds a document to its group.
    fn add(&mut self, doc: &Document) -> Result<()> {
        let key = self.id.evaluate(doc)?;
        let accumulators = self.buckets.entry(key).or_insert_with(|| self.empty.clone());
        for (accumulator, expr) in accumulators.iter_mut().zip(&self.expressions) {
            let value = match expr {
                Some(expr) => expr.evaluate(doc)?,
                None => Value::Null,
            };
            accumulator.add(value)?;
        }
        Ok(())
    }

    /// Emits the group documents. Empty input yields no groups at all, even
    /// for a constant _id.
    fn into_documents(self) -> Result<Documents> {
        let names = self.names;
        let documents = self
            .buckets
            .into_iter()
            .map(|(key, accumulators)| -> Result<Document> {
                let mut doc = Document::new();
                doc.insert(ID_FIELD, key);
                for (name, accumulator) in names.iter().zip(accumulators) {
                    doc.insert(name.as_str(), accumulator.value()?);
                }
                Ok(doc)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(documents.into_iter().map(Ok)))
    }
}

/// Accumulates group values. Uses an enum rather than a trait since we need
/// to keep these in a vector.
#[derive(Clone)]
enum Accumulator {
    Average { count: i64, sum: Value },
    Count(i64),
    First(Option<Value>),
    Last(Value),
    Max(Option<Value>),
    Min(Option<Value>),
    Push(Vec<Value>),
    Sum(Value),
}

impl Accumulator {
    fn new(aggregate: &Aggregate) -> Self {
        match aggregate {
            Aggregate::Average(_) => Self::Average {
                count: 0,
                sum: Value::Integer(0),
            },
            Aggregate::Count => Self::Count(0),
            Aggregate::First(_) => Self::First(None),
            Aggregate::Last(_) => Self::Last(Value::Null),
            Aggregate::Max(_) => Self::Max(None),
            Aggregate::Min(_) => Self::Min(None),
            Aggregate::Push(_) => Self::Push(Vec::new()),
            Aggregate::Sum(_) => Self::Sum(Value::Integer(0)),
        }
    }

    /// Adds a value to the accumulator. $sum and $avg skip non-numeric
    /// values, $min and $max skip nulls.
    fn add(&mut self, value: Value) -> Result<()> {
        match self {
            Self::Average { count, sum } if value.is_numeric() => {
                *count += 1;
                *sum = sum.checked_add(&value)?;
            }
            Self::Average { .. } => {}
            Self::Count(count) => *count += 1,
            Self::First(first @ None) => *first = Some(value),
            Self::First(Some(_)) => {}
            Self::Last(last) => *last = value,
            Self::Max(_) | Self::Min(_) if value.is_null() => {}
            Self::Max(max @ None) => *max = Some(value),
            Self::Max(Some(max)) => {
                if value > *max {
                    *max = value
                }
            }
            Self::Min(min @ None) => *min = Some(value),
            Self::Min(Some(min)) => {
                if value < *min {
                    *min = value
                }
            }
            Self::Push(values) => values.push(value),
            Self::Sum(sum) if value.is_numeric() => *sum = sum.checked_add(&value)?,
            Self::Sum(_) => {}
        }
        Ok(())
    }

    /// Returns the aggregate value.
    fn value(self) -> Result<Value> {
        Ok(match self {
            Self::Average { count: 0, .. } => Value::Null,
            Self::Average { count, sum } => match sum.as_f64() {
                Some(sum) => Value::Float(sum / count as f64),
                None => Value::Null,
            },
            Self::Count(count) => Value::Integer(count),
            Self::First(value) | Self::Max(value) | Self::Min(value) => value.unwrap_or(Value::Null),
            Self::Last(value) | Self::Sum(value) => value,
            Self::Push(values) => Value::Array(values),
        })
    }
}
