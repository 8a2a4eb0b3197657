use crate::common::constants::{FIELD_PATH_PREFIX, ID_FIELD, PATH_SEPARATOR};
use crate::common::Result;
use crate::errinput;
use crate::query::engine::{Catalog, Transaction};
use crate::query::execution::{self, ExecutionResult};
use crate::query::parser::ast;
use crate::query::planner::{Expression, Filter, Planner};
use crate::storage::Namespace;
use crate::types::{Document, Value};
use log::debug;

/// A statement plan. Each plan executes against a single transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    /// Switches the session's current database.
    Use { database: String },
    /// Lists the collections of a database.
    ListCollections { database: String },
    /// Reports document and collection counts of a database.
    Stats { database: String },
    /// Inserts documents in order, stopping at the first failure. Documents
    /// inserted before the failure remain.
    Insert {
        ns: Namespace,
        documents: Vec<Document>,
    },
    /// Deletes the documents matching the filter, at most one if `one` is set.
    Delete {
        ns: Namespace,
        filter: Filter,
        one: bool,
    },
    /// Creates a collection. Errors if it already exists.
    Create { ns: Namespace },
    /// Drops a collection.
    Drop { ns: Namespace },
    /// Runs the pipeline over the collection and returns the documents.
    Aggregate { ns: Namespace, pipeline: Vec<Stage> },
    /// Runs the pipeline over the collection and returns the document count.
    Count { ns: Namespace, pipeline: Vec<Stage> },
}

impl Plan {
    /// Builds a plan from a statement, resolving collections in the given database.
    pub fn build(statement: ast::Statement, database: &str) -> Result<Self> {
        Planner::new(database).build(statement)
    }

    /// Executes the plan, consuming it.
    pub fn execute(self, txn: &(impl Transaction + Catalog)) -> Result<ExecutionResult> {
        execution::execute_plan(self, txn, txn)
    }
}

/// An aggregation pipeline stage.
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Keeps the documents matching the filter.
    Match(Filter),
    /// Reshapes documents.
    Project(Projection),
    /// Sets fields to the evaluated expressions, replacing existing ones.
    AddFields(Vec<(String, Expression)>),
    /// Removes fields.
    Unset(Vec<String>),
    /// Groups documents by the evaluated _id expression, emitting one
    /// document per group with the _id followed by the accumulated fields.
    Group {
        id: Expression,
        aggregates: Vec<(String, Aggregate)>,
    },
    /// Sorts documents by the given fields. Sorting is stable.
    Sort(Vec<(String, Direction)>),
    /// Emits only the first n documents.
    Limit(usize),
    /// Discards the first n documents.
    Skip(usize),
    /// Emits a single document holding the number of input documents in the
    /// given field, or nothing if there were none.
    Count(String),
}

impl Stage {
    /// Builds a stage from its shell form, e.g. { $match: { category: "Fruit" } }.
    pub fn build(value: &Value) -> Result<Self> {
        let Some(stage) = value.as_document() else {
            return errinput!("each pipeline stage must be an object, got {value}");
        };
        let mut fields = stage.iter();
        let (Some((name, spec)), None) = (fields.next(), fields.next()) else {
            return errinput!("a pipeline stage must have exactly one field: {stage}");
        };
        let stage = match name.as_str() {
            "$match" => Self::Match(Filter::build(expect_document(name, spec)?)?),
            "$project" => Self::Project(Projection::build(expect_document(name, spec)?)?),
            "$addFields" | "$set" => Self::AddFields(
                expect_document(name, spec)?
                    .iter()
                    .map(|(path, expr)| Ok((path.clone(), Expression::build(expr)?)))
                    .collect::<Result<_>>()?,
            ),
            "$unset" => Self::Unset(build_unset(spec)?),
            "$group" => Self::build_group(expect_document(name, spec)?)?,
            "$sort" => Self::Sort(build_sort(expect_document(name, spec)?)?),
            "$limit" => match spec.as_usize() {
                Some(0) | None => return errinput!("$limit must be a positive integer, got {spec}"),
                Some(n) => Self::Limit(n),
            },
            "$skip" => match spec.as_usize() {
                Some(n) => Self::Skip(n),
                None => return errinput!("$skip must be a non-negative integer, got {spec}"),
            },
            "$count" => Self::Count(build_count_field(spec)?),
            _ => return errinput!("unrecognized pipeline stage name: {name}"),
        };
        debug!("Planned stage {stage}");
        Ok(stage)
    }

    /// Builds a $group stage. The _id field is required.
    fn build_group(spec: &Document) -> Result<Self> {
        let Some(id) = spec.id() else {
            return errinput!("a group specification must include an _id");
        };
        let id = Expression::build(id)?;
        let aggregates = spec
            .iter()
            .filter(|(name, _)| *name != ID_FIELD)
            .map(|(name, accumulator)| {
                if name.contains(PATH_SEPARATOR) {
                    return errinput!("the group field name {name} cannot contain '.'");
                }
                Ok((name.clone(), Aggregate::build(name, accumulator)?))
            })
            .collect::<Result<_>>()?;
        Ok(Self::Group { id, aggregates })
    }
}

fn expect_document<'a>(stage: &str, spec: &'a Value) -> Result<&'a Document> {
    match spec {
        Value::Document(doc) => Ok(doc),
        other => errinput!("the {stage} specification must be an object, got {other}"),
    }
}

/// Builds sort keys from { field: 1 | -1, ... }.
pub fn build_sort(spec: &Document) -> Result<Vec<(String, Direction)>> {
    if spec.is_empty() {
        return errinput!("the $sort specification must have at least one field");
    }
    spec.iter()
        .map(|(path, direction)| match direction {
            Value::Integer(1) => Ok((path.clone(), Direction::Ascending)),
            Value::Integer(-1) => Ok((path.clone(), Direction::Descending)),
            Value::Float(f) if *f == 1.0 => Ok((path.clone(), Direction::Ascending)),
            Value::Float(f) if *f == -1.0 => Ok((path.clone(), Direction::Descending)),
            other => errinput!("$sort key ordering must be 1 or -1, got {other} for {path}"),
        })
        .collect()
}

fn build_unset(spec: &Value) -> Result<Vec<String>> {
    let fields: Vec<String> = match spec {
        Value::String(field) => vec![field.clone()],
        Value::Array(fields) => fields
            .iter()
            .map(|field| match field {
                Value::String(field) => Ok(field.clone()),
                other => errinput!("$unset fields must be strings, got {other}"),
            })
            .collect::<Result<_>>()?,
        other => return errinput!("$unset takes a field name or an array of them, got {other}"),
    };
    if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
        return errinput!("$unset field names must be non-empty");
    }
    Ok(fields)
}

fn build_count_field(spec: &Value) -> Result<String> {
    match spec.as_str() {
        None | Some("") => errinput!("the $count field must be a non-empty string"),
        Some(f) if f.starts_with(FIELD_PATH_PREFIX) => {
            errinput!("the $count field cannot start with '$'")
        }
        Some(f) if f.contains(PATH_SEPARATOR) => errinput!("the $count field cannot contain '.'"),
        Some(f) => Ok(f.to_string()),
    }
}

/// A $group accumulator.
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregate {
    Average(Expression),
    Count,
    First(Expression),
    Last(Expression),
    Max(Expression),
    Min(Expression),
    Push(Expression),
    Sum(Expression),
}

impl Aggregate {
    /// Builds an accumulator from { $op: expression }.
    fn build(field: &str, spec: &Value) -> Result<Self> {
        let accumulator = match spec {
            Value::Document(doc) if doc.len() == 1 => doc.iter().next(),
            _ => None,
        };
        let Some((op, expr)) = accumulator else {
            return errinput!("the field {field} must be an accumulator object, got {spec}");
        };
        if op == "$count" {
            return match expr {
                Value::Document(args) if args.is_empty() => Ok(Self::Count),
                _ => errinput!("$count takes no arguments, i.e. $count: {{}}"),
            };
        }
        let expr = Expression::build(expr)?;
        Ok(match op.as_str() {
            "$avg" => Self::Average(expr),
            "$first" => Self::First(expr),
            "$last" => Self::Last(expr),
            "$max" => Self::Max(expr),
            "$min" => Self::Min(expr),
            "$push" => Self::Push(expr),
            "$sum" => Self::Sum(expr),
            _ => return errinput!("unknown group operator {op}"),
        })
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Average(expr) => write!(f, "{{ $avg: {expr} }}"),
            Self::Count => write!(f, "{{ $count: {{}} }}"),
            Self::First(expr) => write!(f, "{{ $first: {expr} }}"),
            Self::Last(expr) => write!(f, "{{ $last: {expr} }}"),
            Self::Max(expr) => write!(f, "{{ $max: {expr} }}"),
            Self::Min(expr) => write!(f, "{{ $min: {expr} }}"),
            Self::Push(expr) => write!(f, "{{ $push: {expr} }}"),
            Self::Sum(expr) => write!(f, "{{ $sum: {expr} }}"),
        }
    }
}

/// A sort order direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascending => f.write_str("1"),
            Self::Descending => f.write_str("-1"),
        }
    }
}

/// A $project specification.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    /// Whether to keep the _id field.
    pub id: bool,
    pub mode: ProjectionMode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionMode {
    /// Emits only the listed fields, in the listed order. None copies the
    /// field from the input, Some computes it.
    Include(Vec<(String, Option<Expression>)>),
    /// Emits every field except the listed ones.
    Exclude(Vec<String>),
}

impl Projection {
    /// Builds a projection from { field: 1 | 0 | expression, ... }.
    /// Inclusion and exclusion can't be mixed, except for excluding _id.
    pub fn build(spec: &Document) -> Result<Self> {
        if spec.is_empty() {
            return errinput!("the projection specification must have at least one field");
        }
        let mut id = true;
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for (path, value) in spec.iter() {
            let flag = match value {
                Value::Boolean(_) | Value::Integer(_) | Value::Float(_) => value.as_flag(),
                _ => None,
            };
            match flag {
                Some(keep) if path == ID_FIELD => id = keep,
                Some(true) => include.push((path.clone(), None)),
                Some(false) => exclude.push(path.clone()),
                None => include.push((path.clone(), Some(Expression::build(value)?))),
            }
        }
        let mode = match (include.is_empty(), exclude.is_empty()) {
            (false, false) => {
                return errinput!("cannot mix inclusion and exclusion in a projection: {spec}")
            }
            (true, false) => ProjectionMode::Exclude(exclude),
            // A projection that only mentions _id: excluding it keeps
            // everything else, including it keeps only _id.
            (true, true) if !id => ProjectionMode::Exclude(vec![]),
            _ => ProjectionMode::Include(include),
        };
        Ok(Self { id, mode })
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ _id: {}", self.id as u8)?;
        match &self.mode {
            ProjectionMode::Include(fields) => {
                for (path, expr) in fields {
                    match expr {
                        Some(expr) => write!(f, ", {path}: {expr}")?,
                        None => write!(f, ", {path}: 1")?,
                    }
                }
            }
            ProjectionMode::Exclude(fields) => {
                for path in fields {
                    write!(f, ", {path}: 0")?;
                }
            }
        }
        f.write_str(" }")
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match(filter) => write!(f, "{{ $match: {filter} }}"),
            Self::Project(projection) => write!(f, "{{ $project: {projection} }}"),
            Self::AddFields(fields) => {
                f.write_str("{ $addFields: {")?;
                for (i, (path, expr)) in fields.iter().enumerate() {
                    let sep = if i > 0 { ", " } else { " " };
                    write!(f, "{sep}{path}: {expr}")?;
                }
                f.write_str(" } }")
            }
            Self::Unset(fields) => write!(f, "{{ $unset: [ '{}' ] }}", fields.join("', '")),
            Self::Group { id, aggregates } => {
                write!(f, "{{ $group: {{ _id: {id}")?;
                for (name, aggregate) in aggregates {
                    write!(f, ", {name}: {aggregate}")?;
                }
                f.write_str(" } }")
            }
            Self::Sort(keys) => {
                f.write_str("{ $sort: {")?;
                for (i, (path, direction)) in keys.iter().enumerate() {
                    let sep = if i > 0 { ", " } else { " " };
                    write!(f, "{sep}{path}: {direction}")?;
                }
                f.write_str(" } }")
            }
            Self::Limit(n) => write!(f, "{{ $limit: {n} }}"),
            Self::Skip(n) => write!(f, "{{ $skip: {n} }}"),
            Self::Count(field) => write!(f, "{{ $count: '{field}' }}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn stage(spec: Document) -> Result<Stage> {
        Stage::build(&Value::from(spec))
    }

    #[test]
    fn test_group() -> Result<()> {
        let group = stage(doc! {
            "$group" => doc! {
                "_id" => "$category",
                "totalSales" => doc! {
                    "$sum" => doc! { "$multiply" => vec![Value::from("$price"), Value::from("$quantity")] }
                },
                "items" => doc! { "$count" => doc! {} },
            }
        })?;
        assert_eq!(
            group.to_string(),
            "{ $group: { _id: '$category', totalSales: { $sum: { $multiply: [ '$price', '$quantity' ] } }, items: { $count: {} } } }"
        );
        Ok(())
    }

    #[test]
    fn test_group_errors() {
        assert!(stage(doc! { "$group" => doc! { "total" => doc! { "$sum" => 1 } } }).is_err());
        assert!(stage(doc! { "$group" => doc! { "_id" => Value::Null, "total" => 1 } }).is_err());
        assert!(stage(doc! { "$group" => doc! { "_id" => Value::Null, "t" => doc! { "$median" => 1 } } }).is_err());
        assert!(stage(doc! { "$group" => doc! { "_id" => Value::Null, "a.b" => doc! { "$sum" => 1 } } }).is_err());
        assert!(stage(doc! { "$group" => doc! { "_id" => Value::Null, "n" => doc! { "$count" => 1 } } }).is_err());
    }

    #[test]
    fn test_projection() -> Result<()> {
        let project = stage(doc! { "$project" => doc! { "_id" => 0, "item" => 1, "price" => true } })?;
        assert_eq!(
            project,
            Stage::Project(Projection {
                id: false,
                mode: ProjectionMode::Include(vec![("item".into(), None), ("price".into(), None)]),
            })
        );

        let exclude = stage(doc! { "$project" => doc! { "category" => 0 } })?;
        assert_eq!(exclude.to_string(), "{ $project: { _id: 1, category: 0 } }");

        let only_id = stage(doc! { "$project" => doc! { "_id" => 0 } })?;
        assert_eq!(only_id.to_string(), "{ $project: { _id: 0 } }");

        assert!(stage(doc! { "$project" => doc! { "item" => 1, "price" => 0 } }).is_err());
        assert!(stage(doc! { "$project" => doc! {} }).is_err());
        Ok(())
    }

    #[test]
    fn test_sort_limit_skip_count() -> Result<()> {
        assert_eq!(
            stage(doc! { "$sort" => doc! { "totalSales" => -1, "_id" => 1 } })?.to_string(),
            "{ $sort: { totalSales: -1, _id: 1 } }"
        );
        assert_eq!(stage(doc! { "$limit" => 2 })?, Stage::Limit(2));
        assert_eq!(stage(doc! { "$skip" => 0 })?, Stage::Skip(0));
        assert_eq!(stage(doc! { "$count" => "fruits" })?, Stage::Count("fruits".into()));

        assert!(stage(doc! { "$sort" => doc! { "price" => 2 } }).is_err());
        assert!(stage(doc! { "$limit" => 0 }).is_err());
        assert!(stage(doc! { "$skip" => -1 }).is_err());
        assert!(stage(doc! { "$count" => "$n" }).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_stages() {
        assert!(stage(doc! { "$lookup" => doc! {} }).is_err());
        assert!(stage(doc! { "$match" => doc! {}, "$limit" => 1 }).is_err());
        assert!(stage(doc! {}).is_err());
        assert!(stage(doc! { "$match" => "Fruit" }).is_err());
        assert!(Stage::build(&Value::from(1)).is_err());
    }

    #[test]
    fn test_unset_and_set() -> Result<()> {
        assert_eq!(
            stage(doc! { "$unset" => vec![Value::from("price"), Value::from("quantity")] })?,
            Stage::Unset(vec!["price".into(), "quantity".into()])
        );
        assert_eq!(
            stage(doc! { "$set" => doc! { "total" => doc! { "$multiply" => vec![Value::from("$price"), Value::from(2)] } } })?
                .to_string(),
            "{ $addFields: { total: { $multiply: [ '$price', 2 ] } } }"
        );
        assert!(stage(doc! { "$unset" => 1 }).is_err());
        Ok(())
    }
}
