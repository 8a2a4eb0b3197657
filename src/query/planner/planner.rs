use crate::common::Result;
use crate::errinput;
use crate::query::parser::ast::{Call, Statement};
use crate::query::planner::plan::build_sort;
use crate::query::planner::{Filter, Plan, Projection, Stage};
use crate::storage::Namespace;
use crate::types::{Document, Value};
use log::{debug, warn};

/// The planner builds plans from parsed statements, resolving collection
/// names against the session's current database.
pub struct Planner<'a> {
    database: &'a str,
}

impl<'a> Planner<'a> {
    pub fn new(database: &'a str) -> Self {
        Self { database }
    }

    /// Builds a plan for a statement.
    pub fn build(&self, statement: Statement) -> Result<Plan> {
        debug!("Planning {statement:?}");
        match statement {
            Statement::Use(database) => Self::build_use(database),
            Statement::ShowCollections => Ok(Plan::ListCollections {
                database: self.database.to_string(),
            }),
            Statement::Database(call) => self.build_database(call),
            Statement::Collection {
                collection,
                call,
                cursor,
            } => self.build_collection(&collection, call, cursor),
        }
    }

    fn build_use(database: String) -> Result<Plan> {
        if database.is_empty() || database.contains(['/', '\\', '.', ' ', '"', '$']) {
            return errinput!("invalid database name '{database}'");
        }
        Ok(Plan::Use { database })
    }

    /// Builds a db.method() plan.
    fn build_database(&self, call: Call) -> Result<Plan> {
        let database = self.database.to_string();
        match (call.method.as_str(), call.args.as_slice()) {
            ("getCollectionNames", []) => Ok(Plan::ListCollections { database }),
            ("stats", []) => Ok(Plan::Stats { database }),
            ("createCollection", [Value::String(collection)]) => Ok(Plan::Create {
                ns: self.namespace(collection)?,
            }),
            ("getCollectionNames" | "stats" | "createCollection", _) => {
                errinput!("invalid arguments to db.{}()", call.method)
            }
            (method, _) => errinput!("db.{method} is not a function"),
        }
    }

    /// Builds a db.collection.method() plan, applying any cursor calls.
    fn build_collection(&self, collection: &str, call: Call, cursor: Vec<Call>) -> Result<Plan> {
        let ns = self.namespace(collection)?;
        let Call { method, args } = call;
        let plan = match method.as_str() {
            "find" | "findOne" => {
                let (filter, projection) = match args.as_slice() {
                    [] => (None, None),
                    [filter] => (Some(filter), None),
                    [filter, projection] => (Some(filter), Some(projection)),
                    _ => return errinput!("{method} takes at most a filter and a projection"),
                };
                let mut pipeline = Vec::new();
                if let Some(filter) = filter.map(|f| expect_document("filter", f)).transpose()? {
                    if !filter.is_empty() {
                        pipeline.push(Stage::Match(Filter::build(filter)?));
                    }
                }
                let projection = match projection.map(|p| expect_document("projection", p)).transpose()? {
                    Some(projection) if !projection.is_empty() => Some(Projection::build(projection)?),
                    _ => None,
                };
                if method == "findOne" {
                    if !cursor.is_empty() {
                        return errinput!("findOne() returns a document, not a cursor");
                    }
                    pipeline.push(Stage::Limit(1));
                    pipeline.extend(projection.map(Stage::Project));
                    return Ok(Plan::Aggregate { ns, pipeline });
                }
                return Self::build_cursor(ns, pipeline, projection, cursor);
            }
            "aggregate" => {
                let pipeline = match args.as_slice() {
                    [Value::Array(stages)] | [Value::Array(stages), Value::Document(_)] => stages,
                    _ => return errinput!("aggregate() takes an array of pipeline stages"),
                };
                let pipeline = pipeline.iter().map(Stage::build).collect::<Result<_>>()?;
                Plan::Aggregate { ns, pipeline }
            }
            "countDocuments" => {
                let pipeline = match args.as_slice() {
                    [] => vec![],
                    [filter, ..] => vec![Stage::Match(Filter::build(expect_document("filter", filter)?)?)],
                };
                Plan::Count { ns, pipeline }
            }
            "insertOne" => match args.as_slice() {
                [Value::Document(document), options @ ..] => {
                    ignore_options(&method, options);
                    Plan::Insert {
                        ns,
                        documents: vec![document.clone()],
                    }
                }
                _ => return errinput!("insertOne() takes a document"),
            },
            "insertMany" => match args.as_slice() {
                [Value::Array(documents), options @ ..] => {
                    ignore_options(&method, options);
                    let documents = documents
                        .iter()
                        .map(|doc| expect_document("document", doc).cloned())
                        .collect::<Result<_>>()?;
                    Plan::Insert { ns, documents }
                }
                _ => return errinput!("insertMany() takes an array of documents"),
            },
            "deleteOne" | "deleteMany" => match args.as_slice() {
                [Value::Document(filter), options @ ..] => {
                    ignore_options(&method, options);
                    Plan::Delete {
                        ns,
                        filter: Filter::build(filter)?,
                        one: method == "deleteOne",
                    }
                }
                _ => return errinput!("{method}() takes a filter document"),
            },
            "drop" => match args.as_slice() {
                [] => Plan::Drop { ns },
                _ => return errinput!("drop() takes no arguments"),
            },
            _ => return errinput!("db.{collection}.{method} is not a function"),
        };
        match (&plan, cursor.first()) {
            (_, None) => Ok(plan),
            // Aggregation cursors only support the output helpers.
            (Plan::Aggregate { .. }, Some(_))
                if cursor.iter().all(|c| matches!(c.method.as_str(), "toArray" | "pretty")) =>
            {
                Ok(plan)
            }
            (_, Some(call)) => errinput!("{}() is not supported after {method}()", call.method),
        }
    }

    /// Applies cursor calls on a find() pipeline. Like a MongoDB cursor,
    /// modifiers apply as sort, then skip, then limit, whatever the call
    /// order, and the projection comes last. count() ignores skip and limit.
    fn build_cursor(
        ns: Namespace,
        mut pipeline: Vec<Stage>,
        projection: Option<Projection>,
        cursor: Vec<Call>,
    ) -> Result<Plan> {
        let (mut sort, mut skip, mut limit) = (None, None, None);
        let mut count = false;
        for Call { method, args } in cursor {
            if count {
                return errinput!("{method}() is not supported after count()");
            }
            match (method.as_str(), args.as_slice()) {
                ("sort", [Value::Document(spec)]) => sort = Some(build_sort(spec)?),
                ("skip", [n]) => match n.as_usize() {
                    Some(n) => skip = Some(n),
                    None => return errinput!("skip() takes a non-negative integer, got {n}"),
                },
                // A negative limit behaves like its absolute value, and 0 means none.
                ("limit", [n]) => match n {
                    Value::Integer(i) => limit = Some(i.unsigned_abs() as usize),
                    n => match n.as_usize() {
                        Some(n) => limit = Some(n),
                        None => return errinput!("limit() takes an integer, got {n}"),
                    },
                },
                ("count", [] | [Value::Boolean(false)]) => count = true,
                ("toArray" | "pretty", []) => {}
                (method, _) => return errinput!("invalid cursor call {method}()"),
            }
        }
        if count {
            return Ok(Plan::Count { ns, pipeline });
        }
        if let Some(keys) = sort {
            pipeline.push(Stage::Sort(keys));
        }
        if let Some(n) = skip.filter(|n| *n > 0) {
            pipeline.push(Stage::Skip(n));
        }
        if let Some(n) = limit.filter(|n| *n > 0) {
            pipeline.push(Stage::Limit(n));
        }
        pipeline.extend(projection.map(Stage::Project));
        Ok(Plan::Aggregate { ns, pipeline })
    }

    fn namespace(&self, collection: &str) -> Result<Namespace> {
        if collection.is_empty() || collection.contains('$') || collection.contains('\0') {
            return errinput!("invalid collection name '{collection}'");
        }
        Ok(Namespace::new(self.database, collection))
    }
}

fn expect_document<'v>(what: &str, value: &'v Value) -> Result<&'v Document> {
    match value {
        Value::Document(doc) => Ok(doc),
        other => errinput!("the {what} must be an object, got {other}"),
    }
}

/// Write options such as { ordered: false } are accepted but have no effect.
fn ignore_options(method: &str, options: &[Value]) {
    if options.iter().any(|o| !matches!(o, Value::Document(d) if d.is_empty())) {
        warn!("Ignoring options passed to {method}()");
    }
}
