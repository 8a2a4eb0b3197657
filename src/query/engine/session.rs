use super::Engine;
use crate::common::{Error, Result};
use crate::doc;
use crate::query::execution::ExecutionResult;
use crate::query::parser::ast::Statement;
use crate::query::parser::Parser;
use crate::query::planner::Plan;
use crate::types::{Document, Value};
use log::debug;
use serde::Serialize;

/// A shell session, which executes raw statements against a query engine and
/// tracks the current database.
pub struct Session<'a, E: Engine<'a>> {
    txn: E::Transaction,
    database: String,
}

impl<'a, E: Engine<'a>> Session<'a, E> {
    /// Creates a new session with the given query engine, starting in the
    /// given database.
    pub fn new(engine: &'a E, database: &str) -> Result<Self> {
        Ok(Self {
            txn: engine.begin()?,
            database: database.to_string(),
        })
    }

    /// The current database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Parses raw input into statements.
    pub fn parse(&self, input: &str) -> Result<Vec<Statement>> {
        Parser::new(input).parse()
    }

    /// Executes a single parsed statement.
    pub fn execute_statement(&mut self, statement: Statement) -> Result<StatementResult> {
        debug!("Executing {statement:?} in {}", self.database);
        let result: StatementResult = Plan::build(statement, &self.database)?.execute(&self.txn)?.try_into()?;
        if let StatementResult::Use { database } = &result {
            self.database = database.clone();
        }
        Ok(result)
    }

    /// Executes raw input, returning one result per statement. Stops at the
    /// first failing statement: the effects of earlier ones remain, but their
    /// results are discarded. Use execute_statement to see each result as it
    /// happens.
    pub fn execute(&mut self, input: &str) -> Result<Vec<StatementResult>> {
        self.parse(input)?
            .into_iter()
            .map(|statement| self.execute_statement(statement))
            .collect()
    }
}

/// A session statement result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum StatementResult {
    Use { database: String },
    Collections { names: Vec<String> },
    Stats { stats: Document },
    Insert { ids: Vec<Value> },
    Delete { count: u64 },
    Create { collection: String },
    Drop { collection: String, existed: bool },
    Documents { documents: Vec<Document> },
    Count { count: u64 },
}

/// Converts an execution result into a statement result.
impl TryFrom<ExecutionResult> for StatementResult {
    type Error = Error;

    fn try_from(result: ExecutionResult) -> Result<Self> {
        Ok(match result {
            ExecutionResult::Use { database } => Self::Use { database },
            ExecutionResult::Collections { names } => Self::Collections { names },
            ExecutionResult::Stats(status) => Self::Stats { stats: status.into() },
            ExecutionResult::Insert { ids } => Self::Insert { ids },
            ExecutionResult::Delete { count } => Self::Delete { count },
            ExecutionResult::Create { collection } => Self::Create { collection },
            ExecutionResult::Drop { collection, existed } => Self::Drop { collection, existed },
            ExecutionResult::Documents { documents } => Self::Documents {
                documents: documents.collect::<Result<_>>()?,
            },
            ExecutionResult::Count { count } => Self::Count { count },
        })
    }
}

/// Formats results the way the mongo shell prints them.
impl std::fmt::Display for StatementResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Use { database } => write!(f, "switched to db {database}"),
            Self::Collections { names } => f.write_str(&names.join("\n")),
            Self::Stats { stats } => write!(f, "{stats}"),
            Self::Insert { ids } => {
                let ids: Document = ids.iter().enumerate().map(|(i, id)| (i.to_string(), id.clone())).collect();
                write!(f, "{}", doc! { "acknowledged" => true, "insertedIds" => ids })
            }
            Self::Delete { count } => {
                write!(f, "{}", doc! { "acknowledged" => true, "deletedCount" => *count as i64 })
            }
            Self::Create { .. } => write!(f, "{}", doc! { "ok" => 1 }),
            Self::Drop { existed, .. } => write!(f, "{existed}"),
            Self::Documents { documents } if documents.is_empty() => f.write_str("[]"),
            Self::Documents { documents } => {
                f.write_str("[\n")?;
                for (i, doc) in documents.iter().enumerate() {
                    let sep = if i + 1 < documents.len() { "," } else { "" };
                    writeln!(f, "  {doc}{sep}")?;
                }
                f.write_str("]")
            }
            Self::Count { count } => write!(f, "{count}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::engine::Local;
    use crate::storage::Memory;

    #[test]
    fn test_use_switches_database() -> Result<()> {
        let engine = Local::new(Memory::new());
        let mut session = engine.session("test")?;
        session.execute("use('ecommerce'); db.sales.insertOne({ _id: 1 })")?;
        assert_eq!(session.database(), "ecommerce");
        assert_eq!(
            session.execute("use test; db.getCollectionNames(); use ecommerce; show collections")?,
            vec![
                StatementResult::Use { database: "test".into() },
                StatementResult::Collections { names: vec![] },
                StatementResult::Use { database: "ecommerce".into() },
                StatementResult::Collections { names: vec!["sales".into()] },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_stops_at_first_error() -> Result<()> {
        let engine = Local::new(Memory::new());
        let mut session = engine.session("test")?;
        assert!(session
            .execute("db.a.insertOne({ _id: 1 }); db.a.insertOne({ _id: 1 }); db.b.insertOne({})")
            .is_err());
        assert_eq!(
            session.execute("db.getCollectionNames()")?,
            vec![StatementResult::Collections { names: vec!["a".into()] }]
        );
        Ok(())
    }

    #[test]
    fn test_display() {
        let insert = StatementResult::Insert { ids: vec![Value::from(1), Value::from(2)] };
        assert_eq!(insert.to_string(), "{ acknowledged: true, insertedIds: { '0': 1, '1': 2 } }");

        let documents = StatementResult::Documents {
            documents: vec![doc! { "_id" => "Fruit", "totalSales" => 145 }, doc! { "_id" => "Vegetable", "totalSales" => 96 }],
        };
        assert_eq!(
            documents.to_string(),
            "[\n  { _id: 'Fruit', totalSales: 145 },\n  { _id: 'Vegetable', totalSales: 96 }\n]"
        );
        assert_eq!(StatementResult::Documents { documents: vec![] }.to_string(), "[]");
        assert_eq!(StatementResult::Delete { count: 2 }.to_string(), "{ acknowledged: true, deletedCount: 2 }");
    }

    #[test]
    fn test_json() -> Result<()> {
        let result = StatementResult::Documents {
            documents: vec![doc! { "_id" => Value::Null, "totalFruitSales" => 145 }],
        };
        assert_eq!(
            serde_json::to_string(&result)?,
            r#"{"result":"documents","documents":[{"_id":null,"totalFruitSales":145}]}"#
        );
        Ok(())
    }
}
