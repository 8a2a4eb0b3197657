use crate::common::Result;
use crate::errinput;
use crate::query::engine::{Catalog, Transaction};
use crate::query::execution::{aggregate, source, transform};
use crate::query::planner::{Plan, Stage};
use crate::storage::Status;
use crate::types::{Documents, Value};
use itertools::Itertools as _;
use log::info;

/// Executes a plan.
///
/// Takes both a catalog and transaction as parameters, even though a
/// transaction implements the Catalog trait, to separate collection
/// management from document access.
pub fn execute_plan(plan: Plan, catalog: &impl Catalog, txn: &impl Transaction) -> Result<ExecutionResult> {
    Ok(match plan {
        Plan::Use { database } => {
            info!("Switched to database {database}");
            ExecutionResult::Use { database }
        }

        Plan::ListCollections { database } => ExecutionResult::Collections {
            names: catalog.list_collections(&database)?,
        },

        Plan::Stats { database } => ExecutionResult::Stats(catalog.status(&database)?),

        Plan::Insert { ns, documents } => ExecutionResult::Insert {
            ids: txn.insert(&ns, documents)?,
        },

        // Collect the matching _ids before deleting anything, so the scan
        // doesn't observe its own deletes.
        Plan::Delete { ns, filter, one } => {
            let matches = transform::filter(source::scan(txn, &ns)?, filter);
            let matches = if one { transform::limit(matches, 1) } else { matches };
            let ids: Vec<Value> = matches
                .map_ok(|doc| doc.id().cloned().unwrap_or(Value::Null))
                .try_collect()?;
            ExecutionResult::Delete {
                count: txn.delete(&ns, &ids)?,
            }
        }

        Plan::Create { ns } => {
            if !catalog.create_collection(&ns)? {
                return errinput!("collection {ns} already exists");
            }
            ExecutionResult::Create { collection: ns.collection }
        }

        Plan::Drop { ns } => ExecutionResult::Drop {
            existed: catalog.drop_collection(&ns)?,
            collection: ns.collection,
        },

        Plan::Aggregate { ns, pipeline } => ExecutionResult::Documents {
            documents: execute_pipeline(source::scan(txn, &ns)?, pipeline)?,
        },

        Plan::Count { ns, pipeline } => {
            let mut count = 0;
            for result in execute_pipeline(source::scan(txn, &ns)?, pipeline)? {
                result?;
                count += 1;
            }
            ExecutionResult::Count { count }
        }
    })
}

/// Runs documents through the pipeline stages in order.
///
/// Streaming stages wrap the iterator lazily. $group, $sort and $count have
/// to see all of their input, so they drain the upstream stages when the
/// pipeline is built.
pub fn execute_pipeline(source: Documents, pipeline: Vec<Stage>) -> Result<Documents> {
    pipeline.into_iter().try_fold(source, |documents, stage| {
        Ok(match stage {
            Stage::Match(filter) => transform::filter(documents, filter),
            Stage::Project(projection) => transform::project(documents, projection),
            Stage::AddFields(fields) => transform::add_fields(documents, fields),
            Stage::Unset(paths) => transform::unset(documents, paths),
            Stage::Group { id, aggregates } => aggregate::group(documents, id, aggregates)?,
            Stage::Sort(order) => transform::order(documents, order)?,
            Stage::Limit(limit) => transform::limit(documents, limit),
            Stage::Skip(skip) => transform::skip(documents, skip),
            Stage::Count(field) => transform::count(documents, field)?,
        })
    })
}

/// A plan execution result.
pub enum ExecutionResult {
    Use { database: String },
    Collections { names: Vec<String> },
    Stats(Status),
    Insert { ids: Vec<Value> },
    Delete { count: u64 },
    Create { collection: String },
    Drop { collection: String, existed: bool },
    Documents { documents: Documents },
    Count { count: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::utility::sales;
    use crate::doc;
    use crate::query::engine::{Engine as _, Local};
    use crate::query::parser::Parser;
    use crate::storage::{Memory, Namespace};
    use crate::types::Document;

    fn run(txn: &(impl Transaction + Catalog), input: &str) -> Result<ExecutionResult> {
        let statement = Parser::new(input).parse()?.remove(0);
        Plan::build(statement, "ecommerce")?.execute(txn)
    }

    fn documents(result: ExecutionResult) -> Result<Vec<Document>> {
        match result {
            ExecutionResult::Documents { documents } => documents.collect(),
            _ => panic!("expected documents"),
        }
    }

    #[test]
    fn test_total_fruit_sales() -> Result<()> {
        let engine = Local::new(Memory::new());
        let txn = engine.begin()?;
        txn.insert(&Namespace::new("ecommerce", "sales"), sales())?;

        let result = run(
            &txn,
            r#"db.sales.aggregate([
                { $match: { category: "Fruit" } },
                { $group: { _id: null, totalFruitSales: { $sum: { $multiply: ["$price", "$quantity"] } } } },
            ]);"#,
        )?;
        assert_eq!(
            documents(result)?,
            vec![doc! { "_id" => Value::Null, "totalFruitSales" => 145 }]
        );
        Ok(())
    }

    #[test]
    fn test_delete_one_and_count() -> Result<()> {
        let engine = Local::new(Memory::new());
        let txn = engine.begin()?;
        txn.insert(&Namespace::new("ecommerce", "sales"), sales())?;

        let ExecutionResult::Delete { count } = run(&txn, "db.sales.deleteOne({ category: 'Fruit' })")? else {
            panic!("expected delete result");
        };
        assert_eq!(count, 1);
        let ExecutionResult::Count { count } = run(&txn, "db.sales.countDocuments({ category: 'Fruit' })")? else {
            panic!("expected count result");
        };
        assert_eq!(count, 2);
        let remaining = documents(run(&txn, "db.sales.find({}, { item: 1, _id: 0 })")?)?;
        assert_eq!(remaining[0], doc! { "item" => "Banana" });
        Ok(())
    }

    #[test]
    fn test_delete_one_uses_insertion_order() -> Result<()> {
        let engine = Local::new(Memory::new());
        let txn = engine.begin()?;
        txn.insert(
            &Namespace::new("ecommerce", "sales"),
            vec![doc! { "_id" => 5, "c" => "F" }, doc! { "_id" => 1, "c" => "F" }],
        )?;
        run(&txn, "db.sales.deleteOne({ c: 'F' })")?;
        assert_eq!(documents(run(&txn, "db.sales.find()")?)?, vec![doc! { "_id" => 1, "c" => "F" }]);
        Ok(())
    }

    #[test]
    fn test_create_and_drop() -> Result<()> {
        let engine = Local::new(Memory::new());
        let txn = engine.begin()?;
        assert!(matches!(run(&txn, "db.createCollection('sales')")?, ExecutionResult::Create { .. }));
        assert!(run(&txn, "db.createCollection('sales')").is_err());
        assert!(matches!(
            run(&txn, "db.sales.drop()")?,
            ExecutionResult::Drop { existed: true, .. }
        ));
        assert!(matches!(
            run(&txn, "db.sales.drop()")?,
            ExecutionResult::Drop { existed: false, .. }
        ));
        Ok(())
    }

    #[test]
    fn test_missing_collection_is_empty() -> Result<()> {
        let engine = Local::new(Memory::new());
        let txn = engine.begin()?;
        assert!(documents(run(&txn, "db.nothing.aggregate([{ $count: 'n' }])")?)?.is_empty());
        Ok(())
    }
}
