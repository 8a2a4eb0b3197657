use crate::common::constants::ID_FIELD;
use crate::common::Result;
use crate::doc;
use crate::query::planner::{Direction, Expression, Filter, Projection, ProjectionMode};
use crate::types::{Document, Documents, Value};
use itertools::{izip, Itertools as _};

/// Keeps the documents matching the filter ($match).
pub fn filter(source: Documents, filter: Filter) -> Documents {
    Box::new(source.filter_ok(move |doc| filter.matches(doc)))
}

/// Emits at most the given number of documents ($limit).
pub fn limit(source: Documents, limit: usize) -> Documents {
    Box::new(source.take(limit))
}

/// Skips the given number of documents ($skip).
pub fn skip(source: Documents, skip: usize) -> Documents {
    Box::new(source.skip(skip))
}

/// Sorts the documents by the given field paths ($sort). Missing fields sort
/// as null, and documents with equal keys keep their input order.
pub fn order(source: Documents, order: Vec<(String, Direction)>) -> Result<Documents> {
    // Precompute the sort values rather than resolving paths for every
    // comparison, and map them based on the document index.
    let mut idocs: Vec<_> = source.enumerate().map(|(i, r)| r.map(|doc| (i, doc))).try_collect()?;
    let sort_values: Vec<Vec<Value>> = idocs
        .iter()
        .map(|(_, doc)| {
            order
                .iter()
                .map(|(path, _)| doc.get_path(path).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    idocs.sort_by(|&(a, _), &(b, _)| {
        let dirs = order.iter().map(|(_, dir)| dir);
        for (a, b, dir) in izip!(&sort_values[a], &sort_values[b], dirs) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => {}
                order if *dir == Direction::Descending => return order.reverse(),
                order => return order,
            }
        }
        std::cmp::Ordering::Equal
    });

    Ok(Box::new(idocs.into_iter().map(|(_, doc)| Ok(doc))))
}

/// Reshapes the documents ($project).
pub fn project(source: Documents, projection: Projection) -> Documents {
    Box::new(source.map(move |result| result.and_then(|doc| reshape(doc, &projection))))
}

fn reshape(mut doc: Document, projection: &Projection) -> Result<Document> {
    match &projection.mode {
        ProjectionMode::Exclude(paths) => {
            for path in paths {
                doc.remove_path(path);
            }
            if !projection.id {
                doc.remove(ID_FIELD);
            }
            Ok(doc)
        }
        ProjectionMode::Include(fields) => {
            let mut output = Document::new();
            if let Some(id) = doc.id().filter(|_| projection.id) {
                output.insert(ID_FIELD, id.clone());
            }
            for (path, expr) in fields {
                let value = match expr {
                    None => doc.get_path(path).cloned(),
                    Some(expr) => expr.compute(&doc)?,
                };
                if let Some(value) = value {
                    output.insert_path(path, value);
                }
            }
            Ok(output)
        }
    }
}

/// Sets computed fields ($addFields, $set). All expressions see the input
/// document, not each other's results.
pub fn add_fields(source: Documents, fields: Vec<(String, Expression)>) -> Documents {
    Box::new(source.map(move |result| -> Result<Document> {
        let mut doc = result?;
        let values: Vec<_> = fields.iter().map(|(_, expr)| expr.compute(&doc)).try_collect()?;
        for ((path, _), value) in fields.iter().zip(values) {
            if let Some(value) = value {
                doc.insert_path(path, value);
            }
        }
        Ok(doc)
    }))
}

/// Removes fields ($unset).
pub fn unset(source: Documents, paths: Vec<String>) -> Documents {
    Box::new(source.map_ok(move |mut doc| {
        for path in &paths {
            doc.remove_path(path);
        }
        doc
    }))
}

/// Counts the documents into a single { field: n } document ($count).
/// Emits nothing for empty input.
pub fn count(source: Documents, field: String) -> Result<Documents> {
    let mut n: i64 = 0;
    for result in source {
        result?;
        n += 1;
    }
    if n == 0 {
        return Ok(Box::new(std::iter::empty()));
    }
    Ok(Box::new(std::iter::once(Ok(doc! { field => n }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::utility::sales;

    fn source(documents: Vec<Document>) -> Documents {
        Box::new(documents.into_iter().map(Ok))
    }

    fn collect(documents: Documents) -> Result<Vec<Document>> {
        documents.collect()
    }

    fn items(documents: &[Document]) -> Vec<String> {
        documents
            .iter()
            .map(|doc| doc.get("item").map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_order_is_stable() -> Result<()> {
        let sorted = collect(order(
            source(sales()),
            vec![("category".into(), Direction::Descending), ("price".into(), Direction::Ascending)],
        )?)?;
        assert_eq!(
            items(&sorted),
            vec!["'Tomato'", "'Carrot'", "'Banana'", "'Apple'", "'Mango'"]
        );

        // Equal keys keep their input order.
        let sorted = collect(order(source(sales()), vec![("category".into(), Direction::Ascending)])?)?;
        assert_eq!(
            items(&sorted),
            vec!["'Apple'", "'Banana'", "'Mango'", "'Carrot'", "'Tomato'"]
        );
        Ok(())
    }

    #[test]
    fn test_missing_fields_sort_first() -> Result<()> {
        let docs = vec![doc! { "_id" => 1, "rank" => 2 }, doc! { "_id" => 2 }];
        let sorted = collect(order(source(docs), vec![("rank".into(), Direction::Ascending)])?)?;
        assert_eq!(sorted[0].id(), Some(&Value::from(2)));
        Ok(())
    }

    #[test]
    fn test_project() -> Result<()> {
        let spec = doc! {
            "_id" => 0,
            "item" => 1,
            "total" => doc! { "$multiply" => vec![Value::from("$price"), Value::from("$quantity")] },
            "discount" => "$discount",
        };
        let projected = collect(project(source(sales()), Projection::build(&spec)?))?;
        assert_eq!(projected[0], doc! { "item" => "Apple", "total" => 50 });

        let excluded = collect(project(
            source(sales()),
            Projection::build(&doc! { "price" => 0, "quantity" => 0 })?,
        ))?;
        assert_eq!(excluded[1], doc! { "_id" => 2, "item" => "Banana", "category" => "Fruit" });
        Ok(())
    }

    #[test]
    fn test_add_fields_and_unset() -> Result<()> {
        let fields = vec![
            ("price".to_string(), Expression::build(&Value::from(doc! { "$add" => vec![Value::from("$price"), Value::from(1)] }))?),
            ("old".to_string(), Expression::Field("price".into())),
        ];
        let updated = collect(unset(
            add_fields(source(sales()), fields),
            vec!["item".into(), "category".into()],
        ))?;
        assert_eq!(updated[0], doc! { "_id" => 1, "price" => 11, "quantity" => 5, "old" => 10 });
        Ok(())
    }

    #[test]
    fn test_limit_skip_count() -> Result<()> {
        let page = collect(limit(skip(source(sales()), 1), 2))?;
        assert_eq!(items(&page), vec!["'Banana'", "'Carrot'"]);

        let counted = collect(count(filter(source(sales()), Filter::build(&doc! { "category" => "Fruit" })?), "fruits".into())?)?;
        assert_eq!(counted, vec![doc! { "fruits" => 3 }]);

        let none = collect(count(filter(source(sales()), Filter::build(&doc! { "category" => "Meat" })?), "n".into())?)?;
        assert!(none.is_empty());
        Ok(())
    }
}
