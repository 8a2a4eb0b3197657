//! Shell plumbing shared by script mode and the interactive prompt.

use crate::common::{Error, Result};
use crate::config::OutputFormat;
use crate::query::engine::{Engine, Session, StatementResult};
use crate::query::parser::is_incomplete;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline_derive::{Completer, Helper, Highlighter, Hinter};
use std::io::Write;

/// Executes the input one statement at a time, writing each result before
/// the next statement runs. Stops at the first error, after the results of
/// the statements before it have been written.
pub fn execute<'a, E: Engine<'a>>(
    session: &mut Session<'a, E>,
    input: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    for statement in session.parse(input)? {
        let result = session.execute_statement(statement)?;
        write_result(&result, format, out)?;
    }
    Ok(())
}

/// Runs script files in order. The first failing statement stops the run.
pub fn run_scripts<'a, E: Engine<'a>>(
    session: &mut Session<'a, E>,
    paths: &[String],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    for path in paths {
        let script = std::fs::read_to_string(path).map_err(|err| Error::IO(format!("{path}: {err}")))?;
        execute(session, &script, format, out)?;
    }
    Ok(())
}

pub fn write_result(result: &StatementResult, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Shell => writeln!(out, "{result}")?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(result)?)?,
    }
    Ok(())
}

/// Keeps reading lines while brackets or strings are left open, so a
/// pipeline can be typed across several lines.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct InputValidator;

impl InputValidator {
    fn check(input: &str) -> ValidationResult {
        if is_incomplete(input) {
            return ValidationResult::Incomplete;
        }
        ValidationResult::Valid(None)
    }
}

impl Validator for InputValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(Self::check(ctx.input()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::engine::Local;
    use crate::storage::Memory;

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_earlier_results_survive_an_error() -> Result<()> {
        let engine = Local::new(Memory::new());
        let mut session = engine.session("test")?;
        let mut out = Vec::new();
        let result = execute(
            &mut session,
            "db.a.insertOne({ _id: 1 }); db.a.find(); db.a.insertOne({ _id: 1 }); db.a.drop()",
            OutputFormat::Shell,
            &mut out,
        );
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
        assert_eq!(
            output(out),
            "{ acknowledged: true, insertedIds: { '0': 1 } }\n[\n  { _id: 1 }\n]\n"
        );
        // The statement after the failure never ran.
        assert_eq!(session.execute("show collections")?[0].to_string(), "a");
        Ok(())
    }

    #[test]
    fn test_json_lines() -> Result<()> {
        let engine = Local::new(Memory::new());
        let mut session = engine.session("test")?;
        let mut out = Vec::new();
        execute(
            &mut session,
            "use('ecommerce')\ndb.sales.insertOne({ _id: 1, price: 10, quantity: 5 })\n\
             db.sales.aggregate([{ $group: { _id: null, total: { $sum: { $multiply: ['$price', '$quantity'] } } } }])",
            OutputFormat::Json,
            &mut out,
        )?;
        assert_eq!(
            output(out).lines().collect::<Vec<_>>(),
            vec![
                r#"{"result":"use","database":"ecommerce"}"#,
                r#"{"result":"insert","ids":[1]}"#,
                r#"{"result":"documents","documents":[{"_id":null,"total":50}]}"#,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_run_scripts_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (first, second) = (dir.path().join("load.mongodb.js"), dir.path().join("query.mongodb.js"));
        std::fs::write(&first, "use('ecommerce');\ndb.sales.insertMany([{ _id: 1, category: 'Fruit' }, { _id: 2 }]);\n")?;
        std::fs::write(&second, "// count the fruit\ndb.sales.countDocuments({ category: 'Fruit' });\n")?;

        let engine = Local::new(Memory::new());
        let mut session = engine.session("test")?;
        let mut out = Vec::new();
        let paths = [first, second].map(|p| p.to_string_lossy().into_owned());
        run_scripts(&mut session, &paths, OutputFormat::Shell, &mut out)?;
        assert_eq!(
            output(out),
            "switched to db ecommerce\n{ acknowledged: true, insertedIds: { '0': 1, '1': 2 } }\n1\n"
        );

        let missing = [dir.path().join("missing.js").to_string_lossy().into_owned()];
        assert!(matches!(
            run_scripts(&mut session, &missing, OutputFormat::Shell, &mut Vec::new()),
            Err(Error::IO(_))
        ));
        Ok(())
    }

    #[test]
    fn test_input_validator() {
        assert!(matches!(InputValidator::check("db.sales.aggregate(["), ValidationResult::Incomplete));
        assert!(matches!(InputValidator::check("db.sales.find({ item: 'Ap"), ValidationResult::Incomplete));
        assert!(matches!(InputValidator::check("db.sales.find({})"), ValidationResult::Valid(None)));
        // Unbalanced closers are left for the parser to report.
        assert!(matches!(InputValidator::check("db.sales.find())"), ValidationResult::Valid(None)));
    }
}
