use rustydoc::common::constants::PROMPT;
use rustydoc::common::{Error, Result};
use rustydoc::config::Settings;
use rustydoc::query::engine::{Local, Session};
use rustydoc::shell::{self, InputValidator};
use rustydoc::storage::Memory;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::EnvFilter;

type ShellSession<'a> = Session<'a, Local<Memory>>;

/// Runs the given script files in order, or an interactive shell if none
/// are given.
fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings)?;

    let engine = Local::new(Memory::new());
    let mut session = engine.session(&settings.database)?;

    let scripts: Vec<String> = std::env::args().skip(1).collect();
    if scripts.is_empty() {
        return repl(&mut session, &settings);
    }
    shell::run_scripts(&mut session, &scripts, settings.output, &mut std::io::stdout().lock())
}

/// Logs to stderr. RUST_LOG takes precedence over the configured level.
fn init_logging(settings: &Settings) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level).map_err(|err| Error::Config(err.to_string()))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

fn repl(session: &mut ShellSession<'_>, settings: &Settings) -> Result<()> {
    let config = rustyline::Config::builder()
        .max_history_size(settings.history_size)?
        .auto_add_history(true)
        .build();
    let mut editor = Editor::<InputValidator, DefaultHistory>::with_config(config)?;
    editor.set_helper(Some(InputValidator));

    loop {
        let prompt = format!("{}{PROMPT}", session.database());
        let input = match editor.readline(&prompt) {
            Ok(input) => input,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        match input.trim() {
            "" => continue,
            "exit" | "quit" | "exit()" | "quit()" => break,
            _ => {}
        }
        if let Err(err) = shell::execute(session, &input, settings.output, &mut std::io::stdout().lock()) {
            println!("error: {err}");
        }
    }
    Ok(())
}
