use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::{Builder, Env};
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use mad_interpreter as mad;

use mad::ast_printer::Ast;
use mad::scanner::Scanner;
use mad::session::{is_incomplete, Mode, Session, Status};

/// Source files must carry this extension.
const EXTENSION: &str = "mad";

#[derive(ClapParser, Debug)]
#[command(version, about = "mad language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log (filter with RUST_LOG)
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a .mad file; the first error stops the program with status 1
    Run { filename: PathBuf },

    /// Starts the interactive prompt (the default without a subcommand)
    Repl,

    /// Tokenizes a .mad file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a .mad file and prints its syntax tree
    Parse {
        filename: PathBuf,

        /// Print the tree as JSON instead of S-expressions
        #[arg(long)]
        json: bool,
    },
}

/// Checks the extension and reads the whole file.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    if filename.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
        bail!("Wrong file extension. Expected '.{}'", EXTENSION);
    }

    let source = std::fs::read_to_string(filename)
        .with_context(|| format!("Failed to read file {}", filename.display()))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::from_env(Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("mad_interpreter::").unwrap_or(module);

            writeln!(
                buf,
                "{} [{}:{}] - {}",
                Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

fn run_file(filename: &Path) -> Result<()> {
    let source = read_source(filename)?;
    let mut session = Session::new(Mode::Batch, io::stdout().lock(), io::stderr());

    if let Status::Halt(code) = session.run(&source) {
        debug!("Run halted with status {}", code);
        std::process::exit(code);
    }

    info!("Program executed successfully");

    Ok(())
}

fn repl() -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to start the prompt")?;
    let mut session = Session::new(Mode::Interactive, io::stdout(), io::stderr());
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "... " };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => bail!("Failed to read input: {}", e),
        };

        if buffer.is_empty() && line.trim() == "exit" {
            break;
        }

        if buffer.is_empty() && line.trim().is_empty() {
            continue;
        }

        if let Err(e) = editor.add_history_entry(line.as_str()) {
            debug!("Could not record history entry: {}", e);
        }

        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&line);

        if is_incomplete(&buffer) {
            continue;
        }

        session.run(&buffer);
        buffer.clear();
    }

    info!("Leaving interactive prompt");

    Ok(())
}

fn tokenize(filename: &Path) -> Result<()> {
    let source = read_source(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    Ok(())
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;

    let statements = match mad::scan(&source).and_then(|tokens| mad::parse(&tokens)) {
        Ok(statements) => statements,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(65);
        }
    };

    if json {
        let rendered =
            serde_json::to_string_pretty(&statements).context("Failed to serialize the AST")?;
        println!("{}", rendered);
    } else {
        println!("{}", Ast.print_program(&statements));
    }

    Ok(())
}

fn main() {
    let args: Cli = Cli::parse();

    if args.log {
        if let Err(e) = init_logger() {
            eprintln!("{:#}", e);
        }
    }

    info!("CLI arguments: {:?}", args);

    let result = match &args.commands {
        Some(Commands::Run { filename }) => run_file(filename),
        Some(Commands::Repl) | None => repl(),
        Some(Commands::Tokenize { filename }) => tokenize(filename),
        Some(Commands::Parse { filename, json }) => parse(filename, *json),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
