use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use todostore::{Action, App, Config, ItemManager, Observer, StdoutSink, TextSink, render};
use tracing::Level;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - To-do items in an embedded store, with live updates")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store directory (default: the user's local data dir)
    #[arg(short, long, env = "TODOSTORE_PATH")]
    store_path: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run the change observer: re-render the item list after every change
    #[arg(long, global = true)]
    live: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item (a stock summary unless one is given)
    Create {
        #[arg(short, long)]
        summary: Option<String>,
    },

    /// Show every item
    Read,

    /// Mark the first incomplete item as complete
    Update,

    /// Delete the first item
    DeleteFirst,

    /// Delete every item
    DeleteAll,

    /// Show items whose field starts with a prefix (case-sensitive)
    Query {
        #[arg(short, long, default_value = "summary")]
        field: String,

        #[arg(short, long)]
        prefix: String,
    },

    /// Interactive shell driving the five actions (observer on by default)
    Shell {
        /// Render only on `read`, without the change observer
        #[arg(long)]
        no_live: bool,
    },
}

impl Cli {
    /// Whether the change observer runs for this invocation
    fn live(&self) -> bool {
        match self.command {
            Commands::Shell { no_live } => !no_live,
            _ => self.live,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries rendered items only
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let live = cli.live();
    let config = Config::new(cli.store_path, live);
    let mut sink = StdoutSink;

    match cli.command {
        Commands::Shell { .. } => run_shell(&config),
        Commands::Create { summary } => with_items(&config, &mut sink, |items| {
            let item = match summary {
                Some(summary) => items.create(&summary)?,
                None => items.create_random()?,
            };
            println!("{} {}", "Created".green(), item.id);
            Ok(())
        }),
        Commands::Read => with_items(&config, &mut sink, |items| {
            print!("{}", render(&items.read_all()?));
            Ok(())
        }),
        Commands::Update => with_items(&config, &mut sink, |items| {
            match items.complete_first_incomplete()? {
                Some(item) => println!("{} {}", "Completed".green(), item.id),
                None => println!("{}", "No incomplete items".yellow()),
            }
            Ok(())
        }),
        Commands::DeleteFirst => with_items(&config, &mut sink, |items| {
            match items.delete_first()? {
                Some(item) => println!("{} {}", "Deleted".green(), item.id),
                None => println!("{}", "No items to delete".yellow()),
            }
            Ok(())
        }),
        Commands::DeleteAll => with_items(&config, &mut sink, |items| {
            let count = items.delete_all()?;
            println!("{} {} item(s)", "Deleted".green(), count);
            Ok(())
        }),
        Commands::Query { field, prefix } => with_items(&config, &mut sink, |items| {
            print!("{}", render(&items.query_by_prefix(&field, &prefix)?));
            Ok(())
        }),
    }
}

/// Open the store, run one command against it, close it
///
/// With `config.live`, the change observer watches the command and renders
/// the item list into `sink` once per committed change.
fn with_items<S, F>(config: &Config, sink: &mut S, f: F) -> Result<()>
where
    S: TextSink,
    F: FnOnce(&mut ItemManager) -> Result<()>,
{
    let mut items = ItemManager::open(&config.store_path)
        .wrap_err_with(|| format!("Failed to open store at {}", config.store_path.display()))?;

    let mut observer = Observer::new();
    if config.live {
        observer.start(&mut items).context("Failed to start change observer")?;
    }

    f(&mut items)?;

    observer.pump(|| {
        sink.set_text(&render(&items.read_all()?));
        Ok(())
    })?;
    observer.cancel();

    items.close().context("Failed to close store")?;
    Ok(())
}

fn run_shell(config: &Config) -> Result<()> {
    let mut app = App::open(config, StdoutSink)
        .wrap_err_with(|| format!("Failed to open store at {}", config.store_path.display()))?;

    eprintln!(
        "{} actions: {} (quit to exit)",
        "todostore".bold(),
        Action::ALL.map(|a| a.name()).join(", ")
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit" | "q") {
            break;
        }

        match input.parse::<Action>() {
            Ok(action) => {
                if let Err(e) = app.dispatch(action) {
                    eprintln!("{} {}", "Error:".red(), e);
                }
            }
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    }

    app.close().context("Failed to close store")?;
    Ok(())
}
