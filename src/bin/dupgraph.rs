// src/bin/dupgraph.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dupgraph_core::config::Config;
use dupgraph_core::server;
use dupgraph_core::tools::StructureTools;
use dupgraph_core::watch;
use std::path::PathBuf;
use std::process;

const STATE_DIR: &str = ".dupgraph";

#[derive(Parser)]
#[command(name = "dupgraph", version, about = "Structural duplicate detection for Python")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a codebase and persist the result
    Index {
        /// Root directory to index
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Report duplicate groups and recommendations
    Analyze {
        /// Only show significant duplicates instead of every small one
        #[arg(long)]
        significant: bool,
    },
    /// Check a file's code against the index before writing it
    Check {
        /// File the code is destined for
        file: PathBuf,
    },
    /// Suppress a duplicate group by its WL hash
    Suppress { wl_hash: String },
    /// Remove a suppression
    Unsuppress { wl_hash: String },
    /// List suppressed hashes
    Suppressions,
    /// Serve the tool API over stdin/stdout (framing auto-detected)
    Serve,
    /// Re-index files as they change (blocks until interrupted)
    Watch {
        /// Root directory to watch
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::new();
    config.load_local_config(std::path::Path::new("."));
    config.verbose = cli.verbose;
    config.validate()?;

    let state_dir = PathBuf::from(STATE_DIR);
    let mut tools = StructureTools::new(config);
    tools.load_state(&state_dir)?;

    match cli.command {
        Commands::Index { path } => {
            let stats = tools.index_codebase(&path)?;
            tools.save_state(&state_dir)?;
            println!(
                "Indexed {} file(s) ({} unit(s)), skipped {}.",
                stats.files_indexed.to_string().cyan(),
                stats.units_added,
                stats.files_skipped
            );
        }
        Commands::Analyze { significant } => {
            let result = tools.analyze(!significant);
            println!("{}", result.text);
        }
        Commands::Check { file } => {
            let content = std::fs::read_to_string(&file)?;
            let result = tools.check_code(&file.display().to_string(), &content);
            println!("{}", result.text);
            if result.is_error {
                process::exit(2);
            }
        }
        Commands::Suppress { wl_hash } => {
            let result = tools.suppress(&wl_hash);
            tools.save_state(&state_dir)?;
            println!("{}", result.text);
        }
        Commands::Unsuppress { wl_hash } => {
            let result = tools.unsuppress(&wl_hash);
            tools.save_state(&state_dir)?;
            println!("{}", result.text);
        }
        Commands::Suppressions => {
            println!("{}", tools.list_suppressions().text);
        }
        Commands::Serve => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            server::serve(&mut tools, stdin.lock(), stdout.lock())?;
            tools.save_state(&state_dir)?;
        }
        Commands::Watch { path } => {
            tools.index_codebase(&path)?;
            tools.save_state(&state_dir)?;
            watch::watch(&mut tools, &path)?;
        }
    }
    Ok(())
}
