use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use patricia_dict::command::{self, Session};
use patricia_dict::Config;

#[derive(Parser)]
#[command(name = "patricia-dict", about = "PATRICIA trie dictionary", version)]
struct Cli {
    /// Read commands from this file instead of stdin
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Keep words as typed instead of lowercasing them
    #[arg(long)]
    no_fold_case: bool,

    /// Initial capacity hint (number of entries)
    #[arg(long, default_value_t = Config::default().initial_capacity)]
    capacity: usize,

    /// Log to stderr (honours RUST_LOG, defaults to debug)
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_tracing(cli: &Cli) {
    // Logs stay off unless asked for: stdout carries the protocol responses.
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "patricia_dict=debug".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> io::Result<()> {
    let mut session = Session::with_config(Config {
        initial_capacity: cli.capacity,
        fold_case: !cli.no_fold_case,
    })
    .map_err(io::Error::other)?;
    let stdout = io::stdout().lock();

    match cli.input {
        Some(path) => {
            let file = File::open(&path)?;
            command::run(&mut session, BufReader::new(file), stdout)
        }
        None => command::run(&mut session, io::stdin().lock(), stdout),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
