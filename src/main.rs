use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use findscu::worker::TaskEvent;

#[derive(Parser, Debug)]
#[command(
    name = "findscu",
    about = "Run a DICOM C-FIND query or C-ECHO verification described by a JSON document"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a Study Root C-FIND query
    Find {
        /// Path to the JSON query description (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run a C-ECHO verification
    Echo {
        /// Path to the JSON description (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn read_input(input: Option<PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut handle = match cli.command {
        Command::Find { input } => findscu::find_scu(read_input(input)?),
        Command::Echo { input } => findscu::echo_scu(read_input(input)?),
    };

    let mut failed = false;
    while let Some(event) = handle.recv().await {
        match event {
            TaskEvent::Progress(chunk) => eprintln!("{}", chunk),
            TaskEvent::Completed(payload) => println!("{}", payload),
            TaskEvent::Failed(document) => {
                println!("{}", document);
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
