mod cmd;

use clap::{Parser, Subcommand};
use std::process;
use tokserve::envconfig::EnvConfig;

#[derive(Parser)]
#[command(name = "tokserve")]
#[command(version)]
#[command(about = "Tokenize text with cached Hugging Face tokenizers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve,
    Tokenize {
        model: String,
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    Health,
    Cache,
    #[command(alias = "clear")]
    ClearCache,
    Version,
}

fn main() {
    let cli = Cli::parse();
    let config = EnvConfig::from_env();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.max_blocking_threads)
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Serve => cmd::serve(config).await,
            Commands::Tokenize { model, text, json } => cmd::tokenize(&model, &text.join(" "), json).await,
            Commands::Health => cmd::health().await,
            Commands::Cache => cmd::cache().await,
            Commands::ClearCache => cmd::clear_cache().await,
            Commands::Version => cmd::version(),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
