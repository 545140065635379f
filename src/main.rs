use clap::{Parser, Subcommand};
use urlqa::Result;
use urlqa::commands::{ask, init_config, show_config};

#[derive(Parser)]
#[command(name = "urlqa")]
#[command(about = "Answer natural-language questions about the contents of a web page")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and answer a question about its contents
    Ask {
        /// URL of the page to read
        url: String,
        /// The question to answer
        question: String,
        /// Number of queue workers to run
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
    /// Manage the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            url,
            question,
            workers,
        } => {
            let answer = ask(&url, &question, workers).await?;
            println!("{answer}");
        }
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
    }

    Ok(())
}
