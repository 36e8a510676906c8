use clap::Parser;
use tracing::error;

use vaultsmith::cli::{self, output, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode(args) => cli::encode::execute(&args).map(|()| true),
        Commands::Check(CheckCommand::Config(args)) => {
            cli::check::execute_config(&args.config).map(|()| true)
        }
        #[cfg(feature = "rpc")]
        Commands::Feeds(args) => cli::feeds::execute(&args).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!(error = %e, "Fatal error");
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}
