//! ModelHub CLI

use clap::Parser;

use modelhub::cli::{run, Cli, EXIT_FAILURE, EXIT_SUCCESS};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
