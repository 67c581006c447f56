//! LazyTeams CLI binary entry point.

use clap::Parser;
use lazyteams::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Err(err) = cli::run(args).await {
        cli::report(&err);
        std::process::exit(cli::exit_code(&err));
    }
}
