use clap::Parser;
use std::error::Error;
use topic_embeddings::cli::{self, Cli};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);
    cli::run(cli)
}
