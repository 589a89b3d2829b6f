use std::env;

use tracing_subscriber::EnvFilter;

use seedbank::cli;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    std::process::exit(cli::run_with_args(&args));
}
