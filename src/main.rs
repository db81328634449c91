mod app;
mod cli;

use tracing::Level;

fn main() {
    let cli = cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    app::run(cli);
}
