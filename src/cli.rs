use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "exportq")]
#[command(about = "Asset export job queue with durable state", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Show debug-level log output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue sample assets against the simulated provider and watch them drain
    Demo {
        /// How many sample assets to enqueue
        #[arg(long, default_value_t = 4)]
        count: usize,

        /// Preset to export with (overrides config)
        #[arg(long)]
        preset: Option<String>,

        /// Make the last asset's transcode fail, to show error handling
        #[arg(long)]
        flaky: bool,
    },

    /// List the preset catalog
    Presets,

    /// Show the persisted queue state and where it lives
    Status,

    /// Delete the persisted queue state
    Clear,

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
