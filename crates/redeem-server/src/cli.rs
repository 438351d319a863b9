use clap::{Parser, Subcommand};

/// Redeem - channel point reward webhook server
#[derive(Parser, Debug)]
#[command(name = "redeemd")]
#[command(version = redeem_core::VERSION)]
#[command(about = "Channel point reward webhook daemon", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Default)]
pub enum Commands {
    /// Run server in foreground (default if no command given)
    #[default]
    Run,

    /// Scan the local network for bulbs and print their hardware addresses
    Discover {
        /// Seconds to wait for replies
        #[arg(long, default_value = "3")]
        timeout: u64,
    },
}
