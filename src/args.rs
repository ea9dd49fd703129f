use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_LAUNCHER_URL, DEFAULT_LISTEN_PORT, DEFAULT_METHOD_PREFIX};

/// Link bank accounts through Klarna Open Banking and sync their transactions.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    pub connection: ConnectionArgs,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct ConnectionArgs {
    /// Base URL of the backend, e.g. https://erp.example.com
    #[clap(long, env = "KOSMA_BACKEND_URL")]
    pub backend_url: String,

    /// API key of the backend user
    #[clap(long, env = "KOSMA_API_KEY")]
    pub api_key: String,

    /// API secret of the backend user
    #[clap(long, env = "KOSMA_API_SECRET", hide_env_values = true)]
    pub api_secret: String,

    /// Module path the backend's banking methods live under
    #[clap(long, env = "KOSMA_METHOD_PREFIX", default_value = DEFAULT_METHOD_PREFIX)]
    pub method_prefix: String,

    /// Where to load the consent widget's launcher script from
    #[clap(long, env = "KOSMA_LAUNCHER_URL", default_value = DEFAULT_LAUNCHER_URL)]
    pub launcher_url: String,

    /// Local port the consent page is served on
    #[clap(long, env = "KOSMA_LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Link the banks of a company and add their accounts
    LinkBanks {
        /// Company to add the accounts to. Asks if not given.
        #[clap(long)]
        company: Option<String>,
    },

    /// Enqueue a transaction sync for a linked bank account
    SyncTransactions {
        /// Bank account to sync. Asks if not given.
        #[clap(long)]
        account: Option<String>,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
