use std::path::PathBuf;

use clap::{Parser, Subcommand};
use depot_core::UserType;

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "Keep the local warehouse mirror in sync with the ordering server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retry queued refreshes, then run a full sync
    Sync {
        /// User type code or name (defaults to DEPOT_USER_TYPE)
        #[arg(long, value_name = "TYPE")]
        user_type: Option<UserType>,
        /// Signed-in user id (defaults to DEPOT_USER_ID)
        #[arg(long, value_name = "ID")]
        user_id: Option<i64>,
    },
    /// Dispatch a push payload read from a file or stdin
    Notify {
        /// Payload file; stdin is read when omitted
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Retry every queued refresh now
    Retry,
    /// List refreshes waiting for retry
    Failed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show mirrored row counts and last sync stamps
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which tables a user type synchronizes
    Tables {
        /// User type code or name
        #[arg(long, value_name = "TYPE")]
        user_type: UserType,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
